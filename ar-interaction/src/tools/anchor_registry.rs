use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::engine::assets::{ModelInstanceHandle, ModelInstancePool};
use crate::engine::scene::{
    AnchorNode, BoundingVolume, EditGesture, MeasurementMarker, PlacedModel, spawn_scene_root,
};
use crate::engine::tracking::{AnchorId, SpatialAnchor};

/// What an anchor's subtree displays.
#[derive(Debug)]
pub enum EntryContent {
    Furniture(ModelInstanceHandle),
    Marker,
}

/// A spatial anchor paired with the one scene subtree it owns.
#[derive(Debug)]
pub struct AnchorEntry {
    anchor: SpatialAnchor,
    root: Entity,
    content_node: Entity,
    bounds_node: Option<Entity>,
    content: EntryContent,
}

impl AnchorEntry {
    pub fn anchor(&self) -> &SpatialAnchor {
        &self.anchor
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn content_node(&self) -> Entity {
        self.content_node
    }

    pub fn bounds_node(&self) -> Option<Entity> {
        self.bounds_node
    }

    pub fn content(&self) -> &EntryContent {
        &self.content
    }

    pub fn is_marker(&self) -> bool {
        matches!(self.content, EntryContent::Marker)
    }

    /// Drops the anchor and hands back whatever the entry was holding.
    pub fn into_content(self) -> EntryContent {
        self.content
    }
}

/// Live anchors and their scene subtrees.
///
/// The only writer of anchor subtrees in the scene graph: every entry's root is
/// parented under the scene root exactly once and despawned together with the
/// entry.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    scene_root: Option<Entity>,
    entries: BTreeMap<AnchorId, AnchorEntry>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene root entity, spawned on first use.
    pub fn scene_root(&mut self, world: &mut World) -> Entity {
        if let Some(root) = self.scene_root {
            if world.get_entity(root).is_ok() {
                return root;
            }
        }
        let root = spawn_scene_root(world);
        self.scene_root = Some(root);
        root
    }

    /// Places a furniture subtree for `anchor` using an already leased instance.
    pub fn place(
        &mut self,
        world: &mut World,
        anchor: SpatialAnchor,
        lease: ModelInstanceHandle,
        pool: &ModelInstancePool,
    ) -> AnchorId {
        let instance = pool.instance(&lease);
        let size = instance.bounds;
        let root = self.spawn_anchor_root(world, &anchor, &instance.label);

        let content_node = world
            .spawn((
                PlacedModel {
                    asset: instance.asset.clone(),
                    label: instance.label.clone(),
                },
                Transform::IDENTITY,
                Visibility::Inherited,
                Name::new(instance.label.clone()),
                ChildOf(root),
            ))
            .id();

        // Centre the box so it sits flat on the anchored surface.
        let bounds_node = world
            .spawn((
                BoundingVolume(size),
                Transform::from_translation(Vec3::Y * size.y * 0.5),
                Visibility::Hidden,
                Name::new(format!("{}_bounds", instance.label)),
                ChildOf(root),
            ))
            .id();

        world.entity_mut(content_node).observe(
            move |trigger: Trigger<EditGesture>, mut visibility: Query<&mut Visibility>| {
                if let Ok(mut v) = visibility.get_mut(bounds_node) {
                    *v = if trigger.event().active {
                        Visibility::Inherited
                    } else {
                        Visibility::Hidden
                    };
                }
            },
        );

        self.insert(AnchorEntry {
            anchor,
            root,
            content_node,
            bounds_node: Some(bounds_node),
            content: EntryContent::Furniture(lease),
        })
    }

    /// Places a measurement marker subtree for `anchor`.
    pub fn place_marker(&mut self, world: &mut World, anchor: SpatialAnchor, radius: f32) -> AnchorId {
        let root = self.spawn_anchor_root(world, &anchor, "measurement");
        let content_node = world
            .spawn((
                MeasurementMarker { radius },
                Transform::IDENTITY,
                Visibility::Inherited,
                Name::new("measurement_marker"),
                ChildOf(root),
            ))
            .id();

        self.insert(AnchorEntry {
            anchor,
            root,
            content_node,
            bounds_node: None,
            content: EntryContent::Marker,
        })
    }

    /// Detaches the entry's subtree and returns the entry.
    ///
    /// Panics if `id` is not registered: the scene graph and the registry
    /// would otherwise drift apart.
    pub fn remove(&mut self, world: &mut World, id: AnchorId) -> AnchorEntry {
        let Some(entry) = self.entries.remove(&id) else {
            panic!("attempted to remove {} which is not in the anchor registry", id);
        };
        if !world.despawn(entry.root) {
            panic!("{} subtree was detached outside the anchor registry", id);
        }
        entry
    }

    pub fn get(&self, id: AnchorId) -> Option<&AnchorEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: AnchorId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Registered anchors in creation order.
    pub fn ids(&self) -> Vec<AnchorId> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn spawn_anchor_root(&mut self, world: &mut World, anchor: &SpatialAnchor, label: &str) -> Entity {
        let scene_root = self.scene_root(world);
        world
            .spawn((
                AnchorNode { anchor: anchor.id() },
                *anchor.pose(),
                Visibility::Inherited,
                Name::new(format!("{}_{}", label, anchor.id())),
                ChildOf(scene_root),
            ))
            .id()
    }

    fn insert(&mut self, entry: AnchorEntry) -> AnchorId {
        let id = entry.anchor.id();
        if self.entries.insert(id, entry).is_some() {
            panic!("{} registered twice", id);
        }
        id
    }
}
