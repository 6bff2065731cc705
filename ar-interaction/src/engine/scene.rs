use bevy::pbr::wireframe::{Wireframe, WireframeColor};
use bevy::prelude::*;
use constants::render_settings::{BOUNDS_WIREFRAME_COLOUR, MARKER_COLOUR, MARKER_EMISSIVE};

use super::assets::AssetId;
use super::tracking::AnchorId;

/// Parent of every anchor subtree.
#[derive(Component)]
pub struct SceneRoot;

/// Root node of an anchor subtree, posed at the anchor.
#[derive(Component, Debug, Clone, Copy)]
pub struct AnchorNode {
    pub anchor: AnchorId,
}

/// Content node carrying a pooled furniture model.
#[derive(Component, Debug, Clone)]
pub struct PlacedModel {
    pub asset: AssetId,
    pub label: String,
}

/// Invisible box around placed furniture, shown while the model is being edited.
#[derive(Component, Debug, Clone, Copy)]
pub struct BoundingVolume(pub Vec3);

/// Small sphere marking a selected measurement point.
#[derive(Component, Debug, Clone, Copy)]
pub struct MeasurementMarker {
    pub radius: f32,
}

/// Reported by the host on a content node when an edit gesture starts or ends.
#[derive(Event, Debug, Clone, Copy)]
pub struct EditGesture {
    pub active: bool,
}

/// Whether detected planes should be drawn. Read by the host renderer.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneVisualization {
    pub enabled: bool,
}

pub fn spawn_scene_root(world: &mut World) -> Entity {
    world
        .spawn((
            SceneRoot,
            Transform::IDENTITY,
            Visibility::Inherited,
            Name::new("ar_scene_root"),
        ))
        .id()
}

// Gives newly spawned markers and bounding volumes something to draw when the
// host has a renderer. Headless hosts have no mesh assets and skip this.
pub fn decorate_scene_nodes(
    mut commands: Commands,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
    new_markers: Query<(Entity, &MeasurementMarker), Added<MeasurementMarker>>,
    new_bounds: Query<(Entity, &BoundingVolume), Added<BoundingVolume>>,
) {
    let (Some(mut meshes), Some(mut materials)) = (meshes, materials) else {
        return;
    };

    for (entity, marker) in &new_markers {
        commands.entity(entity).try_insert((
            Mesh3d(meshes.add(Sphere::new(marker.radius))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: MARKER_COLOUR,
                emissive: MARKER_EMISSIVE,
                unlit: true,
                ..default()
            })),
        ));
    }

    for (entity, BoundingVolume(size)) in &new_bounds {
        // Transparent surface so only the wireframe shows.
        commands.entity(entity).try_insert((
            Mesh3d(meshes.add(Cuboid::from_size(*size))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgba(0.0, 0.0, 0.0, 0.0),
                alpha_mode: AlphaMode::Blend,
                unlit: true,
                ..default()
            })),
            Wireframe,
            WireframeColor {
                color: BOUNDS_WIREFRAME_COLOUR,
            },
        ));
    }
}
