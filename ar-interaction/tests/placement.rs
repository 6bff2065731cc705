mod common;

use ar_interaction::engine::scene::AnchorNode;
use ar_interaction::{
    AnchorPlacementController, ArInteractionSettings, AssetId, AssetLoading, LoadOutcome,
    PlaneVisualization, TapOutcome,
};
use bevy::prelude::*;
use common::{CountingLoader, frame_at};
use std::collections::BTreeSet;
use std::sync::Arc;

fn background_controller(
    capacity: usize,
    asset: &str,
) -> (AnchorPlacementController, Arc<CountingLoader>) {
    let loader = Arc::new(CountingLoader::default());
    let settings = ArInteractionSettings {
        pool_capacity: capacity,
        asset_loading: AssetLoading::Background,
        default_asset: Some(AssetId::from(asset)),
        ..default()
    };
    (
        AnchorPlacementController::new(settings, loader.clone()),
        loader,
    )
}

// Every anchor node in the scene has exactly one registry entry and vice versa.
fn assert_no_dangling_anchors(world: &mut World, ctrl: &AnchorPlacementController) {
    let mut q = world.query::<&AnchorNode>();
    let in_scene: Vec<_> = q.iter(world).map(|node| node.anchor).collect();
    let unique: BTreeSet<_> = in_scene.iter().copied().collect();
    let registered: BTreeSet<_> = ctrl.registry().ids().into_iter().collect();
    assert_eq!(in_scene.len(), unique.len(), "anchor attached twice");
    assert_eq!(unique, registered);
}

#[test]
fn eleven_chairs_load_two_batches() {
    let mut world = World::new();
    let (mut ctrl, loader) = background_controller(10, "chair.glb");
    let chair = AssetId::from("chair.glb");

    for i in 0..11 {
        ctrl.on_frame_update(frame_at(Vec3::new(i as f32 * 0.8, 0.0, -2.0)));
        let outcome = ctrl.on_tap(&mut world, Vec2::new(540.0, 1200.0)).expect("tap");
        match i {
            0 | 10 => assert_eq!(outcome, TapOutcome::LoadQueued(chair.clone())),
            _ => assert!(matches!(outcome, TapOutcome::Placed(_)), "{:?}", outcome),
        }
        for done in ctrl.finish_loads(&mut world) {
            assert!(matches!(done, LoadOutcome::Placed { ref anchors, .. } if anchors.len() == 1));
        }
    }

    let stats = ctrl.pool().stats(&chair);
    assert_eq!(loader.calls(), 2);
    assert_eq!((stats.loaded, stats.leased, stats.free), (20, 11, 9));
    assert_eq!(ctrl.anchor_count(), 11);
    assert_no_dangling_anchors(&mut world, &ctrl);
}

#[test]
fn taps_during_a_load_share_it() {
    let mut world = World::new();
    let (mut ctrl, loader) = background_controller(2, "lamp.glb");
    let lamp = AssetId::from("lamp.glb");
    ctrl.on_frame_update(frame_at(Vec3::new(0.0, 0.0, -1.0)));

    for _ in 0..5 {
        let outcome = ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
        assert_eq!(outcome, TapOutcome::LoadQueued(lamp.clone()));
    }
    assert_eq!(ctrl.queued_placements(&lamp), 5);
    assert_eq!(ctrl.anchor_count(), 0);

    ctrl.finish_loads(&mut world);

    // One load per pool-empty event: 2 + 2 + 1.
    let stats = ctrl.pool().stats(&lamp);
    assert_eq!(loader.calls(), 3);
    assert_eq!(stats.batches, 3);
    assert_eq!((stats.loaded, stats.leased, stats.free), (6, 5, 1));
    assert_eq!(ctrl.anchor_count(), 5);
    assert!(!ctrl.has_pending_loads());
    assert_no_dangling_anchors(&mut world, &ctrl);
}

#[test]
fn failed_load_places_nothing() {
    let mut world = World::new();
    let (mut ctrl, loader) = background_controller(4, "missing-sofa.glb");
    ctrl.on_frame_update(frame_at(Vec3::ZERO));

    ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
    ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
    let outcomes = ctrl.finish_loads(&mut world);

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], LoadOutcome::Failed(_)));
    assert_eq!(loader.calls(), 1);
    assert_eq!(ctrl.anchor_count(), 0);
    assert_no_dangling_anchors(&mut world, &ctrl);

    let failed = ctrl
        .take_notifications()
        .into_iter()
        .find(|n| n.method == "placement_failed")
        .expect("placement_failed notification");
    assert_eq!(failed.params["dropped"].as_u64(), Some(2));
}

#[test]
fn place_and_remove_sequences_leave_no_dangling_anchors() {
    let mut world = World::new();
    let (mut ctrl, _) = background_controller(3, "chair.glb");
    let chair = AssetId::from("chair.glb");

    // Small LCG so the sequence is arbitrary but reproducible.
    let mut seed: u32 = 0x2545_f491;
    let mut next = move || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        seed >> 16
    };

    for step in 0..60 {
        let ids = ctrl.registry().ids();
        if ids.is_empty() || next() % 3 != 0 {
            ctrl.on_frame_update(frame_at(Vec3::new(step as f32, 0.0, 0.0)));
            ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
            ctrl.finish_loads(&mut world);
        } else {
            let victim = ids[next() as usize % ids.len()];
            ctrl.remove_anchor(&mut world, victim);
        }
        assert_no_dangling_anchors(&mut world, &ctrl);

        let stats = ctrl.pool().stats(&chair);
        assert!(stats.leased + stats.free <= stats.loaded);
        assert_eq!(stats.leased, ctrl.anchor_count());
        assert_eq!(stats.loaded % 3, 0);
    }
}

#[test]
fn clear_anchors_returns_instances_to_pool() {
    let mut world = World::new();
    let (mut ctrl, loader) = background_controller(4, "chair.glb");
    let chair = AssetId::from("chair.glb");

    for i in 0..3 {
        ctrl.on_frame_update(frame_at(Vec3::new(i as f32, 0.0, 0.0)));
        ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
        ctrl.finish_loads(&mut world);
    }
    assert_eq!(ctrl.clear_anchors(&mut world), 3);
    assert_eq!(ctrl.anchor_count(), 0);
    assert_eq!(ctrl.pool().stats(&chair).free, 4);

    ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
    assert_eq!(loader.calls(), 1, "reused instances need no reload");
    assert_no_dangling_anchors(&mut world, &ctrl);
}

#[test]
fn clear_anchors_drops_taps_waiting_on_a_load() {
    let mut world = World::new();
    let (mut ctrl, loader) = background_controller(4, "chair.glb");
    let chair = AssetId::from("chair.glb");
    ctrl.on_frame_update(frame_at(Vec3::new(0.5, 0.0, -1.0)));

    ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
    ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
    assert_eq!(ctrl.queued_placements(&chair), 2);

    assert_eq!(ctrl.clear_anchors(&mut world), 0);
    assert_eq!(ctrl.queued_placements(&chair), 0);
    ctrl.finish_loads(&mut world);

    assert_eq!(ctrl.anchor_count(), 0);
    assert_no_dangling_anchors(&mut world, &ctrl);
    let stats = ctrl.pool().stats(&chair);
    assert_eq!((stats.loaded, stats.leased, stats.free), (4, 0, 4));
    assert_eq!(loader.calls(), 1);

    let cleared = ctrl
        .take_notifications()
        .into_iter()
        .find(|n| n.method == "anchors_cleared")
        .expect("anchors_cleared notification");
    assert_eq!(cleared.params["dropped"].as_u64(), Some(2));
    assert_eq!(cleared.params["count"].as_u64(), Some(0));
}

#[test]
fn tap_without_frame_changes_nothing() {
    let mut world = World::new();
    let (mut ctrl, loader) = background_controller(10, "chair.glb");

    let outcome = ctrl.on_tap(&mut world, Vec2::new(100.0, 200.0));
    assert!(matches!(outcome, Ok(TapOutcome::Ignored(_))));
    assert_eq!(ctrl.anchor_count(), 0);
    assert_eq!(loader.calls(), 0);
    assert!(!ctrl.has_pending_loads());
}

#[test]
fn plane_visualization_toggle_is_idempotent() {
    let mut world = World::new();
    let (mut ctrl, _) = background_controller(10, "chair.glb");

    assert!(ctrl.set_plane_visualization(&mut world, true));
    assert!(!ctrl.set_plane_visualization(&mut world, true));

    assert!(ctrl.plane_visualization_enabled());
    assert_eq!(
        world.get_resource::<PlaneVisualization>(),
        Some(&PlaneVisualization { enabled: true })
    );
    let toggles = ctrl
        .take_notifications()
        .iter()
        .filter(|n| n.method == "plane_visualization_changed")
        .count();
    assert_eq!(toggles, 1);
}

#[test]
fn changing_asset_keeps_existing_placements() {
    let mut world = World::new();
    let (mut ctrl, _) = background_controller(2, "chair.glb");
    ctrl.on_frame_update(frame_at(Vec3::ZERO));
    ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
    ctrl.finish_loads(&mut world);

    assert!(ctrl.select_asset(AssetId::from("table.glb")));
    ctrl.on_tap(&mut world, Vec2::ZERO).expect("tap");
    ctrl.finish_loads(&mut world);

    let assets: Vec<String> = ctrl
        .registry()
        .iter()
        .filter_map(|entry| match entry.content() {
            ar_interaction::EntryContent::Furniture(handle) => Some(handle.asset().to_string()),
            ar_interaction::EntryContent::Marker => None,
        })
        .collect();
    assert_eq!(assets, vec!["chair.glb", "table.glb"]);
}
