use bevy::prelude::*;
use std::sync::Arc;

use crate::engine::assets::{AssetId, AssetLoader, LoadFailure};
use crate::engine::scene::{PlaneVisualization, decorate_scene_nodes};
use crate::engine::tracking::TrackingFrame;
use crate::settings::ArInteractionSettings;
use crate::tools::placement_controller::{AnchorPlacementController, LoadOutcome, PlacementError};

/// Host input, consumed in send order so every tap is evaluated against the
/// latest frame sent before it.
#[derive(Event, Clone)]
pub enum InteractionInput {
    FrameUpdated(Arc<dyn TrackingFrame>),
    Tap(Vec2),
    SetMeasuring(bool),
    SetPlaneVisualization(bool),
    SelectAsset(AssetId),
    ClearHistory,
    ClearAnchors,
}

/// Fired when a model batch fails to load and its placements are dropped.
#[derive(Event, Debug, Clone)]
pub struct PlacementFailed {
    pub asset: AssetId,
    pub message: String,
}

impl From<&LoadFailure> for PlacementFailed {
    fn from(failure: &LoadFailure) -> Self {
        Self {
            asset: failure.asset.clone(),
            message: failure.to_string(),
        }
    }
}

/// Registers the placement controller, its input stream and load polling.
pub struct ArInteractionPlugin {
    loader: Arc<dyn AssetLoader>,
    settings: ArInteractionSettings,
}

impl ArInteractionPlugin {
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            loader,
            settings: ArInteractionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ArInteractionSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl Plugin for ArInteractionPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .insert_resource(AnchorPlacementController::new(
                self.settings.clone(),
                Arc::clone(&self.loader),
            ))
            .init_resource::<PlaneVisualization>()
            .add_event::<InteractionInput>()
            .add_event::<PlacementFailed>()
            .add_systems(
                Update,
                (
                    process_interaction_inputs,
                    poll_model_loads,
                    decorate_scene_nodes,
                )
                    .chain(),
            );
    }
}

fn apply_input(
    controller: &mut AnchorPlacementController,
    world: &mut World,
    input: InteractionInput,
) -> Result<(), PlacementError> {
    match input {
        InteractionInput::FrameUpdated(frame) => {
            controller.on_frame_update(frame);
        }
        InteractionInput::Tap(screen) => {
            controller.on_tap(world, screen)?;
        }
        InteractionInput::SetMeasuring(enabled) => {
            controller.set_measuring(world, enabled);
        }
        InteractionInput::SetPlaneVisualization(enabled) => {
            controller.set_plane_visualization(world, enabled);
        }
        InteractionInput::SelectAsset(asset) => {
            controller.select_asset(asset);
        }
        InteractionInput::ClearHistory => controller.clear_history(),
        InteractionInput::ClearAnchors => {
            controller.clear_anchors(world);
        }
    }
    Ok(())
}

// Exclusive so the controller can attach and detach nodes directly.
pub fn process_interaction_inputs(world: &mut World) {
    let inputs: Vec<InteractionInput> = world
        .resource_mut::<Events<InteractionInput>>()
        .drain()
        .collect();
    if inputs.is_empty() {
        return;
    }

    let failures = world.resource_scope(|world, mut controller: Mut<AnchorPlacementController>| {
        let mut failures = Vec::new();
        for input in inputs {
            if let Err(PlacementError::Load(failure)) = apply_input(&mut controller, world, input) {
                failures.push(PlacementFailed::from(&failure));
            }
        }
        failures
    });

    for failure in failures {
        world.send_event(failure);
    }
}

pub fn poll_model_loads(world: &mut World) {
    if !world.resource::<AnchorPlacementController>().has_pending_loads() {
        return;
    }

    let failures = world.resource_scope(|world, mut controller: Mut<AnchorPlacementController>| {
        controller
            .poll_loads(world)
            .into_iter()
            .filter_map(|outcome| match outcome {
                LoadOutcome::Failed(failure) => Some(PlacementFailed::from(&failure)),
                LoadOutcome::Placed { .. } => None,
            })
            .collect::<Vec<_>>()
    });

    for failure in failures {
        world.send_event(failure);
    }
}
