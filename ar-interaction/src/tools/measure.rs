use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::anchor_registry::AnchorRegistry;
use crate::engine::tracking::{AnchorId, SpatialAnchor};

/// One completed two-point measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub id: u32,
    pub start: Vec3,
    pub end: Vec3,
    /// Metres between `start` and `end`.
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementPhase {
    #[default]
    Idle,
    /// First point placed; its marker entry is held by the registry.
    AwaitingSecondPoint { pending: AnchorId },
}

/// Result of feeding a valid hit into the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementStep {
    Started { anchor: AnchorId, position: Vec3 },
    Completed(MeasurementRecord),
}

/// Two-tap distance measurement with an append-only history.
#[derive(Debug, Default)]
pub struct MeasurementStateMachine {
    phase: MeasurementPhase,
    history: Vec<MeasurementRecord>,
    current: Option<MeasurementRecord>,
    next_id: u32,
}

impl MeasurementStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    // First point: place a marker and wait.
    // Second point: place a marker, record the distance, drop both markers.
    pub fn on_valid_hit(
        &mut self,
        world: &mut World,
        registry: &mut AnchorRegistry,
        anchor: SpatialAnchor,
        marker_radius: f32,
    ) -> MeasurementStep {
        let position = anchor.translation();
        let placed = registry.place_marker(world, anchor, marker_radius);

        match self.phase {
            MeasurementPhase::Idle => {
                // Starting a new measurement clears the displayed result.
                self.current = None;
                self.phase = MeasurementPhase::AwaitingSecondPoint { pending: placed };
                MeasurementStep::Started {
                    anchor: placed,
                    position,
                }
            }
            MeasurementPhase::AwaitingSecondPoint { pending } => {
                let first = registry.remove(world, pending);
                let second = registry.remove(world, placed);

                let record = MeasurementRecord {
                    id: self.next_id,
                    start: first.anchor().translation(),
                    end: second.anchor().translation(),
                    distance: first.anchor().distance_to(second.anchor()),
                };
                self.next_id += 1;
                self.history.push(record.clone());
                self.current = Some(record.clone());
                self.phase = MeasurementPhase::Idle;
                MeasurementStep::Completed(record)
            }
        }
    }

    /// Drops a half-complete measurement without recording it.
    /// Returns whether a pending point was discarded.
    pub fn abort(&mut self, world: &mut World, registry: &mut AnchorRegistry) -> bool {
        self.current = None;
        match std::mem::take(&mut self.phase) {
            MeasurementPhase::Idle => false,
            MeasurementPhase::AwaitingSecondPoint { pending } => {
                registry.remove(world, pending);
                true
            }
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.current = None;
    }

    pub fn phase(&self) -> MeasurementPhase {
        self.phase
    }

    pub fn pending_anchor(&self) -> Option<AnchorId> {
        match self.phase {
            MeasurementPhase::AwaitingSecondPoint { pending } => Some(pending),
            MeasurementPhase::Idle => None,
        }
    }

    /// Oldest first.
    pub fn history(&self) -> &[MeasurementRecord] {
        &self.history
    }

    /// Distance of the last completed measurement still on display.
    pub fn current_distance(&self) -> Option<f32> {
        self.current.as_ref().map(|m| m.distance)
    }

    pub fn current(&self) -> Option<&MeasurementRecord> {
        self.current.as_ref()
    }
}
