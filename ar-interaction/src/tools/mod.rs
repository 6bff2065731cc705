//! Interaction tools driven by taps and tracking frames.
//!
//! ## Tap Flow
//!
//! ```text
//! Tap (x, y) + latest TrackingFrame
//!   └─> AnchorPlacementController::on_tap()
//!       ├─> no frame / no valid hit / anchor lost  -> Ignored
//!       ├─> measuring: MeasurementStateMachine
//!       │     ├─> Idle -> marker placed, AwaitingSecondPoint
//!       │     └─> AwaitingSecondPoint -> distance recorded, markers removed, Idle
//!       └─> placing: ModelInstancePool lease
//!             ├─> free instance -> AnchorRegistry::place()
//!             └─> pool empty -> background batch load, tap queued
//! ```
//!
//! The registry is the only writer of anchor subtrees in the scene graph;
//! measurement markers go through the same primitive.

/// Live anchors and the scene subtrees they own.
pub mod anchor_registry;

/// Two-tap distance measurement and its history.
pub mod measure;

/// Top-level coordinator for taps, frame updates and mode toggles.
pub mod placement_controller;

/// Tracking prompt derived from the latest frame.
pub mod tracking_status;
