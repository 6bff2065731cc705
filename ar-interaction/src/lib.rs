//! Augmented-reality interaction core.
//!
//! Turns per-frame tracking data and screen taps into placed 3D furniture and
//! two-tap distance measurements. The Bevy `World` is the scene graph host:
//! anchors become entity subtrees under a single scene root.
//!
//! ## Architecture
//!
//! ```text
//! InteractionInput (ordered event stream)
//!   └─> AnchorPlacementController
//!       ├─> TrackingFrame::hit_test() -> first valid SurfaceHit
//!       ├─> MeasurementStateMachine  (measuring mode)
//!       └─> AnchorRegistry + ModelInstancePool (placement mode)
//!             └─> AsyncComputeTaskPool batch loads via AssetLoader
//!
//! TrackingQualityMonitor: latest frame + anchor count -> status prompt
//! ```
//!
//! ## Ownership
//!
//! - A `SpatialAnchor` lives inside exactly one `AnchorEntry` and is dropped
//!   when the entry is removed.
//! - Pooled model instances are leased through non-`Clone` handles and go back
//!   to the pool (or are retired) when their entry is removed.
//! - Background loads never touch the scene; their results are applied on the
//!   coordinating thread before any node is attached.
//!
//! ## Embedding
//!
//! Bevy hosts add [`ArInteractionPlugin`] and send [`InteractionInput`] events.
//! Other hosts own an [`AnchorPlacementController`] and a `World` directly and
//! call [`AnchorPlacementController::poll_loads`] once per frame.

/// Tracking boundary, model assets and scene node components.
pub mod engine;

/// JSON-RPC style notification outbox for host UIs.
pub mod notifications;

/// Bevy plugin wiring the controller into an app.
pub mod plugin;

/// Runtime settings and configuration errors.
pub mod settings;

/// Anchor registry, measurement, tracking status and the placement controller.
pub mod tools;

pub use engine::assets::{
    AssetId, AssetLoader, LoadFailure, LoadFailureCause, ManifestModelLoader, ModelInstance,
    ModelInstanceHandle, ModelInstancePool, PoolStats,
};
pub use engine::scene::{EditGesture, PlaneVisualization};
pub use engine::tracking::{
    AnchorId, HitKind, HitResult, ReplayFrame, SpatialAnchor, SurfaceHit, TrackingFailureReason,
    TrackingFrame,
};
pub use notifications::InteractionNotification;
pub use plugin::{ArInteractionPlugin, InteractionInput, PlacementFailed};
pub use settings::{ArInteractionSettings, AssetLoading, ConfigError};
pub use tools::anchor_registry::{AnchorEntry, AnchorRegistry, EntryContent};
pub use tools::measure::{MeasurementPhase, MeasurementRecord, MeasurementStep};
pub use tools::placement_controller::{
    AnchorPlacementController, IgnoreReason, LoadOutcome, PlacementError, TapOutcome,
};
pub use tools::tracking_status::{TrackingQualityMonitor, TrackingStatus};
