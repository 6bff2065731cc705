use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task, TaskPool, block_on, futures_lite::future};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::anchor_registry::{AnchorEntry, AnchorRegistry, EntryContent};
use super::measure::{MeasurementPhase, MeasurementRecord, MeasurementStateMachine, MeasurementStep};
use super::tracking_status::{TrackingQualityMonitor, TrackingStatus};
use crate::engine::assets::{
    AssetId, AssetLoader, LoadFailure, LoadFailureCause, ModelInstance, ModelInstanceHandle,
    ModelInstancePool,
};
use crate::engine::scene::PlaneVisualization;
use crate::engine::tracking::{
    AnchorId, SpatialAnchor, SurfaceHit, TrackingFrame, first_valid_hit,
};
use crate::notifications::{InteractionNotification, InteractionNotifications};
use crate::settings::{ArInteractionSettings, AssetLoading};

type LoadResult = Result<Vec<ModelInstance>, LoadFailure>;

/// Why a tap produced nothing. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoFrame,
    NoValidHit,
    AnchorCreationFailed,
    NoAssetSelected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TapOutcome {
    Ignored(IgnoreReason),
    Placed(AnchorId),
    /// The asset's pool is empty; the placement completes when its batch loads.
    LoadQueued(AssetId),
    Measurement(MeasurementStep),
}

/// Result of applying a finished background load.
#[derive(Debug)]
pub enum LoadOutcome {
    Placed { asset: AssetId, anchors: Vec<AnchorId> },
    Failed(LoadFailure),
}

#[derive(Debug)]
pub enum PlacementError {
    Load(LoadFailure),
}

impl From<LoadFailure> for PlacementError {
    fn from(err: LoadFailure) -> Self {
        PlacementError::Load(err)
    }
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::Load(e) => write!(f, "placement failed: {}", e),
        }
    }
}

impl std::error::Error for PlacementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlacementError::Load(e) => Some(e),
        }
    }
}

// One in-flight batch load per asset, with the taps waiting on it in arrival order.
struct PendingLoad {
    task: Task<LoadResult>,
    queued: VecDeque<Box<dyn SurfaceHit>>,
}

/// Top-level coordinator for taps and frame updates.
///
/// All methods run on the coordinating thread. The only work pushed elsewhere
/// is model loading, whose results are applied in [`poll_loads`](Self::poll_loads).
#[derive(Resource)]
pub struct AnchorPlacementController {
    settings: ArInteractionSettings,
    loader: Arc<dyn AssetLoader>,
    frame: Option<Arc<dyn TrackingFrame>>,
    registry: AnchorRegistry,
    pool: ModelInstancePool,
    measurement: MeasurementStateMachine,
    pending_loads: HashMap<AssetId, PendingLoad>,
    selected_asset: Option<AssetId>,
    is_measuring: bool,
    plane_visualization: bool,
    last_status: Option<TrackingStatus>,
    notifications: InteractionNotifications,
}

impl AnchorPlacementController {
    pub fn new(settings: ArInteractionSettings, loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            pool: ModelInstancePool::new(settings.pool_capacity),
            selected_asset: settings.default_asset.clone(),
            settings,
            loader,
            frame: None,
            registry: AnchorRegistry::new(),
            measurement: MeasurementStateMachine::new(),
            pending_loads: HashMap::new(),
            is_measuring: false,
            plane_visualization: false,
            last_status: None,
            notifications: InteractionNotifications::default(),
        }
    }

    /// Replaces the current frame and returns the recomputed tracking status.
    pub fn on_frame_update(&mut self, frame: Arc<dyn TrackingFrame>) -> TrackingStatus {
        self.frame = Some(frame);
        let status = self.tracking_status();
        if self.last_status.as_ref() != Some(&status) {
            self.notifications.send_notification(
                "tracking_status_changed",
                serde_json::json!({ "status": status.text() }),
            );
            self.last_status = Some(status.clone());
        }
        status
    }

    pub fn on_tap(&mut self, world: &mut World, screen: Vec2) -> Result<TapOutcome, PlacementError> {
        let Some(frame) = self.frame.as_ref() else {
            debug!("Tap at {} ignored: no tracking frame yet", screen);
            return Ok(TapOutcome::Ignored(IgnoreReason::NoFrame));
        };
        let Some(hit) = first_valid_hit(frame.as_ref(), screen) else {
            debug!("Tap at {} ignored: no valid surface hit", screen);
            return Ok(TapOutcome::Ignored(IgnoreReason::NoValidHit));
        };

        if self.is_measuring {
            let Some(anchor) = hit.create_anchor() else {
                debug!("Tap at {} ignored: anchor creation failed", screen);
                return Ok(TapOutcome::Ignored(IgnoreReason::AnchorCreationFailed));
            };
            return Ok(TapOutcome::Measurement(self.measure(world, anchor)));
        }

        let Some(asset) = self.selected_asset.clone() else {
            debug!("Tap at {} ignored: no asset selected", screen);
            return Ok(TapOutcome::Ignored(IgnoreReason::NoAssetSelected));
        };
        self.place_furniture(world, asset, hit)
    }

    /// Returns whether the mode changed. Enabling drops furniture taps still
    /// waiting on a background load; disabling drops any half-complete
    /// measurement.
    pub fn set_measuring(&mut self, world: &mut World, enabled: bool) -> bool {
        if self.is_measuring == enabled {
            return false;
        }
        self.is_measuring = enabled;
        if enabled {
            let dropped = self.drop_queued_placements();
            if dropped > 0 {
                debug!("Dropped {} queued placement(s) on entering measuring mode", dropped);
            }
        } else if self.measurement.abort(world, &mut self.registry) {
            debug!("Discarded half-complete measurement");
        }
        info!("Measuring mode {}", if enabled { "enabled" } else { "disabled" });
        self.notifications.send_notification(
            "measuring_changed",
            serde_json::json!({ "active": enabled }),
        );
        true
    }

    /// Idempotent. Publishes the flag as the `PlaneVisualization` resource.
    pub fn set_plane_visualization(&mut self, world: &mut World, enabled: bool) -> bool {
        if self.plane_visualization == enabled {
            return false;
        }
        self.plane_visualization = enabled;
        world.insert_resource(PlaneVisualization { enabled });
        self.notifications.send_notification(
            "plane_visualization_changed",
            serde_json::json!({ "enabled": enabled }),
        );
        true
    }

    /// Only affects future placements.
    pub fn select_asset(&mut self, asset: AssetId) -> bool {
        if self.selected_asset.as_ref() == Some(&asset) {
            return false;
        }
        info!("Selected asset {}", asset);
        self.notifications.send_notification(
            "asset_selected",
            serde_json::json!({ "asset": asset.as_str() }),
        );
        self.selected_asset = Some(asset);
        true
    }

    pub fn clear_history(&mut self) {
        self.measurement.clear_history();
        self.notifications
            .send_notification("measure_history_cleared", serde_json::json!({}));
    }

    /// Removes one placed anchor. Removing the pending measurement point aborts
    /// that measurement.
    pub fn remove_anchor(&mut self, world: &mut World, id: AnchorId) {
        if self.measurement.pending_anchor() == Some(id) {
            self.measurement.abort(world, &mut self.registry);
            return;
        }
        let entry = self.registry.remove(world, id);
        self.recycle(entry);
    }

    /// Removes every anchor, including a pending measurement point, and drops
    /// taps waiting on background loads. In-flight loads still fill the pool.
    /// Returns the number of anchors removed.
    pub fn clear_anchors(&mut self, world: &mut World) -> usize {
        let dropped = self.drop_queued_placements();
        let mut removed = usize::from(self.measurement.abort(world, &mut self.registry));
        for id in self.registry.ids() {
            let entry = self.registry.remove(world, id);
            self.recycle(entry);
            removed += 1;
        }
        info!("Cleared {} anchors, dropped {} queued placement(s)", removed, dropped);
        self.notifications.send_notification(
            "anchors_cleared",
            serde_json::json!({ "count": removed, "dropped": dropped }),
        );
        removed
    }

    /// Applies background loads that have finished. Never blocks.
    pub fn poll_loads(&mut self, world: &mut World) -> Vec<LoadOutcome> {
        let ready: Vec<(AssetId, LoadResult)> = self
            .pending_loads
            .iter_mut()
            .filter_map(|(asset, pending)| {
                block_on(future::poll_once(&mut pending.task)).map(|result| (asset.clone(), result))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(ready.len());
        for (asset, result) in ready {
            if let Some(pending) = self.pending_loads.remove(&asset) {
                outcomes.push(self.apply_load(world, asset, pending.queued, result));
            }
        }
        outcomes
    }

    /// Blocks until every background load, including follow-up batches, is applied.
    pub fn finish_loads(&mut self, world: &mut World) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Some(asset) = self.pending_loads.keys().next().cloned() {
            let Some(pending) = self.pending_loads.remove(&asset) else {
                break;
            };
            let result = block_on(pending.task);
            outcomes.push(self.apply_load(world, asset, pending.queued, result));
        }
        outcomes
    }

    pub fn has_pending_loads(&self) -> bool {
        !self.pending_loads.is_empty()
    }

    /// Taps waiting on a batch load for `asset`.
    pub fn queued_placements(&self, asset: &AssetId) -> usize {
        self.pending_loads
            .get(asset)
            .map_or(0, |pending| pending.queued.len())
    }

    pub fn tracking_status(&self) -> TrackingStatus {
        TrackingQualityMonitor::status(self.frame.as_deref(), self.registry.len())
    }

    pub fn current_distance(&self) -> Option<f32> {
        self.measurement.current_distance()
    }

    pub fn history(&self) -> &[MeasurementRecord] {
        self.measurement.history()
    }

    pub fn measurement_phase(&self) -> MeasurementPhase {
        self.measurement.phase()
    }

    pub fn anchor_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &ModelInstancePool {
        &self.pool
    }

    pub fn is_measuring(&self) -> bool {
        self.is_measuring
    }

    pub fn plane_visualization_enabled(&self) -> bool {
        self.plane_visualization
    }

    pub fn selected_asset(&self) -> Option<&AssetId> {
        self.selected_asset.as_ref()
    }

    pub fn settings(&self) -> &ArInteractionSettings {
        &self.settings
    }

    pub fn take_notifications(&mut self) -> Vec<InteractionNotification> {
        self.notifications.drain()
    }

    fn measure(&mut self, world: &mut World, anchor: SpatialAnchor) -> MeasurementStep {
        let had_result = self.measurement.current_distance().is_some();
        let step = self.measurement.on_valid_hit(
            world,
            &mut self.registry,
            anchor,
            self.settings.marker_radius,
        );

        match &step {
            MeasurementStep::Started { position, .. } => {
                if had_result {
                    self.notifications
                        .send_notification("measure_cleared", serde_json::json!({}));
                }
                self.notifications.send_notification(
                    "measure_started",
                    serde_json::json!({ "position": [position.x, position.y, position.z] }),
                );
            }
            MeasurementStep::Completed(m) => {
                info!("Measured {:.3} m", m.distance);
                self.notifications.send_notification(
                    "measure_completed",
                    serde_json::json!({
                        "id": m.id,
                        "start": [m.start.x, m.start.y, m.start.z],
                        "end": [m.end.x, m.end.y, m.end.z],
                        "distance": m.distance,
                    }),
                );
            }
        }
        step
    }

    fn place_furniture(
        &mut self,
        world: &mut World,
        asset: AssetId,
        hit: Box<dyn SurfaceHit>,
    ) -> Result<TapOutcome, PlacementError> {
        // Taps behind an in-flight load wait their turn.
        if let Some(pending) = self.pending_loads.get_mut(&asset) {
            pending.queued.push_back(hit);
            return Ok(TapOutcome::LoadQueued(asset));
        }

        let lease = match self.settings.asset_loading {
            AssetLoading::Background => match self.pool.lease(&asset) {
                Some(lease) => lease,
                None => {
                    let task = self.spawn_load(&asset);
                    self.pending_loads.insert(
                        asset.clone(),
                        PendingLoad {
                            task,
                            queued: VecDeque::from([hit]),
                        },
                    );
                    return Ok(TapOutcome::LoadQueued(asset));
                }
            },
            AssetLoading::Inline => match self.pool.lease_or_load(&asset, self.loader.as_ref()) {
                Ok(lease) => lease,
                Err(failure) => {
                    self.report_load_failure(&failure, 1);
                    return Err(failure.into());
                }
            },
        };

        Ok(match self.place_leased(world, lease, hit.as_ref()) {
            Some(id) => TapOutcome::Placed(id),
            None => TapOutcome::Ignored(IgnoreReason::AnchorCreationFailed),
        })
    }

    // Anchor and entry are created together, only once an instance is in hand.
    fn place_leased(
        &mut self,
        world: &mut World,
        lease: ModelInstanceHandle,
        hit: &dyn SurfaceHit,
    ) -> Option<AnchorId> {
        let asset = lease.asset().clone();
        let Some(anchor) = hit.create_anchor() else {
            debug!("Anchor creation failed for {}; returning instance", asset);
            self.pool.release(lease);
            return None;
        };
        let position = anchor.translation();
        let id = self.registry.place(world, anchor, lease, &self.pool);
        self.notifications.send_notification(
            "anchor_placed",
            serde_json::json!({
                "anchor": id.get(),
                "asset": asset.as_str(),
                "position": [position.x, position.y, position.z],
            }),
        );
        Some(id)
    }

    fn spawn_load(&self, asset: &AssetId) -> Task<LoadResult> {
        let loader = Arc::clone(&self.loader);
        let asset = asset.clone();
        let count = self.pool.capacity();
        info!("Loading {} instances of {} in the background", count, asset);
        AsyncComputeTaskPool::get_or_init(TaskPool::new)
            .spawn(async move { loader.load_instances(&asset, count) })
    }

    fn apply_load(
        &mut self,
        world: &mut World,
        asset: AssetId,
        mut queued: VecDeque<Box<dyn SurfaceHit>>,
        result: LoadResult,
    ) -> LoadOutcome {
        let instances = match result {
            Ok(instances) => instances,
            Err(failure) => {
                self.report_load_failure(&failure, queued.len());
                return LoadOutcome::Failed(failure);
            }
        };

        let added = self.pool.fill(&asset, instances);
        let mut anchors = Vec::new();
        while let Some(hit) = queued.pop_front() {
            let Some(lease) = self.pool.lease(&asset) else {
                queued.push_front(hit);
                break;
            };
            if let Some(id) = self.place_leased(world, lease, hit.as_ref()) {
                anchors.push(id);
            }
        }

        if !queued.is_empty() {
            if added == 0 {
                let failure = LoadFailure::new(asset, LoadFailureCause::EmptyBatch);
                self.report_load_failure(&failure, queued.len());
                return LoadOutcome::Failed(failure);
            }
            // Pool ran dry again with taps still waiting: one more batch.
            let task = self.spawn_load(&asset);
            self.pending_loads
                .insert(asset.clone(), PendingLoad { task, queued });
        }

        LoadOutcome::Placed { asset, anchors }
    }

    fn report_load_failure(&mut self, failure: &LoadFailure, dropped: usize) {
        warn!("{}; dropping {} placement(s)", failure, dropped);
        self.notifications.send_notification(
            "placement_failed",
            serde_json::json!({
                "asset": failure.asset.as_str(),
                "error": failure.cause.to_string(),
                "dropped": dropped,
            }),
        );
    }

    // Empties every load queue; the loads themselves still complete.
    fn drop_queued_placements(&mut self) -> usize {
        self.pending_loads
            .values_mut()
            .map(|pending| std::mem::take(&mut pending.queued).len())
            .sum()
    }

    fn recycle(&mut self, entry: AnchorEntry) {
        if let EntryContent::Furniture(lease) = entry.into_content() {
            if self.settings.release_instances_on_remove {
                self.pool.release(lease);
            } else {
                self.pool.retire(lease);
            }
        }
    }
}
