use bevy::prelude::*;
use std::collections::HashMap;

use super::loader::{AssetId, AssetLoader, LoadFailure, LoadFailureCause, ModelInstance};

/// Lease on one pooled model instance.
///
/// Not `Clone`: the holder owns the instance until it hands the handle back via
/// [`ModelInstancePool::release`] or [`ModelInstancePool::retire`]. Dropping the
/// handle instead consumes the instance for good.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelInstanceHandle {
    asset: AssetId,
    slot: usize,
}

impl ModelInstanceHandle {
    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Per-asset counters. `leased + free + retired <= loaded` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub loaded: usize,
    pub leased: usize,
    pub free: usize,
    pub retired: usize,
    pub batches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Leased,
    Retired,
}

#[derive(Debug)]
struct Slot {
    instance: ModelInstance,
    state: SlotState,
}

#[derive(Debug, Default)]
struct AssetSlots {
    free: Vec<usize>,
    loaded: usize,
    leased: usize,
    retired: usize,
    batches: usize,
}

/// Arena of loaded model instances with a free list per asset.
///
/// Instances are appended in batches of `capacity` and never removed, so slot
/// indices stay valid for the lifetime of the pool.
#[derive(Debug)]
pub struct ModelInstancePool {
    capacity: usize,
    slots: Vec<Slot>,
    assets: HashMap<AssetId, AssetSlots>,
}

impl ModelInstancePool {
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            warn!("Model pool capacity of 0 requested, using 1");
        }
        Self {
            capacity: capacity.max(1),
            slots: Vec::new(),
            assets: HashMap::new(),
        }
    }

    /// Batch size used for every load.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has_free(&self, asset: &AssetId) -> bool {
        self.assets
            .get(asset)
            .is_some_and(|slots| !slots.free.is_empty())
    }

    /// Pops a free instance, if any. Never loads.
    pub fn lease(&mut self, asset: &AssetId) -> Option<ModelInstanceHandle> {
        let slots = self.assets.get_mut(asset)?;
        let slot = slots.free.pop()?;
        self.slots[slot].state = SlotState::Leased;
        slots.leased += 1;
        Some(ModelInstanceHandle {
            asset: asset.clone(),
            slot,
        })
    }

    /// Leases an instance, loading one batch synchronously if the free list is empty.
    ///
    /// Blocks on the loader; callers on the frame thread should load in the
    /// background and [`fill`](Self::fill) instead.
    pub fn lease_or_load(
        &mut self,
        asset: &AssetId,
        loader: &dyn AssetLoader,
    ) -> Result<ModelInstanceHandle, LoadFailure> {
        if let Some(handle) = self.lease(asset) {
            return Ok(handle);
        }
        let instances = loader.load_instances(asset, self.capacity)?;
        self.fill(asset, instances);
        self.lease(asset)
            .ok_or_else(|| LoadFailure::new(asset.clone(), LoadFailureCause::EmptyBatch))
    }

    /// Adds one loaded batch to the free list, truncated to the pool capacity.
    /// Returns the number of instances added.
    pub fn fill(&mut self, asset: &AssetId, instances: Vec<ModelInstance>) -> usize {
        let entry = self.assets.entry(asset.clone()).or_default();
        let mut added = 0;
        for instance in instances.into_iter().take(self.capacity) {
            let slot = self.slots.len();
            self.slots.push(Slot {
                instance,
                state: SlotState::Free,
            });
            entry.free.push(slot);
            added += 1;
        }
        entry.loaded += added;
        entry.batches += 1;
        debug!(
            "Model pool: loaded {} instances of {} ({} total)",
            added, asset, entry.loaded
        );
        added
    }

    /// Returns a leased instance to its asset's free list.
    pub fn release(&mut self, handle: ModelInstanceHandle) {
        let slots = self.checked_out(&handle);
        slots.leased -= 1;
        slots.free.push(handle.slot);
        self.slots[handle.slot].state = SlotState::Free;
    }

    /// Permanently consumes a leased instance. It stays counted as loaded.
    pub fn retire(&mut self, handle: ModelInstanceHandle) {
        let slots = self.checked_out(&handle);
        slots.leased -= 1;
        slots.retired += 1;
        self.slots[handle.slot].state = SlotState::Retired;
    }

    pub fn instance(&self, handle: &ModelInstanceHandle) -> &ModelInstance {
        &self.slots[handle.slot].instance
    }

    pub fn stats(&self, asset: &AssetId) -> PoolStats {
        self.assets
            .get(asset)
            .map(|slots| PoolStats {
                loaded: slots.loaded,
                leased: slots.leased,
                free: slots.free.len(),
                retired: slots.retired,
                batches: slots.batches,
            })
            .unwrap_or_default()
    }

    fn checked_out(&mut self, handle: &ModelInstanceHandle) -> &mut AssetSlots {
        let leased = self
            .slots
            .get(handle.slot)
            .is_some_and(|slot| slot.state == SlotState::Leased && slot.instance.asset == handle.asset);
        if !leased {
            panic!(
                "model instance slot {} of {} is not leased from this pool",
                handle.slot, handle.asset
            );
        }
        match self.assets.get_mut(&handle.asset) {
            Some(slots) => slots,
            None => panic!("model pool has no entry for leased asset {}", handle.asset),
        }
    }
}
