#![allow(dead_code)]

use ar_interaction::{
    AssetId, AssetLoader, HitResult, LoadFailure, LoadFailureCause, ModelInstance, ReplayFrame,
    TrackingFrame,
};
use bevy::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

/// Loader that counts calls and fails for assets whose name starts with `missing`.
#[derive(Default)]
pub struct CountingLoader {
    calls: AtomicUsize,
}

impl CountingLoader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssetLoader for CountingLoader {
    fn load_instances(
        &self,
        asset: &AssetId,
        count: usize,
    ) -> Result<Vec<ModelInstance>, LoadFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if asset.as_str().starts_with("missing") {
            return Err(LoadFailure::new(
                asset.clone(),
                LoadFailureCause::MissingFile(asset.as_str().into()),
            ));
        }
        Ok((0..count)
            .map(|i| ModelInstance {
                asset: asset.clone(),
                label: format!("{}#{}", asset, i),
                bounds: Vec3::new(0.5, 0.9, 0.5),
            })
            .collect())
    }
}

/// Loader whose batches block until the test opens the gate once per batch.
pub struct GatedLoader {
    gate: Mutex<Receiver<()>>,
    inner: CountingLoader,
}

impl GatedLoader {
    pub fn new() -> (Self, Sender<()>) {
        let (open, gate) = channel();
        (
            Self {
                gate: Mutex::new(gate),
                inner: CountingLoader::default(),
            },
            open,
        )
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl AssetLoader for GatedLoader {
    fn load_instances(
        &self,
        asset: &AssetId,
        count: usize,
    ) -> Result<Vec<ModelInstance>, LoadFailure> {
        let opened = self
            .gate
            .lock()
            .map(|gate| gate.recv().is_ok())
            .unwrap_or(false);
        if !opened {
            return Err(LoadFailure::new(
                asset.clone(),
                LoadFailureCause::Parse("gate closed".to_string()),
            ));
        }
        self.inner.load_instances(asset, count)
    }
}

/// Frame whose every hit-test lands on a plane at `position`.
pub fn frame_at(position: Vec3) -> Arc<dyn TrackingFrame> {
    Arc::new(ReplayFrame::new().with_hit(HitResult::plane(position)))
}
