//! Model assets: the loader boundary and the instance pool in front of it.

/// Asset identifiers, loaded instances, the `AssetLoader` boundary and a
/// manifest-backed loader implementation.
pub mod loader;

/// Arena-style pool of loaded model instances leased out per asset.
pub mod pool;

pub use loader::{AssetId, AssetLoader, LoadFailure, LoadFailureCause, ManifestModelLoader, ModelInstance};
pub use pool::{ModelInstanceHandle, ModelInstancePool, PoolStats};
