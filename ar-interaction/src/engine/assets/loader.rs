use bevy::prelude::*;
use constants::render_settings::MIN_BOUNDS_EXTENT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::ConfigError;

/// Identifies a 3D model by its path, e.g. `"chair.glb"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for AssetId {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One loaded, renderable copy of a model asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub asset: AssetId,
    pub label: String,
    /// Size of the model's local bounding box.
    pub bounds: Vec3,
}

/// Why an asset could not be loaded.
#[derive(Debug)]
pub enum LoadFailureCause {
    MissingFile(PathBuf),
    Io(std::io::Error),
    Parse(String),
    UnknownAsset,
    EmptyBatch,
}

impl fmt::Display for LoadFailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailureCause::MissingFile(path) => write!(f, "file not found: {}", path.display()),
            LoadFailureCause::Io(e) => write!(f, "IO error: {}", e),
            LoadFailureCause::Parse(msg) => write!(f, "parse error: {}", msg),
            LoadFailureCause::UnknownAsset => write!(f, "asset is not in the model manifest"),
            LoadFailureCause::EmptyBatch => write!(f, "loader returned no instances"),
        }
    }
}

/// Loader error for one asset. Never retried internally.
#[derive(Debug)]
pub struct LoadFailure {
    pub asset: AssetId,
    pub cause: LoadFailureCause,
}

impl LoadFailure {
    pub fn new(asset: AssetId, cause: LoadFailureCause) -> Self {
        Self { asset, cause }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load {}: {}", self.asset, self.cause)
    }
}

impl std::error::Error for LoadFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            LoadFailureCause::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Boundary to whatever actually decodes model files. May block on I/O, so the
/// placement controller only calls it from the async compute pool.
pub trait AssetLoader: Send + Sync + 'static {
    fn load_instances(&self, asset: &AssetId, count: usize)
    -> Result<Vec<ModelInstance>, LoadFailure>;
}

/// Local bounds of a model in asset space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsData {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

/// Manifest entry describing one placeable model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub local_bounds: BoundsData,
}

impl ModelDefinition {
    /// Bounding box size, clamped so degenerate models still get a pickable volume.
    pub fn size(&self) -> Vec3 {
        let lb = &self.local_bounds;
        let extent = |min: f64, max: f64| {
            let e = (max - min) as f32;
            if e.is_finite() && e > MIN_BOUNDS_EXTENT {
                e
            } else {
                MIN_BOUNDS_EXTENT
            }
        };
        Vec3::new(
            extent(lb.min_x, lb.max_x),
            extent(lb.min_y, lb.max_y),
            extent(lb.min_z, lb.max_z),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelManifest {
    assets: Vec<ModelDefinition>,
}

/// Loads models listed in `<root>/manifest.json` from files under `root`.
///
/// Decoding is left to the renderer; this loader validates that the model file
/// exists and is non-empty and hands out instances sized from the manifest.
#[derive(Debug, Clone)]
pub struct ManifestModelLoader {
    root: PathBuf,
    definitions: HashMap<String, ModelDefinition>,
}

impl ManifestModelLoader {
    pub const MANIFEST_FILE: &'static str = "manifest.json";

    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        let json = fs::read_to_string(root.join(Self::MANIFEST_FILE))?;
        Self::from_manifest_str(root, &json)
    }

    pub fn from_manifest_str(root: impl Into<PathBuf>, json: &str) -> Result<Self, ConfigError> {
        let manifest: ModelManifest = serde_json::from_str(json)?;
        let definitions = manifest
            .assets
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();
        Ok(Self {
            root: root.into(),
            definitions,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn definition(&self, asset: &AssetId) -> Option<&ModelDefinition> {
        self.definitions.get(asset.as_str())
    }
}

impl AssetLoader for ManifestModelLoader {
    fn load_instances(
        &self,
        asset: &AssetId,
        count: usize,
    ) -> Result<Vec<ModelInstance>, LoadFailure> {
        let fail = |cause| LoadFailure::new(asset.clone(), cause);

        let Some(def) = self.definition(asset) else {
            return Err(fail(LoadFailureCause::UnknownAsset));
        };

        let path = self.root.join(asset.as_str());
        let metadata = fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                fail(LoadFailureCause::MissingFile(path.clone()))
            } else {
                fail(LoadFailureCause::Io(e))
            }
        })?;
        if !metadata.is_file() || metadata.len() == 0 {
            return Err(fail(LoadFailureCause::Parse(format!(
                "{} is not a model file",
                path.display()
            ))));
        }

        let size = def.size();
        debug!("Instantiating {} copies of {} ({:?})", count, asset, size);
        Ok((0..count)
            .map(|i| ModelInstance {
                asset: asset.clone(),
                label: format!("{}#{}", def.name, i),
                bounds: size,
            })
            .collect())
    }
}
