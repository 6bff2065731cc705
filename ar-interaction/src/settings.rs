use bevy::prelude::*;
use constants::pool::DEFAULT_POOL_CAPACITY;
use constants::render_settings::MEASUREMENT_MARKER_RADIUS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::engine::assets::AssetId;

/// Error types for reading settings and model manifests.
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::JsonError(err)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::JsonError(e) => write!(f, "JSON error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid settings: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where model batches are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetLoading {
    /// On the async compute pool; placements wait for the batch.
    #[default]
    Background,
    /// On the calling thread, for hosts whose input thread is not the frame thread.
    Inline,
}

/// Runtime settings for the interaction core. Missing JSON fields take defaults.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArInteractionSettings {
    /// Instances loaded per batch when an asset's pool runs dry.
    pub pool_capacity: usize,
    /// Return instances to the pool when their anchor is removed, instead of retiring them.
    pub release_instances_on_remove: bool,
    pub marker_radius: f32,
    pub asset_loading: AssetLoading,
    /// Asset used for placement until the user selects one.
    pub default_asset: Option<AssetId>,
}

impl Default for ArInteractionSettings {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            release_instances_on_remove: true,
            marker_radius: MEASUREMENT_MARKER_RADIUS,
            asset_loading: AssetLoading::Background,
            default_asset: None,
        }
    }
}

impl ArInteractionSettings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_capacity == 0 {
            return Err(ConfigError::Invalid("pool_capacity must be at least 1".into()));
        }
        if !self.marker_radius.is_finite() || self.marker_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "marker_radius must be positive, got {}",
                self.marker_radius
            )));
        }
        Ok(())
    }
}
