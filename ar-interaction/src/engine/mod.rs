/// Model loading and instance pooling.
pub mod assets;

/// Scene-graph components, the edit-gesture signal and node decoration.
pub mod scene;

/// Tracking provider boundary: frames, hit results and spatial anchors.
pub mod tracking;
