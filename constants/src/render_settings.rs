use bevy::prelude::*;

/// Radius of the sphere shown at each selected measurement point.
pub const MEASUREMENT_MARKER_RADIUS: f32 = 0.0125;

/// Smallest edge length given to a bounding volume so degenerate assets stay pickable.
pub const MIN_BOUNDS_EXTENT: f32 = 0.001;

pub const MARKER_COLOUR: Color = Color::srgb(1.0, 1.0, 0.2);
pub const MARKER_EMISSIVE: LinearRgba = LinearRgba::new(1., 1., 0.2, 1.);

pub const BOUNDS_WIREFRAME_COLOUR: Color = Color::WHITE;
