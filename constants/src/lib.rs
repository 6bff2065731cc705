pub mod pool;
pub mod render_settings;
pub mod tracking;
