/// Core modules: configuration, lifecycle states and the pure state behind each scene
pub mod config;
pub mod constants;
pub mod playback;
pub mod portfolio;
pub mod viewport;
