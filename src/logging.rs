use bevy::log::{BoxedLayer, Level, LogPlugin};
use bevy::prelude::*;

use crate::core::constants::logging::*;

/// Log configuration for the app. Release builds (see build.rs) keep only warnings from
/// this crate; debug builds log at debug level.
pub fn log_plugin() -> LogPlugin {
    let (level, filter) = if cfg!(quiet_logging) {
        (Level::WARN, QUIET_FILTER)
    } else {
        (Level::INFO, DEBUG_FILTER)
    };
    LogPlugin {
        level,
        filter: filter.to_string(),
        custom_layer: flame_layer,
    }
}

#[cfg(feature = "logging")]
#[derive(Resource)]
struct FlameGuard(
    #[allow(dead_code)] tracing_flame::FlushGuard<std::io::BufWriter<std::fs::File>>,
);

// Folded stacks for flamegraphs, flushed when the guard resource drops with the app
#[cfg(feature = "logging")]
fn flame_layer(app: &mut App) -> Option<BoxedLayer> {
    use tracing_subscriber::Layer;

    match tracing_flame::FlameLayer::with_file(FLAME_OUTPUT) {
        Ok((layer, guard)) => {
            app.insert_resource(FlameGuard(guard));
            Some(layer.boxed())
        }
        Err(err) => {
            eprintln!("Flame layer disabled, cannot write {}: {}", FLAME_OUTPUT, err);
            None
        }
    }
}

#[cfg(not(feature = "logging"))]
fn flame_layer(_app: &mut App) -> Option<BoxedLayer> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_this_crate() {
        let plugin = log_plugin();
        assert!(plugin.filter.contains("portfolio_scenes="));
        assert!(plugin.filter.contains("wgpu=error"));
    }
}
