use bevy::app::AppExit;
use bevy::prelude::*;

use crate::core::config::{validate_viewer_config, ViewerConfig};
use crate::core::playback::PlaybackGuard;
use crate::core::viewport::ViewportBindings;

/// Lifecycle of the avatar scene. The galaxy and backdrop do not wait on any asset.
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum BootstrapPhase {
    #[default]
    Loading,
    Ready,
    /// Asset loading failed; the avatar viewer stays blank
    Failed,
}

/// Per-frame ordering: input is read before any time-dependent state advances,
/// and Bevy renders after `Update` finishes.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum FrameSet {
    Input,
    Advance,
    Present,
}

pub struct PortfolioPlugin;

impl Plugin for PortfolioPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<BootstrapPhase>()
            .configure_sets(
                Update,
                (FrameSet::Input, FrameSet::Advance, FrameSet::Present).chain(),
            )
            .init_resource::<ViewerConfig>()
            .init_resource::<ViewportBindings>()
            .add_systems(PreStartup, validate_viewer_config)
            .add_systems(Last, cancel_playback_on_exit);
    }
}

// Pending transition timers die with the app rather than firing into a torn-down world
fn cancel_playback_on_exit(
    mut exit_events: EventReader<AppExit>,
    mut guards: Query<&mut PlaybackGuard>,
) {
    if exit_events.read().next().is_none() {
        return;
    }
    for mut guard in guards.iter_mut() {
        let cancelled = guard.cancel_all();
        if cancelled > 0 {
            debug!("Cancelled {} pending avatar transitions on exit", cancelled);
        }
    }
}
