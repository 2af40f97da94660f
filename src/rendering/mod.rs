/// Rendering modules for the avatar scene, the galaxy background and the shader backdrop
pub mod animation_systems;
pub mod backdrop;
pub mod galaxy;
pub mod motion;
pub mod orbit_camera;
pub mod resize;
pub mod scene_bootstrap;

use bevy::prelude::*;

use crate::core::portfolio::FrameSet;

/// Per-frame scene motion: container binding, orbit input, spins and the backdrop clock.
pub struct SceneLoopPlugin;

impl Plugin for SceneLoopPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (resize::adapt_viewports_on_resize, orbit_camera::orbit_drag_input)
                .in_set(FrameSet::Input),
        )
        .add_systems(
            Update,
            (
                motion::advance_spins,
                orbit_camera::advance_orbit_rigs,
                backdrop::advance_backdrop_clock,
            )
                .in_set(FrameSet::Advance),
        );
    }
}
