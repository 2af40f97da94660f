use bevy::prelude::*;

mod core;
mod logging;
mod qa;
mod rendering;
mod ui;

use crate::core::constants;
use crate::core::portfolio::PortfolioPlugin;
use qa::QaPlugin;
use rendering::animation_systems::AnimationPlugin;
use rendering::backdrop::BackdropPlugin;
use rendering::galaxy::GalaxyPlugin;
use rendering::scene_bootstrap::SceneBootstrapPlugin;
use rendering::SceneLoopPlugin;
use ui::UIPlugin;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: constants::WINDOW_TITLE.into(),
                        resolution: (constants::WINDOW_WIDTH, constants::WINDOW_HEIGHT).into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(logging::log_plugin()),
            PortfolioPlugin,
            GalaxyPlugin,
            BackdropPlugin,
            SceneBootstrapPlugin,
            AnimationPlugin,
            SceneLoopPlugin,
            QaPlugin,
            UIPlugin,
        ))
        .run();
}
