// UI module: the chat panel and the avatar loading indicator

pub mod button_styles;
pub mod chat_panel;
pub mod loading_indicator;

pub use chat_panel::*;
pub use loading_indicator::*;

use bevy::prelude::*;

use crate::core::portfolio::{BootstrapPhase, FrameSet};

pub struct UIPlugin;

impl Plugin for UIPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<QueryInput>()
            .add_systems(Startup, (setup_loading_indicator, setup_chat_panel))
            .add_systems(Update, (chat_keyboard_input, handle_ask_button).in_set(FrameSet::Input))
            .add_systems(
                Update,
                update_loading_text
                    .in_set(FrameSet::Present)
                    .run_if(in_state(BootstrapPhase::Loading)),
            )
            .add_systems(OnEnter(BootstrapPhase::Ready), hide_loading_indicator)
            .add_systems(
                Update,
                (style_ask_button, update_query_text, update_chat_record).in_set(FrameSet::Present),
            );
    }
}
