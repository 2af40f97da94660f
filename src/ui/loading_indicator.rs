use bevy::prelude::*;

use crate::core::config::ViewerConfig;
use crate::core::constants::ui::*;
use crate::rendering::scene_bootstrap::LoadProgress;

#[derive(Component)]
pub struct LoadingIndicator;

#[derive(Component)]
pub struct LoadingText;

/// Centered over the avatar container so it sits where the avatar will appear.
pub fn setup_loading_indicator(mut commands: Commands, config: Res<ViewerConfig>) {
    let layout = config.avatar_container;
    commands
        .spawn((
            Name::new("Loading Indicator"),
            Node {
                position_type: PositionType::Absolute,
                left: Val::Percent(layout.x * 100.0),
                top: Val::Percent(layout.y * 100.0),
                width: Val::Percent(layout.width * 100.0),
                height: Val::Percent(layout.height * 100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            LoadingIndicator,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(LoadProgress { loaded: 0, total: 1 }.label()),
                TextFont {
                    font_size: LOADING_TEXT_SIZE,
                    ..default()
                },
                TextColor(TEXT_COLOR),
                LoadingText,
            ));
        });
}

pub fn update_loading_text(
    progress: Res<LoadProgress>,
    mut texts: Query<&mut Text, With<LoadingText>>,
) {
    if !progress.is_changed() {
        return;
    }
    let label = progress.label();
    for mut text in texts.iter_mut() {
        if text.0 != label {
            text.0 = label.clone();
        }
    }
}

pub fn hide_loading_indicator(mut indicators: Query<&mut Visibility, With<LoadingIndicator>>) {
    for mut visibility in indicators.iter_mut() {
        *visibility = Visibility::Hidden;
    }
    debug!("Loading indicator hidden");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn text_follows_progress() {
        let mut world = World::new();
        world.insert_resource(LoadProgress {
            loaded: 1,
            total: 4,
        });
        let text = world.spawn((Text::new(""), LoadingText)).id();

        let _ = world.run_system_once(update_loading_text);

        assert_eq!(world.get::<Text>(text).unwrap().0, "LOADING... 25%");
    }
}
