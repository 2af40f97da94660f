use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::input::ButtonState;
use bevy::prelude::*;

use crate::core::constants::ui::*;
use crate::qa::protocol::source_lines;
use crate::qa::session::{QaSession, QueryRecord, SubmitQuery};
use crate::ui::button_styles::ButtonStyle;

/// The question being typed. Kept after submission so it can be edited and asked again.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct QueryInput {
    pub text: String,
}

impl QueryInput {
    /// Apply one pressed key. Returns the question to submit when Enter is pressed.
    pub fn apply_key(&mut self, key: &Key) -> Option<String> {
        match key {
            Key::Character(chars) => {
                self.text
                    .extend(chars.chars().filter(|c| !c.is_control()));
                None
            }
            Key::Space => {
                self.text.push(' ');
                None
            }
            Key::Backspace => {
                self.text.pop();
                None
            }
            Key::Enter => Some(self.text.clone()),
            _ => None,
        }
    }

    /// Apply a frame's pressed keys in order. Keys after the first submission are dropped,
    /// since the request they would edit or resend is already on its way.
    pub fn apply_keys<'a>(&mut self, keys: impl IntoIterator<Item = &'a Key>) -> Option<String> {
        for key in keys {
            if let Some(question) = self.apply_key(key) {
                return Some(question);
            }
        }
        None
    }

    pub fn display(&self, focused: bool) -> String {
        match (self.text.is_empty(), focused) {
            (true, _) => QUERY_PLACEHOLDER.to_string(),
            (false, true) => format!("{}{}", self.text, CARET),
            (false, false) => self.text.clone(),
        }
    }
}

#[derive(Component)]
pub struct QueryInputText;

#[derive(Component)]
pub struct AskButton;

#[derive(Component)]
pub struct AskButtonLabel;

#[derive(Component)]
pub struct ProcessingText;

#[derive(Component)]
pub struct ErrorText;

#[derive(Component)]
pub struct ResponseText;

#[derive(Component)]
pub struct SourcesText;

pub fn ask_button_label(record: &QueryRecord) -> &'static str {
    if record.is_loading {
        "Asking..."
    } else {
        "Ask Question"
    }
}

pub fn error_text(record: &QueryRecord) -> String {
    if record.error.is_empty() {
        String::new()
    } else {
        format!("Error: {}", record.error)
    }
}

pub fn sources_text(record: &QueryRecord) -> String {
    if record.sources.is_empty() {
        return String::new();
    }
    let mut text = format!("Sources Used (Top {}):", record.sources.len());
    for line in source_lines(&record.sources) {
        text.push_str("\n\n");
        text.push_str(&line);
    }
    text
}

pub fn setup_chat_panel(mut commands: Commands) {
    let body_font = TextFont {
        font_size: BODY_TEXT_SIZE,
        ..default()
    };

    commands
        .spawn((
            Name::new("Chat Panel"),
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(PANEL_PADDING * 2.0),
                top: Val::Px(PANEL_PADDING * 2.0),
                width: Val::Px(PANEL_WIDTH),
                max_height: Val::Percent(90.0),
                padding: UiRect::all(Val::Px(PANEL_PADDING)),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(PANEL_GAP),
                border: UiRect::all(Val::Px(1.0)),
                overflow: Overflow::clip(),
                ..default()
            },
            BackgroundColor(PANEL_BACKGROUND),
            BorderColor(BORDER_COLOR),
        ))
        .with_children(|panel| {
            panel.spawn((
                Text::new("Ask about my research"),
                TextFont {
                    font_size: TITLE_TEXT_SIZE,
                    ..default()
                },
                TextColor(TEXT_COLOR),
            ));

            // Input row
            panel
                .spawn(Node {
                    flex_direction: FlexDirection::Row,
                    column_gap: Val::Px(PANEL_GAP),
                    ..default()
                })
                .with_children(|row| {
                    row.spawn((
                        Node {
                            flex_grow: 1.0,
                            height: Val::Px(INPUT_HEIGHT),
                            padding: UiRect::horizontal(Val::Px(PANEL_GAP)),
                            align_items: AlignItems::Center,
                            border: UiRect::all(Val::Px(1.0)),
                            overflow: Overflow::clip(),
                            ..default()
                        },
                        BackgroundColor(INPUT_BACKGROUND),
                        BorderColor(BORDER_COLOR),
                    ))
                    .with_children(|input| {
                        input.spawn((
                            Text::new(QUERY_PLACEHOLDER),
                            body_font.clone(),
                            TextColor(MUTED_TEXT_COLOR),
                            QueryInputText,
                        ));
                    });

                    row.spawn((
                        Button,
                        Node {
                            width: Val::Px(BUTTON_WIDTH),
                            height: Val::Px(INPUT_HEIGHT),
                            justify_content: JustifyContent::Center,
                            align_items: AlignItems::Center,
                            border: UiRect::all(Val::Px(1.0)),
                            ..default()
                        },
                        BackgroundColor(ButtonStyle::ASK.normal),
                        BorderColor(BORDER_COLOR),
                        AskButton,
                    ))
                    .with_children(|button| {
                        button.spawn((
                            Text::new("Ask Question"),
                            body_font.clone(),
                            TextColor(TEXT_COLOR),
                            AskButtonLabel,
                        ));
                    });
                });

            panel.spawn((
                Text::new("Processing..."),
                body_font.clone(),
                TextColor(MUTED_TEXT_COLOR),
                Visibility::Hidden,
                ProcessingText,
            ));
            panel.spawn((
                Text::new(""),
                body_font.clone(),
                TextColor(ERROR_TEXT_COLOR),
                ErrorText,
            ));
            panel.spawn((
                Text::new(""),
                body_font.clone(),
                TextColor(TEXT_COLOR),
                ResponseText,
            ));
            panel.spawn((
                Text::new(""),
                body_font,
                TextColor(MUTED_TEXT_COLOR),
                SourcesText,
            ));
        });
}

// Keys are swallowed while a request is outstanding
pub fn chat_keyboard_input(
    mut keys: EventReader<KeyboardInput>,
    session: Res<QaSession>,
    mut input: ResMut<QueryInput>,
    mut submissions: EventWriter<SubmitQuery>,
) {
    if session.record().is_loading {
        keys.clear();
        return;
    }

    if keys.is_empty() {
        return;
    }
    let pressed = keys
        .read()
        .filter(|event| event.state == ButtonState::Pressed)
        .map(|event| &event.logical_key);
    if let Some(question) = input.apply_keys(pressed) {
        submissions.send(SubmitQuery(question));
    }
}

pub fn handle_ask_button(
    buttons: Query<&Interaction, (Changed<Interaction>, With<AskButton>)>,
    session: Res<QaSession>,
    input: Res<QueryInput>,
    mut submissions: EventWriter<SubmitQuery>,
) {
    if session.record().is_loading {
        return;
    }
    for interaction in buttons.iter() {
        if *interaction == Interaction::Pressed {
            submissions.send(SubmitQuery(input.text.clone()));
        }
    }
}

pub fn style_ask_button(
    session: Res<QaSession>,
    mut buttons: Query<(&Interaction, &mut BackgroundColor), With<AskButton>>,
) {
    let loading = session.record().is_loading;
    for (interaction, mut background) in buttons.iter_mut() {
        let color = match (loading, interaction) {
            (true, _) => ButtonStyle::ASK.disabled,
            (false, Interaction::Pressed) => ButtonStyle::ASK.pressed,
            (false, Interaction::Hovered) => ButtonStyle::ASK.hover,
            (false, Interaction::None) => ButtonStyle::ASK.normal,
        };
        if background.0 != color {
            background.0 = color;
        }
    }
}

pub fn update_query_text(
    input: Res<QueryInput>,
    session: Res<QaSession>,
    mut texts: Query<(&mut Text, &mut TextColor), With<QueryInputText>>,
) {
    if !input.is_changed() && !session.is_changed() {
        return;
    }
    let focused = !session.record().is_loading;
    for (mut text, mut color) in texts.iter_mut() {
        text.0 = input.display(focused);
        color.0 = if input.text.is_empty() {
            MUTED_TEXT_COLOR
        } else {
            TEXT_COLOR
        };
    }
}

#[allow(clippy::type_complexity)]
pub fn update_chat_record(
    session: Res<QaSession>,
    mut labels: Query<&mut Text, With<AskButtonLabel>>,
    mut processing: Query<&mut Visibility, With<ProcessingText>>,
    mut errors: Query<&mut Text, (With<ErrorText>, Without<AskButtonLabel>)>,
    mut responses: Query<
        &mut Text,
        (
            With<ResponseText>,
            Without<AskButtonLabel>,
            Without<ErrorText>,
        ),
    >,
    mut sources: Query<
        &mut Text,
        (
            With<SourcesText>,
            Without<AskButtonLabel>,
            Without<ErrorText>,
            Without<ResponseText>,
        ),
    >,
) {
    if !session.is_changed() {
        return;
    }
    let record = session.record();

    for mut text in labels.iter_mut() {
        text.0 = ask_button_label(record).to_string();
    }
    for mut visibility in processing.iter_mut() {
        *visibility = if record.is_loading {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
    for mut text in errors.iter_mut() {
        text.0 = error_text(record);
    }
    for mut text in responses.iter_mut() {
        text.0 = record.response.clone();
    }
    for mut text in sources.iter_mut() {
        text.0 = sources_text(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::protocol::{Source, SourceMetadata};

    #[test]
    fn typing_and_backspace_edit_the_query() {
        let mut input = QueryInput::default();
        assert_eq!(input.apply_key(&Key::Character("Hi".into())), None);
        assert_eq!(input.apply_key(&Key::Space), None);
        assert_eq!(input.apply_key(&Key::Character("x".into())), None);
        assert_eq!(input.apply_key(&Key::Backspace), None);
        assert_eq!(input.text, "Hi ");
        assert_eq!(input.display(true), "Hi _");
    }

    #[test]
    fn enter_submits_without_clearing() {
        let mut input = QueryInput {
            text: "What is your research?".into(),
        };
        assert_eq!(
            input.apply_key(&Key::Enter),
            Some("What is your research?".to_string())
        );
        assert_eq!(input.text, "What is your research?");
    }

    #[test]
    fn one_submission_per_frame() {
        let mut input = QueryInput {
            text: "Hi".into(),
        };
        let keys = [
            Key::Enter,
            Key::Enter,
            Key::Character("x".into()),
            Key::Enter,
        ];
        assert_eq!(input.apply_keys(&keys), Some("Hi".to_string()));
        // Keys after the submission are not applied
        assert_eq!(input.text, "Hi");

        let typing = [Key::Character("a".into()), Key::Backspace];
        assert_eq!(input.apply_keys(&typing), None);
        assert_eq!(input.text, "Hi");
    }

    #[test]
    fn error_line_is_prefixed() {
        let mut record = QueryRecord::default();
        assert!(error_text(&record).is_empty());
        record.error = "HTTP error! Status: 500".into();
        assert_eq!(error_text(&record), "Error: HTTP error! Status: 500");
    }

    #[test]
    fn empty_input_shows_placeholder() {
        assert_eq!(QueryInput::default().display(true), QUERY_PLACEHOLDER);
    }

    #[test]
    fn button_label_tracks_loading() {
        let mut record = QueryRecord::default();
        assert_eq!(ask_button_label(&record), "Ask Question");
        record.is_loading = true;
        assert_eq!(ask_button_label(&record), "Asking...");
    }

    #[test]
    fn sources_block_lists_every_source() {
        let record = QueryRecord {
            sources: vec![
                Source {
                    id: 1,
                    score: 0.9,
                    metadata: Some(SourceMetadata {
                        source: Some("thesis.pdf".into()),
                        kind: Some("pdf".into()),
                        page: Some(0.0),
                    }),
                },
                Source {
                    id: 2,
                    score: 0.5,
                    metadata: None,
                },
            ],
            ..default()
        };
        let text = sources_text(&record);
        assert!(text.starts_with("Sources Used (Top 2):"));
        assert!(text.contains("Source 1"));
        assert!(text.contains("Source 2"));
        assert!(sources_text(&QueryRecord::default()).is_empty());
    }
}
