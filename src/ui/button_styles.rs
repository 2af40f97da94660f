use bevy::prelude::*;

// Button colours per interaction state
pub struct ButtonStyle {
    pub normal: Color,
    pub hover: Color,
    pub pressed: Color,
    pub disabled: Color,
}

impl ButtonStyle {
    pub const ASK: Self = Self {
        normal: Color::srgba(0.25, 0.25, 0.55, 0.9),
        hover: Color::srgba(0.35, 0.35, 0.75, 0.9),
        pressed: Color::srgba(0.45, 0.45, 0.9, 0.9),
        disabled: Color::srgba(0.2, 0.2, 0.3, 0.6),
    };
}
