use bevy::prelude::*;

use crate::core::constants;

/// Fractional rectangle of the primary window that one camera renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerLayout {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ContainerLayout {
    pub const fn from_tuple(rect: (f32, f32, f32, f32)) -> Self {
        Self {
            x: rect.0,
            y: rect.1,
            width: rect.2,
            height: rect.3,
        }
    }

    /// A layout must have positive area and stay within the window.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= 1.0 + f32::EPSILON
            && self.y + self.height <= 1.0 + f32::EPSILON
    }

    /// Whether a window-relative point (logical pixels) falls inside this container.
    pub fn contains(&self, point: Vec2, window_size: Vec2) -> bool {
        let min = Vec2::new(self.x, self.y) * window_size;
        let max = min + Vec2::new(self.width, self.height) * window_size;
        point.x >= min.x && point.y >= min.y && point.x < max.x && point.y < max.y
    }

    /// Top-left corner in logical window pixels.
    pub fn logical_origin(&self, window_size: Vec2) -> Vec2 {
        Vec2::new(self.x, self.y) * window_size
    }
}

/// Which container a camera or binding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerId {
    Avatar,
    Background,
}

/// Runtime configuration for the scenes and the QA client.
///
/// Containers are named here explicitly instead of being looked up from page structure,
/// so every system that needs a region receives it from this resource.
#[derive(Resource, Debug, Clone)]
pub struct ViewerConfig {
    pub avatar_container: ContainerLayout,
    pub background_container: ContainerLayout,
    pub qa_endpoint: String,
    pub avatar_model: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            avatar_container: ContainerLayout::from_tuple(constants::containers::AVATAR),
            background_container: ContainerLayout::from_tuple(constants::containers::BACKGROUND),
            qa_endpoint: constants::qa::ENDPOINT.to_string(),
            avatar_model: constants::assets::AVATAR_MODEL.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn container(&self, id: ContainerId) -> ContainerLayout {
        match id {
            ContainerId::Avatar => self.avatar_container,
            ContainerId::Background => self.background_container,
        }
    }

    /// Replace degenerate container layouts with the defaults, reporting each replacement.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.avatar_container.is_valid() {
            warn!(
                "Avatar container layout {:?} is degenerate, using {:?}",
                self.avatar_container, defaults.avatar_container
            );
            self.avatar_container = defaults.avatar_container;
        }
        if !self.background_container.is_valid() {
            warn!(
                "Background container layout {:?} is degenerate, using {:?}",
                self.background_container, defaults.background_container
            );
            self.background_container = defaults.background_container;
        }
        self
    }
}

/// Startup system that validates whatever configuration was inserted before the app ran.
pub fn validate_viewer_config(mut config: ResMut<ViewerConfig>) {
    let checked = config.clone().sanitized();
    if checked.avatar_container != config.avatar_container
        || checked.background_container != config.background_container
    {
        *config = checked;
    }
    info!(
        "Viewer configured: avatar container {:?}, QA endpoint {}",
        config.avatar_container, config.qa_endpoint
    );
}
