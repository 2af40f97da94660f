//! Viewport bindings between window containers and the cameras that render into them.
//!
//! A binding stores the last physical rectangle computed for a container together with the
//! aspect ratio derived from it. The resize adapter feeds new window sizes through
//! [`ViewportBinding::apply`], which reports whether anything actually changed so cameras are
//! only touched when the container really moved or grew.

use bevy::prelude::*;

use crate::core::config::{ContainerId, ContainerLayout};

/// Container rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRect {
    pub physical_position: UVec2,
    pub physical_size: UVec2,
}

impl ContainerRect {
    pub fn aspect_ratio(&self) -> f32 {
        self.physical_size.x as f32 / self.physical_size.y.max(1) as f32
    }
}

/// Compute the physical rectangle of a container for a window of the given physical size.
///
/// Returns `None` for a zero-sized window (minimised), which callers skip.
pub fn container_rect(window_physical: UVec2, layout: &ContainerLayout) -> Option<ContainerRect> {
    if window_physical.x == 0 || window_physical.y == 0 {
        return None;
    }

    let window = window_physical.as_vec2();
    let position = (Vec2::new(layout.x, layout.y) * window).floor().as_uvec2();
    let position = position.min(window_physical - UVec2::ONE);
    let size = (Vec2::new(layout.width, layout.height) * window)
        .round()
        .as_uvec2()
        .max(UVec2::ONE);
    // Keep the rectangle inside the window so the render target never overflows
    let size = size.min(window_physical - position);

    Some(ContainerRect {
        physical_position: position,
        physical_size: size,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    Unchanged,
    Resized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportBinding {
    pub container: ContainerId,
    pub rect: Option<ContainerRect>,
    pub aspect_ratio: f32,
}

impl ViewportBinding {
    pub fn new(container: ContainerId) -> Self {
        Self {
            container,
            rect: None,
            aspect_ratio: 1.0,
        }
    }

    /// Record a new container rectangle. Identical rectangles leave the binding untouched.
    pub fn apply(&mut self, rect: ContainerRect) -> ResizeOutcome {
        if self.rect == Some(rect) {
            return ResizeOutcome::Unchanged;
        }
        self.rect = Some(rect);
        self.aspect_ratio = rect.aspect_ratio();
        ResizeOutcome::Resized
    }
}

/// One binding per container.
#[derive(Resource, Debug, Clone)]
pub struct ViewportBindings {
    pub avatar: ViewportBinding,
    pub background: ViewportBinding,
}

impl Default for ViewportBindings {
    fn default() -> Self {
        Self {
            avatar: ViewportBinding::new(ContainerId::Avatar),
            background: ViewportBinding::new(ContainerId::Background),
        }
    }
}

impl ViewportBindings {
    pub fn get(&self, id: ContainerId) -> &ViewportBinding {
        match id {
            ContainerId::Avatar => &self.avatar,
            ContainerId::Background => &self.background,
        }
    }

    pub fn get_mut(&mut self, id: ContainerId) -> &mut ViewportBinding {
        match id {
            ContainerId::Avatar => &mut self.avatar,
            ContainerId::Background => &mut self.background,
        }
    }
}

/// Marks a camera as rendering into a container's viewport.
#[derive(Component, Debug, Clone, Copy)]
pub struct BoundToContainer(pub ContainerId);
