use bevy::prelude::*;
use bevy::render::camera::Viewport;
use bevy::window::{PrimaryWindow, WindowResized};

use crate::core::config::{ContainerId, ViewerConfig};
use crate::core::viewport::{container_rect, BoundToContainer, ResizeOutcome, ViewportBindings};
use crate::rendering::backdrop::{BackdropMaterial, TunnelMaterial};

/// Keep every bound camera's viewport and aspect ratio in step with its container.
///
/// Runs on window resize and whenever a bound camera appears, so cameras spawned after the
/// first frame (the avatar camera) pick up the current rectangle immediately.
#[allow(clippy::too_many_arguments)]
pub fn adapt_viewports_on_resize(
    mut resized: EventReader<WindowResized>,
    windows: Query<&Window, With<PrimaryWindow>>,
    config: Res<ViewerConfig>,
    mut bindings: ResMut<ViewportBindings>,
    mut cameras: Query<(&BoundToContainer, &mut Camera, &mut Projection)>,
    added: Query<(), Added<BoundToContainer>>,
    backdrop: Option<Res<BackdropMaterial>>,
    mut tunnel_materials: ResMut<Assets<TunnelMaterial>>,
) {
    let window_resized = resized.read().count() > 0;
    let camera_added = !added.is_empty();
    let first_run = bindings.avatar.rect.is_none() || bindings.background.rect.is_none();
    if !window_resized && !camera_added && !first_run {
        return;
    }

    let Ok(window) = windows.get_single() else { return };
    let physical = window.physical_size();

    let mut changed = Vec::new();
    for id in [ContainerId::Avatar, ContainerId::Background] {
        // Minimised windows report zero size; keep the previous viewport
        let Some(rect) = container_rect(physical, &config.container(id)) else {
            continue;
        };
        if bindings.get_mut(id).apply(rect) == ResizeOutcome::Resized {
            debug!(
                "{:?} container now {}x{} at {:?}",
                id, rect.physical_size.x, rect.physical_size.y, rect.physical_position
            );
            changed.push(id);
        }
    }
    if changed.is_empty() && !camera_added {
        return;
    }

    for (bound, mut camera, mut projection) in cameras.iter_mut() {
        let binding = bindings.get(bound.0);
        let Some(rect) = binding.rect else { continue };
        let target = Viewport {
            physical_position: rect.physical_position,
            physical_size: rect.physical_size,
            ..default()
        };
        let unchanged = camera.viewport.as_ref().is_some_and(|current| {
            current.physical_position == target.physical_position
                && current.physical_size == target.physical_size
        });
        if !unchanged {
            camera.viewport = Some(target);
        }
        if let Projection::Perspective(perspective) = projection.as_mut() {
            if perspective.aspect_ratio != binding.aspect_ratio {
                perspective.aspect_ratio = binding.aspect_ratio;
            }
        }
    }

    if changed.contains(&ContainerId::Avatar) {
        if let (Some(backdrop), Some(rect)) = (backdrop, bindings.avatar.rect) {
            if let Some(material) = tunnel_materials.get_mut(&backdrop.0) {
                material.uniform.resolution = rect.physical_size.as_vec2();
            }
        }
    }
}
