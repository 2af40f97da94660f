use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::core::config::ViewerConfig;
use crate::core::constants::camera::*;
use crate::core::constants::REFERENCE_FPS;

/// Orbit around a target at fixed distance and polar angle. Only the azimuth moves,
/// so the visitor can turn the avatar but not pan, zoom or tilt.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitRig {
    pub target: Vec3,
    pub distance: f32,
    pub polar: f32,
    pub azimuth: f32,
    /// Rotation still to be applied; drained a little every frame for damping
    pub pending_azimuth: f32,
}

impl OrbitRig {
    /// Place the rig so the camera looks from the direction of `eye`, clamped to the rig's
    /// distance and polar angle.
    pub fn from_eye(eye: Vec3, target: Vec3, distance: f32, polar: f32) -> Self {
        let offset = eye - target;
        Self {
            target,
            distance,
            polar,
            azimuth: offset.x.atan2(offset.z),
            pending_azimuth: 0.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        self.target
            + Vec3::new(sin_polar * sin_azimuth, cos_polar, sin_polar * cos_azimuth) * self.distance
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.target, Vec3::Y)
    }

    /// Queue rotation for a horizontal drag of `delta_x` pixels across a container
    /// `container_height` pixels tall.
    pub fn drag(&mut self, delta_x: f32, container_height: f32) {
        if container_height <= 0.0 {
            return;
        }
        self.pending_azimuth -= ORBIT_DRAG_SENSITIVITY * delta_x / container_height;
    }

    /// Apply a damped share of the pending rotation.
    pub fn advance(&mut self, delta_secs: f32) {
        if self.pending_azimuth == 0.0 {
            return;
        }
        let share = 1.0 - ORBIT_DAMPING.powf(delta_secs * REFERENCE_FPS);
        let step = self.pending_azimuth * share;
        self.azimuth = (self.azimuth + step).rem_euclid(std::f32::consts::TAU);
        self.pending_azimuth -= step;
        if self.pending_azimuth.abs() < ORBIT_REST_VELOCITY {
            self.pending_azimuth = 0.0;
        }
    }
}

pub fn orbit_drag_input(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    windows: Query<&Window, With<PrimaryWindow>>,
    config: Res<ViewerConfig>,
    mut rigs: Query<&mut OrbitRig>,
) {
    let dragged: f32 = mouse_motion.read().map(|motion| motion.delta.x).sum();
    if !mouse_buttons.pressed(MouseButton::Left) || dragged == 0.0 {
        return;
    }
    let Ok(window) = windows.get_single() else { return };
    let Some(cursor) = window.cursor_position() else { return };

    let window_size = window.size();
    let layout = config.avatar_container;
    if !layout.contains(cursor, window_size) {
        return;
    }

    let container_height = window_size.y * layout.height;
    for mut rig in rigs.iter_mut() {
        rig.drag(dragged, container_height);
    }
}

pub fn advance_orbit_rigs(time: Res<Time>, mut rigs: Query<(&mut OrbitRig, &mut Transform)>) {
    let delta = time.delta_secs();
    for (mut rig, mut transform) in rigs.iter_mut() {
        if rig.pending_azimuth == 0.0 {
            continue;
        }
        rig.advance(delta);
        *transform = rig.transform();
    }
}
