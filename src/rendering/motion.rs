use bevy::prelude::*;

use crate::core::constants::REFERENCE_FPS;

/// Continuous rotation in radians per second around the local X, Y and Z axes.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub radians_per_second: Vec3,
}

impl Spin {
    /// Convert an increment tuned per frame at the reference rate into a per-second rate.
    pub fn from_per_frame(per_frame: Vec3) -> Self {
        Self {
            radians_per_second: per_frame * REFERENCE_FPS,
        }
    }

    pub fn rotation_for(&self, delta_secs: f32) -> Quat {
        let step = self.radians_per_second * delta_secs;
        Quat::from_euler(EulerRot::XYZ, step.x, step.y, step.z)
    }
}

pub fn advance_spins(time: Res<Time>, mut spinning: Query<(&Spin, &mut Transform)>) {
    let delta = time.delta_secs();
    if delta == 0.0 {
        return;
    }
    for (spin, mut transform) in spinning.iter_mut() {
        transform.rotation = (transform.rotation * spin.rotation_for(delta)).normalize();
    }
}
