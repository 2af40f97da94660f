use bevy::pbr::{Material, MaterialPlugin};
use bevy::prelude::*;
use bevy::render::camera::{ClearColorConfig, ScalingMode};
use bevy::render::render_resource::{AsBindGroup, ShaderRef, ShaderType};
use bevy::render::view::RenderLayers;

use crate::core::config::ContainerId;
use crate::core::constants::{assets::TUNNEL_SHADER, backdrop::*, camera_order, layers, REFERENCE_FPS};
use crate::core::viewport::BoundToContainer;

/// Procedural voronoi tunnel drawn behind the avatar.
pub struct BackdropPlugin;

impl Plugin for BackdropPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MaterialPlugin::<TunnelMaterial>::default())
            .add_systems(Startup, spawn_backdrop);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, ShaderType)]
pub struct TunnelUniform {
    pub time: f32,
    /// Container size in physical pixels
    pub resolution: Vec2,
}

#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct TunnelMaterial {
    #[uniform(0)]
    pub uniform: TunnelUniform,
}

impl Material for TunnelMaterial {
    fn fragment_shader() -> ShaderRef {
        TUNNEL_SHADER.into()
    }
}

impl TunnelMaterial {
    /// Shader clock rate, derived from the per-frame step at the reference frame rate.
    pub const TIME_RATE: f32 = TIME_STEP_PER_FRAME * REFERENCE_FPS;

    pub fn advance(&mut self, delta_secs: f32) {
        self.uniform.time += Self::TIME_RATE * delta_secs;
    }
}

/// Handle to the backdrop's material so the loop and the resize adapter can reach it.
#[derive(Resource, Clone)]
pub struct BackdropMaterial(pub Handle<TunnelMaterial>);

#[derive(Component)]
pub struct BackdropCamera;

fn spawn_backdrop(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<TunnelMaterial>>,
) {
    let material = materials.add(TunnelMaterial {
        uniform: TunnelUniform {
            time: 0.0,
            resolution: Vec2::ONE,
        },
    });
    commands.insert_resource(BackdropMaterial(material.clone()));

    // A 2x2 quad filling the orthographic camera's fixed 2x2 view
    commands.spawn((
        Name::new("Backdrop Quad"),
        Mesh3d(meshes.add(Rectangle::new(2.0, 2.0))),
        MeshMaterial3d(material),
        Transform::default(),
        RenderLayers::layer(layers::BACKDROP),
    ));

    commands.spawn((
        Name::new("Backdrop Camera"),
        Camera3d::default(),
        Camera {
            order: camera_order::BACKDROP,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        Projection::Orthographic(OrthographicProjection {
            scaling_mode: ScalingMode::Fixed {
                width: 2.0,
                height: 2.0,
            },
            ..OrthographicProjection::default_3d()
        }),
        Transform::from_xyz(0.0, 0.0, 1.0).looking_at(Vec3::ZERO, Vec3::Y),
        RenderLayers::layer(layers::BACKDROP),
        BoundToContainer(ContainerId::Avatar),
        BackdropCamera,
    ));
}

pub fn advance_backdrop_clock(
    time: Res<Time>,
    backdrop: Option<Res<BackdropMaterial>>,
    mut materials: ResMut<Assets<TunnelMaterial>>,
) {
    let Some(backdrop) = backdrop else { return };
    if let Some(material) = materials.get_mut(&backdrop.0) {
        material.advance(time.delta_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_matches_per_frame_step_at_reference_rate() {
        let mut material = TunnelMaterial {
            uniform: TunnelUniform::default(),
        };
        for _ in 0..60 {
            material.advance(1.0 / REFERENCE_FPS);
        }
        assert!((material.uniform.time - TIME_STEP_PER_FRAME * 60.0).abs() < 1e-4);
    }

    #[test]
    fn clock_is_frame_rate_independent() {
        let mut fast = TunnelMaterial {
            uniform: TunnelUniform::default(),
        };
        let mut slow = fast.clone();
        for _ in 0..120 {
            fast.advance(1.0 / 120.0);
        }
        for _ in 0..30 {
            slow.advance(1.0 / 30.0);
        }
        assert!((fast.uniform.time - slow.uniform.time).abs() < 1e-4);
    }
}
