//! # Galaxy background
//!
//! A slowly rotating spiral of small stars rendered behind everything else.
//!
//! Stars are placed along a single spiral arm: a star at radius `r` sits at angle
//! `SPIRAL_TWIST * r`, so the disc winds outward. All stars share one merged mesh
//! (an octahedron per star) and one unlit material, which keeps ten thousand stars to a
//! single draw call. The galaxy has its own camera and render layer, bound to the
//! background container.

use bevy::prelude::*;
use bevy::render::camera::ClearColorConfig;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::view::RenderLayers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::config::ContainerId;
use crate::core::constants::{camera_order, galaxy::*, layers};
use crate::core::viewport::BoundToContainer;
use crate::rendering::motion::Spin;

pub struct GalaxyPlugin;

impl Plugin for GalaxyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_galaxy);
    }
}

#[derive(Component)]
pub struct GalaxyRoot;

#[derive(Component)]
pub struct GalaxyCamera;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub position: Vec3,
    pub size: f32,
}

/// Scatter `count` stars along the spiral.
pub fn generate_stars(count: usize, rng: &mut impl Rng) -> Vec<Star> {
    (0..count)
        .map(|_| {
            let radius = rng.gen::<f32>() * MAX_RADIUS;
            let angle = radius * SPIRAL_TWIST;
            let z = (rng.gen::<f32>() * 2.0 - 1.0) * THICKNESS;
            Star {
                position: Vec3::new(angle.cos() * radius, angle.sin() * radius, z),
                size: MIN_STAR_SIZE + rng.gen::<f32>() * STAR_SIZE_SPREAD,
            }
        })
        .collect()
}

const OCTAHEDRON: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

// Faces wound counter-clockwise when seen from outside
const OCTAHEDRON_FACES: [[u32; 3]; 8] = [
    [0, 2, 4],
    [2, 1, 4],
    [1, 3, 4],
    [3, 0, 4],
    [2, 0, 5],
    [1, 2, 5],
    [3, 1, 5],
    [0, 3, 5],
];

/// Merge every star into one triangle mesh, one octahedron of radius `size / 2` per star.
pub fn build_star_mesh(stars: &[Star]) -> Mesh {
    let mut positions = Vec::with_capacity(stars.len() * OCTAHEDRON.len());
    let mut normals = Vec::with_capacity(stars.len() * OCTAHEDRON.len());
    let mut indices = Vec::with_capacity(stars.len() * OCTAHEDRON_FACES.len() * 3);

    for (star_index, star) in stars.iter().enumerate() {
        let base = (star_index * OCTAHEDRON.len()) as u32;
        let half = star.size * 0.5;
        for corner in OCTAHEDRON {
            positions.push((star.position + corner * half).to_array());
            normals.push(corner.to_array());
        }
        for face in OCTAHEDRON_FACES {
            indices.extend(face.iter().map(|i| base + i));
        }
    }

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_indices(Indices::U32(indices))
}

fn spawn_galaxy(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let stars = generate_stars(STAR_COUNT, &mut rng);
    let mesh = meshes.add(build_star_mesh(&stars));
    let material = materials.add(StandardMaterial {
        base_color: STAR_COLOR,
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    commands
        .spawn((
            Name::new("Galaxy"),
            GalaxyRoot,
            Transform::default(),
            Visibility::default(),
            Spin::from_per_frame(Vec3::new(0.0, SPIN_PER_FRAME, 0.0)),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(mesh),
                MeshMaterial3d(material),
                Transform::default(),
                RenderLayers::layer(layers::GALAXY),
            ));
        });

    commands.spawn((
        Name::new("Galaxy Camera"),
        Camera3d::default(),
        Camera {
            order: camera_order::GALAXY,
            clear_color: ClearColorConfig::Custom(Color::BLACK),
            ..default()
        },
        Projection::Perspective(PerspectiveProjection {
            fov: FOV_DEGREES.to_radians(),
            near: 0.1,
            far: 1000.0,
            ..default()
        }),
        Transform::from_xyz(0.0, 0.0, CAMERA_DISTANCE).looking_at(Vec3::ZERO, Vec3::Y),
        RenderLayers::layer(layers::GALAXY),
        BoundToContainer(ContainerId::Background),
        // The avatar cameras only cover their container, so the UI hangs off this one
        IsDefaultUiCamera,
        GalaxyCamera,
    ));

    info!("Spawned galaxy background with {} stars", stars.len());
}
