//! # Scene Bootstrapper
//!
//! Loads the avatar and its props, reports progress, and builds the avatar scene once
//! the avatar is in memory.
//!
//! ## Lifecycle
//!
//! 1. **Startup**: queue the avatar glTF and the prop scenes on the asset server
//! 2. **Loading**: every frame, count settled assets and publish [`LoadProgress`];
//!    only the avatar decides between [`BootstrapPhase::Ready`] and [`BootstrapPhase::Failed`]
//! 3. **Ready**: spawn the avatar camera, lighting rig, pedestal and avatar, and build the
//!    clip library for the animation systems
//!
//! Props are decoration. Each one is spawned when its scene finishes loading, and a prop
//! that fails to load is logged and left out.
//!
//! A failed avatar load is terminal: the avatar container stays blank and nothing retries.

use bevy::gltf::{Gltf, GltfAssetLabel};
use bevy::asset::{LoadState, RecursiveDependencyLoadState, UntypedAssetId};
use bevy::pbr::NotShadowCaster;
use bevy::prelude::*;
use bevy::render::camera::ClearColorConfig;
use bevy_animation::prelude::AnimationGraph;

use crate::core::config::{ContainerId, ViewerConfig};
use crate::core::constants::{avatar::*, camera::*, camera_order, lights::*, props::PROPS};
use crate::core::playback::{ClipRole, PlaybackGuard};
use crate::core::portfolio::BootstrapPhase;
use crate::core::viewport::BoundToContainer;
use crate::rendering::animation_systems::{AvatarClips, ClipLibrary};
use crate::rendering::motion::Spin;
use crate::rendering::orbit_camera::OrbitRig;

pub struct SceneBootstrapPlugin;

impl Plugin for SceneBootstrapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LoadProgress>()
            .add_systems(Startup, queue_scene_assets)
            .add_systems(
                Update,
                track_load_progress.run_if(in_state(BootstrapPhase::Loading)),
            )
            .add_systems(OnEnter(BootstrapPhase::Ready), build_avatar_scene)
            .add_systems(OnEnter(BootstrapPhase::Failed), report_bootstrap_failure)
            .add_systems(
                Update,
                (spawn_loaded_props, apply_prop_tints)
                    .chain()
                    .run_if(in_state(BootstrapPhase::Ready)),
            );
    }
}

/// Handles queued at startup. The avatar is loaded as a whole glTF so its named clips
/// are available alongside the scene.
#[derive(Resource, Debug, Clone)]
pub struct SceneAssets {
    pub avatar: Handle<Gltf>,
    pub props: Vec<Handle<Scene>>,
    /// Props already spawned or given up on, by index into `props`
    settled_props: Vec<bool>,
}

/// Where one queued asset stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Loaded,
    Failed,
}

impl AssetStatus {
    fn of(asset_server: &AssetServer, id: impl Into<UntypedAssetId>) -> Self {
        let id = id.into();
        if let Some(LoadState::Failed(err)) = asset_server.get_load_state(id) {
            debug!("Asset {:?} failed: {}", id, err);
            return AssetStatus::Failed;
        }
        if let Some(RecursiveDependencyLoadState::Failed(err)) =
            asset_server.get_recursive_dependency_load_state(id)
        {
            debug!("A dependency of asset {:?} failed: {}", id, err);
            return AssetStatus::Failed;
        }
        if asset_server.is_loaded_with_dependencies(id) {
            AssetStatus::Loaded
        } else {
            AssetStatus::Pending
        }
    }
}

/// One look at the queued assets: the progress to show and the phase to move to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCheck {
    pub progress: LoadProgress,
    pub phase: Option<BootstrapPhase>,
}

/// Only the avatar gates the scene. Props count towards progress once they settle either way.
pub fn check_scene_load(avatar: AssetStatus, props: &[AssetStatus]) -> LoadCheck {
    let settled_props = props
        .iter()
        .filter(|status| **status != AssetStatus::Pending)
        .count();
    let progress = LoadProgress {
        loaded: settled_props + usize::from(avatar == AssetStatus::Loaded),
        total: 1 + props.len(),
    };
    let phase = match avatar {
        AssetStatus::Pending => None,
        AssetStatus::Loaded => Some(BootstrapPhase::Ready),
        AssetStatus::Failed => Some(BootstrapPhase::Failed),
    };
    LoadCheck { progress, phase }
}

pub fn tint_from_hex(hex: u32) -> Color {
    Color::srgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

/// Loaded-over-total asset counts for the loading indicator.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.loaded.min(self.total) as f32 / self.total as f32
    }

    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }

    pub fn label(&self) -> String {
        format!("LOADING... {}%", self.percent())
    }
}

#[derive(Component)]
pub struct AvatarRoot;

#[derive(Component)]
pub struct AvatarCamera;

/// Colour override applied to every mesh of a prop once its scene has spawned.
#[derive(Component, Debug, Clone, Copy)]
pub struct PropTint(pub Color);

#[derive(Component)]
struct TintApplied;

fn queue_scene_assets(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut progress: ResMut<LoadProgress>,
    config: Res<ViewerConfig>,
) {
    let avatar = asset_server.load::<Gltf>(config.avatar_model.clone());
    let props: Vec<Handle<Scene>> = PROPS
        .iter()
        .map(|prop| asset_server.load(GltfAssetLabel::Scene(0).from_asset(prop.path)))
        .collect();

    *progress = LoadProgress {
        loaded: 0,
        total: 1 + props.len(),
    };
    info!(
        "Queued avatar {} and {} props for loading",
        config.avatar_model,
        props.len()
    );
    commands.insert_resource(SceneAssets {
        avatar,
        settled_props: vec![false; props.len()],
        props,
    });
}

fn track_load_progress(
    asset_server: Res<AssetServer>,
    assets: Option<Res<SceneAssets>>,
    mut progress: ResMut<LoadProgress>,
    mut next_phase: ResMut<NextState<BootstrapPhase>>,
) {
    let Some(assets) = assets else { return };

    let avatar = AssetStatus::of(&asset_server, &assets.avatar);
    let props: Vec<AssetStatus> = assets
        .props
        .iter()
        .map(|handle| AssetStatus::of(&asset_server, handle))
        .collect();
    let check = check_scene_load(avatar, &props);

    if check.progress.percent() != progress.percent() {
        debug!("Loading scene assets... {}%", check.progress.percent());
    }
    if check.progress != *progress {
        *progress = check.progress;
    }
    match check.phase {
        Some(BootstrapPhase::Ready) => {
            info!("Avatar loaded");
            next_phase.set(BootstrapPhase::Ready);
        }
        Some(BootstrapPhase::Failed) => {
            error!("Failed to load avatar {:?}", assets.avatar.path());
            next_phase.set(BootstrapPhase::Failed);
        }
        _ => {}
    }
}

fn report_bootstrap_failure() {
    warn!("Avatar viewer left blank after an asset load failure");
}

#[allow(clippy::too_many_arguments)]
fn build_avatar_scene(
    mut commands: Commands,
    assets: Res<SceneAssets>,
    gltfs: Res<Assets<Gltf>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut next_phase: ResMut<NextState<BootstrapPhase>>,
) {
    let Some(gltf) = gltfs.get(&assets.avatar) else {
        error!("Avatar glTF reported loaded but is missing from storage");
        next_phase.set(BootstrapPhase::Failed);
        return;
    };
    let Some(scene) = gltf
        .default_scene
        .clone()
        .or_else(|| gltf.scenes.first().cloned())
    else {
        error!("Avatar glTF contains no scene");
        next_phase.set(BootstrapPhase::Failed);
        return;
    };

    let (graph, library) = ClipLibrary::build(
        gltf.named_animations
            .iter()
            .map(|(name, clip)| (name.as_ref(), clip.clone())),
    );
    for role in library.missing() {
        warn!(
            "Avatar has no '{}' clip; {:?} interactions will do nothing",
            role.clip_name(),
            role
        );
    }
    if library.node(ClipRole::Idle).is_none() {
        warn!("Avatar will not play an idle loop");
    }
    commands.insert_resource(AvatarClips {
        graph: graphs.add(graph),
        library,
    });

    spawn_avatar_camera(&mut commands);
    spawn_lighting_rig(&mut commands);

    commands.spawn((
        Name::new("Pedestal"),
        Mesh3d(
            meshes.add(
                Cylinder::new(PEDESTAL_RADIUS, PEDESTAL_HEIGHT)
                    .mesh()
                    .resolution(PEDESTAL_RESOLUTION),
            ),
        ),
        MeshMaterial3d(materials.add(StandardMaterial::default())),
        Transform::from_xyz(0.0, -PEDESTAL_HEIGHT * 0.5, 0.0),
        NotShadowCaster,
    ));

    commands.spawn((
        Name::new("Avatar"),
        SceneRoot(scene),
        Transform::default(),
        Visibility::Visible,
        AvatarRoot,
        PlaybackGuard::default(),
    ));

    info!("Avatar scene built");
}

fn spawn_avatar_camera(commands: &mut Commands) {
    let rig = OrbitRig::from_eye(INITIAL_EYE, ORBIT_TARGET, ORBIT_DISTANCE, ORBIT_POLAR);
    commands.spawn((
        Name::new("Avatar Camera"),
        Camera3d::default(),
        Camera {
            order: camera_order::AVATAR,
            // Draw over the backdrop already in this container
            clear_color: ClearColorConfig::None,
            ..default()
        },
        Projection::Perspective(PerspectiveProjection {
            fov: AVATAR_FOV_DEGREES.to_radians(),
            ..default()
        }),
        rig.transform(),
        rig,
        BoundToContainer(ContainerId::Avatar),
        AvatarCamera,
    ));
}

fn spawn_lighting_rig(commands: &mut Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: AMBIENT_BRIGHTNESS,
    });

    commands.spawn((
        Name::new("Spot Light"),
        SpotLight {
            intensity: SPOT_INTENSITY,
            range: SPOT_RANGE,
            outer_angle: SPOT_ANGLE,
            inner_angle: SPOT_ANGLE * (1.0 - SPOT_PENUMBRA),
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(SPOT_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Key Light"),
        DirectionalLight {
            illuminance: KEY_ILLUMINANCE,
            ..default()
        },
        Transform::from_translation(KEY_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn spawn_loaded_props(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut assets: ResMut<SceneAssets>,
) {
    let assets = &mut *assets;
    for ((prop, handle), settled) in PROPS
        .iter()
        .zip(assets.props.iter())
        .zip(assets.settled_props.iter_mut())
    {
        if *settled {
            continue;
        }
        match AssetStatus::of(&asset_server, handle) {
            AssetStatus::Pending => {}
            AssetStatus::Failed => {
                warn!("Prop {} failed to load and will not be shown", prop.path);
                *settled = true;
            }
            AssetStatus::Loaded => {
                let mut entity = commands.spawn((
                    Name::new(prop.path),
                    SceneRoot(handle.clone()),
                    Transform::from_translation(prop.position),
                    Spin::from_per_frame(prop.spin_per_frame),
                ));
                if let Some(hex) = prop.tint {
                    entity.insert(PropTint(tint_from_hex(hex)));
                }
                debug!("Spawned prop {}", prop.path);
                *settled = true;
            }
        }
    }
}

// Scenes spawn their children a frame or more after the root, so tints wait for them
fn apply_prop_tints(
    mut commands: Commands,
    props: Query<(Entity, &PropTint), Without<TintApplied>>,
    children: Query<&Children>,
    meshes: Query<(), With<MeshMaterial3d<StandardMaterial>>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (prop, tint) in props.iter() {
        if children.get(prop).is_err() {
            continue;
        }

        let material = materials.add(StandardMaterial {
            base_color: tint.0,
            ..default()
        });
        let mut tinted = 0;
        for descendant in children.iter_descendants(prop) {
            if meshes.get(descendant).is_ok() {
                commands
                    .entity(descendant)
                    .insert(MeshMaterial3d(material.clone()));
                tinted += 1;
            }
        }
        commands.entity(prop).insert(TintApplied);
        debug!("Tinted {} meshes of prop {:?}", tinted, prop);
    }
}
