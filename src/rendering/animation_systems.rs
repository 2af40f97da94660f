use std::time::Duration;

use bevy::animation::transition::AnimationTransitions;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_animation::graph::AnimationNodeIndex;
use bevy_animation::prelude::{AnimationGraph, AnimationGraphHandle};
use hashbrown::HashMap;

use crate::core::config::ViewerConfig;
use crate::core::constants::avatar::*;
use crate::core::playback::{ClipRole, InteractionKind, PlaybackCommand, PlaybackGuard};
use crate::core::portfolio::{BootstrapPhase, FrameSet};
use crate::rendering::scene_bootstrap::{AvatarCamera, AvatarRoot};

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<InteractionTrigger>()
            .add_systems(
                Update,
                (
                    link_animation_player,
                    detect_pointer_triggers,
                    handle_interaction_triggers,
                )
                    .chain()
                    .in_set(FrameSet::Input)
                    .run_if(in_state(BootstrapPhase::Ready)),
            )
            .add_systems(
                Update,
                advance_playback_timers
                    .in_set(FrameSet::Advance)
                    .run_if(in_state(BootstrapPhase::Ready)),
            );
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionTrigger {
    pub kind: InteractionKind,
}

/// Graph nodes for every clip role the avatar asset provides.
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    nodes: HashMap<ClipRole, AnimationNodeIndex>,
    missing: Vec<ClipRole>,
}

impl ClipLibrary {
    /// Build an animation graph from the asset's named clips, one node per known role.
    pub fn build<'a>(
        named_clips: impl IntoIterator<Item = (&'a str, Handle<AnimationClip>)>,
    ) -> (AnimationGraph, ClipLibrary) {
        let clips: HashMap<&str, Handle<AnimationClip>> = named_clips.into_iter().collect();
        let mut graph = AnimationGraph::new();
        let mut library = ClipLibrary::default();

        for role in ClipRole::ALL {
            match clips.get(role.clip_name()) {
                Some(clip) => {
                    let node = graph.add_clip(clip.clone(), 1.0, graph.root);
                    library.nodes.insert(role, node);
                }
                None => library.missing.push(role),
            }
        }
        (graph, library)
    }

    pub fn node(&self, role: ClipRole) -> Option<AnimationNodeIndex> {
        self.nodes.get(&role).copied()
    }

    pub fn missing(&self) -> &[ClipRole] {
        &self.missing
    }
}

/// The avatar's animation graph and the node of each clip role.
#[derive(Resource, Debug, Clone)]
pub struct AvatarClips {
    pub graph: Handle<AnimationGraph>,
    pub library: ClipLibrary,
}

/// Points from the avatar root to the entity that carries its `AnimationPlayer`.
#[derive(Component, Debug, Clone, Copy)]
pub struct AvatarAnimationLink {
    pub player: Option<Entity>,
}

// Wait for the scene to instantiate, then attach the graph to its animation player
// and start the idle loop
pub fn link_animation_player(
    mut commands: Commands,
    avatars: Query<Entity, (With<AvatarRoot>, Without<AvatarAnimationLink>)>,
    mut players: Query<&mut AnimationPlayer>,
    children: Query<&Children>,
    clips: Option<Res<AvatarClips>>,
) {
    let Some(clips) = clips else { return };
    for avatar in avatars.iter() {
        if children.get(avatar).is_err() {
            continue;
        }

        let Some(player_entity) = search_for_animation_player(avatar, &children, &players, 0)
        else {
            warn!("Avatar scene {:?} has no AnimationPlayer; it will stay posed", avatar);
            commands
                .entity(avatar)
                .insert(AvatarAnimationLink { player: None });
            continue;
        };

        let mut transitions = AnimationTransitions::new();
        if let (Ok(mut player), Some(idle)) = (
            players.get_mut(player_entity),
            clips.library.node(ClipRole::Idle),
        ) {
            transitions.play(&mut player, idle, Duration::ZERO).repeat();
        }

        commands
            .entity(player_entity)
            .insert((AnimationGraphHandle(clips.graph.clone()), transitions));
        commands.entity(avatar).insert(AvatarAnimationLink {
            player: Some(player_entity),
        });
        info!(
            "Linked avatar {:?} to animation player {:?}",
            avatar, player_entity
        );
    }
}

fn search_for_animation_player(
    entity: Entity,
    children: &Query<&Children>,
    players: &Query<&mut AnimationPlayer>,
    depth: usize,
) -> Option<Entity> {
    if depth > 10 {
        return None;
    }
    if players.get(entity).is_ok() {
        return Some(entity);
    }
    children.get(entity).ok().and_then(|list| {
        list.iter()
            .find_map(|&child| search_for_animation_player(child, children, players, depth + 1))
    })
}

/// Pick ray through a normalised device coordinate of a perspective camera.
pub fn pick_ray(camera: &GlobalTransform, fov: f32, aspect_ratio: f32, ndc: Vec2) -> Ray3d {
    let half_height = (fov * 0.5).tan();
    let local = Vec3::new(ndc.x * half_height * aspect_ratio, ndc.y * half_height, -1.0);
    let direction = camera.affine().transform_vector3(local);
    Ray3d {
        origin: camera.translation(),
        direction: Dir3::new(direction).unwrap_or(Dir3::NEG_Z),
    }
}

/// Whether `ray` passes within `radius` of the vertical segment through `center`.
pub fn ray_hits_capsule(ray: Ray3d, center: Vec3, half_height: f32, radius: f32) -> bool {
    let bottom = center - Vec3::Y * half_height;
    let axis = Vec3::Y * (half_height * 2.0);
    let direction = *ray.direction;

    // Closest point on the infinite lines, then clamp to the ray and segment
    let w = ray.origin - bottom;
    let b = direction.dot(axis);
    let c = axis.length_squared();
    let d = direction.dot(w);
    let e = axis.dot(w);
    let denom = c - b * b;
    let t = if denom.abs() > f32::EPSILON {
        ((b * e - c * d) / denom).max(0.0)
    } else {
        0.0
    };

    let s = ((ray.origin + direction * t - bottom).dot(axis) / c).clamp(0.0, 1.0);
    let on_axis = bottom + axis * s;
    let t = (on_axis - ray.origin).dot(direction).max(0.0);
    (ray.origin + direction * t).distance(on_axis) <= radius
}

pub fn detect_pointer_triggers(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    config: Res<ViewerConfig>,
    cameras: Query<(&GlobalTransform, &Projection), With<AvatarCamera>>,
    avatars: Query<&GlobalTransform, With<AvatarRoot>>,
    mut triggers: EventWriter<InteractionTrigger>,
    mut was_inside: Local<bool>,
) {
    let Ok(window) = windows.get_single() else { return };
    let window_size = window.size();
    let layout = config.avatar_container;
    let cursor = window.cursor_position();
    // A cursor outside the window reports no position, which counts as leaving
    let inside = cursor.is_some_and(|point| layout.contains(point, window_size));

    if *was_inside && !inside {
        triggers.send(InteractionTrigger {
            kind: InteractionKind::Chi,
        });
    }
    *was_inside = inside;

    if !inside || !mouse_buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let Some(cursor) = cursor else { return };
    let Ok((camera_transform, Projection::Perspective(perspective))) = cameras.get_single() else {
        return;
    };

    let container_size = Vec2::new(layout.width, layout.height) * window_size;
    let relative = (cursor - layout.logical_origin(window_size)) / container_size;
    let ndc = Vec2::new(relative.x * 2.0 - 1.0, 1.0 - relative.y * 2.0);
    let aspect = container_size.x / container_size.y.max(1.0);
    let ray = pick_ray(camera_transform, perspective.fov, aspect, ndc);

    for avatar_transform in avatars.iter() {
        let center = avatar_transform.transform_point(PICK_CENTER);
        if ray_hits_capsule(ray, center, PICK_HALF_HEIGHT, PICK_RADIUS) {
            triggers.send(InteractionTrigger {
                kind: InteractionKind::Stumble,
            });
            break;
        }
    }
}

pub fn handle_interaction_triggers(
    mut triggers: EventReader<InteractionTrigger>,
    mut avatars: Query<(&mut PlaybackGuard, &AvatarAnimationLink)>,
    mut players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
    clips: Option<Res<AvatarClips>>,
) {
    let Some(clips) = clips else {
        triggers.clear();
        return;
    };

    for trigger in triggers.read() {
        // Without the target clip, or the idle clip to return to, the trigger is skipped
        // and the guard stays idle
        if clips.library.node(trigger.kind.target_clip()).is_none()
            || clips.library.node(ClipRole::Idle).is_none()
        {
            debug!("Clips missing for {:?}; trigger skipped", trigger.kind);
            continue;
        }

        for (mut guard, link) in avatars.iter_mut() {
            let Some(command) = guard.try_begin(trigger.kind) else {
                debug!("{:?} trigger dropped while a transition is in flight", trigger.kind);
                continue;
            };
            debug!("{:?} transition started", trigger.kind);
            apply_playback_command(&command, link, &mut players, &clips.library);
        }
    }
}

pub fn advance_playback_timers(
    time: Res<Time>,
    mut avatars: Query<(&mut PlaybackGuard, &AvatarAnimationLink)>,
    mut players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
    clips: Option<Res<AvatarClips>>,
) {
    let Some(clips) = clips else { return };
    for (mut guard, link) in avatars.iter_mut() {
        for command in guard.tick(time.delta()) {
            apply_playback_command(&command, link, &mut players, &clips.library);
        }
    }
}

fn apply_playback_command(
    command: &PlaybackCommand,
    link: &AvatarAnimationLink,
    players: &mut Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
    library: &ClipLibrary,
) {
    match *command {
        PlaybackCommand::CrossFade { to, duration } => {
            let Some(node) = library.node(to) else { return };
            let Some(player_entity) = link.player else { return };
            let Ok((mut player, mut transitions)) = players.get_mut(player_entity) else {
                return;
            };
            transitions.play(&mut player, node, duration).repeat();
        }
        PlaybackCommand::Released(kind) => {
            debug!("{:?} transition released", kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    use crate::core::constants::playback::STUMBLE_HOLD;
    use crate::core::playback::TriggerPhase;

    fn full_library() -> (AnimationGraph, ClipLibrary) {
        ClipLibrary::build([
            (IDLE_CLIP, Handle::default()),
            (STUMBLE_CLIP, Handle::default()),
            (CHI_CLIP, Handle::default()),
            ("unrelated", Handle::default()),
        ])
    }

    #[test]
    fn library_maps_every_named_role() {
        let (_, library) = full_library();
        assert!(library.missing().is_empty());
        for role in ClipRole::ALL {
            assert!(library.node(role).is_some());
        }
        assert_ne!(library.node(ClipRole::Idle), library.node(ClipRole::Stumble));
    }

    #[test]
    fn library_reports_missing_clips() {
        let (_, library) = ClipLibrary::build([(IDLE_CLIP, Handle::default())]);
        assert_eq!(library.missing(), &[ClipRole::Stumble, ClipRole::Chi]);
        assert!(library.node(ClipRole::Chi).is_none());
    }

    #[test]
    fn centre_ray_hits_avatar() {
        let camera = GlobalTransform::from(
            Transform::from_xyz(0.0, 0.75, 3.0).looking_at(PICK_CENTER, Vec3::Y),
        );
        let ray = pick_ray(&camera, 45f32.to_radians(), 1.0, Vec2::ZERO);
        assert!(ray_hits_capsule(ray, PICK_CENTER, PICK_HALF_HEIGHT, PICK_RADIUS));
    }

    #[test]
    fn edge_ray_misses_avatar() {
        let camera = GlobalTransform::from(
            Transform::from_xyz(0.0, 0.75, 3.0).looking_at(PICK_CENTER, Vec3::Y),
        );
        let ray = pick_ray(&camera, 45f32.to_radians(), 1.0, Vec2::new(0.95, 0.0));
        assert!(!ray_hits_capsule(ray, PICK_CENTER, PICK_HALF_HEIGHT, PICK_RADIUS));
    }

    #[test]
    fn capsule_behind_ray_is_missed() {
        let ray = Ray3d {
            origin: Vec3::new(0.0, 0.75, 3.0),
            direction: Dir3::Z,
        };
        assert!(!ray_hits_capsule(ray, PICK_CENTER, PICK_HALF_HEIGHT, PICK_RADIUS));
    }

    #[test]
    fn spammed_triggers_start_one_transition() {
        let mut world = World::new();
        world.init_resource::<Events<InteractionTrigger>>();

        let (_, library) = full_library();
        let stumble = library.node(ClipRole::Stumble).unwrap();
        world.insert_resource(AvatarClips {
            graph: Handle::default(),
            library,
        });

        let player = world
            .spawn((AnimationPlayer::default(), AnimationTransitions::new()))
            .id();
        let avatar = world
            .spawn((
                PlaybackGuard::default(),
                AvatarAnimationLink {
                    player: Some(player),
                },
            ))
            .id();

        for _ in 0..5 {
            world.send_event(InteractionTrigger {
                kind: InteractionKind::Stumble,
            });
        }
        let _ = world.run_system_once(handle_interaction_triggers);

        let guard = world.get::<PlaybackGuard>(avatar).unwrap();
        assert!(guard.is_busy(InteractionKind::Stumble));
        let transitions = world.get::<AnimationTransitions>(player).unwrap();
        assert_eq!(transitions.get_main_animation(), Some(stumble));
        // Nothing was playing before, so there is nothing fading out
        let player_state = world.get::<AnimationPlayer>(player).unwrap();
        assert_eq!(player_state.playing_animations().count(), 1);
    }

    #[test]
    fn missing_clip_leaves_guard_idle() {
        let mut world = World::new();
        world.init_resource::<Events<InteractionTrigger>>();
        let (_, library) = ClipLibrary::build([(IDLE_CLIP, Handle::default())]);
        world.insert_resource(AvatarClips {
            graph: Handle::default(),
            library,
        });
        let avatar = world
            .spawn((
                PlaybackGuard::default(),
                AvatarAnimationLink { player: None },
            ))
            .id();

        world.send_event(InteractionTrigger {
            kind: InteractionKind::Chi,
        });
        let _ = world.run_system_once(handle_interaction_triggers);

        let guard = world.get::<PlaybackGuard>(avatar).unwrap();
        assert!(!guard.is_busy(InteractionKind::Chi));
    }

    #[test]
    fn missing_idle_clip_skips_triggers() {
        let mut world = World::new();
        world.init_resource::<Events<InteractionTrigger>>();
        let (_, library) =
            ClipLibrary::build([(STUMBLE_CLIP, Handle::default()), (CHI_CLIP, Handle::default())]);
        world.insert_resource(AvatarClips {
            graph: Handle::default(),
            library,
        });
        let player = world
            .spawn((AnimationPlayer::default(), AnimationTransitions::new()))
            .id();
        let avatar = world
            .spawn((
                PlaybackGuard::default(),
                AvatarAnimationLink {
                    player: Some(player),
                },
            ))
            .id();

        world.send_event(InteractionTrigger {
            kind: InteractionKind::Stumble,
        });
        let _ = world.run_system_once(handle_interaction_triggers);

        let guard = world.get::<PlaybackGuard>(avatar).unwrap();
        assert!(!guard.is_busy(InteractionKind::Stumble));
        let transitions = world.get::<AnimationTransitions>(player).unwrap();
        assert_eq!(transitions.get_main_animation(), None);
    }

    #[test]
    fn expired_hold_fades_back_to_idle() {
        let mut world = World::new();
        world.init_resource::<Events<InteractionTrigger>>();
        let (_, library) = full_library();
        let idle = library.node(ClipRole::Idle).unwrap();
        let stumble = library.node(ClipRole::Stumble).unwrap();
        world.insert_resource(AvatarClips {
            graph: Handle::default(),
            library,
        });
        let player = world
            .spawn((AnimationPlayer::default(), AnimationTransitions::new()))
            .id();
        let avatar = world
            .spawn((
                PlaybackGuard::default(),
                AvatarAnimationLink {
                    player: Some(player),
                },
            ))
            .id();

        world.send_event(InteractionTrigger {
            kind: InteractionKind::Stumble,
        });
        let _ = world.run_system_once(handle_interaction_triggers);
        let transitions = world.get::<AnimationTransitions>(player).unwrap();
        assert_eq!(transitions.get_main_animation(), Some(stumble));

        let mut time = Time::<()>::default();
        time.advance_by(Duration::from_secs_f32(STUMBLE_HOLD + 0.1));
        world.insert_resource(time);
        let _ = world.run_system_once(advance_playback_timers);

        let guard = world.get::<PlaybackGuard>(avatar).unwrap();
        assert!(matches!(
            guard.phase(InteractionKind::Stumble),
            TriggerPhase::Returning(_)
        ));
        let transitions = world.get::<AnimationTransitions>(player).unwrap();
        assert_eq!(transitions.get_main_animation(), Some(idle));
    }

    fn pointer_world() -> (World, Entity, Vec2, Vec2) {
        let mut world = World::new();
        world.init_resource::<Events<InteractionTrigger>>();
        world.init_resource::<ButtonInput<MouseButton>>();
        world.init_resource::<ViewerConfig>();

        let window = Window::default();
        let size = window.size();
        let layout = world.resource::<ViewerConfig>().avatar_container;
        let inside = layout.logical_origin(size)
            + Vec2::new(layout.width, layout.height) * size * 0.5;
        let outside = layout.logical_origin(size) - Vec2::ONE;
        let window = world.spawn((window, PrimaryWindow)).id();
        (world, window, inside, outside)
    }

    fn move_cursor(world: &mut World, window: Entity, position: Option<Vec2>) {
        world
            .get_mut::<Window>(window)
            .unwrap()
            .set_cursor_position(position);
    }

    fn drain_triggers(world: &mut World) -> Vec<InteractionKind> {
        world
            .resource_mut::<Events<InteractionTrigger>>()
            .drain()
            .map(|trigger| trigger.kind)
            .collect()
    }

    #[test]
    fn leaving_the_container_sends_chi() {
        let (mut world, window, inside, outside) = pointer_world();
        let system = world.register_system(detect_pointer_triggers);

        move_cursor(&mut world, window, Some(inside));
        world.run_system(system).unwrap();
        assert!(drain_triggers(&mut world).is_empty());

        move_cursor(&mut world, window, Some(outside));
        world.run_system(system).unwrap();
        assert_eq!(drain_triggers(&mut world), vec![InteractionKind::Chi]);

        // Staying outside does not repeat it
        world.run_system(system).unwrap();
        assert!(drain_triggers(&mut world).is_empty());
    }

    #[test]
    fn cursor_leaving_the_window_sends_chi() {
        let (mut world, window, inside, _) = pointer_world();
        let system = world.register_system(detect_pointer_triggers);

        move_cursor(&mut world, window, Some(inside));
        world.run_system(system).unwrap();
        move_cursor(&mut world, window, None);
        world.run_system(system).unwrap();
        assert_eq!(drain_triggers(&mut world), vec![InteractionKind::Chi]);
    }

    #[test]
    fn cursor_never_inside_sends_nothing() {
        let (mut world, window, _, outside) = pointer_world();
        let system = world.register_system(detect_pointer_triggers);

        move_cursor(&mut world, window, Some(outside));
        world.run_system(system).unwrap();
        move_cursor(&mut world, window, None);
        world.run_system(system).unwrap();
        assert!(drain_triggers(&mut world).is_empty());
    }
}
