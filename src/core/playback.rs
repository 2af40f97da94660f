//! # Playback guard
//!
//! Tracks the clip transitions started by pointer interactions on the avatar.
//!
//! Each [`InteractionKind`] owns a [`TriggerPhase`]:
//!
//! ```text
//! Idle --try_begin--> Holding --hold expires--> Returning --release expires--> Idle
//!                     (target clip)             (fading back to idle clip)
//! ```
//!
//! While a kind is `Holding` or `Returning` it is busy and further triggers of that kind are
//! dropped, not queued. The timers live inside the phase, so dropping the guard (for example
//! when the avatar is despawned) cancels every pending step.

use std::time::Duration;

use bevy::prelude::*;

use crate::core::constants::playback::*;

/// Animation clips the avatar can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipRole {
    Idle,
    Stumble,
    Chi,
}

impl ClipRole {
    pub const ALL: [ClipRole; 3] = [ClipRole::Idle, ClipRole::Stumble, ClipRole::Chi];

    pub fn clip_name(self) -> &'static str {
        use crate::core::constants::avatar::*;
        match self {
            ClipRole::Idle => IDLE_CLIP,
            ClipRole::Stumble => STUMBLE_CLIP,
            ClipRole::Chi => CHI_CLIP,
        }
    }
}

/// Pointer interactions that start a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// Clicking the avatar
    Stumble,
    /// Pointer leaving the avatar container
    Chi,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 2] = [InteractionKind::Stumble, InteractionKind::Chi];

    pub fn target_clip(self) -> ClipRole {
        match self {
            InteractionKind::Stumble => ClipRole::Stumble,
            InteractionKind::Chi => ClipRole::Chi,
        }
    }

    pub fn fade_in(self) -> Duration {
        match self {
            InteractionKind::Stumble => Duration::from_secs_f32(STUMBLE_FADE_IN),
            InteractionKind::Chi => Duration::from_secs_f32(CHI_FADE_IN),
        }
    }

    pub fn hold(self) -> Duration {
        match self {
            InteractionKind::Stumble => Duration::from_secs_f32(STUMBLE_HOLD),
            InteractionKind::Chi => Duration::from_secs_f32(CHI_HOLD),
        }
    }

    // A stumble may interrupt a chi, never the other way round
    fn blocked_by(self) -> &'static [InteractionKind] {
        match self {
            InteractionKind::Stumble => &[InteractionKind::Stumble],
            InteractionKind::Chi => &[InteractionKind::Stumble, InteractionKind::Chi],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum TriggerPhase {
    #[default]
    Idle,
    /// Target clip playing; the timer counts down to the fade back
    Holding(Timer),
    /// Idle clip fading back in; the timer counts down to release
    Returning(Timer),
}

impl TriggerPhase {
    pub fn is_busy(&self) -> bool {
        !matches!(self, TriggerPhase::Idle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    CrossFade { to: ClipRole, duration: Duration },
    Released(InteractionKind),
}

/// Per-avatar transition state, one phase per interaction kind.
#[derive(Component, Debug, Clone, Default)]
pub struct PlaybackGuard {
    stumble: TriggerPhase,
    chi: TriggerPhase,
}

impl PlaybackGuard {
    pub fn phase(&self, kind: InteractionKind) -> &TriggerPhase {
        match kind {
            InteractionKind::Stumble => &self.stumble,
            InteractionKind::Chi => &self.chi,
        }
    }

    fn phase_mut(&mut self, kind: InteractionKind) -> &mut TriggerPhase {
        match kind {
            InteractionKind::Stumble => &mut self.stumble,
            InteractionKind::Chi => &mut self.chi,
        }
    }

    pub fn is_busy(&self, kind: InteractionKind) -> bool {
        self.phase(kind).is_busy()
    }

    /// Start a transition for `kind`. Returns the cross-fade to apply, or `None` when the
    /// trigger must be dropped because a conflicting transition is in flight.
    pub fn try_begin(&mut self, kind: InteractionKind) -> Option<PlaybackCommand> {
        if kind.blocked_by().iter().any(|&other| self.is_busy(other)) {
            return None;
        }

        // A stumble takes over the rig; a chi still holding must not fade back over it
        if kind == InteractionKind::Stumble {
            if let TriggerPhase::Holding(_) = self.chi {
                self.chi = TriggerPhase::Returning(release_timer());
            }
        }

        *self.phase_mut(kind) = TriggerPhase::Holding(Timer::new(kind.hold(), TimerMode::Once));
        Some(PlaybackCommand::CrossFade {
            to: kind.target_clip(),
            duration: kind.fade_in(),
        })
    }

    /// Advance every pending timer by `delta`, returning the commands that became due.
    pub fn tick(&mut self, delta: Duration) -> Vec<PlaybackCommand> {
        let mut commands = Vec::new();
        for kind in InteractionKind::ALL {
            let phase = self.phase_mut(kind);
            let mut remaining_delta = delta;

            if let TriggerPhase::Holding(timer) = &mut *phase {
                let before = timer.remaining();
                timer.tick(remaining_delta);
                if !timer.finished() {
                    continue;
                }
                remaining_delta = remaining_delta.saturating_sub(before);
                *phase = TriggerPhase::Returning(release_timer());
                commands.push(PlaybackCommand::CrossFade {
                    to: ClipRole::Idle,
                    duration: Duration::from_secs_f32(RETURN_FADE),
                });
            }

            if let TriggerPhase::Returning(timer) = &mut *phase {
                timer.tick(remaining_delta);
                if timer.finished() {
                    *phase = TriggerPhase::Idle;
                    commands.push(PlaybackCommand::Released(kind));
                }
            }
        }
        commands
    }

    /// Drop every pending timer. Returns how many transitions were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for kind in InteractionKind::ALL {
            let phase = self.phase_mut(kind);
            if phase.is_busy() {
                cancelled += 1;
            }
            *phase = TriggerPhase::Idle;
        }
        cancelled
    }
}

fn release_timer() -> Timer {
    Timer::new(Duration::from_secs_f32(RELEASE_DELAY), TimerMode::Once)
}
