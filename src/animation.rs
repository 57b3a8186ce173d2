//! Hand animation state requests.
//!
//! The controller never plays clips. It tells an [`AnimationSink`] which named
//! state each hand should be in, and the game maps that to its own animation
//! system (usually by reading [`HandAnimationChanged`] events).

use bevy::prelude::*;

use crate::hand::HandSide;

/// Named hand animation states.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandAnimState {
    #[default]
    Idle,
    TryGrab,
    Grab,
}

impl HandAnimState {
    /// Clip name conventionally used for this state.
    pub fn clip_name(self) -> &'static str {
        match self {
            HandAnimState::Idle => "HandIdle",
            HandAnimState::TryGrab => "HandTryGrab",
            HandAnimState::Grab => "HandGrab",
        }
    }
}

/// Receiver of hand animation state changes.
pub trait AnimationSink {
    /// Start playing `state` on `side`.
    fn play(&mut self, side: HandSide, state: HandAnimState);
}

/// Collects requested changes; used by the ECS glue and in tests.
impl AnimationSink for Vec<(HandSide, HandAnimState)> {
    fn play(&mut self, side: HandSide, state: HandAnimState) {
        self.push((side, state));
    }
}

/// Tracks the current state of one hand so repeated requests are no-ops.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandAnimator {
    current: HandAnimState,
}

impl HandAnimator {
    /// Currently playing state.
    pub fn current(&self) -> HandAnimState {
        self.current
    }

    /// Request `state`; forwards to `sink` only when it differs from the
    /// current one. Returns whether a change was issued.
    pub fn set_state(
        &mut self,
        side: HandSide,
        state: HandAnimState,
        sink: &mut impl AnimationSink,
    ) -> bool {
        if self.current == state {
            return false;
        }
        sink.play(side, state);
        self.current = state;
        true
    }
}

/// Event sent whenever a player's hand changes animation state.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandAnimationChanged {
    pub player: Entity,
    pub side: HandSide,
    pub state: HandAnimState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animator_starts_idle() {
        let animator = HandAnimator::default();
        assert_eq!(animator.current(), HandAnimState::Idle);
    }

    #[test]
    fn setting_same_state_twice_plays_once() {
        let mut animator = HandAnimator::default();
        let mut sink = Vec::new();

        assert!(animator.set_state(HandSide::Left, HandAnimState::Grab, &mut sink));
        assert!(!animator.set_state(HandSide::Left, HandAnimState::Grab, &mut sink));

        assert_eq!(sink, vec![(HandSide::Left, HandAnimState::Grab)]);
    }

    #[test]
    fn setting_current_idle_is_noop() {
        let mut animator = HandAnimator::default();
        let mut sink = Vec::new();
        animator.set_state(HandSide::Right, HandAnimState::Idle, &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn clip_names() {
        assert_eq!(HandAnimState::TryGrab.clip_name(), "HandTryGrab");
        assert_eq!(HandAnimState::Grab.clip_name(), "HandGrab");
    }
}
