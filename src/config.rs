//! Controller configuration components.
//!
//! All tuning lives in [`ClimbConfig`], a reflectable component grouped into
//! sub-configs per subsystem. Values are plain data; nothing here is
//! recomputed at runtime.

use bevy::prelude::*;

use crate::collision::LayerMask;
use crate::hand::HandSide;

/// Policy deciding whether a hand may attach while the body is moving upward.
///
/// Two variants were shipped historically and neither is canonical, so the
/// choice is left to the game.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrabGatePolicy {
    /// Refuse any attach while ascending, unless the other hand already grips.
    #[default]
    BlockAscendingUnlessOtherHandGrips,
    /// While ascending, refuse only the object this hand last let go of.
    BlockAscendingSameObject,
    /// Never gate on vertical motion.
    Unrestricted,
}

/// Horizontal movement, jump and gravity tuning.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct LocomotionConfig {
    /// Horizontal speed (units/second).
    pub move_speed: f32,
    /// Factor applied to `move_speed` while either hand grips.
    pub grip_speed_factor: f32,
    /// Jump height parameter; launch speed is `sqrt(jump_force * -2 * gravity)`.
    pub jump_force: f32,
    /// Vertical gravity acceleration (negative = down).
    pub gravity: f32,
    /// Grace window after leaving the ground during which a jump is allowed.
    pub coyote_time: f32,
    /// How long an early jump press is remembered.
    pub jump_buffer_time: f32,
    /// Gravity multiplier while descending.
    pub fall_gravity_multiplier: f32,
    /// Gravity multiplier while ascending with jump held.
    pub jump_hang_gravity_multiplier: f32,
    /// Extra gravity multiplier applied while ascending with jump released.
    pub jump_cut_gravity_multiplier: f32,
    /// Terminal fall speed (positive).
    pub max_fall_speed: f32,
    /// Velocity change applied away from the wall when jumping off a grip.
    pub push_off_impulse: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            grip_speed_factor: 0.5,
            jump_force: 10.0,
            gravity: -9.81,
            coyote_time: 0.2,
            jump_buffer_time: 0.1,
            fall_gravity_multiplier: 2.5,
            jump_hang_gravity_multiplier: 0.5,
            jump_cut_gravity_multiplier: 0.5,
            max_fall_speed: 20.0,
            push_off_impulse: 4.0,
        }
    }
}

/// Contact ray lengths, measured from the body origin.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct SensorConfig {
    pub ground_check_distance: f32,
    pub wall_check_distance: f32,
    pub ceiling_check_distance: f32,
    /// Layers counted as ground, walls and ceilings.
    pub ground_layer: LayerMask,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ground_check_distance: 1.1,
            wall_check_distance: 0.8,
            ceiling_check_distance: 1.1,
            ground_layer: LayerMask::ALL,
        }
    }
}

/// Grab targeting shared by both hands.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct GrabConfig {
    /// Maximum distance of the view-centre grab ray.
    pub grab_range: f32,
    /// Layers a grab ray may hit.
    pub grabbable_layer: LayerMask,
    /// Component-wise offset along the hit normal where the anchor is placed.
    pub hand_offset: Vec3,
    pub gate_policy: GrabGatePolicy,
    /// Vertical speed above which the body counts as ascending.
    pub upward_velocity_threshold: f32,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            grab_range: 1.5,
            grabbable_layer: LayerMask::ALL,
            hand_offset: Vec3::splat(0.05),
            gate_policy: GrabGatePolicy::default(),
            upward_velocity_threshold: 0.1,
        }
    }
}

/// Per-hand stamina and cooldown.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct HandConfig {
    pub max_stamina: f32,
    /// Cost deducted on attach, and drain per second while gripping.
    /// Regeneration runs at twice this rate.
    pub cost_stamina: f32,
    /// Seconds after a release during which the hand cannot grab.
    pub grab_cooldown: f32,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            max_stamina: 100.0,
            cost_stamina: 10.0,
            grab_cooldown: 0.25,
        }
    }
}

/// Elastic constraint between the body and a gripping hand.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    /// Slack length; the spring only pulls beyond this distance.
    pub max_distance: f32,
    /// Impulse applied toward the anchor when the hand lets go.
    pub release_impulse_force: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 50.0,
            damping: 5.0,
            max_distance: 0.5,
            release_impulse_force: 3.0,
        }
    }
}

/// Presentation-only hand effects.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct FeedbackConfig {
    pub full_stamina_color: LinearRgba,
    pub low_stamina_color: LinearRgba,
    /// Per-axis shake amplitude at zero stamina.
    pub max_shake_intensity: f32,
    /// Noise sampling rate for the shake.
    pub shake_speed: f32,
    /// Surface distance at which the recoil is fully applied.
    pub recoil_near_distance: f32,
    /// Surface distance at which the recoil starts.
    pub recoil_far_distance: f32,
    /// Local offset applied at full recoil.
    pub recoil_direction: Vec3,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            full_stamina_color: LinearRgba::WHITE,
            low_stamina_color: LinearRgba::RED,
            max_shake_intensity: 0.02,
            shake_speed: 20.0,
            recoil_near_distance: 0.1,
            recoil_far_distance: 0.6,
            recoil_direction: Vec3::new(0.0, -0.03, 0.08),
        }
    }
}

/// First-person look tuning.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct LookConfig {
    /// Degrees per second per unit of look input.
    pub mouse_sensitivity: f32,
    /// Absolute pitch limit in degrees.
    pub pitch_limit: f32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 100.0,
            pitch_limit: 90.0,
        }
    }
}

/// Configuration for a climbing player.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ClimbConfig {
    pub locomotion: LocomotionConfig,
    pub sensor: SensorConfig,
    pub grab: GrabConfig,
    pub left_hand: HandConfig,
    pub right_hand: HandConfig,
    pub spring: SpringConfig,
    pub feedback: FeedbackConfig,
    pub look: LookConfig,
}

impl ClimbConfig {
    /// Default tuning for a player character.
    pub fn player() -> Self {
        Self::default()
    }

    /// Forgiving tuning: longer grace windows, slower stamina drain.
    pub fn casual() -> Self {
        let hand = HandConfig {
            cost_stamina: 5.0,
            ..default()
        };
        Self {
            locomotion: LocomotionConfig {
                coyote_time: 0.3,
                jump_buffer_time: 0.2,
                ..default()
            },
            left_hand: hand,
            right_hand: hand,
            ..default()
        }
    }

    /// Hand tuning for one side.
    pub fn hand(&self, side: HandSide) -> &HandConfig {
        match side {
            HandSide::Left => &self.left_hand,
            HandSide::Right => &self.right_hand,
        }
    }

    /// Builder: set horizontal move speed.
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.locomotion.move_speed = speed;
        self
    }

    /// Builder: set jump force and gravity.
    pub fn with_jump(mut self, jump_force: f32, gravity: f32) -> Self {
        self.locomotion.jump_force = jump_force;
        self.locomotion.gravity = gravity;
        self
    }

    /// Builder: set coyote time.
    pub fn with_coyote_time(mut self, time: f32) -> Self {
        self.locomotion.coyote_time = time;
        self
    }

    /// Builder: set jump buffer time.
    pub fn with_jump_buffer_time(mut self, time: f32) -> Self {
        self.locomotion.jump_buffer_time = time;
        self
    }

    /// Builder: set the ground and grabbable layers.
    pub fn with_layers(mut self, ground: LayerMask, grabbable: LayerMask) -> Self {
        self.sensor.ground_layer = ground;
        self.grab.grabbable_layer = grabbable;
        self
    }

    /// Builder: set grab range.
    pub fn with_grab_range(mut self, range: f32) -> Self {
        self.grab.grab_range = range;
        self
    }

    /// Builder: set the ascending grab gate.
    pub fn with_gate_policy(mut self, policy: GrabGatePolicy) -> Self {
        self.grab.gate_policy = policy;
        self
    }

    /// Builder: set stamina for both hands.
    pub fn with_stamina(mut self, max: f32, cost: f32) -> Self {
        for hand in [&mut self.left_hand, &mut self.right_hand] {
            hand.max_stamina = max;
            hand.cost_stamina = cost;
        }
        self
    }

    /// Builder: set grab cooldown for both hands.
    pub fn with_grab_cooldown(mut self, cooldown: f32) -> Self {
        self.left_hand.grab_cooldown = cooldown;
        self.right_hand.grab_cooldown = cooldown;
        self
    }

    /// Builder: set spring stiffness and damping.
    pub fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.spring.stiffness = stiffness;
        self.spring.damping = damping;
        self
    }

    /// Builder: set the release impulse.
    pub fn with_release_impulse(mut self, force: f32) -> Self {
        self.spring.release_impulse_force = force;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hands_are_symmetric() {
        let config = ClimbConfig::default();
        assert_eq!(
            config.hand(HandSide::Left).max_stamina,
            config.hand(HandSide::Right).max_stamina
        );
        assert_eq!(
            config.hand(HandSide::Left).cost_stamina,
            config.hand(HandSide::Right).cost_stamina
        );
    }

    #[test]
    fn casual_preset_is_more_forgiving() {
        let casual = ClimbConfig::casual();
        let default = ClimbConfig::default();
        assert!(casual.locomotion.coyote_time > default.locomotion.coyote_time);
        assert!(casual.left_hand.cost_stamina < default.left_hand.cost_stamina);
    }

    #[test]
    fn builders_set_both_hands() {
        let config = ClimbConfig::default()
            .with_stamina(50.0, 2.0)
            .with_grab_cooldown(1.0);
        for side in HandSide::ALL {
            assert_eq!(config.hand(side).max_stamina, 50.0);
            assert_eq!(config.hand(side).cost_stamina, 2.0);
            assert_eq!(config.hand(side).grab_cooldown, 1.0);
        }
    }

    #[test]
    fn gate_policy_defaults_to_other_hand_exception() {
        assert_eq!(
            GrabGatePolicy::default(),
            GrabGatePolicy::BlockAscendingUnlessOtherHandGrips
        );
    }
}
