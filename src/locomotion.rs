//! Horizontal movement, jump assist and gravity.
//!
//! Runs once per fixed tick after the ground sensor. The steps are strictly
//! ordered: horizontal velocity, jump buffer, coyote timer, jump trigger,
//! jump cut, gravity.

use bevy::prelude::*;

use crate::animation::AnimationSink;
use crate::config::{ClimbConfig, LocomotionConfig};
use crate::hand::{HandRelease, Hands};
use crate::state::{MovementState, PlayerState};

/// Launch speed for a jump.
///
/// `sqrt(jump_force * -2 * gravity)`; zero if gravity points up.
pub fn jump_velocity(jump_force: f32, gravity: f32) -> f32 {
    (jump_force * -2.0 * gravity).max(0.0).sqrt()
}

/// Per-tick inputs to the integrator that come from outside the movement state.
#[derive(Debug, Clone, Copy)]
pub struct LocomotionContext {
    /// Planar forward and right used to orient the move input.
    pub basis: (Vec3, Vec3),
    pub body_position: Vec3,
    pub dt: f32,
}

/// What happened during one integration step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocomotionReport {
    pub jumped: bool,
    /// Grips let go by a jump push-off.
    pub releases: Vec<HandRelease>,
}

/// Set horizontal velocity from the move input; vertical is left untouched.
pub fn apply_horizontal(
    movement: &mut MovementState,
    basis: (Vec3, Vec3),
    gripping: bool,
    config: &LocomotionConfig,
) {
    let (forward, right) = basis;
    let input = movement.move_input;
    let direction = forward * input.y + right * input.x;
    let speed = if gripping {
        config.move_speed * config.grip_speed_factor
    } else {
        config.move_speed
    };
    movement.velocity.x = direction.x * speed;
    movement.velocity.z = direction.z * speed;
}

/// Refresh or count down the jump buffer and coyote timers.
pub fn update_jump_timers(
    movement: &mut MovementState,
    state: &mut PlayerState,
    config: &LocomotionConfig,
    dt: f32,
) {
    if state.take_jump_request() {
        movement.jump_buffer_timer = config.jump_buffer_time;
    } else {
        movement.jump_buffer_timer = (movement.jump_buffer_timer - dt).max(0.0);
    }

    if state.is_grounded() {
        movement.coyote_timer = config.coyote_time;
    } else {
        movement.coyote_timer = (movement.coyote_timer - dt).max(0.0);
    }
}

/// Whether a buffered jump may fire now.
pub fn can_jump(movement: &MovementState, gripping: bool) -> bool {
    movement.jump_buffer_timer > 0.0 && (movement.coyote_timer > 0.0 || gripping)
}

/// Jump cut, then gravity with its multipliers and the terminal fall clamp.
pub fn apply_vertical(
    movement: &mut MovementState,
    jump_held: bool,
    config: &LocomotionConfig,
    dt: f32,
) {
    if !jump_held && movement.velocity.y > 0.0 {
        movement.velocity.y += config.gravity * config.jump_cut_gravity_multiplier * dt;
    }

    let multiplier = if movement.velocity.y < 0.0 {
        config.fall_gravity_multiplier
    } else if jump_held && movement.velocity.y > 0.0 {
        config.jump_hang_gravity_multiplier
    } else {
        1.0
    };
    movement.velocity.y += config.gravity * multiplier * dt;
    movement.velocity.y = movement.velocity.y.max(-config.max_fall_speed);
}

/// Run one locomotion step.
///
/// A jump releases every grip through the normal hand release and pushes the
/// body away from each surface it was holding.
pub fn integrate(
    movement: &mut MovementState,
    state: &mut PlayerState,
    hands: &mut Hands,
    ctx: &LocomotionContext,
    config: &ClimbConfig,
    sink: &mut impl AnimationSink,
) -> LocomotionReport {
    let loco = &config.locomotion;
    let mut report = LocomotionReport::default();

    apply_horizontal(movement, ctx.basis, hands.any_grabbing(), loco);
    update_jump_timers(movement, state, loco, ctx.dt);

    if can_jump(movement, hands.any_grabbing()) {
        movement.velocity.y = jump_velocity(loco.jump_force, loco.gravity);
        movement.jump_buffer_timer = 0.0;
        movement.coyote_timer = 0.0;

        report.releases = hands.release_all(ctx.body_position, config, sink);
        for release in &report.releases {
            movement.velocity += -release.reach * loco.push_off_impulse;
        }
        report.jumped = true;
        debug!(
            "jump at {:.2} m/s, released {} grip(s)",
            movement.velocity.y,
            report.releases.len()
        );
    }

    apply_vertical(movement, state.jump_held, loco, ctx.dt);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionData;
    use crate::hand::{HandAnchor, HandRuntimeState, HandSide};
    use crate::intent::InputSnapshot;
    use crate::testing::TestScene;

    const DT: f32 = 1.0 / 60.0;

    fn grounded() -> PlayerState {
        PlayerState {
            ground: Some(CollisionData::new(1.0, Vec3::Y, Vec3::ZERO, None)),
            ..default()
        }
    }

    fn ctx() -> LocomotionContext {
        LocomotionContext {
            basis: (Vec3::NEG_Z, Vec3::X),
            body_position: Vec3::new(0.0, 1.0, 0.0),
            dt: DT,
        }
    }

    fn hands(config: &ClimbConfig) -> Hands {
        let parent = Entity::from_raw(500);
        let make = |side, raw| {
            HandRuntimeState::new(
                side,
                HandAnchor::new(Entity::from_raw(raw), parent, Transform::default()),
                config.hand(side),
            )
        };
        Hands::new(make(HandSide::Left, 501), make(HandSide::Right, 502))
    }

    fn grip_left(hands: &mut Hands, config: &ClimbConfig) {
        use crate::camera::ViewRay;
        use crate::hand::{update_hands, GrabContext};

        let mut scene = TestScene::new();
        scene.add_wall(-1.0, true);
        let ctx = GrabContext {
            view: Some(ViewRay::new(Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z, Vec3::X)),
            body_position: Vec3::new(0.0, 1.0, 0.0),
            body_velocity: Vec3::ZERO,
            dt: DT,
        };
        let input = InputSnapshot::default().with_grab_press(HandSide::Left);
        update_hands(hands, &input, &ctx, config, &scene, &mut Vec::new());
        assert!(hands.left.is_grabbing());
    }

    #[test]
    fn launch_velocity_matches_formula() {
        let v = jump_velocity(10.0, -9.81);
        assert!((v - 14.007).abs() < 1e-3);
        assert_eq!(jump_velocity(10.0, 9.81), 0.0);
    }

    #[test]
    fn horizontal_is_assigned_from_basis() {
        let config = LocomotionConfig::default();
        let mut movement = MovementState {
            move_input: Vec2::new(0.0, 1.0),
            velocity: Vec3::new(9.0, -1.0, 9.0),
            ..default()
        };

        apply_horizontal(&mut movement, (Vec3::NEG_Z, Vec3::X), false, &config);
        assert!((movement.velocity - Vec3::new(0.0, -1.0, -5.0)).length() < 1e-5);

        apply_horizontal(&mut movement, (Vec3::NEG_Z, Vec3::X), true, &config);
        assert!((movement.velocity.z + 2.5).abs() < 1e-5);
    }

    #[test]
    fn buffer_is_set_on_press_and_counts_down() {
        let config = LocomotionConfig::default();
        let mut movement = MovementState::default();
        let mut state = PlayerState {
            jump_requested: true,
            ..default()
        };

        update_jump_timers(&mut movement, &mut state, &config, DT);
        assert_eq!(movement.jump_buffer_timer, config.jump_buffer_time);
        assert!(!state.jump_requested);

        update_jump_timers(&mut movement, &mut state, &config, DT);
        assert!((movement.jump_buffer_timer - (config.jump_buffer_time - DT)).abs() < 1e-6);
    }

    #[test]
    fn coyote_resets_on_ground_and_decays_in_air() {
        let config = LocomotionConfig::default();
        let mut movement = MovementState::default();

        update_jump_timers(&mut movement, &mut grounded(), &config, DT);
        assert_eq!(movement.coyote_timer, config.coyote_time);

        update_jump_timers(&mut movement, &mut PlayerState::default(), &config, DT);
        assert!((movement.coyote_timer - (config.coyote_time - DT)).abs() < 1e-6);
    }

    #[test]
    fn timers_stop_at_zero_during_long_falls() {
        let config = LocomotionConfig::default();
        let mut movement = MovementState::default();
        let mut state = PlayerState {
            jump_requested: true,
            ..default()
        };
        update_jump_timers(&mut movement, &mut state, &config, DT);

        // Ten seconds airborne.
        for _ in 0..600 {
            update_jump_timers(&mut movement, &mut state, &config, DT);
        }

        assert_eq!(movement.jump_buffer_timer, 0.0);
        assert_eq!(movement.coyote_timer, 0.0);
    }

    #[test]
    fn jump_truth_table() {
        let base = MovementState {
            jump_buffer_timer: 0.05,
            coyote_timer: 0.0,
            ..default()
        };
        assert!(!can_jump(&base, false));
        assert!(can_jump(&base, true));
        assert!(can_jump(&MovementState { coyote_timer: 0.1, ..base }, false));
        assert!(!can_jump(&MovementState { jump_buffer_timer: 0.0, ..base }, true));
    }

    #[test]
    fn grounded_press_jumps() {
        let config = ClimbConfig::default();
        let mut movement = MovementState::default();
        let mut state = PlayerState {
            jump_requested: true,
            jump_held: true,
            ..grounded()
        };
        let mut hands = hands(&config);

        let report = integrate(&mut movement, &mut state, &mut hands, &ctx(), &config, &mut Vec::new());

        assert!(report.jumped);
        let launch = jump_velocity(10.0, -9.81);
        let expected = launch + config.locomotion.gravity * config.locomotion.jump_hang_gravity_multiplier * DT;
        assert!((movement.velocity.y - expected).abs() < 1e-4);
        assert_eq!(movement.jump_buffer_timer, 0.0);
        assert_eq!(movement.coyote_timer, 0.0);
    }

    #[test]
    fn airborne_press_outside_windows_expires() {
        let config = ClimbConfig::default();
        let mut movement = MovementState::default();
        let mut state = PlayerState {
            jump_requested: true,
            ..default()
        };
        let mut hands = hands(&config);

        for _ in 0..30 {
            let report =
                integrate(&mut movement, &mut state, &mut hands, &ctx(), &config, &mut Vec::new());
            assert!(!report.jumped);
        }
        assert!(movement.jump_buffer_timer < 0.0);
    }

    #[test]
    fn buffered_press_fires_on_landing() {
        let config = ClimbConfig::default();
        let mut movement = MovementState {
            coyote_timer: -1.0,
            ..default()
        };
        let mut state = PlayerState {
            jump_requested: true,
            ..default()
        };
        let mut hands = hands(&config);

        let report = integrate(&mut movement, &mut state, &mut hands, &ctx(), &config, &mut Vec::new());
        assert!(!report.jumped);

        state.ground = grounded().ground;
        let report = integrate(&mut movement, &mut state, &mut hands, &ctx(), &config, &mut Vec::new());
        assert!(report.jumped);
    }

    #[test]
    fn grip_jump_releases_and_pushes_off() {
        let config = ClimbConfig::default().with_coyote_time(0.0);
        let mut hands = hands(&config);
        grip_left(&mut hands, &config);

        let mut movement = MovementState {
            jump_buffer_timer: 0.0,
            coyote_timer: 0.0,
            ..default()
        };
        let mut state = PlayerState {
            jump_requested: true,
            jump_held: true,
            ..default()
        };
        let mut sink = Vec::new();

        let report = integrate(&mut movement, &mut state, &mut hands, &ctx(), &config, &mut sink);

        assert!(report.jumped);
        assert_eq!(report.releases.len(), 1);
        assert_eq!(report.releases[0].side, HandSide::Left);
        assert!(!hands.left.is_grabbing());
        assert!(hands.left.anchor.is_home());
        // Pushed away from the wall (+Z) on top of grip-slowed input of zero.
        assert!((movement.velocity.z - config.locomotion.push_off_impulse).abs() < 1e-5);
        assert!(movement.velocity.y > 0.0);
    }

    #[test]
    fn holding_through_apex_does_not_retrigger() {
        let config = ClimbConfig::default();
        let mut movement = MovementState::default();
        let mut state = PlayerState {
            jump_requested: true,
            jump_held: true,
            ..grounded()
        };
        let mut hands = hands(&config);

        let report = integrate(&mut movement, &mut state, &mut hands, &ctx(), &config, &mut Vec::new());
        assert!(report.jumped);
        state.ground = None;

        let mut jumps = 0;
        for _ in 0..240 {
            if integrate(&mut movement, &mut state, &mut hands, &ctx(), &config, &mut Vec::new()).jumped {
                jumps += 1;
            }
        }
        assert_eq!(jumps, 0);
        assert!(movement.velocity.y < 0.0);
    }

    #[test]
    fn releasing_jump_cuts_ascent() {
        let config = LocomotionConfig::default();
        let start = MovementState {
            velocity: Vec3::new(0.0, 8.0, 0.0),
            ..default()
        };

        let mut held = start;
        apply_vertical(&mut held, true, &config, DT);
        let mut cut = start;
        apply_vertical(&mut cut, false, &config, DT);

        assert!(cut.velocity.y < held.velocity.y);
        let expected = 8.0 + config.gravity * config.jump_cut_gravity_multiplier * DT + config.gravity * DT;
        assert!((cut.velocity.y - expected).abs() < 1e-5);
    }

    #[test]
    fn falling_uses_fall_multiplier() {
        let config = LocomotionConfig::default();
        let mut movement = MovementState {
            velocity: Vec3::new(0.0, -1.0, 0.0),
            ..default()
        };
        apply_vertical(&mut movement, false, &config, DT);
        let expected = -1.0 + config.gravity * config.fall_gravity_multiplier * DT;
        assert!((movement.velocity.y - expected).abs() < 1e-5);
    }

    #[test]
    fn fall_speed_is_clamped() {
        let config = LocomotionConfig::default();
        let mut movement = MovementState {
            velocity: Vec3::new(0.0, -19.99, 0.0),
            ..default()
        };
        for _ in 0..10 {
            apply_vertical(&mut movement, false, &config, DT);
        }
        assert_eq!(movement.velocity.y, -config.max_fall_speed);
    }
}
