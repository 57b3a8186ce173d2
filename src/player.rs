//! The climbing player aggregate and its fixed-tick step.
//!
//! [`ClimbingPlayer`] owns every piece of per-player simulation state. Only
//! [`step`] mutates it during simulation, handing explicit borrows to each
//! subsystem in a fixed order:
//!
//! 1. input snapshot
//! 2. hand state machines
//! 3. ground sensor
//! 4. locomotion
//! 5. hand springs and release impulses

use bevy::prelude::*;

use crate::animation::AnimationSink;
use crate::backend::PhysicsQuery;
use crate::camera::{LookState, ViewRay};
use crate::config::ClimbConfig;
use crate::error::RigError;
use crate::feedback::ProximitySensor;
use crate::hand::{
    update_hands, GrabContext, HandAnchor, HandRelease, HandRuntimeState, HandSide, Hands,
};
use crate::intent::InputSnapshot;
use crate::locomotion::{integrate, LocomotionContext};
use crate::sensor::sense_contacts;
use crate::state::{MovementState, PlayerState};

/// All simulation state for one climbing player.
#[derive(Component, Debug, Clone)]
pub struct ClimbingPlayer {
    pub state: PlayerState,
    pub movement: MovementState,
    pub hands: Hands,
    pub look: LookState,
    /// Camera whose view-centre ray aims grabs. Grabbing is disabled without one.
    pub camera: Option<Entity>,
    /// Entity pitched by look input; usually the camera's parent.
    pub camera_holder: Option<Entity>,
    pub proximity: Option<ProximitySensor>,
    /// Closest surface distance from the last proximity probe.
    pub proximity_reading: Option<f32>,
    /// Spring force handed to the physics engine last tick, so the backend
    /// can take it back out before adding the next one.
    pub applied_force: Vec3,
}

impl ClimbingPlayer {
    pub fn hand(&self, side: HandSide) -> &HandRuntimeState {
        self.hands.get(side)
    }

    pub fn is_grounded(&self) -> bool {
        self.state.is_grounded()
    }

    pub fn is_grabbing(&self) -> bool {
        self.hands.any_grabbing()
    }

    /// Capture a hand anchor's rest pose from where it sits in the scene.
    ///
    /// [`bind_hand_anchors`](crate::systems::bind_hand_anchors) calls this once
    /// the anchor entity exists.
    pub fn bind_hand_anchor(&mut self, side: HandSide, parent: Entity, local: &Transform) {
        self.hands.get_mut(side).anchor.bind(parent, local);
    }

    /// Whether both hands have captured their rest pose.
    pub fn anchors_bound(&self) -> bool {
        self.hands.iter().all(|hand| hand.anchor.is_bound())
    }
}

/// Assembles a [`ClimbingPlayer`], checking that both hands are given.
///
/// Anchor rest poses are read from the anchor entities' `Transform` and
/// `ChildOf` on the first fixed tick after spawning, so the anchors only need
/// to be spawned under their parent at their rest pose.
#[derive(Debug, Clone, Default)]
pub struct PlayerRigBuilder {
    left: Option<Entity>,
    right: Option<Entity>,
    camera: Option<Entity>,
    camera_holder: Option<Entity>,
    proximity: Option<ProximitySensor>,
}

impl PlayerRigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `entity` as a hand anchor. It returns to its current parent and
    /// local pose on release.
    pub fn with_hand_anchor(mut self, side: HandSide, entity: Entity) -> Self {
        match side {
            HandSide::Left => self.left = Some(entity),
            HandSide::Right => self.right = Some(entity),
        }
        self
    }

    /// Bind the camera. `holder` receives the pitch rotation.
    pub fn with_camera(mut self, camera: Entity, holder: Entity) -> Self {
        self.camera = Some(camera);
        self.camera_holder = Some(holder);
        self
    }

    pub fn with_proximity_sensor(mut self, sensor: ProximitySensor) -> Self {
        self.proximity = Some(sensor);
        self
    }

    pub fn build(self, config: &ClimbConfig) -> Result<ClimbingPlayer, RigError> {
        Ok(ClimbingPlayer {
            state: PlayerState::default(),
            movement: MovementState::default(),
            hands: Hands::new(
                bind_hand(HandSide::Left, self.left, config)?,
                bind_hand(HandSide::Right, self.right, config)?,
            ),
            look: LookState::default(),
            camera: self.camera,
            camera_holder: self.camera_holder,
            proximity: self.proximity,
            proximity_reading: None,
            applied_force: Vec3::ZERO,
        })
    }
}

fn bind_hand(
    side: HandSide,
    entity: Option<Entity>,
    config: &ClimbConfig,
) -> Result<HandRuntimeState, RigError> {
    let entity = entity.ok_or(RigError::MissingAnchor(side))?;
    let anchor = HandAnchor::unbound(entity);
    Ok(HandRuntimeState::new(side, anchor, config.hand(side)))
}

/// Body pose and environment for one fixed tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub position: Vec3,
    /// Body forward; the wall ray and fallback move basis use it.
    pub forward: Vec3,
    pub right: Vec3,
    /// Velocity as the physics engine left it.
    pub velocity: Vec3,
    pub view: Option<ViewRay>,
    pub dt: f32,
}

impl TickContext {
    /// Context from a body transform, facing its local -Z.
    pub fn from_transform(transform: &GlobalTransform, velocity: Vec3, dt: f32) -> Self {
        Self {
            position: transform.translation(),
            forward: *transform.forward(),
            right: *transform.right(),
            velocity,
            view: None,
            dt,
        }
    }

    pub fn with_view(mut self, view: Option<ViewRay>) -> Self {
        self.view = view;
        self
    }

    fn move_basis(&self) -> (Vec3, Vec3) {
        let flat = |v: Vec3| Vec3::new(v.x, 0.0, v.z).try_normalize();
        self.view
            .and_then(|view| view.planar_basis())
            .or_else(|| Some((flat(self.forward)?, flat(self.right)?)))
            .unwrap_or((Vec3::NEG_Z, Vec3::X))
    }
}

/// Outcome of one [`step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Velocity to hand back to the physics engine.
    pub velocity: Vec3,
    /// Summed spring force of the gripping hands, for the physics engine to
    /// integrate with the body's mass.
    pub force: Vec3,
    /// Summed release impulse of the hands that let go this tick.
    pub impulse: Vec3,
    pub jumped: bool,
    pub releases: Vec<HandRelease>,
}

/// Advance one player by one fixed tick.
pub fn step(
    player: &mut ClimbingPlayer,
    config: &ClimbConfig,
    ctx: &TickContext,
    input: &InputSnapshot,
    physics: &impl PhysicsQuery,
    sink: &mut impl AnimationSink,
) -> TickReport {
    player.movement.move_input = input.move_input;
    player.movement.velocity = ctx.velocity;
    if input.jump_pressed {
        player.state.jump_requested = true;
    }
    player.state.jump_held = input.jump_held;

    let grab_ctx = GrabContext {
        view: ctx.view,
        body_position: ctx.position,
        body_velocity: ctx.velocity,
        dt: ctx.dt,
    };
    let mut releases = update_hands(&mut player.hands, input, &grab_ctx, config, physics, sink);

    sense_contacts(&mut player.state, ctx.position, ctx.forward, &config.sensor, physics);

    let loco_ctx = LocomotionContext {
        basis: ctx.move_basis(),
        body_position: ctx.position,
        dt: ctx.dt,
    };
    let loco = integrate(
        &mut player.movement,
        &mut player.state,
        &mut player.hands,
        &loco_ctx,
        config,
        sink,
    );
    releases.extend(loco.releases);

    let velocity = player.movement.velocity;
    let mut force = Vec3::ZERO;
    for side in HandSide::ALL {
        let hand = player.hands.get_mut(side);
        let anchor = hand.anchor.translation;
        if let Some(grip) = hand.grip_mut() {
            grip.spring.set_target(anchor);
            force += grip.spring.force(ctx.position, velocity);
        }
    }
    let impulse: Vec3 = releases.iter().map(|release| release.impulse).sum();

    TickReport {
        velocity,
        force,
        impulse,
        jumped: loco.jumped,
        releases,
    }
}
