//! Per-player simulation state and state marker components.
//!
//! [`PlayerState`] and [`MovementState`] are plain data owned by the player
//! aggregate. The marker components mirror them into the ECS after every
//! tick so game code can filter queries on them.

use bevy::prelude::*;

use crate::collision::CollisionData;

/// Contact facts and jump input for one player.
///
/// The contact fields are written only by the ground sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerState {
    /// Ground hit under the body, if within range.
    pub ground: Option<CollisionData>,
    /// Wall hit in front of the body, if within range.
    pub wall: Option<CollisionData>,
    /// Ceiling hit above the body, if within range.
    pub ceiling: Option<CollisionData>,
    /// Jump press waiting to be buffered. Consumed once.
    pub jump_requested: bool,
    /// Jump button level.
    pub jump_held: bool,
}

impl PlayerState {
    pub fn is_grounded(&self) -> bool {
        self.ground.is_some()
    }

    pub fn is_touching_wall(&self) -> bool {
        self.wall.is_some()
    }

    pub fn is_touching_ceiling(&self) -> bool {
        self.ceiling.is_some()
    }

    /// Take the pending jump request, clearing it.
    pub fn take_jump_request(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }
}

/// Velocity and jump timers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementState {
    pub velocity: Vec3,
    pub move_input: Vec2,
    /// Remaining coyote window. Counts down while airborne.
    pub coyote_timer: f32,
    /// Remaining jump buffer. Counts down until a jump consumes it.
    pub jump_buffer_timer: f32,
}

/// Marker component indicating the player is grounded.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the player is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the player is facing a wall within range.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TouchingWall {
    /// Normal of the wall surface.
    pub normal: Vec3,
}

impl Default for TouchingWall {
    fn default() -> Self {
        Self { normal: Vec3::Z }
    }
}

impl TouchingWall {
    pub fn new(normal: Vec3) -> Self {
        Self { normal }
    }
}

/// Marker component indicating a ceiling is within range above the player.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct TouchingCeiling;

/// Marker component present while at least one hand grips.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grabbing;

/// Marker added to a climbing player the physics backend cannot drive.
///
/// Such players are skipped by the simulation and keep no state markers.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Unsimulated;
