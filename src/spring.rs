//! Spring tether between a gripping hand and the body.

use bevy::prelude::*;

use crate::config::SpringConfig;

/// Spring from the body centre to a hand anchor.
///
/// Slack up to `max_distance`; beyond that it pulls the body back toward the
/// anchor with a damped linear force. Created when a hand attaches and consumed
/// by [`SpringConstraint::release`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConstraint {
    pub config: SpringConfig,
    /// Anchor position in world space.
    pub target: Vec3,
}

impl SpringConstraint {
    pub fn new(config: SpringConfig, target: Vec3) -> Self {
        Self { config, target }
    }

    /// Track the anchor.
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Force on the body this tick.
    pub fn force(&self, body_position: Vec3, body_velocity: Vec3) -> Vec3 {
        let offset = self.target - body_position;
        let distance = offset.length();
        let stretch = distance - self.config.max_distance;
        if stretch <= 0.0 || distance <= f32::EPSILON {
            return Vec3::ZERO;
        }
        let dir = offset / distance;
        let closing_speed = body_velocity.dot(dir);
        dir * (self.config.stiffness * stretch - self.config.damping * closing_speed)
    }

    /// Destroy the spring, returning the release impulse on the body.
    ///
    /// The impulse points from the body toward `anchor` and is zero when the
    /// two coincide.
    pub fn release(self, body_position: Vec3, anchor: Vec3) -> Vec3 {
        (anchor - body_position).normalize_or_zero() * self.config.release_impulse_force
    }
}

/// Apply a force over `dt` and return the new velocity.
///
/// For backends that only expose velocity; `mass` comes from the physics
/// engine. A non-positive mass leaves the velocity unchanged.
pub fn apply_force(velocity: Vec3, force: Vec3, mass: f32, dt: f32) -> Vec3 {
    if mass <= 0.0 {
        return velocity;
    }
    velocity + force / mass * dt
}

/// Apply an instantaneous impulse and return the new velocity.
pub fn apply_impulse(velocity: Vec3, impulse: Vec3, mass: f32) -> Vec3 {
    if mass <= 0.0 {
        return velocity;
    }
    velocity + impulse / mass
}
