//! First-person look and the camera view ray.

use bevy::prelude::*;

use crate::config::LookConfig;

/// Camera origin and basis for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRay {
    pub origin: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
}

impl ViewRay {
    pub fn new(origin: Vec3, forward: Vec3, right: Vec3) -> Self {
        Self {
            origin,
            forward,
            right,
        }
    }

    /// Read a view ray off a camera's global transform.
    pub fn from_transform(transform: &GlobalTransform) -> Self {
        Self {
            origin: transform.translation(),
            forward: *transform.forward(),
            right: *transform.right(),
        }
    }

    /// Forward and right flattened onto the XZ plane.
    ///
    /// Returns `None` when either axis is vertical.
    pub fn planar_basis(&self) -> Option<(Vec3, Vec3)> {
        let forward = Vec3::new(self.forward.x, 0.0, self.forward.z).try_normalize()?;
        let right = Vec3::new(self.right.x, 0.0, self.right.z).try_normalize()?;
        Some((forward, right))
    }
}

/// Accumulated camera pitch, in degrees.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct LookState {
    pub pitch: f32,
}

/// Result of one look update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookDelta {
    /// Degrees to rotate the body about world Y.
    pub yaw: f32,
    /// New absolute camera pitch in degrees.
    pub pitch: f32,
}

impl LookDelta {
    /// Body yaw rotation for this update.
    pub fn yaw_rotation(&self) -> Quat {
        Quat::from_rotation_y(-self.yaw.to_radians())
    }

    /// Local camera rotation for the accumulated pitch.
    pub fn pitch_rotation(&self) -> Quat {
        Quat::from_rotation_x(self.pitch.to_radians())
    }
}

/// Integrate look input into body yaw and camera pitch.
///
/// Positive `look.x` turns right, positive `look.y` looks up.
pub fn integrate_look(
    state: &mut LookState,
    look: Vec2,
    config: &LookConfig,
    dt: f32,
) -> LookDelta {
    let scaled = look * config.mouse_sensitivity * dt;
    state.pitch = (state.pitch + scaled.y).clamp(-config.pitch_limit, config.pitch_limit);
    LookDelta {
        yaw: scaled.x,
        pitch: state.pitch,
    }
}
