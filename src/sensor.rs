//! Ground, wall and ceiling contact sensing.

use bevy::prelude::*;

use crate::backend::{PhysicsQuery, RaycastRequest};
use crate::config::SensorConfig;
use crate::state::PlayerState;

/// Cast the three contact rays from `origin` and store the results.
///
/// Down finds ground, `forward` finds walls, up finds ceilings. Each ray uses
/// its own configured length and the ground layer filter. Results replace the
/// previous tick's contacts entirely.
pub fn sense_contacts(
    state: &mut PlayerState,
    origin: Vec3,
    forward: Vec3,
    config: &SensorConfig,
    physics: &impl PhysicsQuery,
) {
    let cast = |direction: Vec3, distance: f32| {
        RaycastRequest::new(origin, direction, distance)
            .on_layers(config.ground_layer)
            .cast(physics)
    };

    state.ground = cast(Vec3::NEG_Y, config.ground_check_distance);
    state.wall = cast(forward, config.wall_check_distance);
    state.ceiling = cast(Vec3::Y, config.ceiling_check_distance);
}
