//! Optional gizmo overlay: grab ray, spring tethers and the proximity capsule.
//!
//! Needs Bevy's gizmo support (part of `DefaultPlugins`).

use bevy::color::palettes::css::{DEEP_SKY_BLUE, LIME, ORANGE_RED, YELLOW};
use bevy::prelude::*;

use crate::camera::ViewRay;
use crate::config::ClimbConfig;
use crate::player::ClimbingPlayer;
use crate::ClimbingControllerSet;

/// Draws the controller's queries every frame.
pub struct ClimbDebugGizmos;

impl Plugin for ClimbDebugGizmos {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            draw_climb_gizmos.after(ClimbingControllerSet::Presentation),
        );
    }
}

fn draw_climb_gizmos(
    mut gizmos: Gizmos,
    q_players: Query<(&GlobalTransform, &ClimbConfig, &ClimbingPlayer)>,
    q_cameras: Query<&GlobalTransform>,
) {
    for (transform, config, player) in &q_players {
        let view = player
            .camera
            .and_then(|camera| q_cameras.get(camera).ok())
            .map(ViewRay::from_transform);
        if let Some(view) = view {
            let color = if player.is_grabbing() { LIME } else { YELLOW };
            gizmos.line(
                view.origin,
                view.origin + view.forward * config.grab.grab_range,
                color,
            );
        }

        for hand in player.hands.iter().filter(|hand| hand.is_grabbing()) {
            gizmos.line(transform.translation(), hand.anchor.translation, LIME);
            gizmos.sphere(
                Isometry3d::from_translation(hand.anchor.translation),
                config.spring.max_distance,
                LIME.with_alpha(0.3),
            );
        }

        if let Some(sensor) = player.proximity {
            let (a, b) = sensor.segment(transform);
            let color = if player.proximity_reading.is_some() {
                ORANGE_RED
            } else {
                DEEP_SKY_BLUE
            };
            gizmos.sphere(Isometry3d::from_translation(a), sensor.radius, color);
            gizmos.sphere(Isometry3d::from_translation(b), sensor.radius, color);
            gizmos.line(a, b, color);
        }
    }
}
