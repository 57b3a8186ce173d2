//! Hand visual feedback: stamina tint, fatigue shake and proximity recoil.
//!
//! Everything here is presentation. The functions are pure in stamina, time
//! and the latest proximity reading; the ECS glue writes the result to the
//! hand sprite entities each frame.

use bevy::color::Mix;
use bevy::prelude::*;

use crate::backend::PhysicsQuery;
use crate::collision::LayerMask;
use crate::config::FeedbackConfig;
use crate::hand::HandSide;

/// Sprite entity showing one hand.
///
/// The local translation at bind time is the rest position every offset is
/// applied to.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
#[require(HandFeedback)]
pub struct HandSprite {
    /// Player whose hand this sprite shows.
    pub player: Entity,
    pub side: HandSide,
    pub original_local: Vec3,
}

impl HandSprite {
    /// Bind a sprite at its current local translation.
    pub fn bind(player: Entity, side: HandSide, transform: &Transform) -> Self {
        Self {
            player,
            side,
            original_local: transform.translation,
        }
    }
}

/// Latest presentation output for a hand sprite.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct HandFeedback {
    pub color: LinearRgba,
    /// Shake plus recoil, added to the sprite's rest position.
    pub offset: Vec3,
}

impl Default for HandFeedback {
    fn default() -> Self {
        Self {
            color: LinearRgba::WHITE,
            offset: Vec3::ZERO,
        }
    }
}

impl HandFeedback {
    pub fn local_translation(&self, sprite: &HandSprite) -> Vec3 {
        sprite.original_local + self.offset
    }
}

/// Capsule probe measuring how close the hands are to geometry.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ProximitySensor {
    /// Capsule centre relative to the body origin, in body space.
    pub offset: Vec3,
    /// Capsule axis in body space.
    pub up: Vec3,
    /// Total capsule height, end caps included.
    pub height: f32,
    pub radius: f32,
    /// Collider of the sensor itself; ignored by the probe.
    pub entity: Option<Entity>,
}

impl Default for ProximitySensor {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 0.6, -0.4),
            up: Vec3::Y,
            height: 0.8,
            radius: 0.25,
            entity: None,
        }
    }
}

impl ProximitySensor {
    /// Capsule segment endpoints in world space.
    pub fn segment(&self, body: &GlobalTransform) -> (Vec3, Vec3) {
        let center = body.transform_point(self.offset);
        let axis = body.affine().transform_vector3(self.up).normalize_or_zero();
        let half = (self.height * 0.5 - self.radius).max(0.0);
        (center + axis * half, center - axis * half)
    }

    /// Distance from the capsule centre to the closest overlapping surface.
    pub fn read(
        &self,
        body: &GlobalTransform,
        layers: LayerMask,
        physics: &impl PhysicsQuery,
    ) -> Option<f32> {
        let (a, b) = self.segment(body);
        let center = (a + b) * 0.5;
        physics
            .overlap_capsule(a, b, self.radius, layers)
            .into_iter()
            .filter(|contact| Some(contact.entity) != self.entity)
            .map(|contact| contact.closest_point.distance(center))
            .min_by(f32::total_cmp)
    }
}

fn hash_i(i: i32, seed: u32) -> f32 {
    // splitmix64 finalizer → [0,1)
    let mut x = (i as u32 as u64) ^ (seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    (x >> 40) as f32 / (1u64 << 24) as f32
}

/// 1D value noise in `[0, 1)`.
fn value_noise(t: f32, seed: u32) -> f32 {
    let i = t.floor() as i32;
    let f = t - i as f32;
    // quintic smoothstep
    let s = f * f * f * (f * (f * 6.0 - 15.0) + 10.0);
    let a = hash_i(i, seed);
    let b = hash_i(i + 1, seed);
    a * (1.0 - s) + b * s
}

/// Tint from low to full stamina colour.
pub fn stamina_color(ratio: f32, config: &FeedbackConfig) -> LinearRgba {
    config
        .low_stamina_color
        .mix(&config.full_stamina_color, ratio.clamp(0.0, 1.0))
}

/// Fatigue shake in the sprite's local XY plane.
///
/// Zero at full stamina; each axis stays within `max_shake_intensity` at zero.
pub fn shake_offset(ratio: f32, time: f32, seed: u32, config: &FeedbackConfig) -> Vec2 {
    let amplitude = config.max_shake_intensity * (1.0 - ratio.clamp(0.0, 1.0)) * 2.0;
    if amplitude == 0.0 {
        return Vec2::ZERO;
    }
    let t = time * config.shake_speed;
    Vec2::new(
        value_noise(t, seed) - 0.5,
        value_noise(t, seed.wrapping_add(0x5bd1)) - 0.5,
    ) * amplitude
}

/// Push-back offset for a surface `closest` units away.
pub fn recoil_offset(closest: Option<f32>, config: &FeedbackConfig) -> Vec3 {
    let Some(closest) = closest else {
        return Vec3::ZERO;
    };
    let near = config.recoil_near_distance;
    let far = config.recoil_far_distance;
    let t = if far > near {
        ((closest - near) / (far - near)).clamp(0.0, 1.0)
    } else if closest <= near {
        0.0
    } else {
        1.0
    };
    config.recoil_direction * (1.0 - t)
}

/// Full feedback for one hand.
pub fn compute_feedback(
    side: HandSide,
    stamina_ratio: f32,
    time: f32,
    proximity: Option<f32>,
    config: &FeedbackConfig,
) -> HandFeedback {
    let seed = match side {
        HandSide::Left => 11,
        HandSide::Right => 23,
    };
    let shake = shake_offset(stamina_ratio, time, seed, config);
    HandFeedback {
        color: stamina_color(stamina_ratio, config),
        offset: shake.extend(0.0) + recoil_offset(proximity, config),
    }
}
