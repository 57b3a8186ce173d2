//! Physics query result structures.
//!
//! These hold the results of the ray and capsule queries used for contact
//! sensing, grab targeting and the proximity probe.

use bevy::prelude::*;

/// Bit mask selecting which collision layers a query considers.
///
/// Layers map one-to-one onto the physics backend's collision group bits.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl LayerMask {
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// No layer; queries with this mask never hit anything.
    pub const NONE: Self = Self(0);

    /// Mask containing only layer `index` (0..32).
    pub const fn layer(index: u32) -> Self {
        Self(1 << (index & 31))
    }

    /// Combine two masks.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether the two masks share at least one layer.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Information about a raycast hit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a hit result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

/// A collider overlapping a capsule probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityContact {
    /// The overlapping entity.
    pub entity: Entity,
    /// Point on the entity's surface closest to the probe centre.
    pub closest_point: Vec3,
}

impl ProximityContact {
    pub fn new(entity: Entity, closest_point: Vec3) -> Self {
        Self {
            entity,
            closest_point,
        }
    }
}
