//! Physics backend abstraction.
//!
//! The simulation never talks to a physics engine directly. It asks a
//! [`PhysicsQuery`] for rays and capsule overlaps, and the engine glue lives in
//! a [`ClimbPhysicsBackend`] that installs the systems feeding the simulation.
//! This allows swapping physics engines (Rapier3D, custom, a scripted scene in
//! tests, etc.).

use bevy::prelude::*;

use crate::collision::{CollisionData, LayerMask, ProximityContact};

/// Synchronous scene queries consumed by the simulation.
///
/// Every query returns immediately. A miss is a normal negative result, not
/// an error.
pub trait PhysicsQuery {
    /// Cast a ray and return the closest hit within `max_distance`.
    ///
    /// `direction` should be normalized.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<CollisionData>;

    /// Collect every collider overlapping the capsule `a`–`b` with `radius`.
    fn overlap_capsule(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        layers: LayerMask,
    ) -> Vec<ProximityContact>;

    /// Whether `entity` is tagged as something a hand may hold.
    fn is_grabbable(&self, entity: Entity) -> bool;
}

/// Trait for physics backend implementations.
///
/// A backend installs, through its plugin, the systems that read the physics
/// world, run [`crate::player::step`] for every player with a
/// [`PhysicsQuery`] adapter, and write the resulting velocity back to the
/// rigid body. It runs them in [`crate::ClimbingControllerSet::Simulation`]
/// (fixed tick) and [`crate::ClimbingControllerSet::Probe`] (frame).
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`.
pub trait ClimbPhysicsBackend: 'static + Send + Sync {
    /// The velocity component type used by this backend.
    type VelocityComponent: Component;

    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Step length for one simulation tick.
    ///
    /// Uses the configured fixed timestep, so ticks driven by hand (as tests
    /// do) see the same `dt` as the fixed main loop.
    fn fixed_timestep(time: &Time<Fixed>) -> f32 {
        Some(time.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// Helper struct for building raycasts.
#[derive(Debug, Clone, Copy)]
pub struct RaycastRequest {
    /// Origin point of the ray.
    pub origin: Vec3,
    /// Direction of the ray (normalized).
    pub direction: Vec3,
    /// Maximum distance to cast.
    pub max_distance: f32,
    /// Layers the ray may hit.
    pub layers: LayerMask,
}

impl RaycastRequest {
    /// Create a new raycast request against every layer.
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            max_distance,
            layers: LayerMask::ALL,
        }
    }

    /// Restrict the ray to `layers`.
    pub fn on_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    /// Run the request against a query service.
    ///
    /// A zero direction never hits.
    pub fn cast(&self, physics: &impl PhysicsQuery) -> Option<CollisionData> {
        if self.direction == Vec3::ZERO {
            return None;
        }
        physics.raycast(self.origin, self.direction, self.max_distance, self.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestScene;

    #[test]
    fn raycast_request_normalizes_direction() {
        let request = RaycastRequest::new(Vec3::ZERO, Vec3::new(0.0, -5.0, 0.0), 2.0);
        assert_eq!(request.direction, Vec3::NEG_Y);
        assert_eq!(request.layers, LayerMask::ALL);
    }

    #[test]
    fn zero_direction_never_hits() {
        let mut scene = TestScene::new();
        scene.add_floor(0.0);
        let request = RaycastRequest::new(Vec3::Y, Vec3::ZERO, 10.0);
        assert!(request.cast(&scene).is_none());
    }

    #[test]
    fn raycast_request_respects_layers() {
        let mut scene = TestScene::new();
        scene.add_floor(0.0);

        let hit = RaycastRequest::new(Vec3::Y, Vec3::NEG_Y, 2.0).cast(&scene);
        assert!(hit.is_some());

        let miss = RaycastRequest::new(Vec3::Y, Vec3::NEG_Y, 2.0)
            .on_layers(LayerMask::NONE)
            .cast(&scene);
        assert!(miss.is_none());
    }

    struct Dummy;

    impl ClimbPhysicsBackend for Dummy {
        type VelocityComponent = Transform;

        fn plugin() -> impl Plugin {
            NoOpBackendPlugin
        }
    }

    #[test]
    fn fixed_timestep_follows_configured_rate() {
        let time = Time::<Fixed>::from_hz(50.0);
        assert!((Dummy::fixed_timestep(&time) - 0.02).abs() < 1e-6);
    }
}
