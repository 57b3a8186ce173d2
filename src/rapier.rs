//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::animation::HandAnimationChanged;
use crate::backend::{ClimbPhysicsBackend, PhysicsQuery};
use crate::camera::ViewRay;
use crate::collision::{CollisionData, LayerMask, ProximityContact};
use crate::config::ClimbConfig;
use crate::hand::Grabbable;
use crate::intent::ClimbIntent;
use crate::player::{ClimbingPlayer, TickContext};
use crate::spring::{apply_force, apply_impulse};
use crate::systems::run_player_tick;

/// Rapier3D physics backend for the climbing controller.
///
/// Scene queries go through [`RapierQuery`], built each tick from the
/// `RapierContext` system parameter. The controller owns gravity, so bodies
/// should carry `GravityScale(0.0)` (see [`Rapier3dCharacterBundle`]).
///
/// Hand spring forces go through `ExternalForce` and release impulses through
/// `ExternalImpulse`, so Rapier scales them by the body's real mass. Bodies
/// without those components get the equivalent velocity change using
/// `ReadMassProperties`.
pub struct Rapier3dBackend;

impl ClimbPhysicsBackend for Rapier3dBackend {
    type VelocityComponent = Velocity;

    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }
}

/// Plugin that sets up Rapier3D-specific systems for the climbing controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::ClimbingControllerSet;

        app.add_systems(
            FixedUpdate,
            rapier_climb_step.in_set(ClimbingControllerSet::Simulation),
        );
        app.add_systems(
            Update,
            rapier_proximity_probe.in_set(ClimbingControllerSet::Probe),
        );
    }
}

fn layer_filter<'a>(exclude: Entity, layers: LayerMask) -> QueryFilter<'a> {
    QueryFilter::default()
        .exclude_rigid_body(exclude)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(layers.bits()),
        ))
}

/// [`PhysicsQuery`] over a Rapier context, excluding the player's own body.
///
/// A collider matches a layer mask when its collision group memberships
/// intersect the mask.
pub struct RapierQuery<'a, 'c> {
    context: &'a RapierContext<'c>,
    exclude: Entity,
    grabbable: &'a dyn Fn(Entity) -> bool,
}

impl<'a, 'c> RapierQuery<'a, 'c> {
    pub fn new(
        context: &'a RapierContext<'c>,
        exclude: Entity,
        grabbable: &'a dyn Fn(Entity) -> bool,
    ) -> Self {
        Self {
            context,
            exclude,
            grabbable,
        }
    }
}

impl PhysicsQuery for RapierQuery<'_, '_> {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<CollisionData> {
        self.context
            .cast_ray_and_get_normal(
                origin,
                direction,
                max_distance,
                true,
                layer_filter(self.exclude, layers),
            )
            .map(|(entity, hit)| {
                CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(entity))
            })
    }

    fn overlap_capsule(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        layers: LayerMask,
    ) -> Vec<ProximityContact> {
        let center = (a + b) * 0.5;
        let shape = Collider::capsule(a - center, b - center, radius);

        let mut hits = Vec::new();
        self.context.intersections_with_shape(
            center,
            Quat::IDENTITY,
            &shape,
            layer_filter(self.exclude, layers),
            |entity| {
                hits.push(entity);
                true
            },
        );

        hits.into_iter()
            .map(|entity| {
                let only = |e: Entity| e == entity;
                let closest = self
                    .context
                    .project_point(center, true, QueryFilter::new().predicate(&only))
                    .map(|(_, projection)| projection.point)
                    .unwrap_or(center);
                ProximityContact::new(entity, closest)
            })
            .collect()
    }

    fn is_grabbable(&self, entity: Entity) -> bool {
        (self.grabbable)(entity)
    }
}

/// Run the climbing simulation for every player and write the results back.
///
/// The spring force applied last tick is subtracted from `ExternalForce`
/// before the new one is added, so forces from game code are preserved.
fn rapier_climb_step(
    rapier_context: ReadRapierContext,
    time: Res<Time<Fixed>>,
    mut q_players: Query<(
        Entity,
        &GlobalTransform,
        &ClimbConfig,
        &mut ClimbIntent,
        &mut ClimbingPlayer,
        &mut Velocity,
        Option<&mut ExternalForce>,
        Option<&mut ExternalImpulse>,
        Option<&ReadMassProperties>,
    )>,
    q_cameras: Query<&GlobalTransform, Without<ClimbingPlayer>>,
    q_grabbable: Query<(), With<Grabbable>>,
    mut anim_events: EventWriter<HandAnimationChanged>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let dt = Rapier3dBackend::fixed_timestep(&time);
    let grabbable = |entity: Entity| q_grabbable.contains(entity);

    for (
        entity,
        transform,
        config,
        mut intent,
        mut player,
        mut velocity,
        external_force,
        external_impulse,
        mass_properties,
    ) in &mut q_players
    {
        let view = player
            .camera
            .and_then(|camera| q_cameras.get(camera).ok())
            .map(ViewRay::from_transform);
        let ctx = TickContext::from_transform(transform, velocity.linvel, dt).with_view(view);
        let physics = RapierQuery::new(&context, entity, &grabbable);

        let report = run_player_tick(
            entity,
            &mut player,
            config,
            &mut intent,
            &ctx,
            &physics,
            &mut anim_events,
        );
        let mass = mass_properties.map_or(0.0, |props| props.get().mass);
        let mut linvel = report.velocity;

        match external_force {
            Some(mut external) => {
                external.force += report.force - player.applied_force;
                player.applied_force = report.force;
            }
            None => linvel = apply_force(linvel, report.force, mass, dt),
        }
        match external_impulse {
            Some(mut external) => external.impulse += report.impulse,
            None => linvel = apply_impulse(linvel, report.impulse, mass),
        }
        velocity.linvel = linvel;
    }
}

/// Refresh each player's proximity reading for hand recoil.
fn rapier_proximity_probe(
    rapier_context: ReadRapierContext,
    mut q_players: Query<(Entity, &GlobalTransform, &ClimbConfig, &mut ClimbingPlayer)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let never = |_: Entity| false;

    for (entity, transform, config, mut player) in &mut q_players {
        let Some(sensor) = player.proximity else {
            continue;
        };
        let physics = RapierQuery::new(&context, entity, &never);
        let reading = sensor.read(transform, config.sensor.ground_layer, &physics);
        if player.proximity_reading != reading {
            player.proximity_reading = reading;
        }
    }
}

/// Bundle for creating a climbing player body with Rapier3D physics.
///
/// The controller integrates gravity itself and assigns horizontal velocity
/// directly, so the body has no gravity scale, no damping and frictionless
/// contacts. Rotation is locked; look input turns the body through its
/// `Transform`. Hand springs pull through `ExternalForce` and releases kick
/// through `ExternalImpulse`, both scaled by the mass Rapier computes from the
/// collider.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use climb_controller::prelude::*;
/// use climb_controller::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands, rig: ClimbingPlayer) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 1.0, 0.0),
///         rig,
///         ClimbConfig::player(),
///         ClimbIntent::default(),
///         Rapier3dCharacterBundle::new(),
///         Collider::capsule_y(0.5, 0.3),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    pub rigid_body: RigidBody,
    /// Read and written every fixed tick by the controller.
    pub velocity: Velocity,
    /// Hand spring forces, added on top of whatever game code applies.
    pub external_force: ExternalForce,
    /// Hand release impulses.
    pub external_impulse: ExternalImpulse,
    pub locked_axes: LockedAxes,
    pub gravity_scale: GravityScale,
    pub damping: Damping,
    pub friction: Friction,
    /// Mass for the velocity fallback when force components are removed.
    pub mass_properties: ReadMassProperties,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.0,
            },
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Set the rigid body type for the character.
    ///
    /// ```ignore
    /// // Scripted movement that still reads collisions
    /// let bundle = Rapier3dCharacterBundle::new()
    ///     .with_body(RigidBody::KinematicVelocityBased);
    /// ```
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
