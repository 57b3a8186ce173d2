//! # `climb_controller`
//!
//! A first-person climbing character controller with physics backend abstraction.
//!
//! This crate provides a player controller that:
//! - Moves with camera-relative input, jump buffering and coyote time
//! - Cuts jumps short when the button is released and falls faster than it rises
//! - Grabs world geometry with two independent hands aimed by the view centre
//! - Tethers the body to gripping hands with damped springs
//! - Limits grips with per-hand stamina and a re-grab cooldown
//! - Tints and shakes hand sprites as stamina runs low
//! - Abstracts the physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! Each player is one [`ClimbingPlayer`](player::ClimbingPlayer) component.
//! Every fixed tick the backend runs [`player::step`], which in order:
//! 1. Captures the input edges from [`ClimbIntent`](intent::ClimbIntent)
//! 2. Updates both hand state machines (grab, release, stamina)
//! 3. Casts the ground, wall and ceiling rays
//! 4. Integrates horizontal movement, jumps and gravity
//! 5. Sums hand spring forces and release impulses for the physics engine
//!
//! Hand anchors are spawned under their rest parent at their rest pose; the
//! controller reads that pose back on the first fixed tick.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use climb_controller::prelude::*;
//!
//! let mut world = World::new();
//! let holder = world.spawn(Transform::default()).id();
//! let left = world.spawn((Transform::from_xyz(-0.3, -0.2, -0.4), ChildOf(holder))).id();
//! let right = world.spawn((Transform::from_xyz(0.3, -0.2, -0.4), ChildOf(holder))).id();
//!
//! let config = ClimbConfig::player();
//! let player = PlayerRigBuilder::new()
//!     .with_hand_anchor(HandSide::Left, left)
//!     .with_hand_anchor(HandSide::Right, right)
//!     .with_camera(holder, holder)
//!     .build(&config)
//!     .expect("both hands given");
//!
//! // Spawn alongside the backend's body components
//! world.spawn((player, config, ClimbIntent::default()));
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod camera;
pub mod collision;
pub mod config;
pub mod debug;
pub mod error;
pub mod feedback;
pub mod hand;
pub mod intent;
pub mod locomotion;
pub mod player;
pub mod sensor;
pub mod spring;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

#[cfg(test)]
mod testing;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::{AnimationSink, HandAnimState, HandAnimationChanged};
    pub use crate::backend::{ClimbPhysicsBackend, PhysicsQuery};
    pub use crate::collision::LayerMask;
    pub use crate::config::{ClimbConfig, GrabGatePolicy};
    pub use crate::debug::ClimbDebugGizmos;
    pub use crate::error::RigError;
    pub use crate::feedback::{HandFeedback, HandSprite, ProximitySensor};
    pub use crate::hand::{Grabbable, HandPhase, HandSide};
    pub use crate::intent::ClimbIntent;
    pub use crate::player::{ClimbingPlayer, PlayerRigBuilder};
    pub use crate::state::{
        Airborne, Grabbing, Grounded, TouchingCeiling, TouchingWall, Unsimulated,
    };
    pub use crate::{ClimbingControllerPlugin, ClimbingControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for the controller, in execution order within their schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClimbingControllerSet {
    /// FixedUpdate: bind new players and read hierarchy changes made by game code.
    Preparation,
    /// FixedUpdate: the per-player simulation step (backend).
    Simulation,
    /// FixedUpdate: mirror results into the hierarchy and marker components.
    Sync,
    /// Update: per-frame scene probes (backend).
    Probe,
    /// Update: look and hand feedback.
    Presentation,
}

/// Main plugin for the climbing controller.
///
/// This plugin is generic over a physics backend `B` which provides the
/// scene queries and owns the rigid body velocity.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use climb_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(ClimbingControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct ClimbingControllerPlugin<B: backend::ClimbPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::ClimbPhysicsBackend> Default for ClimbingControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::ClimbPhysicsBackend> Plugin for ClimbingControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<config::ClimbConfig>();
        app.register_type::<config::GrabGatePolicy>();
        app.register_type::<intent::ClimbIntent>();
        app.register_type::<hand::Grabbable>();
        app.register_type::<hand::HandSide>();
        app.register_type::<animation::HandAnimState>();
        app.register_type::<feedback::HandSprite>();
        app.register_type::<feedback::HandFeedback>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<state::TouchingCeiling>();
        app.register_type::<state::Grabbing>();
        app.register_type::<state::Unsimulated>();

        app.add_event::<animation::HandAnimationChanged>();

        app.configure_sets(
            FixedUpdate,
            (
                ClimbingControllerSet::Preparation,
                ClimbingControllerSet::Simulation,
                ClimbingControllerSet::Sync,
            )
                .chain(),
        );
        app.configure_sets(
            Update,
            (
                ClimbingControllerSet::Probe,
                ClimbingControllerSet::Presentation,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::flag_unsimulated_players::<B>,
                systems::bind_hand_anchors,
                systems::observe_anchor_parents,
            )
                .chain()
                .in_set(ClimbingControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            (systems::write_hand_anchors, systems::sync_state_markers)
                .chain()
                .in_set(ClimbingControllerSet::Sync),
        );
        app.add_systems(
            Update,
            (systems::apply_look, systems::apply_hand_feedback)
                .chain()
                .in_set(ClimbingControllerSet::Presentation),
        );
    }
}
