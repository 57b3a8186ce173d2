//! Core controller systems.
//!
//! These systems move data between the ECS and the [`ClimbingPlayer`]
//! aggregate. They don't touch the physics engine; the backend plugin
//! supplies the systems that need scene queries and calls [`run_player_tick`]
//! from them.

use bevy::prelude::*;

use crate::animation::HandAnimationChanged;
use crate::backend::{ClimbPhysicsBackend, PhysicsQuery};
use crate::camera::integrate_look;
use crate::config::ClimbConfig;
use crate::error::RigError;
use crate::feedback::{compute_feedback, HandFeedback, HandSprite};
use crate::hand::HandSide;
use crate::intent::ClimbIntent;
use crate::player::{step, ClimbingPlayer, TickContext, TickReport};
use crate::state::{
    Airborne, Grabbing, Grounded, TouchingCeiling, TouchingWall, Unsimulated,
};

/// Run one fixed tick for a player and forward its animation requests.
///
/// Returns the velocity, force and impulse for the backend to hand to the
/// rigid body.
pub fn run_player_tick(
    entity: Entity,
    player: &mut ClimbingPlayer,
    config: &ClimbConfig,
    intent: &mut ClimbIntent,
    ctx: &TickContext,
    physics: &impl PhysicsQuery,
    events: &mut EventWriter<HandAnimationChanged>,
) -> TickReport {
    let input = intent.snapshot();
    let mut requests = Vec::new();
    let report = step(player, config, ctx, &input, physics, &mut requests);

    for (side, state) in requests {
        events.write(HandAnimationChanged {
            player: entity,
            side,
            state,
        });
    }
    report
}

/// Capture each new player's hand anchor rest poses from the scene.
///
/// An anchor returns to the parent and local `Transform` it had here. Anchors
/// that are missing or unparented stay unbound and their hand never grabs.
pub fn bind_hand_anchors(
    mut q_players: Query<(Entity, &mut ClimbingPlayer), Added<ClimbingPlayer>>,
    q_anchors: Query<(&Transform, Option<&ChildOf>)>,
) {
    for (entity, mut player) in &mut q_players {
        for side in HandSide::ALL {
            let anchor = player.hand(side).anchor;
            if anchor.is_bound() {
                continue;
            }
            let Ok((transform, child_of)) = q_anchors.get(anchor.entity) else {
                warn!("{entity}: {}", RigError::AnchorNotFound(side, anchor.entity));
                continue;
            };
            let Some(child_of) = child_of else {
                warn!("{entity}: {}", RigError::MissingAnchorParent(side));
                continue;
            };
            player.bind_hand_anchor(side, child_of.parent(), transform);
        }
    }
}

/// Tag climbing players the backend has no body to drive.
///
/// The marker comes off again once the body component is added.
pub fn flag_unsimulated_players<B: ClimbPhysicsBackend>(
    mut commands: Commands,
    q_missing: Query<
        Entity,
        (
            With<ClimbingPlayer>,
            Without<B::VelocityComponent>,
            Without<Unsimulated>,
        ),
    >,
    q_recovered: Query<Entity, (With<Unsimulated>, With<B::VelocityComponent>)>,
) {
    for entity in &q_missing {
        warn!("{}", RigError::MissingBody(entity));
        commands
            .entity(entity)
            .insert(Unsimulated)
            .remove::<(Grounded, Airborne, TouchingWall, TouchingCeiling, Grabbing)>();
    }
    for entity in &q_recovered {
        commands.entity(entity).remove::<Unsimulated>();
    }
}

/// Read each idle hand anchor's parent from the hierarchy.
///
/// Lets the trailing safety pass notice anchors that game code re-parented.
pub fn observe_anchor_parents(
    mut q_players: Query<&mut ClimbingPlayer>,
    q_parents: Query<Option<&ChildOf>>,
) {
    for mut player in &mut q_players {
        for side in HandSide::ALL {
            let hand = player.hand(side);
            if hand.is_grabbing() || !hand.anchor.is_bound() {
                continue;
            }
            let Ok(child_of) = q_parents.get(hand.anchor.entity) else {
                continue;
            };
            let parent = child_of.map(ChildOf::parent);
            if parent != hand.anchor.parent {
                player.hands.get_mut(side).observe_anchor_parent(parent);
            }
        }
    }
}

/// Mirror anchor re-parents into the hierarchy.
pub fn write_hand_anchors(mut commands: Commands, mut q_players: Query<&mut ClimbingPlayer>) {
    for mut player in &mut q_players {
        for side in HandSide::ALL {
            if !player.hand(side).anchor.needs_sync() {
                continue;
            }
            let anchor = &mut player.hands.get_mut(side).anchor;
            let transform =
                Transform::from_translation(anchor.translation).with_rotation(anchor.rotation);

            let Ok(mut entity) = commands.get_entity(anchor.entity) else {
                warn!("{side:?} hand anchor {:?} no longer exists", anchor.entity);
                anchor.mark_synced();
                continue;
            };
            match anchor.parent {
                Some(parent) => {
                    entity.insert((ChildOf(parent), transform));
                }
                None => {
                    entity.remove::<ChildOf>().insert(transform);
                }
            }
            anchor.mark_synced();
        }
    }
}

/// Sync state marker components based on the player's state.
///
/// Players tagged [`Unsimulated`] keep no markers.
pub fn sync_state_markers(
    mut commands: Commands,
    q_players: Query<
        (
            Entity,
            &ClimbingPlayer,
            Has<Grounded>,
            Has<Airborne>,
            Option<&TouchingWall>,
            Has<TouchingCeiling>,
            Has<Grabbing>,
        ),
        Without<Unsimulated>,
    >,
) {
    for (entity, player, has_grounded, has_airborne, wall, has_ceiling, has_grabbing) in
        &q_players
    {
        let state = &player.state;

        if state.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !state.is_grounded() && (has_grounded || !has_airborne) {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        match (state.wall, wall) {
            (Some(hit), current) if current.map(|w| w.normal) != Some(hit.normal) => {
                commands.entity(entity).insert(TouchingWall::new(hit.normal));
            }
            (None, Some(_)) => {
                commands.entity(entity).remove::<TouchingWall>();
            }
            _ => {}
        }

        if state.is_touching_ceiling() && !has_ceiling {
            commands.entity(entity).insert(TouchingCeiling);
        } else if !state.is_touching_ceiling() && has_ceiling {
            commands.entity(entity).remove::<TouchingCeiling>();
        }

        if player.is_grabbing() && !has_grabbing {
            commands.entity(entity).insert(Grabbing);
        } else if !player.is_grabbing() && has_grabbing {
            commands.entity(entity).remove::<Grabbing>();
        }
    }
}

/// Turn the body and pitch the camera holder from look input.
pub fn apply_look(
    time: Res<Time>,
    mut q_players: Query<(&ClimbIntent, &ClimbConfig, &mut ClimbingPlayer, &mut Transform)>,
    mut q_holders: Query<&mut Transform, Without<ClimbingPlayer>>,
) {
    let dt = time.delta_secs();
    for (intent, config, mut player, mut transform) in &mut q_players {
        if intent.look_input == Vec2::ZERO {
            continue;
        }
        let delta = integrate_look(&mut player.look, intent.look_input, &config.look, dt);
        transform.rotation = delta.yaw_rotation() * transform.rotation;

        if let Some(mut holder) = player.camera_holder.and_then(|h| q_holders.get_mut(h).ok()) {
            holder.rotation = delta.pitch_rotation();
        }
    }
}

/// Write stamina tint, shake and recoil to every hand sprite.
pub fn apply_hand_feedback(
    time: Res<Time>,
    q_players: Query<(&ClimbingPlayer, &ClimbConfig)>,
    mut q_sprites: Query<(&HandSprite, &mut HandFeedback, &mut Transform)>,
) {
    let now = time.elapsed_secs();
    for (sprite, mut feedback, mut transform) in &mut q_sprites {
        let Ok((player, config)) = q_players.get(sprite.player) else {
            continue;
        };
        let ratio = player.hand(sprite.side).stamina_ratio(config.hand(sprite.side));
        *feedback = compute_feedback(
            sprite.side,
            ratio,
            now,
            player.proximity_reading,
            &config.feedback,
        );
        transform.translation = feedback.local_translation(sprite);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerRigBuilder;
    use bevy::ecs::system::RunSystemOnce;

    fn spawn_rig(world: &mut World) -> (Entity, Entity, Entity) {
        let holder = world.spawn(Transform::default()).id();
        let left = world
            .spawn((Transform::from_xyz(-0.3, -0.2, -0.4), ChildOf(holder)))
            .id();
        let right = world
            .spawn((Transform::from_xyz(0.3, -0.2, -0.4), ChildOf(holder)))
            .id();
        let config = ClimbConfig::default();
        let player = PlayerRigBuilder::new()
            .with_hand_anchor(HandSide::Left, left)
            .with_hand_anchor(HandSide::Right, right)
            .with_camera(holder, holder)
            .build(&config)
            .unwrap();
        let entity = world
            .spawn((Transform::default(), player, config, ClimbIntent::default()))
            .id();
        world.run_system_once(bind_hand_anchors).unwrap();
        (entity, holder, left)
    }

    #[test]
    fn anchors_bind_to_their_scene_pose() {
        let mut world = World::new();
        let (player, holder, _) = spawn_rig(&mut world);

        let player = world.get::<ClimbingPlayer>(player).unwrap();
        assert!(player.anchors_bound());
        let right = player.hand(HandSide::Right).anchor;
        assert_eq!(right.parent, Some(holder));
        assert_eq!(right.home().unwrap().translation, Vec3::new(0.3, -0.2, -0.4));
        assert!(!right.needs_sync());
    }

    #[test]
    fn unparented_anchor_stays_unbound() {
        let mut world = World::new();
        let loose = world.spawn(Transform::from_xyz(1.0, 0.0, 0.0)).id();
        let holder = world.spawn(Transform::default()).id();
        let right = world.spawn((Transform::default(), ChildOf(holder))).id();
        let config = ClimbConfig::default();
        let rig = PlayerRigBuilder::new()
            .with_hand_anchor(HandSide::Left, loose)
            .with_hand_anchor(HandSide::Right, right)
            .build(&config)
            .unwrap();
        let player = world.spawn((Transform::default(), rig, config)).id();

        world.run_system_once(bind_hand_anchors).unwrap();

        let rig = world.get::<ClimbingPlayer>(player).unwrap();
        assert!(!rig.hand(HandSide::Left).anchor.is_bound());
        assert!(rig.hand(HandSide::Right).anchor.is_bound());
    }

    #[test]
    fn airborne_marker_added_for_fresh_player() {
        let mut world = World::new();
        let (player, _, _) = spawn_rig(&mut world);

        world.run_system_once(sync_state_markers).unwrap();

        assert!(world.get::<Airborne>(player).is_some());
        assert!(world.get::<Grounded>(player).is_none());
        assert!(world.get::<Grabbing>(player).is_none());
    }

    #[test]
    fn grounded_replaces_airborne() {
        use crate::collision::CollisionData;

        let mut world = World::new();
        let (player, _, _) = spawn_rig(&mut world);
        world.run_system_once(sync_state_markers).unwrap();

        world.get_mut::<ClimbingPlayer>(player).unwrap().state.ground =
            Some(CollisionData::new(1.0, Vec3::Y, Vec3::ZERO, None));
        world.run_system_once(sync_state_markers).unwrap();

        assert!(world.get::<Grounded>(player).is_some());
        assert!(world.get::<Airborne>(player).is_none());
    }

    #[test]
    fn wall_marker_tracks_normal() {
        use crate::collision::CollisionData;

        let mut world = World::new();
        let (player, _, _) = spawn_rig(&mut world);

        world.get_mut::<ClimbingPlayer>(player).unwrap().state.wall =
            Some(CollisionData::new(0.5, Vec3::Z, Vec3::ZERO, None));
        world.run_system_once(sync_state_markers).unwrap();
        assert_eq!(world.get::<TouchingWall>(player).unwrap().normal, Vec3::Z);

        world.get_mut::<ClimbingPlayer>(player).unwrap().state.wall = None;
        world.run_system_once(sync_state_markers).unwrap();
        assert!(world.get::<TouchingWall>(player).is_none());
    }

    #[test]
    fn stray_anchor_parent_is_observed() {
        let mut world = World::new();
        let (player, _, left) = spawn_rig(&mut world);
        let elsewhere = world.spawn(Transform::default()).id();
        world.entity_mut(left).insert(ChildOf(elsewhere));

        world.run_system_once(observe_anchor_parents).unwrap();

        let anchor = world.get::<ClimbingPlayer>(player).unwrap().hand(HandSide::Left).anchor;
        assert_eq!(anchor.parent, Some(elsewhere));
    }

    #[test]
    fn anchor_writes_follow_revision() {
        let mut world = World::new();
        let (player, holder, left) = spawn_rig(&mut world);
        let elsewhere = world.spawn(Transform::default()).id();
        world.entity_mut(left).insert(ChildOf(elsewhere));
        world.entity_mut(left).insert(Transform::from_xyz(5.0, 5.0, 5.0));

        // Observe the stray parent, then let a tick of the hand machine restore it.
        world.run_system_once(observe_anchor_parents).unwrap();
        {
            use crate::hand::{update_hands, GrabContext};
            use crate::intent::InputSnapshot;
            use crate::testing::TestScene;

            let config = ClimbConfig::default();
            let mut entity = world.entity_mut(player);
            let mut state = entity.get_mut::<ClimbingPlayer>().unwrap();
            let ctx = GrabContext {
                view: None,
                body_position: Vec3::ZERO,
                body_velocity: Vec3::ZERO,
                dt: 1.0 / 60.0,
            };
            update_hands(
                &mut state.hands,
                &InputSnapshot::default(),
                &ctx,
                &config,
                &TestScene::new(),
                &mut Vec::new(),
            );
        }
        world.run_system_once(write_hand_anchors).unwrap();

        assert_eq!(world.get::<ChildOf>(left).unwrap().parent(), holder);
        assert_eq!(
            world.get::<Transform>(left).unwrap().translation,
            Vec3::new(-0.3, -0.2, -0.4)
        );
        assert!(!world
            .get::<ClimbingPlayer>(player)
            .unwrap()
            .hand(HandSide::Left)
            .anchor
            .needs_sync());
    }
}
