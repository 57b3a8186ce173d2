//! Hand grab state machine.
//!
//! Each player has two symmetric hands. A hand is `Idle`, `Trying` (grab held
//! but nothing to hold), or `Grabbing` (anchored to a grabbable object). The
//! grabbed object and the hand's spring live together in a [`Grip`], so a
//! grabbing hand always has both and an idle hand has neither.
//!
//! Per tick, [`update_hands`] runs, in order: intent edges, cooldowns, the
//! right then left hand transitions, stamina, and a trailing pass that puts
//! stray anchors back under their home parent.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::animation::{AnimationSink, HandAnimState, HandAnimator};
use crate::backend::{PhysicsQuery, RaycastRequest};
use crate::camera::ViewRay;
use crate::collision::CollisionData;
use crate::config::{ClimbConfig, GrabConfig, GrabGatePolicy, HandConfig};
use crate::intent::{GrabInput, InputSnapshot};
use crate::spring::SpringConstraint;

/// Which hand.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    /// Both sides, in update order.
    pub const ALL: [HandSide; 2] = [HandSide::Right, HandSide::Left];

    /// The opposite hand.
    pub fn other(self) -> Self {
        match self {
            HandSide::Left => HandSide::Right,
            HandSide::Right => HandSide::Left,
        }
    }
}

/// Marker for colliders a hand may hold.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grabbable;

/// Observable phase of a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPhase {
    Idle,
    Trying,
    Grabbing,
}

/// Where a hand anchor rests when not gripping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorHome {
    pub parent: Entity,
    pub translation: Vec3,
    pub rotation: Quat,
}

/// A hand anchor's place in the scene hierarchy.
///
/// While attached, `translation`/`rotation` are local to the home parent.
/// While detached (gripping), they are world space.
///
/// The home pose is captured from the anchor entity's own `Transform` and
/// parent once it exists in the world. Until then the anchor is unbound and
/// the hand cannot grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAnchor {
    /// Scene entity carrying the hand.
    pub entity: Entity,
    home: Option<AnchorHome>,
    /// Current parent; `None` while detached.
    pub parent: Option<Entity>,
    pub translation: Vec3,
    pub rotation: Quat,
    revision: u32,
    synced: u32,
}

impl HandAnchor {
    /// An anchor whose home pose has not been read yet.
    pub fn unbound(entity: Entity) -> Self {
        Self {
            entity,
            home: None,
            parent: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            revision: 0,
            synced: 0,
        }
    }

    /// An anchor already bound at `local` under `parent`.
    pub fn new(entity: Entity, parent: Entity, local: Transform) -> Self {
        let mut anchor = Self::unbound(entity);
        anchor.bind(parent, &local);
        anchor
    }

    /// Record the anchor's rest pose. The anchor is assumed to sit there now.
    pub fn bind(&mut self, parent: Entity, local: &Transform) {
        self.home = Some(AnchorHome {
            parent,
            translation: local.translation,
            rotation: local.rotation,
        });
        self.parent = Some(parent);
        self.translation = local.translation;
        self.rotation = local.rotation;
    }

    pub fn is_bound(&self) -> bool {
        self.home.is_some()
    }

    pub fn home(&self) -> Option<&AnchorHome> {
        self.home.as_ref()
    }

    /// Whether the anchor sits under its home parent. Unbound anchors have
    /// nowhere else to be.
    pub fn is_home(&self) -> bool {
        match self.home {
            Some(home) => self.parent == Some(home.parent),
            None => true,
        }
    }

    /// Incremented on every re-parent; the ECS glue syncs when it changes.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Whether the scene hierarchy lags behind the last re-parent.
    pub fn needs_sync(&self) -> bool {
        self.revision != self.synced
    }

    pub fn mark_synced(&mut self) {
        self.synced = self.revision;
    }

    /// Direction the anchor's forward axis points.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    fn detach_to(&mut self, translation: Vec3, rotation: Quat) {
        self.parent = None;
        self.translation = translation;
        self.rotation = rotation;
        self.revision = self.revision.wrapping_add(1);
    }

    fn reattach(&mut self) {
        let Some(home) = self.home else {
            return;
        };
        self.parent = Some(home.parent);
        self.translation = home.translation;
        self.rotation = home.rotation;
        self.revision = self.revision.wrapping_add(1);
    }
}

/// An active hold: the grabbed object and the spring tying the body to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grip {
    pub object: Entity,
    /// Direction the hand reaches into the surface (opposite the hit normal).
    pub reach: Vec3,
    pub spring: SpringConstraint,
}

/// A successful grab ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabTarget {
    pub object: Entity,
    pub hit: CollisionData,
}

/// Outcome of a hand letting go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandRelease {
    pub side: HandSide,
    pub object: Entity,
    /// Spring release impulse on the body.
    pub impulse: Vec3,
    /// Reach direction of the grip that ended.
    pub reach: Vec3,
}

/// Per-tick facts the hands need from the rest of the player.
#[derive(Debug, Clone, Copy)]
pub struct GrabContext {
    /// Camera view ray; grabbing finds nothing without one.
    pub view: Option<ViewRay>,
    pub body_position: Vec3,
    pub body_velocity: Vec3,
    pub dt: f32,
}

impl GrabContext {
    /// Whether the body rises faster than the grab gate's threshold.
    pub fn is_ascending(&self, grab: &GrabConfig) -> bool {
        self.body_velocity.y > grab.upward_velocity_threshold
    }
}

/// Runtime state of one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandRuntimeState {
    pub side: HandSide,
    /// Grab intent; set by a press, cleared by a release or forced release.
    pub trying: bool,
    pub stamina: f32,
    pub cooldown: f32,
    /// Object this hand most recently let go of.
    pub last_grabbed: Option<Entity>,
    pub anchor: HandAnchor,
    pub animator: HandAnimator,
    grip: Option<Grip>,
}

impl HandRuntimeState {
    /// A rested hand with full stamina.
    pub fn new(side: HandSide, anchor: HandAnchor, config: &HandConfig) -> Self {
        Self {
            side,
            trying: false,
            stamina: config.max_stamina,
            cooldown: 0.0,
            last_grabbed: None,
            anchor,
            animator: HandAnimator::default(),
            grip: None,
        }
    }

    pub fn is_grabbing(&self) -> bool {
        self.grip.is_some()
    }

    pub fn grip(&self) -> Option<&Grip> {
        self.grip.as_ref()
    }

    pub(crate) fn grip_mut(&mut self) -> Option<&mut Grip> {
        self.grip.as_mut()
    }

    pub fn grabbed_object(&self) -> Option<Entity> {
        self.grip.map(|g| g.object)
    }

    pub fn phase(&self) -> HandPhase {
        match (self.trying, self.is_grabbing()) {
            (_, true) => HandPhase::Grabbing,
            (true, false) => HandPhase::Trying,
            (false, false) => HandPhase::Idle,
        }
    }

    /// Stamina as a fraction of `max_stamina`.
    pub fn stamina_ratio(&self, config: &HandConfig) -> f32 {
        if config.max_stamina <= 0.0 {
            return 0.0;
        }
        (self.stamina / config.max_stamina).clamp(0.0, 1.0)
    }

    /// Record the anchor's parent as found in the scene.
    ///
    /// Ignored while gripping, when the anchor is owned by the grip.
    pub fn observe_anchor_parent(&mut self, parent: Option<Entity>) {
        if !self.is_grabbing() {
            self.anchor.parent = parent;
        }
    }

    /// Apply this tick's button edges.
    pub fn apply_intent(&mut self, input: GrabInput) {
        if input.pressed {
            self.trying = true;
        }
        if input.released {
            self.trying = false;
        }
    }

    /// Count the cooldown down.
    pub fn tick_cooldown(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    /// Anchor the hand on `target`.
    fn attach(
        &mut self,
        target: GrabTarget,
        grab: &GrabConfig,
        hand: &HandConfig,
        climb: &ClimbConfig,
        sink: &mut impl AnimationSink,
    ) {
        let hit = target.hit;
        let reach = -hit.normal.normalize_or_zero();
        let position = hit.point + hit.normal * grab.hand_offset;
        let mut rotation = Transform::IDENTITY
            .looking_to(reach, Vec3::Y)
            .rotation;
        if self.side == HandSide::Right {
            rotation *= Quat::from_rotation_y(PI);
        }

        self.anchor.detach_to(position, rotation);
        self.stamina -= hand.cost_stamina;
        self.grip = Some(Grip {
            object: target.object,
            reach,
            spring: SpringConstraint::new(climb.spring, position),
        });
        self.animator.set_state(self.side, HandAnimState::Grab, sink);
        debug!("{:?} hand grabbed {:?}", self.side, target.object);
    }

    /// Let go of the current grip, if any.
    ///
    /// The spring is consumed first, then the anchor returns to its home
    /// parent with its cached local pose and the cooldown restarts.
    pub fn release(
        &mut self,
        body_position: Vec3,
        hand: &HandConfig,
        sink: &mut impl AnimationSink,
    ) -> Option<HandRelease> {
        let grip = self.grip.take()?;
        let impulse = grip.spring.release(body_position, self.anchor.translation);

        self.last_grabbed = Some(grip.object);
        self.anchor.reattach();
        self.cooldown = hand.grab_cooldown;
        self.animator.set_state(self.side, HandAnimState::Idle, sink);
        debug!("{:?} hand released {:?}", self.side, grip.object);

        Some(HandRelease {
            side: self.side,
            object: grip.object,
            impulse,
            reach: grip.reach,
        })
    }

    /// Drain while gripping, regenerate at twice the rate otherwise.
    ///
    /// Running dry forces a release and drops the grab intent, so the player
    /// has to press again.
    fn update_stamina(
        &mut self,
        body_position: Vec3,
        dt: f32,
        hand: &HandConfig,
        sink: &mut impl AnimationSink,
    ) -> Option<HandRelease> {
        if self.is_grabbing() {
            self.stamina -= hand.cost_stamina * dt;
            if self.stamina <= 0.0 {
                self.stamina = 0.0;
                self.trying = false;
                info!("{:?} hand ran out of stamina", self.side);
                return self.release(body_position, hand, sink);
            }
        } else {
            self.stamina = (self.stamina + hand.cost_stamina * 2.0 * dt).min(hand.max_stamina);
        }
        None
    }

    /// Put the anchor back home if something moved it while not gripping.
    fn restore_stray_anchor(&mut self) -> bool {
        if self.is_grabbing() || self.anchor.is_home() {
            return false;
        }
        warn!(
            "{:?} hand anchor found under {:?} while idle; restoring",
            self.side, self.anchor.parent
        );
        self.anchor.reattach();
        true
    }
}

/// Both hands of a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Hands {
    pub left: HandRuntimeState,
    pub right: HandRuntimeState,
}

impl Hands {
    pub fn new(left: HandRuntimeState, right: HandRuntimeState) -> Self {
        Self { left, right }
    }

    pub fn get(&self, side: HandSide) -> &HandRuntimeState {
        match side {
            HandSide::Left => &self.left,
            HandSide::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: HandSide) -> &mut HandRuntimeState {
        match side {
            HandSide::Left => &mut self.left,
            HandSide::Right => &mut self.right,
        }
    }

    /// Whether either hand grips.
    pub fn any_grabbing(&self) -> bool {
        self.left.is_grabbing() || self.right.is_grabbing()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandRuntimeState> {
        [&self.right, &self.left].into_iter()
    }

    /// Release both hands, returning what let go.
    pub fn release_all(
        &mut self,
        body_position: Vec3,
        config: &ClimbConfig,
        sink: &mut impl AnimationSink,
    ) -> Vec<HandRelease> {
        HandSide::ALL
            .into_iter()
            .filter_map(|side| {
                self.get_mut(side)
                    .release(body_position, config.hand(side), sink)
            })
            .collect()
    }
}

/// Cast the view-centre ray and return a grabbable hit within range.
pub fn find_grab_target(
    view: Option<ViewRay>,
    grab: &GrabConfig,
    physics: &impl PhysicsQuery,
) -> Option<GrabTarget> {
    let view = view?;
    let hit = RaycastRequest::new(view.origin, view.forward, grab.grab_range)
        .on_layers(grab.grabbable_layer)
        .cast(physics)?;
    let object = hit.entity?;
    physics
        .is_grabbable(object)
        .then_some(GrabTarget { object, hit })
}

/// Whether the ascending gate lets `side` grab `target`.
pub fn gate_allows(
    policy: GrabGatePolicy,
    ascending: bool,
    other_hand_grabbing: bool,
    target: Entity,
    last_grabbed: Option<Entity>,
) -> bool {
    if !ascending {
        return true;
    }
    match policy {
        GrabGatePolicy::BlockAscendingUnlessOtherHandGrips => other_hand_grabbing,
        GrabGatePolicy::BlockAscendingSameObject => last_grabbed != Some(target),
        GrabGatePolicy::Unrestricted => true,
    }
}

fn control_hand(
    hands: &mut Hands,
    side: HandSide,
    ctx: &GrabContext,
    config: &ClimbConfig,
    physics: &impl PhysicsQuery,
    sink: &mut impl AnimationSink,
) -> Option<HandRelease> {
    let other_grabbing = hands.get(side.other()).is_grabbing();
    let hand_config = config.hand(side);
    let hand = hands.get_mut(side);

    match (hand.trying, hand.is_grabbing()) {
        (true, false) => {
            if !hand.anchor.is_bound()
                || hand.cooldown > 0.0
                || hand.stamina < hand_config.cost_stamina
            {
                return None;
            }
            match find_grab_target(ctx.view, &config.grab, physics) {
                Some(target) => {
                    if gate_allows(
                        config.grab.gate_policy,
                        ctx.is_ascending(&config.grab),
                        other_grabbing,
                        target.object,
                        hand.last_grabbed,
                    ) {
                        hand.attach(target, &config.grab, hand_config, config, sink);
                    }
                }
                None => {
                    hand.animator.set_state(side, HandAnimState::TryGrab, sink);
                }
            }
            None
        }
        (false, true) => hand.release(ctx.body_position, hand_config, sink),
        (false, false) => {
            hand.animator.set_state(side, HandAnimState::Idle, sink);
            None
        }
        (true, true) => None,
    }
}

/// Run one tick of both hand state machines.
///
/// Returns every release that happened this tick, in order.
pub fn update_hands(
    hands: &mut Hands,
    input: &InputSnapshot,
    ctx: &GrabContext,
    config: &ClimbConfig,
    physics: &impl PhysicsQuery,
    sink: &mut impl AnimationSink,
) -> Vec<HandRelease> {
    let mut releases = Vec::new();

    for side in HandSide::ALL {
        let hand = hands.get_mut(side);
        hand.apply_intent(input.grab(side));
        hand.tick_cooldown(ctx.dt);
    }

    for side in HandSide::ALL {
        releases.extend(control_hand(hands, side, ctx, config, physics, sink));
    }

    for side in HandSide::ALL {
        let released = hands.get_mut(side).update_stamina(
            ctx.body_position,
            ctx.dt,
            config.hand(side),
            sink,
        );
        releases.extend(released);
    }

    for side in HandSide::ALL {
        hands.get_mut(side).restore_stray_anchor();
    }

    releases
}
