//! Input intent components.
//!
//! The application writes plain levels into [`ClimbIntent`] every frame from
//! whatever input source it uses. At the start of each simulation tick the
//! controller turns those levels into an [`InputSnapshot`] with edges, and the
//! simulation reads only that snapshot.

use bevy::prelude::*;

use crate::hand::HandSide;

/// Player intent written by the input layer.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use climb_controller::prelude::*;
///
/// let mut intent = ClimbIntent::new();
/// intent.set_move(Vec2::new(0.0, 1.0));
/// intent.set_jump_pressed(true);
/// intent.set_grab(HandSide::Left, true);
///
/// let snapshot = intent.snapshot();
/// assert!(snapshot.jump_pressed);
/// assert!(snapshot.grab(HandSide::Left).pressed);
///
/// // Holding produces no new edge.
/// let snapshot = intent.snapshot();
/// assert!(!snapshot.jump_pressed);
/// assert!(snapshot.jump_held);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ClimbIntent {
    /// Planar movement input (x = strafe, y = forward), length at most 1.
    pub move_input: Vec2,
    /// Look delta for this frame (x = yaw, y = pitch).
    pub look_input: Vec2,
    /// Whether the jump button is down.
    pub jump_pressed: bool,
    /// Whether the left grab button is down.
    pub grab_left: bool,
    /// Whether the right grab button is down.
    pub grab_right: bool,
    pub(crate) jump_pressed_prev: bool,
    pub(crate) grab_left_prev: bool,
    pub(crate) grab_right_prev: bool,
}

impl ClimbIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement input. Longer vectors are clamped to unit length.
    pub fn set_move(&mut self, input: Vec2) {
        self.move_input = input.clamp_length_max(1.0);
    }

    /// Set the look delta for this frame.
    pub fn set_look(&mut self, input: Vec2) {
        self.look_input = input;
    }

    /// Set the jump button level.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Set a grab button level.
    pub fn set_grab(&mut self, side: HandSide, pressed: bool) {
        match side {
            HandSide::Left => self.grab_left = pressed,
            HandSide::Right => self.grab_right = pressed,
        }
    }

    /// Current grab button level.
    pub fn is_grab_pressed(&self, side: HandSide) -> bool {
        match side {
            HandSide::Left => self.grab_left,
            HandSide::Right => self.grab_right,
        }
    }

    /// Release every button and zero the axes.
    pub fn clear(&mut self) {
        self.move_input = Vec2::ZERO;
        self.look_input = Vec2::ZERO;
        self.jump_pressed = false;
        self.grab_left = false;
        self.grab_right = false;
    }

    /// Capture this tick's input, consuming edges.
    ///
    /// Edges are reported once: calling this again without a level change
    /// yields no new press or release.
    pub fn snapshot(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            move_input: self.move_input,
            jump_pressed: self.jump_pressed && !self.jump_pressed_prev,
            jump_held: self.jump_pressed,
            grab_left: GrabInput::from_levels(self.grab_left_prev, self.grab_left),
            grab_right: GrabInput::from_levels(self.grab_right_prev, self.grab_right),
        };
        self.jump_pressed_prev = self.jump_pressed;
        self.grab_left_prev = self.grab_left;
        self.grab_right_prev = self.grab_right;
        snapshot
    }
}

/// Grab button edges for one hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrabInput {
    pub pressed: bool,
    pub released: bool,
}

impl GrabInput {
    fn from_levels(previous: bool, current: bool) -> Self {
        Self {
            pressed: current && !previous,
            released: previous && !current,
        }
    }
}

/// Input for a single simulation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub move_input: Vec2,
    /// Rising edge of the jump button.
    pub jump_pressed: bool,
    /// Jump button level.
    pub jump_held: bool,
    pub grab_left: GrabInput,
    pub grab_right: GrabInput,
}

impl InputSnapshot {
    /// Grab edges for one hand.
    pub fn grab(&self, side: HandSide) -> GrabInput {
        match side {
            HandSide::Left => self.grab_left,
            HandSide::Right => self.grab_right,
        }
    }

    /// Builder: set movement input.
    pub fn with_move(mut self, input: Vec2) -> Self {
        self.move_input = input;
        self
    }

    /// Builder: press jump this tick (edge and level).
    pub fn with_jump_press(mut self) -> Self {
        self.jump_pressed = true;
        self.jump_held = true;
        self
    }

    /// Builder: jump button held without a new edge.
    pub fn with_jump_held(mut self) -> Self {
        self.jump_held = true;
        self
    }

    /// Builder: press a grab button this tick.
    pub fn with_grab_press(mut self, side: HandSide) -> Self {
        self.grab_mut(side).pressed = true;
        self
    }

    /// Builder: release a grab button this tick.
    pub fn with_grab_release(mut self, side: HandSide) -> Self {
        self.grab_mut(side).released = true;
        self
    }

    fn grab_mut(&mut self, side: HandSide) -> &mut GrabInput {
        match side {
            HandSide::Left => &mut self.grab_left,
            HandSide::Right => &mut self.grab_right,
        }
    }
}
