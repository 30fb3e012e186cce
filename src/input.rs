//! Per-tick input snapshot.
//!
//! The controller never polls devices. The embedding game writes the
//! current held-state of each action into [`ControlIntent`] every frame
//! (keyboard, gamepad, touch, AI, replay, any source of booleans), and the
//! controller derives press/release edges by comparing against the previous
//! tick's state, which it latches internally after consuming the edges.

use bevy::prelude::*;

/// Desired actions for one character, written by the embedding game.
///
/// # Example
///
/// ```rust,ignore
/// // Your input system, once per frame:
/// intent.set_move_axis(axis_value);
/// intent.set_jump_held(keyboard.pressed(KeyCode::Space));
/// intent.set_attack_held(keyboard.pressed(KeyCode::KeyE));
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct ControlIntent {
    /// Horizontal movement axis (-1.0 = left, 1.0 = right).
    pub move_axis: f32,
    /// Whether the jump action is currently held.
    pub jump_held: bool,
    /// Whether the attack (grab/throw) action is currently held.
    pub attack_held: bool,
    /// Previous tick's jump state, latched by the movement system.
    pub(crate) jump_held_prev: bool,
    /// Previous tick's attack state, latched by the grab system.
    pub(crate) attack_held_prev: bool,
}

impl ControlIntent {
    /// Create a new empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the horizontal axis, clamped to [-1, 1].
    pub fn set_move_axis(&mut self, axis: f32) {
        self.move_axis = axis.clamp(-1.0, 1.0);
    }

    /// Set the jump held-state for this tick.
    pub fn set_jump_held(&mut self, held: bool) {
        self.jump_held = held;
    }

    /// Set the attack held-state for this tick.
    pub fn set_attack_held(&mut self, held: bool) {
        self.attack_held = held;
    }

    /// Jump went from released to held this tick.
    #[inline]
    pub fn jump_just_pressed(&self) -> bool {
        self.jump_held && !self.jump_held_prev
    }

    /// Attack went from released to held this tick.
    #[inline]
    pub fn attack_just_pressed(&self) -> bool {
        self.attack_held && !self.attack_held_prev
    }

    /// Attack went from held to released this tick.
    #[inline]
    pub fn attack_just_released(&self) -> bool {
        !self.attack_held && self.attack_held_prev
    }

    /// Consume the jump edge for this tick.
    pub(crate) fn latch_jump(&mut self) {
        self.jump_held_prev = self.jump_held;
    }

    /// Consume the attack edges for this tick.
    pub(crate) fn latch_attack(&mut self) {
        self.attack_held_prev = self.attack_held;
    }
}
