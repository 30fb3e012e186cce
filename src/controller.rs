//! Character movement: state hub and tick systems.
//!
//! [`CharacterController`] is the central hub for one character's kinematic
//! state. Other components never reach into it directly; cross-component
//! reads go through the narrow accessors ([`is_grounded`], [`facing_sign`],
//! …), and only the systems in this module mutate it.
//!
//! The movement runs in two phases:
//!
//! - [`update_character_input`] (variable rate, once per rendered frame):
//!   scale-cache refresh, input sampling, coyote/buffer timers, jump
//!   execution.
//! - [`fixed_character_tick`] (fixed rate): horizontal drive, facing,
//!   ceiling correction, layered gravity, fall clamp. It consumes the
//!   ground/ceiling contact recorded by the backend's sensor systems
//!   earlier in the same fixed tick.
//!
//! [`is_grounded`]: CharacterController::is_grounded
//! [`facing_sign`]: CharacterController::facing_sign

use bevy::log::warn;
use bevy::prelude::*;

use crate::backend::PhysicsBackend;
use crate::config::CharacterConfig;
use crate::events::{publish_event, JumpExecuted, Landed};
use crate::grab::Grabber;
use crate::input::ControlIntent;

/// Cast distance of the ground probe, scaled by the character's scale.
pub const SKIN_WIDTH: f32 = 0.02;

/// Cast distance of the ceiling probe, scaled by the character's scale.
pub const CEILING_CHECK_DISTANCE: f32 = 0.1;

/// Small downward velocity pinned while grounded, keeping the character
/// pressed onto the ground for stable sensing.
pub const GROUND_STICK_VELOCITY: f32 = -0.1;

/// Phase of the jump arc, derived from the current state each tick.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPhase {
    /// Standing on the ground.
    Grounded,
    /// Moving upward through a jump.
    Rising,
    /// Near the apex, inside the hang band.
    Hanging,
    /// Moving downward.
    Falling,
}

/// Kinematic state for one character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CharacterController {
    /// Ground contact recorded by the backend this fixed tick.
    pub(crate) grounded: bool,
    /// Ground contact of the previous fixed tick, for the landing edge.
    pub(crate) was_grounded: bool,
    /// Ceiling contact recorded by the backend this fixed tick.
    pub(crate) hit_ceiling: bool,
    /// True from a jump impulse until it is cancelled by a ceiling hit,
    /// landing, or the velocity flipping sign at the apex.
    pub(crate) is_jumping: bool,
    /// True while airborne with downward velocity.
    pub(crate) is_falling: bool,
    /// Remaining coyote window; refilled while grounded.
    pub(crate) coyote_timer: f32,
    /// Remaining jump buffer; refilled on a jump press. Allowed to decay
    /// below zero between presses, only the `> 0` comparison matters.
    pub(crate) jump_buffer_timer: f32,
    /// Last non-zero horizontal input, sticky across idle ticks.
    pub(crate) last_move_x: f32,
    /// Unscaled collider half extents, fixed at construction.
    collider_half_extents: Vec2,
    /// Scale the cached extents were computed for.
    cached_scale: Vec2,
    /// Collider half extents scaled by the transform scale.
    scaled_half_extents: Vec2,
    /// Half extents of the ground/ceiling probe box.
    probe_half_extents: Vec2,
    /// One-shot latch for the missing-config warning.
    pub(crate) missing_config_warned: bool,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self::new(Vec2::splat(0.5))
    }
}

impl CharacterController {
    /// Create a controller for a character whose collider spans
    /// `collider_half_extents` at scale 1.
    pub fn new(collider_half_extents: Vec2) -> Self {
        Self {
            grounded: false,
            was_grounded: false,
            hit_ceiling: false,
            is_jumping: false,
            is_falling: false,
            coyote_timer: 0.0,
            jump_buffer_timer: 0.0,
            last_move_x: 0.0,
            collider_half_extents,
            // Zero forces the first refresh to recompute.
            cached_scale: Vec2::ZERO,
            scaled_half_extents: Vec2::ZERO,
            probe_half_extents: Vec2::ZERO,
            missing_config_warned: false,
        }
    }

    /// Whether the ground probe hit this fixed tick.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Whether the ceiling probe hit this fixed tick.
    #[inline]
    pub fn hit_ceiling(&self) -> bool {
        self.hit_ceiling
    }

    /// Whether the current jump's impulse is still in effect.
    #[inline]
    pub fn is_jumping(&self) -> bool {
        self.is_jumping
    }

    /// Whether the character is airborne and moving downward.
    #[inline]
    pub fn is_falling(&self) -> bool {
        self.is_falling
    }

    /// Remaining coyote window, in seconds.
    #[inline]
    pub fn coyote_remaining(&self) -> f32 {
        self.coyote_timer.max(0.0)
    }

    /// Remaining jump buffer, in seconds.
    #[inline]
    pub fn jump_buffer_remaining(&self) -> f32 {
        self.jump_buffer_timer.max(0.0)
    }

    /// Facing from the last non-zero horizontal input: -1.0 or 1.0.
    ///
    /// Defaults to 1.0 before any horizontal input.
    #[inline]
    pub fn facing_sign(&self) -> f32 {
        if self.last_move_x < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    /// Derive the jump phase from this tick's state and vertical velocity.
    pub fn jump_phase(&self, velocity_y: f32, config: &CharacterConfig) -> JumpPhase {
        if self.grounded {
            JumpPhase::Grounded
        } else if self.is_jumping && velocity_y.abs() < config.jump_hang_threshold {
            JumpPhase::Hanging
        } else if velocity_y > 0.0 {
            JumpPhase::Rising
        } else {
            JumpPhase::Falling
        }
    }

    /// Record this fixed tick's ground probe result.
    ///
    /// Called by backend sensor systems before the movement tick.
    pub fn set_ground_contact(&mut self, grounded: bool) {
        self.grounded = grounded;
    }

    /// Record this fixed tick's ceiling probe result.
    pub fn set_ceiling_contact(&mut self, hit: bool) {
        self.hit_ceiling = hit;
    }

    /// Collider half extents scaled by the current transform scale.
    #[inline]
    pub fn scaled_half_extents(&self) -> Vec2 {
        self.scaled_half_extents
    }

    /// Half extents of the ground/ceiling probe box.
    ///
    /// Slightly narrower than the collider so the probe doesn't catch
    /// walls the character is flush against.
    #[inline]
    pub fn probe_half_extents(&self) -> Vec2 {
        self.probe_half_extents
    }

    /// Cast distance of the downward ground probe.
    #[inline]
    pub fn ground_probe_distance(&self) -> f32 {
        SKIN_WIDTH * self.cached_scale.y.abs()
    }

    /// Cast distance of the upward ceiling probe.
    #[inline]
    pub fn ceiling_probe_distance(&self) -> f32 {
        CEILING_CHECK_DISTANCE * self.cached_scale.y.abs()
    }

    /// Recompute the cached scaled extents iff `scale` changed.
    pub(crate) fn refresh_scale_cache(&mut self, scale: Vec2, ground_check_distance: f32) {
        if scale == self.cached_scale {
            return;
        }
        self.cached_scale = scale;
        self.scaled_half_extents = self.collider_half_extents * scale.abs();
        self.probe_half_extents = Vec2::new(
            self.scaled_half_extents.x * 0.95,
            ground_check_distance * scale.y.abs() * 0.5,
        );
    }
}

/// Variable-rate movement phase: timers, input sampling, jump execution.
///
/// Jump execution is the only path that starts a jump: it fires when the
/// buffer is live, the character is grounded or inside the coyote window,
/// and no jump is already in effect, at most once per buffered press.
pub fn update_character_input<B: PhysicsBackend>(world: &mut World) {
    let dt = world.resource::<Time>().delta_secs();

    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<CharacterController>>()
        .iter(world)
        .collect();

    for entity in entities {
        let Some(intent) = world.get::<ControlIntent>(entity).copied() else {
            continue;
        };
        let scale = world
            .get::<Transform>(entity)
            .map_or(Vec2::ONE, |t| t.scale.truncate());
        let config = world.get::<CharacterConfig>(entity).copied();

        let Some(config) = config else {
            // TransientDegradation: skip motion for this tick, warn once.
            if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
                if !controller.missing_config_warned {
                    controller.missing_config_warned = true;
                    warn!("character {entity} has no CharacterConfig, motion disabled");
                }
            }
            if let Some(mut intent) = world.get_mut::<ControlIntent>(entity) {
                intent.latch_jump();
            }
            continue;
        };

        let mut jump_velocity = None;
        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.missing_config_warned = false;
            controller.refresh_scale_cache(scale, config.ground_check_distance);

            if intent.move_axis != 0.0 {
                controller.last_move_x = intent.move_axis;
            }

            controller.jump_buffer_timer = if intent.jump_just_pressed() {
                config.jump_buffer_time
            } else {
                controller.jump_buffer_timer - dt
            };
            controller.coyote_timer = if controller.grounded {
                config.coyote_time
            } else {
                controller.coyote_timer - dt
            };

            let can_jump = (controller.grounded || controller.coyote_timer > 0.0)
                && !controller.is_jumping;
            if controller.jump_buffer_timer > 0.0 && can_jump {
                controller.is_jumping = true;
                controller.is_falling = false;
                controller.coyote_timer = 0.0;
                controller.jump_buffer_timer = 0.0;
                jump_velocity = Some(config.initial_jump_velocity());
            }
        }

        if let Some(takeoff) = jump_velocity {
            let velocity = B::get_velocity(world, entity);
            B::set_velocity(world, entity, Vec2::new(velocity.x, takeoff));
            publish_event(world, JumpExecuted { entity });
        }

        if let Some(mut intent) = world.get_mut::<ControlIntent>(entity) {
            intent.latch_jump();
        }
    }
}

/// Fixed-rate movement phase.
///
/// Runs after the backend's sensor systems so the grounded/ceiling state
/// reflects this step's geometry before gravity decides whether to zero or
/// apply it. Order within the tick: landing edge, horizontal drive, facing,
/// ceiling correction, gravity, fall clamp.
pub fn fixed_character_tick<B: PhysicsBackend>(world: &mut World) {
    let fdt = B::get_fixed_timestep(world);

    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<CharacterController>>()
        .iter(world)
        .collect();

    for entity in entities {
        let Some(config) = world.get::<CharacterConfig>(entity).copied() else {
            continue;
        };
        let Some(intent) = world.get::<ControlIntent>(entity).copied() else {
            continue;
        };
        let Some(state) = world.get::<CharacterController>(entity).cloned() else {
            continue;
        };
        let holding = world.get::<Grabber>(entity).is_some_and(Grabber::is_holding);

        if state.grounded && !state.was_grounded {
            publish_event(world, Landed { entity });
        }
        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.was_grounded = state.grounded;
        }

        // Horizontal drive: concave response that accelerates gently far
        // from the target speed and corrects sharply near it.
        let velocity = B::get_velocity(world, entity);
        let speed_cap = config.move_speed
            * if holding {
                config.holding_speed_multiplier
            } else {
                1.0
            };
        let target_speed = intent.move_axis * speed_cap;
        let speed_diff = target_speed - velocity.x;
        let mut rate = if target_speed.abs() > 0.01 {
            config.acceleration
        } else {
            config.deceleration
        };
        if !state.grounded {
            rate *= config.air_control;
        }
        let drive = (speed_diff.abs() * rate).powf(config.acceleration_curve) * speed_diff.signum();
        B::apply_force(world, entity, Vec2::X * drive);

        // Facing is cosmetic: flip the visual scale, never the physics.
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.scale = Vec3::new(
                config.base_scale * state.facing_sign(),
                config.base_scale,
                1.0,
            );
        }

        let mut velocity = B::get_velocity(world, entity);
        let mut is_jumping = state.is_jumping;
        let mut is_falling = state.is_falling;

        // Head bonk cancels the jump.
        if state.hit_ceiling && velocity.y > 0.0 {
            velocity.y = 0.0;
            is_jumping = false;
        }

        if state.grounded && velocity.y <= 0.0 {
            // Pinned to the ground: no gravity this step.
            B::set_velocity(world, entity, Vec2::new(velocity.x, GROUND_STICK_VELOCITY));
            if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
                controller.is_jumping = false;
                controller.is_falling = false;
            }
            continue;
        }

        let mut gravity = config.gravity_strength();
        if !intent.jump_held && velocity.y > 0.0 && is_jumping {
            gravity *= config.jump_cut_gravity_multiplier;
        }
        if velocity.y.abs() < config.jump_hang_threshold && is_jumping {
            gravity *= config.jump_hang_gravity_multiplier;
        }
        velocity.y += gravity * fdt;

        if !state.grounded {
            if velocity.y > 0.0 {
                is_jumping = true;
                is_falling = false;
            } else if velocity.y < 0.0 {
                is_jumping = false;
                is_falling = true;
            }
        }

        if velocity.y < -config.max_fall_speed {
            velocity.y = -config.max_fall_speed;
        }
        B::set_velocity(world, entity, velocity);

        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.is_jumping = is_jumping;
            controller.is_falling = is_falling;
        }
    }
}

/// Move a character to `position` and zero its velocity.
pub fn teleport<B: PhysicsBackend>(world: &mut World, entity: Entity, position: Vec2) {
    B::set_position(world, entity, position);
    B::set_velocity(world, entity, Vec2::ZERO);
}

/// Zero a character's velocity in place.
pub fn reset_velocity<B: PhysicsBackend>(world: &mut World, entity: Entity) {
    B::set_velocity(world, entity, Vec2::ZERO);
}
