//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to
//! work with the controller. The core never talks to a physics engine
//! directly; it consumes two capabilities:
//!
//! 1. **Sensing**: the backend's plugin registers sensor systems in
//!    [`ControllerSet::Sensors`](crate::ControllerSet::Sensors) that run
//!    shaped queries and record the results on
//!    [`CharacterController`](crate::controller::CharacterController)
//!    (ground/ceiling contact) and [`GrabSensor`](crate::grab::GrabSensor)
//!    (holdables in grab range).
//! 2. **Rigid bodies**: position, velocity, forces/impulses, gravity
//!    scale, damping and the contact-exclusion mask, exposed as the static
//!    methods below.

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the controller.
/// For an example implementation see the `rapier` module's
/// [`Rapier2dBackend`](crate::rapier::Rapier2dBackend).
///
/// # Force semantics
///
/// [`apply_force`](Self::apply_force) is a *continuous* force that must act
/// for the current fixed step only; the backend is responsible for clearing
/// it before the next controller tick. [`apply_impulse`](Self::apply_impulse)
/// is an instantaneous change in momentum.
pub trait PhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend, including its sensor
    /// systems in [`ControllerSet::Sensors`](crate::ControllerSet::Sensors).
    fn plugin() -> impl Plugin;

    /// Get the current world-space position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec2;

    /// Move an entity to a world-space position.
    fn set_position(world: &mut World, entity: Entity, position: Vec2);

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec2;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2);

    /// Apply a continuous force for the current fixed step.
    fn apply_force(world: &mut World, entity: Entity, force: Vec2);

    /// Apply an instantaneous impulse.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2);

    /// Get the gravity scale of an entity (1.0 = full gravity).
    fn get_gravity_scale(world: &World, entity: Entity) -> f32;

    /// Set the gravity scale of an entity.
    fn set_gravity_scale(world: &mut World, entity: Entity, scale: f32);

    /// Get the linear damping coefficient of an entity.
    fn get_linear_damping(world: &World, entity: Entity) -> f32;

    /// Set the linear damping coefficient of an entity.
    fn set_linear_damping(world: &mut World, entity: Entity, damping: f32);

    /// Get the angular damping coefficient of an entity.
    fn get_angular_damping(world: &World, entity: Entity) -> f32;

    /// Set the angular damping coefficient of an entity.
    fn set_angular_damping(world: &mut World, entity: Entity, damping: f32);

    /// Stop the entity from colliding with the contact groups in `mask`.
    ///
    /// `mask` uses the same group-bits convention as
    /// [`CharacterConfig::ground_mask`](crate::config::CharacterConfig::ground_mask).
    fn exclude_contacts(world: &mut World, entity: Entity, mask: u32);

    /// Restore collisions with the contact groups in `mask`.
    fn clear_excluded_contacts(world: &mut World, entity: Entity, mask: u32);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
