//! Carriable objects and the follow servo.
//!
//! A [`Holdable`] is a dynamically simulated body a character can grab.
//! While held it is not parented or joint-locked to the holder: a
//! velocity servo drives it toward the holder's anchor with a clamped
//! continuous force, so it converges smoothly without fighting the solver,
//! and the physics stays live for collisions along the way.

use bevy::prelude::*;

use crate::backend::PhysicsBackend;
use crate::config::FollowConfig;
use crate::controller::CharacterController;
use crate::grab::Grabber;

/// Carry state of a holdable.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldPhase {
    /// Simulating freely.
    #[default]
    Free,
    /// In grab range of a character and eligible, not yet grabbed.
    Targeted,
    /// Bound to a holder.
    Held,
}

/// Marks an entity as carriable and tracks its carry state.
///
/// The holder reference is non-owning; if the holder disappears the
/// follower restores free-body physics on its own.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Holdable {
    pub(crate) phase: HoldPhase,
    pub(crate) holder: Option<Entity>,
}

impl Holdable {
    /// Create a free holdable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current carry phase.
    #[inline]
    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    /// The holder, while [`HoldPhase::Held`].
    #[inline]
    pub fn holder(&self) -> Option<Entity> {
        self.holder
    }

    /// Whether the object is currently carried.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.phase == HoldPhase::Held
    }

    /// Whether the object is the current grab target of some character.
    #[inline]
    pub fn is_targeted(&self) -> bool {
        self.phase == HoldPhase::Targeted
    }
}

/// Bind `entity` to `holder`: zero gravity, raise damping for stability,
/// stop colliding with the configured groups, and seed the velocity from
/// the holder so the pickup doesn't jerk.
pub(crate) fn bind<B: PhysicsBackend>(world: &mut World, entity: Entity, holder: Entity) {
    let follow = world
        .get::<FollowConfig>(entity)
        .copied()
        .unwrap_or_default();
    let Some(mut holdable) = world.get_mut::<Holdable>(entity) else {
        return;
    };
    holdable.phase = HoldPhase::Held;
    holdable.holder = Some(holder);

    B::set_gravity_scale(world, entity, 0.0);
    B::set_linear_damping(world, entity, follow.held_damping);
    B::set_angular_damping(world, entity, follow.held_damping);
    if follow.held_exclusion_mask != 0 {
        B::exclude_contacts(world, entity, follow.held_exclusion_mask);
    }
    let holder_velocity = B::get_velocity(world, holder);
    B::set_velocity(world, entity, holder_velocity);
}

/// Unbind `entity`: restore free-body physics and apply `throw` as an
/// instantaneous impulse.
pub(crate) fn unbind<B: PhysicsBackend>(world: &mut World, entity: Entity, throw: Vec2) {
    let follow = world
        .get::<FollowConfig>(entity)
        .copied()
        .unwrap_or_default();
    let Some(mut holdable) = world.get_mut::<Holdable>(entity) else {
        return;
    };
    holdable.phase = HoldPhase::Free;
    holdable.holder = None;

    B::set_gravity_scale(world, entity, 1.0);
    B::set_linear_damping(world, entity, 0.0);
    B::set_angular_damping(world, entity, follow.rest_angular_damping);
    if follow.held_exclusion_mask != 0 {
        B::clear_excluded_contacts(world, entity, follow.held_exclusion_mask);
    }
    B::apply_impulse(world, entity, throw);
}

/// Fixed-rate follow phase.
///
/// Velocity servo toward the holder's anchor: the position error sets a
/// desired velocity, the velocity error sets a force, and the force is
/// magnitude-clamped so a fast-moving anchor can't dominate the solver.
/// Once within `snap_epsilon` of the anchor, residual horizontal drift is
/// cancelled by copying the holder's horizontal velocity; the vertical
/// component stays with the servo.
pub fn fixed_follow_tick<B: PhysicsBackend>(world: &mut World) {
    let held: Vec<(Entity, Entity)> = world
        .query::<(Entity, &Holdable)>()
        .iter(world)
        .filter(|(_, holdable)| holdable.is_held())
        .filter_map(|(entity, holdable)| holdable.holder.map(|holder| (entity, holder)))
        .collect();

    for (entity, holder) in held {
        let bound = world
            .get::<Grabber>(holder)
            .is_some_and(|grabber| grabber.held() == Some(entity));
        if !bound {
            // Holder vanished or let go without telling us: drop in place.
            unbind::<B>(world, entity, Vec2::ZERO);
            continue;
        }

        let follow = world
            .get::<FollowConfig>(entity)
            .copied()
            .unwrap_or_default();
        let facing = world
            .get::<CharacterController>(holder)
            .map_or(1.0, CharacterController::facing_sign);
        let holder_position = B::get_position(world, holder);
        let Some(anchor) = world
            .get::<Grabber>(holder)
            .map(|grabber| grabber.anchor_position(holder_position, facing))
        else {
            continue;
        };

        let position = B::get_position(world, entity);
        let velocity = B::get_velocity(world, entity);

        let position_error = anchor - position;
        let desired_velocity = position_error * follow.follow_speed;
        let velocity_error = desired_velocity - velocity;
        let force = (velocity_error * follow.damping).clamp_length_max(follow.max_follow_force);
        B::apply_force(world, entity, force);

        if position_error.length() < follow.snap_epsilon {
            let holder_velocity = B::get_velocity(world, holder);
            B::set_velocity(world, entity, Vec2::new(holder_velocity.x, velocity.y));
        }
    }
}
