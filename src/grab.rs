//! Grab, charge and throw.
//!
//! [`Grabber`] runs a three-state machine per character (empty, targeted,
//! held), expressed as its `(target, held)` pair. Targeting comes from the
//! backend's grab-range overlap sensor; grab and release react to attack
//! edges on the variable tick; charging runs on the fixed tick.
//!
//! Release is deliberately asymmetric with grab: a release edge arriving at
//! or before `tap_threshold` after the grab is ignored, so the same quick
//! press that grabbed the object doesn't immediately drop it when it ends.
//! A deliberate hold-then-release throws with the accumulated charge.

use bevy::prelude::*;

use crate::backend::PhysicsBackend;
use crate::config::CharacterConfig;
use crate::controller::CharacterController;
use crate::events::{publish_event, GrabReleased, GrabStarted, TargetAcquired, TargetLost};
use crate::holdable::{self, HoldPhase, Holdable};
use crate::input::ControlIntent;

/// Holdables currently inside a character's grab range.
///
/// Written every fixed tick by the backend's overlap sensor, consumed by
/// [`fixed_grab_tick`]. Order is the backend's detection order; targeting
/// takes the first eligible entry.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct GrabSensor {
    /// Entities overlapping the grab range this tick.
    pub in_range: Vec<Entity>,
}

/// Grab/charge/throw state for one character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct Grabber {
    /// Radius of the grab range around the character.
    pub grab_range: f32,
    /// Contact group bits the overlap sensor tests against.
    pub grabbable_mask: u32,
    /// Connection point relative to the character; the X component is
    /// mirrored by facing.
    pub anchor_offset: Vec2,
    /// The targeted holdable, if any. At most one, first-detected-wins.
    pub(crate) target: Option<Entity>,
    /// The held holdable, if any.
    pub(crate) held: Option<Entity>,
    /// Throw charge accumulated this grab cycle.
    pub(crate) charge: f32,
    /// Simulation clock at the moment of the grab.
    pub(crate) grab_started_at: f32,
}

impl Default for Grabber {
    fn default() -> Self {
        Self::new(1.0, u32::MAX)
    }
}

impl Grabber {
    /// Create a grabber with the given range and grabbable groups.
    pub fn new(grab_range: f32, grabbable_mask: u32) -> Self {
        Self {
            grab_range,
            grabbable_mask,
            anchor_offset: Vec2::new(0.0, 0.75),
            target: None,
            held: None,
            charge: 0.0,
            grab_started_at: 0.0,
        }
    }

    /// Builder: set the connection point offset.
    pub fn with_anchor_offset(mut self, offset: Vec2) -> Self {
        self.anchor_offset = offset;
        self
    }

    /// Whether something is currently held.
    #[inline]
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    /// The held holdable, if any.
    #[inline]
    pub fn held(&self) -> Option<Entity> {
        self.held
    }

    /// The targeted holdable, if any.
    #[inline]
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    /// Throw charge accumulated so far this grab cycle.
    #[inline]
    pub fn charge(&self) -> f32 {
        self.charge
    }

    /// World-space anchor position for a holder at `holder_position`
    /// facing `facing` (-1.0 or 1.0).
    pub fn anchor_position(&self, holder_position: Vec2, facing: f32) -> Vec2 {
        holder_position + Vec2::new(self.anchor_offset.x * facing, self.anchor_offset.y)
    }
}

/// Variable-rate grab phase: attack edges.
///
/// Runs after the movement phase so throw direction sees this frame's
/// facing.
pub fn update_grab_input<B: PhysicsBackend>(world: &mut World) {
    let now = world.resource::<Time>().elapsed_secs();

    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<Grabber>>()
        .iter(world)
        .collect();

    for entity in entities {
        clear_dangling_refs(world, entity);

        let Some(intent) = world.get::<ControlIntent>(entity).copied() else {
            continue;
        };
        let pressed = intent.attack_just_pressed();
        let released = intent.attack_just_released();
        if let Some(mut intent) = world.get_mut::<ControlIntent>(entity) {
            intent.latch_attack();
        }

        let Some(config) = world.get::<CharacterConfig>(entity).copied() else {
            continue;
        };
        let Some(grabber) = world.get::<Grabber>(entity).cloned() else {
            continue;
        };

        if pressed {
            if grabber.held.is_none() {
                if let Some(target) = grabber.target {
                    grab::<B>(world, entity, target, now);
                }
            } else if let Some(mut grabber) = world.get_mut::<Grabber>(entity) {
                // Re-press while holding restarts the charge.
                grabber.charge = 0.0;
            }
        }

        if released
            && grabber.held.is_some()
            && now - grabber.grab_started_at > config.tap_threshold
        {
            release::<B>(world, entity);
        }
    }
}

/// Fixed-rate grab phase: targeting and charging.
///
/// Runs after the movement phase in the same fixed tick. While holding
/// with attack held, charge grows by `throw_force_increment * fdt` up to
/// `max_throw_force`; hitting the cap releases automatically with the
/// capped charge. Otherwise the overlap results drive targeting:
/// first-detected-wins, cleared when the target leaves range.
pub fn fixed_grab_tick<B: PhysicsBackend>(world: &mut World) {
    let fdt = B::get_fixed_timestep(world);

    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<Grabber>>()
        .iter(world)
        .collect();

    for entity in entities {
        clear_dangling_refs(world, entity);

        let Some(config) = world.get::<CharacterConfig>(entity).copied() else {
            continue;
        };
        let Some(intent) = world.get::<ControlIntent>(entity).copied() else {
            continue;
        };
        let Some(grabber) = world.get::<Grabber>(entity).cloned() else {
            continue;
        };

        if grabber.held.is_some() {
            if intent.attack_held {
                let mut at_cap = false;
                if let Some(mut grabber) = world.get_mut::<Grabber>(entity) {
                    grabber.charge = (grabber.charge + config.throw_force_increment * fdt)
                        .min(config.max_throw_force);
                    at_cap = grabber.charge >= config.max_throw_force;
                }
                if at_cap {
                    release::<B>(world, entity);
                }
            }
            continue;
        }

        let in_range = world
            .get::<GrabSensor>(entity)
            .map(|sensor| sensor.in_range.clone())
            .unwrap_or_default();

        if let Some(current) = grabber.target {
            if !in_range.contains(&current) {
                clear_target(world, entity, current);
            }
        }

        let target_now = world.get::<Grabber>(entity).and_then(|g| g.target);
        if target_now.is_none() {
            let candidate = in_range.iter().copied().find(|&candidate| {
                world
                    .get::<Holdable>(candidate)
                    .is_some_and(|holdable| holdable.phase() == HoldPhase::Free)
            });
            if let Some(found) = candidate {
                if let Some(mut holdable) = world.get_mut::<Holdable>(found) {
                    holdable.phase = HoldPhase::Targeted;
                }
                if let Some(mut grabber) = world.get_mut::<Grabber>(entity) {
                    grabber.target = Some(found);
                }
                publish_event(world, TargetAcquired { holdable: found });
            }
        }
    }
}

/// Bind `holdable` to `holder` and start a fresh grab cycle.
fn grab<B: PhysicsBackend>(world: &mut World, holder: Entity, holdable: Entity, now: f32) {
    if world.get::<Holdable>(holdable).is_none() {
        return;
    }
    holdable::bind::<B>(world, holdable, holder);
    if let Some(mut grabber) = world.get_mut::<Grabber>(holder) {
        grabber.held = Some(holdable);
        grabber.target = None;
        grabber.charge = 0.0;
        grabber.grab_started_at = now;
    }
    publish_event(world, GrabStarted { holder, holdable });
}

/// Throw the held object with the accumulated charge along the facing.
///
/// A release with nothing held is ignored.
pub(crate) fn release<B: PhysicsBackend>(world: &mut World, holder: Entity) {
    let Some(grabber) = world.get::<Grabber>(holder).cloned() else {
        return;
    };
    let Some(held) = grabber.held else {
        return;
    };
    let direction = world
        .get::<CharacterController>(holder)
        .map_or(1.0, CharacterController::facing_sign);
    let charge = grabber.charge;

    holdable::unbind::<B>(world, held, Vec2::X * (charge * direction));
    if let Some(mut grabber) = world.get_mut::<Grabber>(holder) {
        grabber.held = None;
        grabber.charge = 0.0;
    }
    publish_event(
        world,
        GrabReleased {
            holder,
            holdable: held,
            charge,
            direction,
        },
    );
}

/// Clear the current target and notify listeners.
fn clear_target(world: &mut World, holder: Entity, target: Entity) {
    if let Some(mut holdable) = world.get_mut::<Holdable>(target) {
        if holdable.phase() == HoldPhase::Targeted {
            holdable.phase = HoldPhase::Free;
        }
    }
    if let Some(mut grabber) = world.get_mut::<Grabber>(holder) {
        grabber.target = None;
    }
    publish_event(world, TargetLost { holdable: target });
}

/// Drop references to holdables that were despawned externally.
///
/// Treated as the empty transition: the state machine continues as if
/// nothing had been targeted or held.
fn clear_dangling_refs(world: &mut World, entity: Entity) {
    let Some(grabber) = world.get::<Grabber>(entity) else {
        return;
    };
    let target_gone = grabber
        .target
        .is_some_and(|e| world.get::<Holdable>(e).is_none());
    let held_gone = grabber
        .held
        .is_some_and(|e| world.get::<Holdable>(e).is_none());
    if !target_gone && !held_gone {
        return;
    }
    if let Some(mut grabber) = world.get_mut::<Grabber>(entity) {
        if target_gone {
            grabber.target = None;
        }
        if held_gone {
            grabber.held = None;
            grabber.charge = 0.0;
        }
    }
}
