//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature (on by default).

use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;

use crate::backend::PhysicsBackend;
use crate::collision::CastHit;
use crate::config::CharacterConfig;
use crate::controller::CharacterController;
use crate::grab::{GrabSensor, Grabber};
use crate::holdable::Holdable;
use crate::ControllerSet;

/// Rapier2D physics backend.
///
/// Rigid-body access goes through `bevy_rapier2d` components
/// (`Velocity`, `ExternalForce`, `ExternalImpulse`, `GravityScale`,
/// `Damping`, `CollisionGroups`). Sensing is handled by dedicated systems
/// registered by [`Rapier2dBackendPlugin`] that receive the Rapier context
/// as a system parameter.
pub struct Rapier2dBackend;

impl PhysicsBackend for Rapier2dBackend {
    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn get_position(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation.truncate())
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation().truncate())
            })
            .unwrap_or(Vec2::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec2) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation.x = position.x;
            transform.translation.y = position.y;
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec2::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec2) {
        // ExternalForce persists in Rapier; reset_controller_forces zeroes
        // it at the top of each fixed tick so this acts for one step.
        if let Some(mut ext_force) = world.get_mut::<ExternalForce>(entity) {
            ext_force.force += force;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
        } else if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            // Fallback: apply as velocity change if no ExternalImpulse component
            vel.linvel += impulse;
        }
    }

    fn get_gravity_scale(world: &World, entity: Entity) -> f32 {
        world.get::<GravityScale>(entity).map(|g| g.0).unwrap_or(1.0)
    }

    fn set_gravity_scale(world: &mut World, entity: Entity, scale: f32) {
        if let Some(mut gravity) = world.get_mut::<GravityScale>(entity) {
            gravity.0 = scale;
        }
    }

    fn get_linear_damping(world: &World, entity: Entity) -> f32 {
        world
            .get::<Damping>(entity)
            .map(|d| d.linear_damping)
            .unwrap_or(0.0)
    }

    fn set_linear_damping(world: &mut World, entity: Entity, damping: f32) {
        if let Some(mut d) = world.get_mut::<Damping>(entity) {
            d.linear_damping = damping;
        }
    }

    fn get_angular_damping(world: &World, entity: Entity) -> f32 {
        world
            .get::<Damping>(entity)
            .map(|d| d.angular_damping)
            .unwrap_or(0.0)
    }

    fn set_angular_damping(world: &mut World, entity: Entity, damping: f32) {
        if let Some(mut d) = world.get_mut::<Damping>(entity) {
            d.angular_damping = damping;
        }
    }

    fn exclude_contacts(world: &mut World, entity: Entity, mask: u32) {
        if let Some(mut groups) = world.get_mut::<CollisionGroups>(entity) {
            groups.filters &= !Group::from_bits_truncate(mask);
        }
    }

    fn clear_excluded_contacts(world: &mut World, entity: Entity, mask: u32) {
        if let Some(mut groups) = world.get_mut::<CollisionGroups>(entity) {
            groups.filters |= Group::from_bits_truncate(mask);
        }
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Plugin that sets up Rapier2D-specific systems for the controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        // Forces this crate applied last tick must not leak into this one.
        app.add_systems(
            FixedUpdate,
            reset_controller_forces.in_set(ControllerSet::Prepare),
        );
        app.add_systems(
            FixedUpdate,
            (rapier_contact_sensors, rapier_grab_sensor).in_set(ControllerSet::Sensors),
        );
    }
}

/// Zero the external forces of controller-managed bodies.
///
/// Runs first in each fixed tick. This crate is the only force writer on
/// its characters and holdables, so a plain reset restores the
/// one-step-only contract of [`PhysicsBackend::apply_force`].
fn reset_controller_forces(
    mut q: Query<&mut ExternalForce, Or<(With<CharacterController>, With<Holdable>)>>,
) {
    for mut force in &mut q {
        force.force = Vec2::ZERO;
        force.torque = 0.0;
    }
}

/// Cast a box through the Rapier context.
fn rapier_box_cast(
    context: &RapierContext,
    origin: Vec2,
    half_extents: Vec2,
    direction: Vec2,
    max_distance: f32,
    exclude: Entity,
    mask: u32,
) -> Option<CastHit> {
    let shape = Collider::cuboid(half_extents.x, half_extents.y);
    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(mask),
        ));

    context
        .cast_shape(
            origin,
            0.0,
            direction,
            &shape,
            ShapeCastOptions {
                max_time_of_impact: max_distance,
                stop_at_penetration: false,
                ..default()
            },
            filter,
        )
        .map(|(hit_entity, hit)| {
            let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
            let point = origin + direction * hit.time_of_impact;
            CastHit::new(hit.time_of_impact, normal, point, Some(hit_entity))
        })
}

/// Ground and ceiling probes.
///
/// Boxes slightly narrower than the scaled collider, cast from its bottom
/// and top edges over the skin distances cached on the controller.
fn rapier_contact_sensors(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &CharacterConfig,
        &mut CharacterController,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, mut controller) in &mut q_controllers {
        let position = transform.translation().truncate();
        let half = controller.scaled_half_extents();
        let probe = controller.probe_half_extents();

        let foot = position - Vec2::Y * half.y;
        let grounded = rapier_box_cast(
            &context,
            foot,
            probe,
            -Vec2::Y,
            controller.ground_probe_distance(),
            entity,
            config.ground_mask,
        )
        .is_some();
        controller.set_ground_contact(grounded);

        let head = position + Vec2::Y * half.y;
        let ceiling = rapier_box_cast(
            &context,
            head,
            probe,
            Vec2::Y,
            controller.ceiling_probe_distance(),
            entity,
            config.ground_mask,
        )
        .is_some();
        controller.set_ceiling_contact(ceiling);
    }
}

/// Grab-range overlap sensor.
///
/// Collects every collider in the grabbable groups intersecting a circle
/// around the character; the grab tick filters for holdables.
fn rapier_grab_sensor(
    rapier_context: ReadRapierContext,
    mut q_grabbers: Query<(Entity, &GlobalTransform, &Grabber, &mut GrabSensor)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, grabber, mut sensor) in &mut q_grabbers {
        sensor.in_range.clear();
        let position = transform.translation().truncate();
        let shape = Collider::ball(grabber.grab_range);
        let filter = QueryFilter::default()
            .exclude_rigid_body(entity)
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(grabber.grabbable_mask),
            ));

        context.intersections_with_shape(position, 0.0, &shape, filter, |hit| {
            sensor.in_range.push(hit);
            true
        });
    }
}

/// Half extents of a collider at scale 1, for
/// [`CharacterController::new`](crate::controller::CharacterController::new).
///
/// For a capsule this is (radius, half_height + radius).
pub fn collider_half_extents(collider: &Collider) -> Vec2 {
    if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        let half_height = (segment.a().y - segment.b().y).abs() / 2.0;
        Vec2::new(capsule.radius(), half_height + capsule.radius())
    } else if let Some(ball) = collider.as_ball() {
        Vec2::splat(ball.radius())
    } else if let Some(cuboid) = collider.as_cuboid() {
        cuboid.half_extents()
    } else {
        Vec2::ZERO
    }
}

/// Bundle for spawning a character with Rapier2D physics.
///
/// The character manages its own gravity, so the bundle disables Rapier's
/// (`GravityScale(0.0)`) and locks rotation.
///
/// # Example
///
/// ```ignore
/// commands.spawn((
///     Transform::from_xyz(0.0, 4.0, 0.0),
///     CharacterController::new(Vec2::new(0.3, 0.7)),
///     CharacterConfig::player(),
///     ControlIntent::default(),
///     Grabber::new(1.0, Group::GROUP_3.bits()),
///     GrabSensor::default(),
///     RapierCharacterBundle::default(),
///     Collider::capsule_y(0.4, 0.3),
/// ));
/// ```
#[derive(Bundle)]
pub struct RapierCharacterBundle {
    /// The rigid body type; [`RigidBody::Dynamic`] for characters.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity, updated by Rapier.
    pub velocity: Velocity,
    /// Per-step force accumulator written by the controller systems.
    pub external_force: ExternalForce,
    /// Impulse accumulator used for jumps and throws.
    pub external_impulse: ExternalImpulse,
    /// Rotation locked; facing is a visual flip, not a physical one.
    pub locked_axes: LockedAxes,
    /// Rapier gravity off; the controller integrates its own.
    pub gravity_scale: GravityScale,
    /// Velocity damping. Zero by default, the controller owns the feel.
    pub damping: Damping,
}

impl Default for RapierCharacterBundle {
    fn default() -> Self {
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
        }
    }
}

/// Bundle for spawning a holdable with Rapier2D physics.
#[derive(Bundle)]
pub struct RapierHoldableBundle {
    /// The rigid body type; [`RigidBody::Dynamic`] so throws and drops
    /// simulate normally.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity, updated by Rapier.
    pub velocity: Velocity,
    /// Per-step force accumulator written by the follow servo.
    pub external_force: ExternalForce,
    /// Impulse accumulator used for the throw.
    pub external_impulse: ExternalImpulse,
    /// Full gravity while free; zeroed while held.
    pub gravity_scale: GravityScale,
    /// Free-body damping; raised while held for servo stability.
    pub damping: Damping,
    /// Contact groups; the held exclusion mask is carved out of `filters`
    /// while carried.
    pub collision_groups: CollisionGroups,
}

impl Default for RapierHoldableBundle {
    fn default() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            gravity_scale: GravityScale(1.0),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.05,
            },
            collision_groups: CollisionGroups::new(Group::ALL, Group::ALL),
        }
    }
}
