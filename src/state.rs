//! State marker components.
//!
//! Thin markers mirrored from the state hubs after each fixed tick, so
//! downstream game systems can use query filters (`With<Grounded>`)
//! instead of reading controller fields.

use bevy::prelude::*;

use crate::controller::CharacterController;
use crate::grab::Grabber;

/// Marker component indicating the character is grounded.
///
/// Mutually exclusive with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is carrying a holdable.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Carrying;

/// Sync marker components from the controller and grabber state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_characters: Query<(
        Entity,
        &CharacterController,
        Option<&Grabber>,
        Has<Grounded>,
        Has<Airborne>,
        Has<Carrying>,
    )>,
) {
    for (entity, controller, grabber, has_grounded, has_airborne, has_carrying) in &q_characters {
        if controller.is_grounded() {
            if !has_grounded {
                commands.entity(entity).insert(Grounded);
            }
            if has_airborne {
                commands.entity(entity).remove::<Airborne>();
            }
        } else {
            if !has_airborne {
                commands.entity(entity).insert(Airborne);
            }
            if has_grounded {
                commands.entity(entity).remove::<Grounded>();
            }
        }

        let holding = grabber.is_some_and(Grabber::is_holding);
        if holding && !has_carrying {
            commands.entity(entity).insert(Carrying);
        } else if !holding && has_carrying {
            commands.entity(entity).remove::<Carrying>();
        }
    }
}
