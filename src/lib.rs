//! # `clutch_character_controller`
//!
//! The movement-and-interaction core of a 2D platformer: a fixed-timestep
//! character controller with a precise jump state machine, plus a
//! grab/charge/throw interaction with a physically simulated carriable
//! object.
//!
//! - Coyote time, jump buffering, and layered gravity (jump cut on early
//!   release, hang gravity at the apex, terminal fall clamp)
//! - Tap-vs-hold grab semantics: a quick tap grabs without instantly
//!   dropping; a deliberate hold-then-release throws with charged force
//! - A force-based follow servo that keeps the carried object glued to a
//!   moving anchor without fighting the physics solver
//! - Physics backend abstraction (Rapier2D included behind the `rapier2d`
//!   feature), so the core never touches an engine directly
//! - A scoped, type-keyed [`EventBus`](events::EventBus) announcing jumps,
//!   landings, grabs and throws to externally owned listeners
//!
//! ## Architecture
//!
//! Work is split into a variable-rate phase (input edges, grace-window
//! timers, jump and grab/release decisions) running once per rendered
//! frame, and a fixed-rate phase (sensors, integration, force application)
//! running at the simulation rate. Within a fixed tick the order is
//! load-bearing and encoded in [`ControllerSet`]: sensors run before the
//! movement integration, movement before the grab tick (throw direction
//! depends on this tick's facing), and grab before the follow servo.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_rapier2d::prelude::*;
//! use clutch_character_controller::prelude::*;
//!
//! App::new()
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
//!     .add_plugins(ClutchControllerPlugin::<Rapier2dBackend>::default())
//!     .run();
//! ```

use bevy::log::error;
use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod controller;
pub mod events;
pub mod grab;
pub mod holdable;
pub mod input;
pub mod state;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::PhysicsBackend;
    pub use crate::config::{CharacterConfig, ConfigError, FollowConfig};
    pub use crate::controller::{CharacterController, JumpPhase};
    pub use crate::events::{
        EventBus, GrabReleased, GrabStarted, JumpExecuted, Landed, TargetAcquired, TargetLost,
    };
    pub use crate::grab::{GrabSensor, Grabber};
    pub use crate::holdable::{HoldPhase, Holdable};
    pub use crate::input::ControlIntent;
    pub use crate::state::{Airborne, Carrying, Grounded};
    pub use crate::{ClutchControllerPlugin, ControllerSet};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dBackend, RapierCharacterBundle, RapierHoldableBundle};
}

/// Fixed-tick phases of the controller, in execution order.
///
/// Backends put their sensor systems in [`Sensors`](ControllerSet::Sensors)
/// and any per-tick preparation (force clearing) in
/// [`Prepare`](ControllerSet::Prepare).
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Per-tick preparation before anything reads or writes physics.
    Prepare,
    /// Shaped queries recording ground/ceiling contact and grab range.
    Sensors,
    /// Character movement integration.
    Movement,
    /// Targeting, charging, automatic release.
    Grab,
    /// Follow servo of carried objects.
    Follow,
}

/// Main plugin for the platformer controller.
///
/// Generic over a physics backend `B` which provides sensing and rigid-body
/// access (e.g. [`Rapier2dBackend`](rapier::Rapier2dBackend)).
pub struct ClutchControllerPlugin<B: backend::PhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::PhysicsBackend> Default for ClutchControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::PhysicsBackend> Plugin for ClutchControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<config::CharacterConfig>();
        app.register_type::<config::FollowConfig>();
        app.register_type::<input::ControlIntent>();
        app.register_type::<controller::CharacterController>();
        app.register_type::<grab::Grabber>();
        app.register_type::<grab::GrabSensor>();
        app.register_type::<holdable::Holdable>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::Carrying>();

        app.init_resource::<events::EventBus>();

        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                ControllerSet::Prepare,
                ControllerSet::Sensors,
                ControllerSet::Movement,
                ControllerSet::Grab,
                ControllerSet::Follow,
            )
                .chain(),
        );

        app.add_systems(PreUpdate, validate_new_configs);

        // Variable-rate phase: movement before grab, so throws read the
        // facing updated this frame.
        app.add_systems(
            Update,
            (
                controller::update_character_input::<B>,
                grab::update_grab_input::<B>,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                controller::fixed_character_tick::<B>.in_set(ControllerSet::Movement),
                grab::fixed_grab_tick::<B>.in_set(ControllerSet::Grab),
                holdable::fixed_follow_tick::<B>.in_set(ControllerSet::Follow),
            ),
        );

        app.add_systems(FixedPostUpdate, state::sync_state_markers);
    }
}

/// Reject invalid parameter sets before any tick consumes them.
///
/// A rejected config is removed, which degrades the character to no-op
/// motion rather than simulating with broken numbers.
fn validate_new_configs(
    mut commands: Commands,
    q_characters: Query<(Entity, &config::CharacterConfig), Added<config::CharacterConfig>>,
    q_holdables: Query<(Entity, &config::FollowConfig), Added<config::FollowConfig>>,
) {
    for (entity, character_config) in &q_characters {
        if let Err(err) = character_config.validate() {
            error!("rejecting CharacterConfig on {entity}: {err}");
            commands.entity(entity).remove::<config::CharacterConfig>();
        }
    }
    for (entity, follow_config) in &q_holdables {
        if let Err(err) = follow_config.validate() {
            error!("rejecting FollowConfig on {entity}: {err}");
            commands.entity(entity).remove::<config::FollowConfig>();
        }
    }
}
