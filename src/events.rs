//! Type-keyed publish/subscribe notifications.
//!
//! [`EventBus`] fans controller state changes out to externally owned
//! listeners (audio, VFX, UI) without coupling the controller to them. It is
//! an explicitly constructed [`Resource`] rather than a process-wide global,
//! and dispatches synchronously, in registration order, to the handlers of the
//! event's concrete type only.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bevy::prelude::*;

/// Marker for types that can travel over the [`EventBus`].
///
/// Blanket-implemented; any `'static` thread-safe type qualifies.
pub trait BusEvent: Any + Send + Sync {}

impl<T: Any + Send + Sync> BusEvent for T {}

/// Token identifying one subscription, returned by
/// [`EventBus::subscribe`] and consumed by [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    type_id: TypeId,
    id: u64,
}

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

struct Entry {
    id: u64,
    handler: Handler,
}

/// Synchronous type-keyed multicast registry.
///
/// # Dispatch guarantees
///
/// - Handlers run in registration order.
/// - Only handlers registered for the event's concrete type run; there is
///   no fan-out to other types.
/// - The handler list is snapshotted when a publish starts, so a handler
///   unsubscribing mid-dispatch never affects the in-flight publish.
///
/// # Example
///
/// ```rust
/// use clutch_character_controller::events::EventBus;
///
/// struct Honk(u32);
///
/// let bus = EventBus::new();
/// let id = bus.subscribe::<Honk>(|honk| println!("honk {}", honk.0));
/// bus.publish(&Honk(3));
/// bus.unsubscribe(id);
/// ```
#[derive(Resource, Default)]
pub struct EventBus {
    channels: RwLock<HashMap<TypeId, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`.
    pub fn subscribe<E: BusEvent>(
        &self,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let wrapped: Handler = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                handler(event);
            }
        });
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Entry {
                id,
                handler: wrapped,
            });
        HandlerId {
            type_id: TypeId::of::<E>(),
            id,
        }
    }

    /// Remove the subscription identified by `handler`.
    ///
    /// Returns `false` if it was already removed. Any publish already in
    /// flight still delivers to the removed handler.
    pub fn unsubscribe(&self, handler: HandlerId) -> bool {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = channels.get_mut(&handler.type_id) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != handler.id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            channels.remove(&handler.type_id);
        }
        removed
    }

    /// Dispatch `event` to every handler currently subscribed to `E`.
    pub fn publish<E: BusEvent>(&self, event: &E) {
        let snapshot: Vec<Handler> = {
            let channels = self
                .channels
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            channels
                .get(&TypeId::of::<E>())
                .map(|entries| entries.iter().map(|e| Arc::clone(&e.handler)).collect())
                .unwrap_or_default()
        };
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of handlers currently subscribed to `E`.
    pub fn subscriber_count<E: BusEvent>(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Publish through the world's bus, if one was installed.
pub(crate) fn publish_event<E: BusEvent>(world: &World, event: E) {
    if let Some(bus) = world.get_resource::<EventBus>() {
        bus.publish(&event);
    }
}

/// A jump impulse was applied this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpExecuted {
    /// The character that jumped.
    pub entity: Entity,
}

/// The character regained ground contact this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landed {
    /// The character that landed.
    pub entity: Entity,
}

/// A holdable became the grab target (in-range feedback on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetAcquired {
    /// The targeted holdable.
    pub holdable: Entity,
}

/// The grab target left range or vanished (in-range feedback off).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLost {
    /// The formerly targeted holdable.
    pub holdable: Entity,
}

/// A holdable was bound to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabStarted {
    /// The grabbing character.
    pub holder: Entity,
    /// The grabbed holdable.
    pub holdable: Entity,
}

/// A held object was released (thrown or dropped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabReleased {
    /// The releasing character.
    pub holder: Entity,
    /// The released holdable.
    pub holdable: Entity,
    /// Charge accumulated at the moment of release.
    pub charge: f32,
    /// Horizontal throw direction (-1.0 or 1.0).
    pub direction: f32,
}
