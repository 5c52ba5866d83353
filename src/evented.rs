//! Event capability for owning types.
//!
//! A type that emits events keeps an [`EventRegistry`] in a private field and
//! implements [`Evented`]. Callers reach the registry only through
//! [`Subscriptions`], which offers `on`/`off` and the limits but not `emit`;
//! emitting stays with the owner's own methods.
//!
//! ```
//! use class_event::{listener, Event, EventMap, EventRegistry, Evented, Subscriptions};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! pub struct Position { pub x: i32, pub y: i32 }
//!
//! pub struct PointEvents;
//! impl EventMap for PointEvents { type Name = &'static str; }
//!
//! pub struct Move;
//! impl Event<PointEvents> for Move {
//!     type Payload = Position;
//!     const NAME: &'static str = "move";
//! }
//!
//! #[derive(Default)]
//! pub struct Point { events: EventRegistry<PointEvents> }
//!
//! impl Point {
//!     pub fn move_to(&self, x: i32, y: i32) {
//!         self.events.emit::<Move>(&Position { x, y });
//!     }
//! }
//!
//! impl Evented for Point {
//!     type Events = PointEvents;
//!     fn subscriptions(&self) -> Subscriptions<'_, PointEvents> {
//!         Subscriptions::new(&self.events)
//!     }
//! }
//!
//! let point = Point::default();
//! let on_move = listener(|p: &Position| println!("moved to {},{}", p.x, p.y));
//! point.on::<Move>(&on_move);
//! point.move_to(1, 2);
//! point.off::<Move>(&on_move);
//! ```
//!
//! Code outside the owner cannot emit through the handle:
//!
//! ```compile_fail
//! use class_event::{Event, EventMap, EventRegistry, Evented, Subscriptions};
//!
//! pub struct PointEvents;
//! impl EventMap for PointEvents { type Name = &'static str; }
//!
//! pub struct Move;
//! impl Event<PointEvents> for Move {
//!     type Payload = i32;
//!     const NAME: &'static str = "move";
//! }
//!
//! mod owner {
//!     use super::*;
//!
//!     #[derive(Default)]
//!     pub struct Point { events: EventRegistry<PointEvents> }
//!
//!     impl Evented for Point {
//!         type Events = PointEvents;
//!         fn subscriptions(&self) -> Subscriptions<'_, PointEvents> {
//!             Subscriptions::new(&self.events)
//!         }
//!     }
//! }
//!
//! let point = owner::Point::default();
//! point.subscriptions().emit::<Move>(&1);
//! ```

use serde_json::Value;

use crate::{
    config::RegistryConfig,
    error::Result,
    event::{Event, EventMap},
    listener::Listener,
    registry::EventRegistry,
};

/// Borrowed view of an [`EventRegistry`] without `emit`.
pub struct Subscriptions<'a, M: EventMap> {
    registry: &'a EventRegistry<M>,
}

impl<M: EventMap> Clone for Subscriptions<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: EventMap> Copy for Subscriptions<'_, M> {}

impl<'a, M: EventMap> Subscriptions<'a, M> {
    /// Wrap `registry`. Called by the owner inside [`Evented::subscriptions`].
    pub fn new(registry: &'a EventRegistry<M>) -> Self {
        Self { registry }
    }

    /// See [`EventRegistry::on`].
    pub fn on<E: Event<M>>(self, listener: &Listener<E::Payload>) -> Self {
        self.registry.on::<E>(listener);
        self
    }

    /// See [`EventRegistry::off`].
    pub fn off<E: Event<M>>(self, listener: &Listener<E::Payload>) -> Self {
        self.registry.off::<E>(listener);
        self
    }

    pub fn listener_count<E: Event<M>>(&self) -> usize {
        self.registry.listener_count::<E>()
    }

    pub fn max_event_listeners(&self) -> usize {
        self.registry.max_event_listeners()
    }

    pub fn max_event_before_warn(&self) -> usize {
        self.registry.max_event_before_warn()
    }

    /// See [`EventRegistry::set_max_event_listeners`].
    pub fn set_max_event_listeners(self, value: impl Into<Value>) -> Result<Self> {
        self.registry.set_max_event_listeners(value)?;
        Ok(self)
    }

    /// See [`EventRegistry::set_max_event_before_warn`].
    pub fn set_max_event_before_warn(self, value: impl Into<Value>) -> Result<Self> {
        self.registry.set_max_event_before_warn(value)?;
        Ok(self)
    }

    pub fn config(&self) -> RegistryConfig {
        self.registry.config()
    }
}

/// Implemented by types that own an [`EventRegistry`].
pub trait Evented {
    type Events: EventMap;

    /// The owner's registry, narrowed to subscription and limits.
    fn subscriptions(&self) -> Subscriptions<'_, Self::Events>;

    /// See [`EventRegistry::on`].
    fn on<E: Event<Self::Events>>(&self, listener: &Listener<E::Payload>) -> &Self {
        self.subscriptions().on::<E>(listener);
        self
    }

    /// See [`EventRegistry::off`].
    fn off<E: Event<Self::Events>>(&self, listener: &Listener<E::Payload>) -> &Self {
        self.subscriptions().off::<E>(listener);
        self
    }
}
