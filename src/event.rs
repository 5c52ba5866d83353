//! Static event maps.
//!
//! An [`EventMap`] names the closed set of events a type can emit. Each event
//! is a marker type implementing [`Event`], which ties one name to exactly one
//! payload type at compile time:
//!
//! ```
//! use class_event::{Event, EventMap};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! pub struct Position { pub x: i32, pub y: i32 }
//!
//! pub struct PointEvents;
//! impl EventMap for PointEvents {
//!     type Name = &'static str;
//! }
//!
//! pub struct Move;
//! impl Event<PointEvents> for Move {
//!     type Payload = Position;
//!     const NAME: &'static str = "move";
//! }
//! ```

use std::fmt;
use std::hash::Hash;

/// The set of events a registry dispatches.
pub trait EventMap: 'static {
    /// Key identifying an event. Usually a fieldless enum or `&'static str`.
    type Name: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static;
}

/// One event in the map `M`.
///
/// Listeners are filed under `NAME` and the payload type together. Two impls
/// that share a `NAME` with different payloads get separate lists, limits,
/// and leak warnings; `listener_count_by_name` sums them.
pub trait Event<M: EventMap>: 'static {
    type Payload: 'static;

    const NAME: M::Name;
}
