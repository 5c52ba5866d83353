pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod evented;
pub mod listener;
pub mod registry;

pub use config::{ConfigStore, KvStore, RegistryConfig};
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use error::{ClassEventError, Result, ValidationError};
pub use event::{Event, EventMap};
pub use evented::{Evented, Subscriptions};
pub use listener::{async_listener, listener, Listener};
pub use registry::{EventRegistry, RegistryBuilder};
