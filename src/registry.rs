//! EventRegistry<M>: typed listener lists keyed by event name.
//!
//! Every event name in `M` owns an ordered list of listeners. Insertion order
//! is invocation order and the same handle may be registered more than once.
//!
//! Dispatch is synchronous and snapshot-based:
//!   - A listener removed *during* emission is still called in that round.
//!   - A listener added *during* emission is NOT called until the next emit.
//!
//! Each listener call is isolated: a panic is caught, reported to the
//! [`Diagnostics`] sink, and the next listener runs.
//!
//! All methods take `&self`. List state sits behind a `parking_lot::Mutex`
//! that is never held while listeners or the diagnostics sink run, so
//! listeners can call `on()`/`off()` on the registry that is emitting.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    config::{
        read_limit, validate_limit, ConfigStore, KvStore, RegistryConfig,
        DEFAULT_MAX_EVENT_BEFORE_WARN, DEFAULT_MAX_EVENT_LISTENERS, MAX_EVENT_BEFORE_WARN,
        MAX_EVENT_LISTENERS,
    },
    diagnostics::{Diagnostics, TracingDiagnostics},
    error::Result,
    event::{Event, EventMap},
    listener::{same_listener, Listener},
};

/// A type-erased `Listener<P>`; `P` is fixed by the [`ListKey`] it is filed under.
type ErasedListener = Box<dyn Any + Send + Sync>;

// ============================================================================
// Internal state
// ============================================================================

/// List key: the event name plus its payload type, so two events that
/// share a name never share a list.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct ListKey<N> {
    name: N,
    payload: TypeId,
}

impl<N> ListKey<N> {
    fn of<M, E>() -> Self
    where
        M: EventMap<Name = N>,
        E: Event<M>,
    {
        Self {
            name: E::NAME,
            payload: TypeId::of::<E::Payload>(),
        }
    }
}

struct RegistryState<N> {
    lists: HashMap<ListKey<N>, Vec<ErasedListener>>,
    /// Lists that already produced a leak warning. Never cleared.
    warn_issued: HashSet<ListKey<N>>,
}

impl<N: Copy + Eq + std::hash::Hash> RegistryState<N> {
    fn new() -> Self {
        Self {
            lists: HashMap::new(),
            warn_issued: HashSet::new(),
        }
    }

    /// Returns the listener count when `key` crosses `warn_at` for the first time.
    fn check_event_list(&mut self, key: ListKey<N>, warn_at: usize) -> Option<usize> {
        let len = self.lists.get(&key).map_or(0, Vec::len);
        if len >= warn_at && self.warn_issued.insert(key) {
            Some(len)
        } else {
            None
        }
    }
}

enum Registration {
    Added { leak: Option<usize> },
    Rejected { limit: usize },
}

// ============================================================================
// EventRegistry
// ============================================================================

/// Listener registry for the events of `M`.
pub struct EventRegistry<M: EventMap> {
    state: Mutex<RegistryState<M::Name>>,
    store: Arc<dyn ConfigStore>,
    diagnostics: Arc<dyn Diagnostics>,
    _map: PhantomData<fn() -> M>,
}

impl<M: EventMap> EventRegistry<M> {
    /// A registry with default limits, an in-memory store, and `tracing` diagnostics.
    pub fn new() -> Self {
        Self::from_parts(
            Arc::new(KvStore::from_config(&RegistryConfig::default())),
            Arc::new(TracingDiagnostics),
        )
    }

    /// Start a [`RegistryBuilder`] for custom limits, store, or diagnostics.
    pub fn builder() -> RegistryBuilder<M> {
        RegistryBuilder::new()
    }

    fn from_parts(store: Arc<dyn ConfigStore>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            state: Mutex::new(RegistryState::new()),
            store,
            diagnostics,
            _map: PhantomData,
        }
    }

    /// Register `listener` for `E`.
    ///
    /// When `max_event_listeners` is non-zero and already reached, the
    /// listener is not added and the diagnostics sink is told. Otherwise it is
    /// appended and the leak-warning threshold is checked.
    pub fn on<E: Event<M>>(&self, listener: &Listener<E::Payload>) -> &Self {
        let limit = self.max_event_listeners();
        let warn_at = self.max_event_before_warn();
        let key = ListKey::of::<M, E>();

        let outcome = {
            let mut st = self.state.lock();
            let list = st.lists.entry(key).or_default();
            if limit > 0 && list.len() >= limit {
                Registration::Rejected { limit }
            } else {
                list.push(Box::new(Arc::clone(listener)));
                Registration::Added {
                    leak: st.check_event_list(key, warn_at),
                }
            }
        };

        // Lock released before reporting.
        match outcome {
            Registration::Rejected { limit } => {
                self.diagnostics.listener_limit_reached(&E::NAME, limit);
            }
            Registration::Added { leak: Some(count) } => {
                self.diagnostics.possible_leak(&E::NAME, count);
            }
            Registration::Added { leak: None } => {}
        }
        self
    }

    /// Remove the first registration of `listener` for `E`.
    ///
    /// Later duplicates of the same handle stay registered. Does nothing if
    /// the handle is not present.
    pub fn off<E: Event<M>>(&self, listener: &Listener<E::Payload>) -> &Self {
        let mut st = self.state.lock();
        if let Some(list) = st.lists.get_mut(&ListKey::of::<M, E>()) {
            let found = list.iter().position(|erased| {
                (**erased)
                    .downcast_ref::<Listener<E::Payload>>()
                    .is_some_and(|registered| same_listener(registered, listener))
            });
            if let Some(index) = found {
                list.remove(index);
            }
        }
        self
    }

    /// Call every listener registered for `E` with `payload`, in order.
    ///
    /// Meant for the type that owns the registry. Listeners are called over a
    /// snapshot taken before the first call.
    pub fn emit<E: Event<M>>(&self, payload: &E::Payload) -> &Self {
        let snapshot: Vec<Listener<E::Payload>> = {
            let st = self.state.lock();
            match st.lists.get(&ListKey::of::<M, E>()) {
                Some(list) => list
                    .iter()
                    .filter_map(|erased| (**erased).downcast_ref::<Listener<E::Payload>>())
                    .cloned()
                    .collect(),
                None => return self,
            }
        };

        for listener in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                self.diagnostics
                    .listener_panicked(&E::NAME, &panic_message(&*panic));
            }
        }
        self
    }

    /// Number of listeners currently registered for `E`.
    pub fn listener_count<E: Event<M>>(&self) -> usize {
        self.state
            .lock()
            .lists
            .get(&ListKey::of::<M, E>())
            .map_or(0, Vec::len)
    }

    /// Number of listeners under `name`, summed over every payload type
    /// registered with that name.
    pub fn listener_count_by_name(&self, name: M::Name) -> usize {
        self.state
            .lock()
            .lists
            .iter()
            .filter(|(key, _)| key.name == name)
            .map(|(_, list)| list.len())
            .sum()
    }

    /// Whether at least one listener is registered for `E`.
    pub fn has_listeners<E: Event<M>>(&self) -> bool {
        self.listener_count::<E>() > 0
    }

    // ------------------------------------------------------------------------
    // Config accessors
    // ------------------------------------------------------------------------

    /// Per-event listener cap. `0` means unlimited.
    pub fn max_event_listeners(&self) -> usize {
        read_limit(self.store.as_ref(), MAX_EVENT_LISTENERS).unwrap_or(DEFAULT_MAX_EVENT_LISTENERS)
    }

    /// Listener count that triggers the one-time leak warning.
    pub fn max_event_before_warn(&self) -> usize {
        read_limit(self.store.as_ref(), MAX_EVENT_BEFORE_WARN)
            .unwrap_or(DEFAULT_MAX_EVENT_BEFORE_WARN)
    }

    /// Set the per-event listener cap. Applies to later `on()` calls only.
    ///
    /// Fails with a validation error, leaving the current value in place,
    /// unless `value` is a finite non-negative integer.
    pub fn set_max_event_listeners(&self, value: impl Into<Value>) -> Result<&Self> {
        self.set_limit(MAX_EVENT_LISTENERS, value.into())
    }

    /// Set the leak-warning threshold. Same validation as
    /// [`set_max_event_listeners`](Self::set_max_event_listeners).
    pub fn set_max_event_before_warn(&self, value: impl Into<Value>) -> Result<&Self> {
        self.set_limit(MAX_EVENT_BEFORE_WARN, value.into())
    }

    /// Current limits as a [`RegistryConfig`].
    pub fn config(&self) -> RegistryConfig {
        RegistryConfig::read_from(self.store.as_ref())
    }

    fn set_limit(&self, key: &str, value: Value) -> Result<&Self> {
        let limit = validate_limit(key, &value)?;
        self.store.set(key, Value::from(limit));
        Ok(self)
    }
}

impl<M: EventMap> Default for EventRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: EventMap> fmt::Debug for EventRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        let lists: Vec<(String, usize)> = st
            .lists
            .iter()
            .map(|(key, list)| (key.name.to_string(), list.len()))
            .collect();
        f.debug_struct("EventRegistry")
            .field("lists", &lists)
            .field("warn_issued", &st.warn_issued.len())
            .field("config", &RegistryConfig::read_from(self.store.as_ref()))
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configures an [`EventRegistry`] before construction.
pub struct RegistryBuilder<M: EventMap> {
    config: Option<RegistryConfig>,
    max_event_listeners: Option<Value>,
    max_event_before_warn: Option<Value>,
    store: Option<Arc<dyn ConfigStore>>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    _map: PhantomData<fn() -> M>,
}

impl<M: EventMap> RegistryBuilder<M> {
    fn new() -> Self {
        Self {
            config: None,
            max_event_listeners: None,
            max_event_before_warn: None,
            store: None,
            diagnostics: None,
            _map: PhantomData,
        }
    }

    /// Seed both limits. Individual setters below take precedence.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Per-event listener cap, validated by [`build`](Self::build).
    pub fn max_event_listeners(mut self, value: impl Into<Value>) -> Self {
        self.max_event_listeners = Some(value.into());
        self
    }

    /// Leak-warning threshold, validated by [`build`](Self::build).
    pub fn max_event_before_warn(mut self, value: impl Into<Value>) -> Self {
        self.max_event_before_warn = Some(value.into());
        self
    }

    /// Keep limits in `store` instead of a private [`KvStore`].
    ///
    /// Values already in the store are used as-is unless a limit is also
    /// given to this builder.
    pub fn store(self, store: impl ConfigStore + 'static) -> Self {
        self.shared_store(Arc::new(store))
    }

    /// Like [`store`](Self::store), for a store shared with other owners.
    pub fn shared_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Send limit, leak, and panic reports to `diagnostics` instead of `tracing`.
    pub fn diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Some(Arc::new(diagnostics));
        self
    }

    /// Validate the limits and build the registry.
    pub fn build(self) -> Result<EventRegistry<M>> {
        let listeners = self
            .max_event_listeners
            .map(|v| validate_limit(MAX_EVENT_LISTENERS, &v))
            .transpose()?;
        let before_warn = self
            .max_event_before_warn
            .map(|v| validate_limit(MAX_EVENT_BEFORE_WARN, &v))
            .transpose()?;

        // A private store always starts from a full config; a supplied one
        // is only overwritten by what was given here.
        let (store, seed): (Arc<dyn ConfigStore>, _) = match self.store {
            Some(store) => (store, self.config),
            None => (
                Arc::new(KvStore::new()),
                Some(self.config.unwrap_or_default()),
            ),
        };
        if let Some(config) = seed {
            config.write_to(store.as_ref());
        }
        if let Some(n) = listeners {
            store.set(MAX_EVENT_LISTENERS, Value::from(n));
        }
        if let Some(n) = before_warn {
            store.set(MAX_EVENT_BEFORE_WARN, Value::from(n));
        }

        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| Arc::new(TracingDiagnostics));

        Ok(EventRegistry::from_parts(store, diagnostics))
    }
}
