//! Registry configuration.
//!
//! Limits live in a [`ConfigStore`], a small key-value collaborator the
//! registry reads on every `on()`. [`KvStore`] is the in-memory default;
//! plug in another store to share or persist settings. [`RegistryConfig`] is
//! the serde-friendly form used to seed a store.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Store key for the per-event listener cap.
pub const MAX_EVENT_LISTENERS: &str = "maxEventListeners";
/// Store key for the leak-warning threshold.
pub const MAX_EVENT_BEFORE_WARN: &str = "maxEventBeforeWarn";

pub const DEFAULT_MAX_EVENT_LISTENERS: usize = 0;
pub const DEFAULT_MAX_EVENT_BEFORE_WARN: usize = 10;

// ============================================================================
// ConfigStore
// ============================================================================

/// Generic get/set storage for configuration values.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);
}

/// In-memory [`ConfigStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct KvStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with the values of `config`.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let store = Self::new();
        config.write_to(&store);
        store
    }
}

impl ConfigStore for KvStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries.lock().insert(key.to_string(), value);
    }
}

// ============================================================================
// RegistryConfig
// ============================================================================

/// Listener limits for an `EventRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Maximum listeners per event name. `0` means unlimited.
    pub max_event_listeners: usize,
    /// Listener count at which a one-time leak warning is issued.
    pub max_event_before_warn: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_event_listeners: DEFAULT_MAX_EVENT_LISTENERS,
            max_event_before_warn: DEFAULT_MAX_EVENT_BEFORE_WARN,
        }
    }
}

impl RegistryConfig {
    /// Read both limits from `store`, falling back to defaults for missing
    /// or unusable entries.
    pub fn read_from(store: &dyn ConfigStore) -> Self {
        Self {
            max_event_listeners: read_limit(store, MAX_EVENT_LISTENERS)
                .unwrap_or(DEFAULT_MAX_EVENT_LISTENERS),
            max_event_before_warn: read_limit(store, MAX_EVENT_BEFORE_WARN)
                .unwrap_or(DEFAULT_MAX_EVENT_BEFORE_WARN),
        }
    }

    pub fn write_to(&self, store: &dyn ConfigStore) {
        store.set(MAX_EVENT_LISTENERS, Value::from(self.max_event_listeners));
        store.set(MAX_EVENT_BEFORE_WARN, Value::from(self.max_event_before_warn));
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Read `key` from `store` as a limit. `None` when absent or invalid.
pub(crate) fn read_limit(store: &dyn ConfigStore, key: &str) -> Option<usize> {
    store.get(key).and_then(|v| validate_limit(key, &v).ok())
}

/// Accept finite, non-negative, integral numbers.
pub(crate) fn validate_limit(path: &str, value: &Value) -> Result<usize, ValidationError> {
    let expected = "a finite non-negative integer";
    let reject = || ValidationError::new(path, expected, describe(value));

    let Value::Number(n) = value else {
        return Err(reject());
    };

    if let Some(u) = n.as_u64() {
        return usize::try_from(u).map_err(|_| reject());
    }
    if n.is_i64() {
        // Only negative integers reach here.
        return Err(reject());
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => {
            Ok(f as usize)
        }
        _ => Err(reject()),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean ({b})"),
        Value::Number(n) => format!("number ({n})"),
        Value::String(s) => format!("string ({s:?})"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
