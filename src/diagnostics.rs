//! Observability sink for non-fatal registry conditions.

use std::fmt;

/// Receives the registry's diagnostic reports.
///
/// `event` is the event name. Each method is called once per qualifying
/// occurrence; none of them can alter registry behavior.
pub trait Diagnostics: Send + Sync {
    /// `on()` rejected a listener because the event already holds `limit`.
    fn listener_limit_reached(&self, event: &dyn fmt::Display, limit: usize);

    /// An event reached the leak-warning threshold for the first time.
    fn possible_leak(&self, event: &dyn fmt::Display, listeners: usize);

    /// A listener panicked during `emit()`. The remaining listeners still ran.
    fn listener_panicked(&self, event: &dyn fmt::Display, message: &str);
}

/// Default sink: reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn listener_limit_reached(&self, event: &dyn fmt::Display, limit: usize) {
        tracing::warn!(
            event = %event,
            limit,
            "maximum number of event listeners reached; listener not added"
        );
    }

    fn possible_leak(&self, event: &dyn fmt::Display, listeners: usize) {
        tracing::warn!(
            event = %event,
            listeners,
            "possible memory leak: event has {listeners} listeners"
        );
    }

    fn listener_panicked(&self, event: &dyn fmt::Display, message: &str) {
        tracing::error!(event = %event, panic = %message, "event listener panicked");
    }
}
