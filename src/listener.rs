//! Listener handles.
//!
//! A [`Listener`] is an `Arc`'d closure. Its identity is the allocation, so
//! keep the handle returned by [`listener`] around to pass to `off()` later.
//! Cloning the handle keeps the same identity.

use std::future::Future;
use std::sync::Arc;

/// Shared closure invoked with each emitted payload.
pub type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Wrap `callback` in a [`Listener`] handle.
pub fn listener<P, F>(callback: F) -> Listener<P>
where
    F: Fn(&P) + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Wrap an async `callback` in a fire-and-forget [`Listener`].
///
/// Every invocation clones the payload and spawns the returned future on the
/// current tokio runtime. The registry never awaits it, and a panic inside the
/// task is reported by tokio rather than by `emit()`. Emitting outside a
/// runtime drops the invocation with a warning.
pub fn async_listener<P, F, Fut>(callback: F) -> Listener<P>
where
    P: Clone + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |payload: &P| match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            // JoinHandle dropped on purpose: the task is detached.
            drop(handle.spawn(callback(payload.clone())));
        }
        Err(e) => {
            tracing::warn!(error = %e, "async listener invoked outside a tokio runtime, skipped");
        }
    })
}

/// Pointer identity of two listener handles.
pub(crate) fn same_listener<P: ?Sized>(a: &Arc<P>, b: &Arc<P>) -> bool {
    Arc::ptr_eq(a, b)
}
