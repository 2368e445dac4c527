//! Cooperative cancellation shared between the operator's signal handler
//! and every suspension point in the engine.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Clonable cancellation flag. All clones observe the same state; once
/// cancelled it stays cancelled.
#[derive(Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags cancellation and wakes every pending [`cancelled`](Self::cancelled) future.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called, immediately if
    /// it already was. The waiter is registered before the flag is checked so
    /// a concurrent `cancel` cannot slip between the two.
    pub async fn cancelled(&self) {
        let mut notified = pin!(self.inner.notify.notified());
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
