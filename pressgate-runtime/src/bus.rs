//! Supervisor notification bus
//!
//! Workers post [`Notification`] bits without blocking; bits accumulate
//! until the supervisor takes the whole set in one delivery. This mirrors
//! a task-notification word: posting the same bit twice before a delivery
//! is the same as posting it once.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pressgate_core::{Notification, Notifier};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    bits: AtomicU32,
    wake: Notify,
}

/// Cloneable handle to the notification word
#[derive(Debug, Clone, Default)]
pub struct NotificationBus {
    inner: Arc<Inner>,
}

impl NotificationBus {
    /// Empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `notification` bits and wake the supervisor
    pub fn post(&self, notification: Notification) {
        if notification.is_empty() {
            return;
        }
        self.inner.bits.fetch_or(notification.bits(), Ordering::AcqRel);
        self.inner.wake.notify_one();
    }

    /// Take every pending bit
    pub fn take(&self) -> Notification {
        Notification::from_bits(self.inner.bits.swap(0, Ordering::AcqRel))
    }

    /// Bits posted but not yet delivered
    pub fn pending(&self) -> Notification {
        Notification::from_bits(self.inner.bits.load(Ordering::Acquire))
    }

    /// Wait up to `timeout` for a delivery
    ///
    /// Returns an empty notification on timeout.
    pub async fn wait(&self, timeout: Duration) -> Notification {
        let pending = self.take();
        if !pending.is_empty() {
            return pending;
        }

        // A post between `take` and here leaves a permit, so this cannot miss it
        let _ = tokio::time::timeout(timeout, self.inner.wake.notified()).await;
        self.take()
    }
}

impl Notifier for NotificationBus {
    fn notify(&self, notification: Notification) {
        self.post(notification);
    }
}
