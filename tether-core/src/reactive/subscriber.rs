//! Subscriber identities.
//!
//! Every registration on a [`SubscriptionBus`](crate::store::SubscriptionBus)
//! and every effect registered on a [`Signal`](super::Signal) gets a
//! [`SubscriberId`]. Ids are what make "remove exactly this registration"
//! possible when the same callback has been registered more than once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter so ids stay unique across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared, payload-free change callback.
///
/// Listeners are compared by pointer identity when removed with
/// [`SubscriptionBus::unsubscribe`](crate::store::SubscriptionBus::unsubscribe).
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// One registration of a listener.
pub struct Subscriber {
    id: SubscriberId,
    notify: Listener,
    active: AtomicBool,
}

impl Subscriber {
    /// Wrap a listener under a fresh id.
    pub fn new(notify: Listener) -> Self {
        Self {
            id: SubscriberId::new(),
            notify,
            active: AtomicBool::new(true),
        }
    }

    /// Whether the registration is still live.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the registration removed. Returns `false` if it already was.
    pub fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether this registration wraps `listener`.
    pub fn wraps(&self, listener: &Listener) -> bool {
        Arc::ptr_eq(&self.notify, listener)
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_calls_callback() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let subscriber = Subscriber::new(Arc::new(move || {
            called_clone.store(true, Ordering::SeqCst);
        }));

        assert!(!called.load(Ordering::SeqCst));
        subscriber.notify();
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn deactivate_reports_first_call_only() {
        let subscriber = Subscriber::new(Arc::new(|| {}));
        assert!(subscriber.is_active());
        assert!(subscriber.deactivate());
        assert!(!subscriber.deactivate());
        assert!(!subscriber.is_active());
    }

    #[test]
    fn wraps_compares_by_identity() {
        let a: Listener = Arc::new(|| {});
        let b: Listener = Arc::new(|| {});
        let subscriber = Subscriber::new(a.clone());

        assert!(subscriber.wraps(&a));
        assert!(!subscriber.wraps(&b));
    }
}
