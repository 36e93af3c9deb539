//! Subscription Bus
//!
//! A payload-free publish/subscribe notifier. Listeners learn that
//! "something changed" and go read whatever they care about.
//!
//! # Delivery
//!
//! `notify` calls listeners synchronously, in subscription order, on the
//! caller's stack. The listener list is snapshotted first and no lock is held
//! while a listener runs, so a listener may subscribe, unsubscribe, mutate
//! state, or trigger a nested `notify`. A listener removed during a round is
//! not called later in that round.
//!
//! A panicking listener aborts the round: listeners after it are not called.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::reactive::{Listener, Subscriber, SubscriberId};

#[derive(Default)]
struct BusInner {
    listeners: RwLock<Vec<Arc<Subscriber>>>,
}

impl BusInner {
    fn remove(&self, id: SubscriberId) -> bool {
        let mut removed = false;
        self.listeners.write().retain(|s| {
            if s.id() != id {
                return true;
            }
            removed |= s.deactivate();
            false
        });
        removed
    }
}

/// Fan-out notifier. Clones share the same listener list.
#[derive(Clone, Default)]
pub struct SubscriptionBus {
    inner: Arc<BusInner>,
}

impl SubscriptionBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for future notifications.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_listener(Arc::new(callback))
    }

    /// Register a shared listener.
    ///
    /// The same listener may be registered more than once; each registration
    /// is called on every notification.
    pub fn subscribe_listener(&self, listener: Listener) -> Subscription {
        let subscriber = Arc::new(Subscriber::new(listener));
        let id = subscriber.id();
        self.inner.listeners.write().push(subscriber);

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Remove every registration of `listener`. No-op if it is not registered.
    pub fn unsubscribe(&self, listener: &Listener) {
        self.inner.listeners.write().retain(|s| {
            if s.wraps(listener) {
                s.deactivate();
                return false;
            }
            true
        });
    }

    /// Call every registered listener.
    pub fn notify(&self) {
        let snapshot: Vec<Arc<Subscriber>> = self.inner.listeners.read().clone();
        for subscriber in snapshot {
            if subscriber.is_active() {
                subscriber.notify();
            }
        }
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.listeners.read().is_empty()
    }
}

impl std::fmt::Debug for SubscriptionBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionBus")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Capability to remove one registration.
///
/// Dropping it keeps the registration alive.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriberId,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Id of the registration this handle removes.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        self.bus.upgrade().is_some_and(|bus| bus.remove(self.id))
    }
}

impl std::fmt::Debug for BusInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusInner")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
