//! Store Implementation
//!
//! A Store is a reducer-driven state container. State changes only through
//! [`Store::dispatch`], which runs the reducer and then notifies every
//! subscriber on the store's [`SubscriptionBus`].
//!
//! # Persistence
//!
//! With [`StoreOptions::persist`] set, the store is bound to one storage key:
//!
//! - at construction, an empty slot is seeded with the JSON encoding of the
//!   initial state; an occupied slot is decoded and replaces the initial
//!   state. Malformed text fails construction.
//! - afterwards, every notification re-encodes and writes the whole state.
//!
//! # Failure
//!
//! The state is replaced only after the reducer returns. A reducer that
//! panics or returns an error leaves the previous state in place and no
//! subscriber is notified.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::bus::{Subscription, SubscriptionBus};
use super::options::StoreOptions;
use crate::error::{StateError, StateResult};
use crate::persist::Storage;
use crate::reactive::Listener;

type Reducer<T, A> = dyn Fn(&T, A) -> StateResult<T> + Send + Sync;

struct StoreInner<T, A> {
    state: RwLock<T>,
    reducer: Box<Reducer<T, A>>,
    bus: SubscriptionBus,
}

/// A reducer-driven state container.
///
/// Clones share the same state and subscribers.
///
/// # Example
///
/// ```rust
/// use tether_core::store::Store;
///
/// enum Action { Inc }
///
/// let store = Store::new(0, |count: &i32, action: Action| match action {
///     Action::Inc => count + 1,
/// });
///
/// store.dispatch(Action::Inc).unwrap();
/// assert_eq!(store.get_state(), 1);
/// ```
pub struct Store<T, A> {
    inner: Arc<StoreInner<T, A>>,
}

impl<T, A> Store<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: 'static,
{
    /// Create an unpersisted store with an infallible reducer.
    pub fn new<R>(initial: T, reducer: R) -> Self
    where
        R: Fn(&T, A) -> T + Send + Sync + 'static,
    {
        Self::from_reducer(
            initial,
            Box::new(move |state: &T, action: A| Ok(reducer(state, action))),
        )
    }

    /// Create an unpersisted store whose reducer may reject actions.
    pub fn fallible<R, E>(initial: T, reducer: R) -> Self
    where
        R: Fn(&T, A) -> Result<T, E> + Send + Sync + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::from_reducer(
            initial,
            Box::new(move |state: &T, action: A| {
                reducer(state, action).map_err(|err| StateError::Reducer(err.into()))
            }),
        )
    }

    fn from_reducer(initial: T, reducer: Box<Reducer<T, A>>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial),
                reducer,
                bus: SubscriptionBus::new(),
            }),
        }
    }

    /// Apply `action` through the reducer, then notify subscribers.
    ///
    /// The reducer runs under the state lock and must not use this store.
    pub fn dispatch(&self, action: A) -> StateResult<()> {
        {
            let mut state = self.inner.state.write();
            let next = (self.inner.reducer)(&state, action)?;
            *state = next;
        }
        tracing::trace!(subscribers = self.inner.bus.len(), "store dispatched");
        self.inner.bus.notify();
        Ok(())
    }

    /// Get a snapshot of the current state.
    pub fn get_state(&self) -> T {
        self.inner.state.read().clone()
    }

    /// Read the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.state.read())
    }

    /// Register `callback` for change notifications.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(callback)
    }

    /// Register a shared listener for change notifications.
    pub fn subscribe_listener(&self, listener: Listener) -> Subscription {
        self.inner.bus.subscribe_listener(listener)
    }

    /// Remove every registration of `listener`.
    pub fn unsubscribe(&self, listener: &Listener) {
        self.inner.bus.unsubscribe(listener);
    }

    /// Number of registered subscribers, including persistence listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.bus.len()
    }

    /// Replace part of the state without notifying. Used while loading.
    pub(crate) fn load_state(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.state.write());
    }

    pub(crate) fn downgrade(&self) -> WeakStore<T, A> {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<T, A> Store<T, A>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    A: 'static,
{
    /// Create a store with an infallible reducer, persisted per `options`.
    pub fn with_options<R>(
        initial: T,
        reducer: R,
        options: &StoreOptions,
        storage: Arc<dyn Storage>,
    ) -> StateResult<Self>
    where
        R: Fn(&T, A) -> T + Send + Sync + 'static,
    {
        Self::new(initial, reducer).attach(options, storage)
    }

    /// Create a store with a fallible reducer, persisted per `options`.
    pub fn fallible_with_options<R, E>(
        initial: T,
        reducer: R,
        options: &StoreOptions,
        storage: Arc<dyn Storage>,
    ) -> StateResult<Self>
    where
        R: Fn(&T, A) -> Result<T, E> + Send + Sync + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::fallible(initial, reducer).attach(options, storage)
    }

    fn attach(self, options: &StoreOptions, storage: Arc<dyn Storage>) -> StateResult<Self> {
        if !options.persist {
            return Ok(self);
        }
        let key = options.key.clone();

        match storage.get(&key) {
            None => {
                let text = self.with_state(|state| encode(&key, state))?;
                storage.set(&key, text)?;
                tracing::debug!(key = %key, "seeded persisted state");
            }
            Some(text) => {
                let loaded: T = serde_json::from_str(&text).map_err(|source| StateError::Decode {
                    key: key.clone(),
                    source,
                })?;
                self.load_state(|state| *state = loaded);
                tracing::debug!(key = %key, "restored persisted state");
            }
        }

        let weak = self.downgrade();
        self.subscribe(move || {
            let Some(store) = weak.upgrade() else {
                return;
            };
            let written = store
                .with_state(|state| encode(&key, state))
                .and_then(|text| storage.set(&key, text));
            if let Err(err) = written {
                tracing::error!(key = %key, error = %err, "failed to persist state");
            }
        });

        Ok(self)
    }
}

fn encode<T: Serialize>(key: &str, state: &T) -> StateResult<String> {
    serde_json::to_string(state).map_err(|source| StateError::Encode {
        key: key.to_string(),
        source,
    })
}

impl<T, A> Clone for Store<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, A> Debug for Store<T, A>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.read())
            .field("subscribers", &self.inner.bus.len())
            .finish()
    }
}

/// Non-owning store reference held by the store's own listeners.
pub(crate) struct WeakStore<T, A> {
    inner: Weak<StoreInner<T, A>>,
}

impl<T, A> WeakStore<T, A> {
    pub(crate) fn upgrade(&self) -> Option<Store<T, A>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl<T, A> Clone for WeakStore<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}
