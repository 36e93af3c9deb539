//! Partitioned Store
//!
//! A [`Store`] over a flat map of scalar fields whose persistence is split
//! per field: field `f` of a store keyed `k` lives in slot `k:f`, stored as
//! plain text rather than JSON.
//!
//! # Loading
//!
//! For each field of the initial state, an empty slot is seeded with the
//! field's text form; an occupied slot is decoded with the field's
//! [`Coercion`] and replaces the initial value. Coercions come from
//! [`StoreOptions::fields`], falling back to the kind of the initial value.
//!
//! # Write-back
//!
//! One listener per field compares the in-memory value with the raw slot
//! text on every notification (see [`Scalar::differs_from_stored`]). A dirty
//! field gets a write scheduled on the [`Scheduler`]. While that write is
//! pending, further notifications do not schedule another one; the write
//! stores whatever the field holds when it finally runs.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::bus::Subscription;
use super::container::{Store, WeakStore};
use super::options::{Coercion, StoreOptions};
use super::scalar::{PartitionState, Scalar};
use crate::error::{StateError, StateResult};
use crate::persist::{field_slot, Storage};
use crate::reactive::Listener;
use crate::scheduler::Scheduler;

/// A reducer-driven store of scalar fields with per-field persistence.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tether_core::persist::{MemoryStorage, Storage};
/// use tether_core::scheduler::ManualScheduler;
/// use tether_core::store::{PartitionState, PartitionedStore, Scalar, StoreOptions};
///
/// let storage = Arc::new(MemoryStorage::new());
/// let scheduler = Arc::new(ManualScheduler::new());
/// let initial: PartitionState = [("count".to_string(), Scalar::from(0))].into_iter().collect();
///
/// let store = PartitionedStore::with_options(
///     initial,
///     |state: &PartitionState, by: f64| {
///         let mut next = state.clone();
///         let count = next["count"].as_number().unwrap_or(0.0);
///         next.insert("count".into(), Scalar::from(count + by));
///         next
///     },
///     &StoreOptions::persisted("state"),
///     storage.clone(),
///     scheduler.clone(),
/// )
/// .unwrap();
///
/// assert_eq!(storage.get("state:count").as_deref(), Some("0"));
///
/// store.dispatch(2.0).unwrap();
/// scheduler.run_until_idle();
/// assert_eq!(storage.get("state:count").as_deref(), Some("2"));
/// ```
pub struct PartitionedStore<A> {
    store: Store<PartitionState, A>,
}

impl<A> PartitionedStore<A>
where
    A: 'static,
{
    /// Create an unpersisted store.
    pub fn new<R>(initial: PartitionState, reducer: R) -> Self
    where
        R: Fn(&PartitionState, A) -> PartitionState + Send + Sync + 'static,
    {
        Self {
            store: Store::new(initial, reducer),
        }
    }

    /// Create a store persisted field by field per `options`.
    ///
    /// Deferred write-backs go to `scheduler`.
    pub fn with_options<R>(
        initial: PartitionState,
        reducer: R,
        options: &StoreOptions,
        storage: Arc<dyn Storage>,
        scheduler: Arc<dyn Scheduler>,
    ) -> StateResult<Self>
    where
        R: Fn(&PartitionState, A) -> PartitionState + Send + Sync + 'static,
    {
        let partitioned = Self::new(initial, reducer);
        if options.persist {
            partitioned.attach(options, storage, scheduler)?;
        }
        Ok(partitioned)
    }

    fn attach(
        &self,
        options: &StoreOptions,
        storage: Arc<dyn Storage>,
        scheduler: Arc<dyn Scheduler>,
    ) -> StateResult<()> {
        let fields = self.store.with_state(|state| -> StateResult<Vec<(String, Coercion)>> {
            if let Some(unknown) = options.fields.keys().find(|name| !state.contains_key(*name)) {
                return Err(StateError::UnknownField(unknown.clone()));
            }
            Ok(state
                .iter()
                .map(|(name, value)| {
                    let coercion = options
                        .fields
                        .get(name)
                        .copied()
                        .unwrap_or_else(|| Coercion::for_value(value));
                    (name.clone(), coercion)
                })
                .collect())
        })?;

        for (field, coercion) in fields {
            let slot = field_slot(&options.key, &field);
            match storage.get(&slot) {
                None => {
                    let text = self
                        .store
                        .with_state(|state| state.get(&field).map(Scalar::to_stored));
                    if let Some(text) = text {
                        storage.set(&slot, text)?;
                        tracing::debug!(slot = %slot, "seeded field");
                    }
                }
                Some(raw) => {
                    let value = coercion.coerce(&raw);
                    self.store.load_state(|state| {
                        state.insert(field.clone(), value);
                    });
                    tracing::debug!(slot = %slot, ?coercion, "restored field");
                }
            }

            let writer = FieldWriter {
                store: self.store.downgrade(),
                storage: storage.clone(),
                scheduler: scheduler.clone(),
                field,
                slot,
                pending: Arc::new(AtomicBool::new(false)),
            };
            self.store.subscribe(move || writer.on_notify());
        }

        Ok(())
    }

    /// Apply `action` through the reducer, then notify subscribers.
    pub fn dispatch(&self, action: A) -> StateResult<()> {
        self.store.dispatch(action)
    }

    /// Get a snapshot of the current state.
    pub fn get_state(&self) -> PartitionState {
        self.store.get_state()
    }

    /// Read the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&PartitionState) -> R) -> R {
        self.store.with_state(f)
    }

    /// Current value of one field.
    pub fn field(&self, name: &str) -> Option<Scalar> {
        self.store.with_state(|state| state.get(name).cloned())
    }

    /// Register `callback` for change notifications.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    /// Register a shared listener for change notifications.
    pub fn subscribe_listener(&self, listener: Listener) -> Subscription {
        self.store.subscribe_listener(listener)
    }

    /// Remove every registration of `listener`.
    pub fn unsubscribe(&self, listener: &Listener) {
        self.store.unsubscribe(listener);
    }

    /// Number of registered subscribers, including per-field writers.
    pub fn subscriber_count(&self) -> usize {
        self.store.subscriber_count()
    }
}

impl<A> Clone for PartitionedStore<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<A> Debug for PartitionedStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedStore")
            .field("store", &self.store)
            .finish()
    }
}

/// Per-field write-back listener.
struct FieldWriter<A> {
    store: WeakStore<PartitionState, A>,
    storage: Arc<dyn Storage>,
    scheduler: Arc<dyn Scheduler>,
    field: String,
    slot: String,
    pending: Arc<AtomicBool>,
}

impl<A: 'static> FieldWriter<A> {
    fn on_notify(&self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let stored = self.storage.get(&self.slot);
        let dirty = store.with_state(|state| {
            state
                .get(&self.field)
                .is_some_and(|value| value.differs_from_stored(stored.as_deref()))
        });
        if !dirty || self.pending.swap(true, Ordering::AcqRel) {
            return;
        }

        let store = self.store.clone();
        let storage = self.storage.clone();
        let field = self.field.clone();
        let slot = self.slot.clone();
        let pending = self.pending.clone();
        self.scheduler.schedule(Box::new(move || {
            pending.store(false, Ordering::Release);
            let Some(store) = store.upgrade() else {
                return;
            };
            let text = store.with_state(|state| state.get(&field).map(Scalar::to_stored));
            let Some(text) = text else {
                return;
            };
            if let Err(err) = storage.set(&slot, text) {
                tracing::error!(slot = %slot, error = %err, "failed to persist field");
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::testing::ReadOnlyStorage;
    use crate::persist::MemoryStorage;
    use crate::scheduler::ManualScheduler;

    enum Action {
        Set(&'static str, Scalar),
    }

    fn reduce(state: &PartitionState, action: Action) -> PartitionState {
        let mut next = state.clone();
        match action {
            Action::Set(field, value) => {
                next.insert(field.to_string(), value);
            }
        }
        next
    }

    fn prefs() -> PartitionState {
        [
            ("count".to_string(), Scalar::from(0)),
            ("dark".to_string(), Scalar::from(false)),
            ("theme".to_string(), Scalar::from("light")),
        ]
        .into_iter()
        .collect()
    }

    fn persisted(
        storage: &Arc<MemoryStorage>,
        scheduler: &Arc<ManualScheduler>,
        options: StoreOptions,
    ) -> StateResult<PartitionedStore<Action>> {
        PartitionedStore::with_options(
            prefs(),
            reduce,
            &options,
            storage.clone(),
            scheduler.clone(),
        )
    }

    #[test]
    fn seeds_each_field_as_plain_text() {
        let storage = Arc::new(MemoryStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        persisted(&storage, &scheduler, StoreOptions::persisted("state")).unwrap();

        assert_eq!(storage.get("state:count").as_deref(), Some("0"));
        assert_eq!(storage.get("state:dark").as_deref(), Some("false"));
        assert_eq!(storage.get("state:theme").as_deref(), Some("light"));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn restores_and_coerces_by_initial_kind() {
        let storage: Arc<MemoryStorage> = Arc::new(
            [("prefs:count", "12"), ("prefs:dark", "false"), ("prefs:theme", "dusk")]
                .into_iter()
                .collect(),
        );
        let scheduler = Arc::new(ManualScheduler::new());
        let store = persisted(&storage, &scheduler, StoreOptions::persisted("prefs")).unwrap();

        assert_eq!(store.field("count"), Some(Scalar::Number(12.0)));
        // Any non-empty text is truthy.
        assert_eq!(store.field("dark"), Some(Scalar::Bool(true)));
        assert_eq!(store.field("theme"), Some(Scalar::from("dusk")));
    }

    #[test]
    fn configured_coercion_overrides_inferred_kind() {
        let storage: Arc<MemoryStorage> = Arc::new([("state:count", "007")].into_iter().collect());
        let scheduler = Arc::new(ManualScheduler::new());
        let options = StoreOptions::persisted("state").with_field("count", Coercion::Text);
        let store = persisted(&storage, &scheduler, options).unwrap();

        assert_eq!(store.field("count"), Some(Scalar::from("007")));
    }

    #[test]
    fn unknown_configured_field_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let options = StoreOptions::persisted("state").with_field("missing", Coercion::Number);

        let result = persisted(&storage, &scheduler, options);
        assert!(matches!(result, Err(StateError::UnknownField(name)) if name == "missing"));
        assert!(storage.is_empty());
    }

    #[test]
    fn writes_are_deferred_to_the_scheduler() {
        let storage = Arc::new(MemoryStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let store = persisted(&storage, &scheduler, StoreOptions::persisted("state")).unwrap();

        store.dispatch(Action::Set("count", Scalar::from(5))).unwrap();
        assert_eq!(storage.get("state:count").as_deref(), Some("0"));

        scheduler.run_until_idle();
        assert_eq!(storage.get("state:count").as_deref(), Some("5"));
    }

    #[test]
    fn bursts_coalesce_into_last_value() {
        let storage = Arc::new(MemoryStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let store = persisted(&storage, &scheduler, StoreOptions::persisted("state")).unwrap();

        for n in 1..=5 {
            store.dispatch(Action::Set("count", Scalar::from(n))).unwrap();
        }
        // Numbers are always dirty, so each field has one pending write.
        assert_eq!(scheduler.pending(), 2);

        scheduler.run_pending();
        assert_eq!(storage.get("state:count").as_deref(), Some("5"));
    }

    #[test]
    fn unchanged_text_field_is_not_rewritten() {
        let storage = Arc::new(MemoryStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let store = persisted(&storage, &scheduler, StoreOptions::persisted("state")).unwrap();

        store.dispatch(Action::Set("theme", Scalar::from("light"))).unwrap();
        // count and dark are always dirty; theme matches its slot.
        assert_eq!(scheduler.pending(), 2);

        store.dispatch(Action::Set("theme", Scalar::from("dark"))).unwrap();
        assert_eq!(scheduler.pending(), 3);
        scheduler.run_until_idle();
        assert_eq!(storage.get("state:theme").as_deref(), Some("dark"));
    }

    #[test]
    fn seeding_failure_fails_construction() {
        let storage = Arc::new(ReadOnlyStorage::new(&[("state:count", "1")]));
        let scheduler = Arc::new(ManualScheduler::new());
        let result = PartitionedStore::with_options(
            prefs(),
            reduce,
            &StoreOptions::persisted("state"),
            storage,
            scheduler,
        );

        assert!(matches!(result, Err(StateError::Storage { key, .. }) if key == "state:dark"));
    }

    #[test]
    fn failed_write_back_is_dropped() {
        let storage = Arc::new(ReadOnlyStorage::new(&[
            ("state:count", "1"),
            ("state:dark", "true"),
            ("state:theme", "dusk"),
        ]));
        let scheduler = Arc::new(ManualScheduler::new());
        let store = PartitionedStore::with_options(
            prefs(),
            reduce,
            &StoreOptions::persisted("state"),
            storage.clone(),
            scheduler.clone(),
        )
        .unwrap();

        store.dispatch(Action::Set("count", Scalar::from(9))).unwrap();
        assert_eq!(scheduler.run_until_idle(), 2);
        assert_eq!(store.field("count"), Some(Scalar::Number(9.0)));
        assert_eq!(storage.get("state:count").as_deref(), Some("1"));

        // The pending flag was released, so the next change schedules again.
        store.dispatch(Action::Set("count", Scalar::from(10))).unwrap();
        assert_eq!(scheduler.pending(), 2);
    }

    #[test]
    fn unpersisted_store_has_no_writers() {
        let storage = Arc::new(MemoryStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let store = persisted(&storage, &scheduler, StoreOptions::default()).unwrap();

        store.dispatch(Action::Set("count", Scalar::from(1))).unwrap();
        assert_eq!(store.subscriber_count(), 0);
        assert!(storage.is_empty());
        assert_eq!(scheduler.pending(), 0);
    }
}
