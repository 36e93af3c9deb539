//! Value Cell
//!
//! A [`ValueCell`] is the simplest stateful primitive: one value plus two
//! hooks that bracket every write. Unlike a [`Signal`](super::Signal), a cell
//! never compares the new value with the old one. Every `set` runs both
//! hooks.
//!
//! # Re-assertion after construction
//!
//! Building a cell schedules one deferred `set` of the cell's current value
//! on the supplied [`Scheduler`]. Callers rely on this to get a single
//! `before_update`/`after_update` cycle once their setup code has finished
//! wiring things together. Pass
//! [`CellHooks::reassert_on_init(false)`](CellHooks::reassert_on_init) to
//! opt out.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::scheduler::Scheduler;

/// A write hook.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Hooks and options for a [`ValueCell`].
///
/// Both hooks default to no-ops.
#[derive(Clone)]
pub struct CellHooks {
    before_update: Hook,
    after_update: Hook,
    reassert_on_init: bool,
}

impl CellHooks {
    /// Run `hook` before each write.
    pub fn before_update<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.before_update = Arc::new(hook);
        self
    }

    /// Run `hook` after each write.
    pub fn after_update<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.after_update = Arc::new(hook);
        self
    }

    /// Whether to schedule the post-construction re-assertion. Defaults to `true`.
    pub fn reassert_on_init(mut self, enabled: bool) -> Self {
        self.reassert_on_init = enabled;
        self
    }
}

impl Default for CellHooks {
    fn default() -> Self {
        Self {
            before_update: Arc::new(|| {}),
            after_update: Arc::new(|| {}),
            reassert_on_init: true,
        }
    }
}

impl Debug for CellHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellHooks")
            .field("reassert_on_init", &self.reassert_on_init)
            .finish_non_exhaustive()
    }
}

struct CellInner<T> {
    value: RwLock<T>,
    hooks: CellHooks,
}

impl<T> CellInner<T> {
    fn set(&self, value: T) {
        (self.hooks.before_update)();
        *self.value.write() = value;
        (self.hooks.after_update)();
    }
}

/// A mutable value with write hooks.
///
/// Clones share the same value.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::{CellHooks, ValueCell};
/// use tether_core::scheduler::ManualScheduler;
///
/// let scheduler = ManualScheduler::new();
/// let hooks = CellHooks::default().after_update(|| println!("written"));
/// let cell = ValueCell::with_hooks(1, hooks, &scheduler);
///
/// cell.set(2);
/// assert_eq!(cell.get(), 2);
/// ```
pub struct ValueCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> ValueCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell with no-op hooks.
    pub fn new(value: T, scheduler: &dyn Scheduler) -> Self {
        Self::with_hooks(value, CellHooks::default(), scheduler)
    }

    /// Create a cell with the given hooks.
    pub fn with_hooks(value: T, hooks: CellHooks, scheduler: &dyn Scheduler) -> Self {
        let reassert = hooks.reassert_on_init;
        let cell = Self {
            inner: Arc::new(CellInner {
                value: RwLock::new(value),
                hooks,
            }),
        };

        if reassert {
            // Weak so a dropped cell is not kept alive by its pending task.
            let weak = Arc::downgrade(&cell.inner);
            scheduler.schedule(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let current = inner.value.read().clone();
                    tracing::trace!("re-asserting value cell");
                    inner.set(current);
                }
            }));
        }

        cell
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Replace the value, running both hooks.
    ///
    /// No equality check is made: setting the current value again still
    /// runs the hooks.
    pub fn set(&self, value: T) {
        self.inner.set(value);
    }

    /// Replace the value with `f(current)`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.inner.value.read());
        self.set(next);
    }
}

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for ValueCell<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCell")
            .field("value", &*self.inner.value.read())
            .finish()
    }
}
