//! Signal Implementation
//!
//! A Signal is the root of a small dependency graph: one value, any number
//! of [`Memo`]s derived from it, and a registry of effects.
//!
//! # How Signals Work
//!
//! 1. `set` compares the new value with the current one. Equal values are
//!    ignored entirely, with no effect checks and no memo updates.
//!
//! 2. A changed value is stored, then every registered effect is checked
//!    (see [`effect`](super::effect) for the trigger rule). Checking an
//!    effect updates its memo dependencies eagerly, even when the effect
//!    ends up not running.
//!
//! 3. Memos that are not effect dependencies stay untouched until read.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock`. No lock is held while
//! effects run, so an effect may read this signal, read memos, or call
//! `set` again (which starts a nested round).

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::effect::{Dependencies, EffectHandle, EffectRegistry};
use super::memo::{Memo, MemoNode};

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub(crate) struct SignalInner<T> {
    id: u64,
    pub(crate) value: RwLock<T>,
    effects: Arc<EffectRegistry>,
}

/// A reactive value with equality-gated updates.
///
/// # Type Parameters
///
/// - `T`: The stored value. `PartialEq` decides whether `set` is a change.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::Signal;
///
/// let count = Signal::new(2);
/// let doubled = count.derive(|x| x * 2);
///
/// count.use_effect(|| println!("doubled changed"), &[doubled.node()]);
///
/// count.set(3);
/// assert_eq!(doubled.get(), 6);
/// ```
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: next_signal_id(),
                value: RwLock::new(value),
                effects: Arc::new(EffectRegistry::default()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the current value. Never recomputes anything.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Set a new value and run triggered effects.
    ///
    /// Does nothing if `value` equals the current value.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return;
            }
            *guard = value;
        }

        tracing::trace!(signal = self.inner.id, "signal changed");
        self.inner.effects.run_triggered();
    }

    /// Set the value to `f(current)`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.inner.value.read());
        self.set(next);
    }

    /// Create a memo computed from this signal's value.
    ///
    /// `compute` runs once immediately, then again only when the memo is
    /// updated after the signal's value has changed.
    pub fn derive<U, F>(&self, compute: F) -> Memo<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Memo::new(&self.inner, compute)
    }

    /// Register an effect that runs when this signal changes.
    ///
    /// With no `dependencies` the effect runs on every change. Otherwise it
    /// runs only when one of the listed memos actually changed value. The
    /// effect is not run at registration.
    pub fn use_effect<F>(&self, effect: F, dependencies: &[MemoNode]) -> EffectHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let dependencies: Dependencies = dependencies.iter().cloned().collect();
        self.inner.effects.register(effect, dependencies)
    }

    /// Number of registered (not disposed) effects.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.len()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("effect_count", &self.inner.effects.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
