//! Memo Implementation
//!
//! A Memo is a cached value derived from a [`Signal`](super::Signal).
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs its computation once and remembers the
//!    upstream value it computed from.
//!
//! 2. `update()` compares the signal's current value with that snapshot. If
//!    they are equal, nothing happens. Otherwise the memo recomputes and, if
//!    the result differs from the cached value, marks itself stale.
//!
//! 3. `get()` runs `update()`, clears the stale flag, and returns the cached
//!    value.
//!
//! Reads are pull-based: a memo nobody reads never recomputes. The exception
//! is a memo used as an effect dependency, which `Signal::set` updates
//! eagerly so it can decide whether the effect should fire.
//!
//! # Stale State
//!
//! [`MemoState::Stale`] means "the value changed and nobody has read it yet".
//! It is set only by a recomputation that produced a different value and
//! cleared only by `get()`. Effects use it as their trigger.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::signal::SignalInner;

/// Counter for generating unique memo IDs.
static MEMO_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique memo ID.
fn next_memo_id() -> u64 {
    MEMO_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Read state of a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value has been read since it last changed.
    Clean,

    /// The cached value changed and has not been read yet.
    Stale,
}

/// Something an effect can depend on.
pub trait Tracked: Send + Sync {
    /// Bring the cached value up to date with its source.
    fn update(&self);

    /// Whether the value changed since it was last read.
    fn is_dirty(&self) -> bool;
}

/// Type-erased dependency token handed to [`Signal::use_effect`](super::Signal::use_effect).
pub type MemoNode = Arc<dyn Tracked>;

struct MemoSlot<T, U> {
    value: U,
    derived_from: T,
    state: MemoState,
}

struct MemoInner<T, U> {
    id: u64,
    source: Weak<SignalInner<T>>,
    compute: Box<dyn Fn(&T) -> U + Send + Sync>,
    slot: Mutex<MemoSlot<T, U>>,
    recomputes: AtomicUsize,
}

impl<T, U> Tracked for MemoInner<T, U>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    U: Clone + PartialEq + Send + Sync + 'static,
{
    fn update(&self) {
        // Memos only hold their signal weakly; once it is gone the cache is final.
        let Some(source) = self.source.upgrade() else {
            return;
        };

        let mut slot = self.slot.lock();
        let upstream = {
            let current = source.value.read();
            if *current == slot.derived_from {
                return;
            }
            current.clone()
        };

        let next = (self.compute)(&upstream);
        slot.derived_from = upstream;
        self.recomputes.fetch_add(1, Ordering::Relaxed);

        if next != slot.value {
            slot.value = next;
            slot.state = MemoState::Stale;
            tracing::trace!(memo = self.id, "memo value changed");
        }
    }

    fn is_dirty(&self) -> bool {
        self.slot.lock().state == MemoState::Stale
    }
}

/// Typed view over a memo, hiding the source value type.
trait Derived<U>: Send + Sync {
    fn id(&self) -> u64;
    fn read(&self) -> U;
    fn state(&self) -> MemoState;
    fn recompute_count(&self) -> usize;
}

impl<T, U> Derived<U> for MemoInner<T, U>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    U: Clone + PartialEq + Send + Sync + 'static,
{
    fn id(&self) -> u64 {
        self.id
    }

    fn read(&self) -> U {
        self.update();
        let mut slot = self.slot.lock();
        slot.state = MemoState::Clean;
        slot.value.clone()
    }

    fn state(&self) -> MemoState {
        self.slot.lock().state
    }

    fn recompute_count(&self) -> usize {
        self.recomputes.load(Ordering::Relaxed)
    }
}

/// A cached value derived from a signal.
///
/// Created with [`Signal::derive`](super::Signal::derive). Clones share the
/// same cache.
///
/// # Type Parameters
///
/// - `U`: The derived value. `PartialEq` decides whether a recomputation
///   counts as a change.
pub struct Memo<U> {
    inner: Arc<dyn Derived<U>>,
    node: MemoNode,
}

impl<U> Memo<U>
where
    U: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new<T, F>(source: &Arc<SignalInner<T>>, compute: F) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let derived_from = source.value.read().clone();
        let value = compute(&derived_from);

        let inner = Arc::new(MemoInner {
            id: next_memo_id(),
            source: Arc::downgrade(source),
            compute: Box::new(compute),
            slot: Mutex::new(MemoSlot {
                value,
                derived_from,
                state: MemoState::Clean,
            }),
            recomputes: AtomicUsize::new(0),
        });

        Self {
            node: inner.clone(),
            inner,
        }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    /// Get the current value, recomputing if the source changed.
    ///
    /// Always leaves the memo [`MemoState::Clean`].
    pub fn get(&self) -> U {
        self.inner.read()
    }

    /// Dependency token for [`Signal::use_effect`](super::Signal::use_effect).
    pub fn node(&self) -> MemoNode {
        Arc::clone(&self.node)
    }

    /// Get the current read state.
    pub fn state(&self) -> MemoState {
        self.inner.state()
    }

    /// Number of recomputations since creation. The initial computation is
    /// not counted.
    pub fn recompute_count(&self) -> usize {
        self.inner.recompute_count()
    }
}

impl<U> Clone for Memo<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            node: Arc::clone(&self.node),
        }
    }
}

impl<U> Debug for Memo<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id())
            .field("state", &self.inner.state())
            .field("recomputes", &self.inner.recompute_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::Signal;
    use super::*;

    #[test]
    fn memo_computes_on_creation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let source = Signal::new(2);

        let memo = source.derive(move |x| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            x * 2
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.get(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.recompute_count(), 0);
    }

    #[test]
    fn memo_caches_value_when_source_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let source = Signal::new(1);

        let memo = source.derive(move |x| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            x + 1
        });

        source.set(5);
        assert_eq!(memo.get(), 6);
        assert_eq!(memo.get(), 6);
        assert_eq!(memo.get(), 6);

        // One at creation, one after the set.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn memo_is_lazy_without_effects() {
        let source = Signal::new(1);
        let memo = source.derive(|x| x * 10);

        source.set(2);
        source.set(3);
        assert_eq!(memo.recompute_count(), 0);

        assert_eq!(memo.get(), 30);
        assert_eq!(memo.recompute_count(), 1);
    }

    #[test]
    fn memo_state_transitions() {
        let source = Signal::new(1);
        let memo = source.derive(|x| x % 2);
        let node = memo.node();

        assert_eq!(memo.state(), MemoState::Clean);

        // Changed result: stale until read.
        source.set(2);
        node.update();
        assert_eq!(memo.state(), MemoState::Stale);
        assert!(node.is_dirty());

        memo.get();
        assert_eq!(memo.state(), MemoState::Clean);

        // Recomputed but equal result: stays clean.
        source.set(4);
        node.update();
        assert_eq!(memo.state(), MemoState::Clean);
        assert_eq!(memo.recompute_count(), 2);
    }

    #[test]
    fn memo_clone_shares_state() {
        let source = Signal::new(1);
        let memo1 = source.derive(|x| x * 3);
        let memo2 = memo1.clone();

        assert_eq!(memo1.id(), memo2.id());

        source.set(2);
        memo1.node().update();
        assert_eq!(memo2.state(), MemoState::Stale);
        assert_eq!(memo2.get(), 6);
        assert_eq!(memo1.state(), MemoState::Clean);
    }

    #[test]
    fn memo_keeps_last_value_after_source_drop() {
        let source = Signal::new(3);
        let memo = source.derive(|x| x * 2);
        drop(source);

        assert_eq!(memo.get(), 6);
        assert_eq!(memo.recompute_count(), 0);
    }
}
