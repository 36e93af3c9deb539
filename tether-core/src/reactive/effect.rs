//! Effect Implementation
//!
//! An Effect is a side-effecting callback registered on a
//! [`Signal`](super::Signal) together with an ordered list of memo
//! dependencies.
//!
//! # When Effects Run
//!
//! Effects never run at registration. Each time the signal's value actually
//! changes, every registered effect is checked in registration order:
//!
//! - an effect with no dependencies runs unconditionally;
//! - otherwise its dependencies are updated left to right, and the effect
//!   runs as soon as one of them reports that its value changed. The check
//!   stops at that first changed dependency.
//!
//! A dependency stays dirty until someone reads it, so an effect whose
//! dependency is never read fires on every subsequent change of the signal.
//!
//! # Disposal
//!
//! Registration returns an [`EffectHandle`]. Dropping the handle leaves the
//! effect registered for the lifetime of the signal; calling
//! [`EffectHandle::dispose`] removes it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::memo::MemoNode;
use super::subscriber::SubscriberId;

/// Inline capacity for an effect's dependency list.
pub(crate) type Dependencies = SmallVec<[MemoNode; 4]>;

pub(crate) struct EffectEntry {
    id: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    dependencies: Dependencies,
    active: AtomicBool,
    runs: AtomicUsize,
}

impl EffectEntry {
    fn is_triggered(&self) -> bool {
        self.dependencies.is_empty()
            || self.dependencies.iter().any(|dependency| {
                dependency.update();
                dependency.is_dirty()
            })
    }

    fn execute(&self) {
        tracing::trace!(effect = self.id.raw(), "running effect");
        (self.run)();
        self.runs.fetch_add(1, Ordering::Relaxed);
    }
}

/// Ordered set of effects owned by one signal.
#[derive(Default)]
pub(crate) struct EffectRegistry {
    entries: RwLock<Vec<Arc<EffectEntry>>>,
}

impl EffectRegistry {
    pub(crate) fn register<F>(self: &Arc<Self>, run: F, dependencies: Dependencies) -> EffectHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let entry = Arc::new(EffectEntry {
            id: SubscriberId::new(),
            run: Box::new(run),
            dependencies,
            active: AtomicBool::new(true),
            runs: AtomicUsize::new(0),
        });
        self.entries.write().push(Arc::clone(&entry));

        EffectHandle {
            entry,
            registry: Arc::downgrade(self),
        }
    }

    /// Run every effect whose trigger condition holds.
    ///
    /// Works on a snapshot so effects may register, dispose, or set signals
    /// while the round is in progress. An effect disposed mid-round is
    /// skipped.
    pub(crate) fn run_triggered(&self) {
        let snapshot: Vec<Arc<EffectEntry>> = self.entries.read().clone();
        for entry in snapshot {
            if entry.active.load(Ordering::Acquire) && entry.is_triggered() {
                entry.execute();
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn remove(&self, id: SubscriberId) {
        self.entries.write().retain(|entry| entry.id != id);
    }
}

/// Handle to a registered effect.
#[derive(Clone)]
pub struct EffectHandle {
    entry: Arc<EffectEntry>,
    registry: Weak<EffectRegistry>,
}

impl EffectHandle {
    /// Get the effect's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.entry.id
    }

    /// Remove the effect from its signal.
    ///
    /// Returns `false` if it had already been disposed.
    pub fn dispose(&self) -> bool {
        let was_active = self.entry.active.swap(false, Ordering::AcqRel);
        if was_active {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove(self.entry.id);
            }
            tracing::trace!(effect = self.entry.id.raw(), "effect disposed");
        }
        was_active
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        !self.entry.active.load(Ordering::Acquire)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.entry.runs.load(Ordering::Relaxed)
    }

    /// Get the number of declared dependencies.
    pub fn dependency_count(&self) -> usize {
        self.entry.dependencies.len()
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.entry.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
