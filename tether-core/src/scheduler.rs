//! Deferred Task Scheduling
//!
//! Two pieces of the runtime do work "later" rather than inside the call
//! that triggered it:
//!
//! - a [`ValueCell`](crate::reactive::ValueCell) re-asserts its value once
//!   after construction, and
//! - a [`PartitionedStore`](crate::store::PartitionedStore) writes dirty
//!   fields back to storage at an idle point.
//!
//! Both go through the [`Scheduler`] trait so the host decides what "later"
//! means. Tasks are single-shot and cannot be cancelled once scheduled. No
//! ordering is promised between tasks from different sources.
//!
//! # Implementations
//!
//! - [`ManualScheduler`]: a FIFO queue stepped explicitly. Tests use it to
//!   advance time deterministically.
//! - [`TokioScheduler`]: spawns each task on a tokio runtime after yielding,
//!   so it runs once the runtime is otherwise idle.
//! - [`ImmediateScheduler`]: runs the task inline. Removes the deferral
//!   entirely.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::runtime::Handle;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Accepts tasks to run at some later idle point.
pub trait Scheduler: Send + Sync {
    /// Queue `task`. Best effort: no deadline is exposed.
    fn schedule(&self, task: Task);
}

/// Scheduler driven by explicit calls to [`run_pending`](Self::run_pending).
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<Task>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run one idle cycle: every task that was queued before this call.
    ///
    /// Tasks queued while the cycle runs wait for the next one. Returns the
    /// number of tasks run.
    pub fn run_pending(&self) -> usize {
        let due = self.pending();
        let mut ran = 0;
        while ran < due {
            // The lock is released before the task runs so tasks can schedule more work.
            let Some(task) = self.queue.lock().pop_front() else {
                break;
            };
            task();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "manual scheduler cycle");
        }
        ran
    }

    /// Run cycles until the queue is empty. Returns the total number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, task: Task) {
        self.queue.lock().push_back(task);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Scheduler that defers onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Schedule onto the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Schedule onto the runtime the caller is running in, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: Task) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}

/// Scheduler that runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, task: Task) {
        task();
    }
}
