//! Shared worker pool for frame and command handling
//!
//! Frame handlers are dispatched as independent tasks with no ordering
//! guarantee between them. The pool bounds the number of in-flight tasks so a
//! flood of inbound frames cannot pile up unboundedly; rejected tasks are
//! dropped with a warning, matching the per-frame containment rule.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::warn;
use tokio::task::JoinHandle;

use crate::constants::DEFAULT_MAX_QUEUED_TASKS;

pub struct WorkerPool {
    /// Maximum number of tasks that may be in flight at once.
    max_queued_tasks: usize,
    /// Current number of active tasks.
    active_tasks: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(max_queued_tasks: usize) -> Self {
        Self {
            max_queued_tasks: max_queued_tasks.max(1),
            active_tasks: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawn a future onto the pool.
    ///
    /// Returns a handle to await the task's completion, or `None` when the
    /// pool is at capacity and the task was rejected. Must be called from
    /// within a tokio runtime.
    pub fn execute<F>(&self, future: F) -> Option<JoinHandle<F::Output>>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let active = self.active_tasks.fetch_add(1, Ordering::SeqCst);
        if active >= self.max_queued_tasks {
            self.active_tasks.fetch_sub(1, Ordering::SeqCst);
            warn!(
                "Worker pool at capacity ({} active tasks), rejecting new task",
                active
            );
            return None;
        }

        let active_tasks = Arc::clone(&self.active_tasks);
        Some(tokio::spawn(async move {
            let result = future.await;
            active_tasks.fetch_sub(1, Ordering::SeqCst);
            result
        }))
    }

    /// Current number of in-flight tasks.
    pub fn active_task_count(&self) -> usize {
        self.active_tasks.load(Ordering::SeqCst)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUED_TASKS)
    }
}

/// Shared worker pool that can be accessed by multiple components
pub type SharedWorkerPool = Arc<WorkerPool>;

pub fn create_worker_pool(max_queued_tasks: usize) -> SharedWorkerPool {
    Arc::new(WorkerPool::new(max_queued_tasks))
}
