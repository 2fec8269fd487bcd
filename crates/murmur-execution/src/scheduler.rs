//! Cancellable delayed tasks.
//!
//! A scheduled task sleeps for its delay and then runs its completion,
//! unless its handle was cancelled in the meantime. Cancellation only flips
//! a flag; the timer still elapses, and the completion turns into a no-op.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a scheduled task. Cheap to clone; all clones share one flag.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Marks the task so its completion is skipped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Spawns delayed completions on the current tokio runtime and keeps track
/// of them for shutdown.
#[derive(Debug, Default)]
pub struct TaskScheduler {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, (TaskHandle, JoinHandle<()>)>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<u64, (TaskHandle, JoinHandle<()>)>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `completion` after `delay` unless the returned handle is
    /// cancelled first.
    pub fn schedule<F, Fut>(&self, name: &'static str, delay: Duration, completion: F) -> TaskHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = TaskHandle {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        };

        let flag = handle.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if flag.is_cancelled() {
                tracing::debug!(target: "scheduler", task = name, id, "Cancelled task discarded");
                return;
            }
            completion().await;
        });

        let mut tasks = self.tasks();
        tasks.retain(|_, (_, join)| !join.is_finished());
        tasks.insert(id, (handle.clone(), join));
        handle
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks();
        tasks.retain(|_, (_, join)| !join.is_finished());
        tasks.len()
    }

    /// Cancels every tracked task and aborts its timer.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.tasks().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(target: "scheduler", count = drained.len(), "Cancelling scheduled tasks");
        }
        for (_, (handle, join)) in drained {
            handle.cancel();
            join.abort();
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
