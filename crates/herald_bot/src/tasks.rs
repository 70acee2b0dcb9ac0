//! Tracking of fire-and-forget background work.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info_span, warn};

/// Owner of every background task a component starts.
///
/// Correlation polls, mapping expiries, group flushes and expiring notices
/// are spawned here instead of detached, so shutdown can abort and join them.
/// Clones share the same set. Dropping the last clone aborts what is left.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    set: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a task on the current runtime.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.lock();
        reap(&mut set);
        set.spawn(task.instrument(info_span!("background", task = name)));
    }

    /// Number of tasks not yet reaped.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no tasks are tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Reap finished tasks and return how many are still running.
    pub fn idle(&self) -> usize {
        let mut set = self.lock();
        reap(&mut set);
        set.len()
    }

    /// Wait until every tracked task, including ones spawned meanwhile, is done.
    pub async fn join_all(&self) {
        loop {
            let mut set = std::mem::take(&mut *self.lock());
            if set.is_empty() {
                return;
            }
            while let Some(result) = set.join_next().await {
                log_outcome(result);
            }
        }
    }

    /// Abort every tracked task and wait for them to stop.
    pub async fn shutdown(&self) {
        let mut set = std::mem::take(&mut *self.lock());
        debug!(tasks = set.len(), "Shutting down background tasks");
        set.shutdown().await;
    }
}

fn reap(set: &mut JoinSet<()>) {
    while let Some(result) = set.try_join_next() {
        log_outcome(result);
    }
}

fn log_outcome(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        warn!(error = %e, "Background task panicked");
    }
}
