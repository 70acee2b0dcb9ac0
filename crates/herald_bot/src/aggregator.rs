//! Buffering of media-group items into whole groups.

use crate::sink::{FailureSink, log_failures};
use crate::tasks::BackgroundTasks;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use herald_core::InboundItem;
use herald_error::{HeraldError, HeraldResult, WorkerError, WorkerErrorKind};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Receives complete media groups.
#[async_trait]
pub trait GroupHandler: Send + Sync {
    /// Handle one group, items in arrival order.
    async fn handle(&self, items: Vec<InboundItem>) -> HeraldResult<()>;
}

/// Collects items that share a group key and hands each group to a
/// [`GroupHandler`] once, after a quiet window measured from its first item.
///
/// Ungrouped items are dispatched on their own without waiting. An item that
/// arrives after its group was dispatched starts a new group.
#[derive(Clone)]
pub struct MediaGroupAggregator {
    groups: Arc<DashMap<String, Vec<InboundItem>>>,
    quiet_window: Duration,
    handler: Arc<dyn GroupHandler>,
    on_failure: FailureSink,
    tasks: BackgroundTasks,
}

impl std::fmt::Debug for MediaGroupAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaGroupAggregator")
            .field("pending", &self.groups.len())
            .field("quiet_window", &self.quiet_window)
            .finish_non_exhaustive()
    }
}

impl MediaGroupAggregator {
    /// Create an aggregator that logs group failures.
    pub fn new(handler: Arc<dyn GroupHandler>, quiet_window: Duration) -> Self {
        Self {
            groups: Arc::new(DashMap::new()),
            quiet_window,
            handler,
            on_failure: log_failures(),
            tasks: BackgroundTasks::new(),
        }
    }

    /// Send group failures to `sink` instead of the log.
    pub fn with_failure_sink(mut self, sink: FailureSink) -> Self {
        self.on_failure = sink;
        self
    }

    /// Track flushes in a shared task set.
    pub fn with_tasks(mut self, tasks: BackgroundTasks) -> Self {
        self.tasks = tasks;
        self
    }

    /// Flush tasks started by this aggregator.
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Number of groups still inside their quiet window.
    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }

    /// Add an item to its group.
    ///
    /// # Errors
    ///
    /// Returns error, without buffering anything, if the item kind can never
    /// become part of a post.
    #[instrument(skip_all, fields(chat_id = item.chat_id, item_id = item.item_id))]
    pub fn submit(&self, item: InboundItem) -> Result<(), WorkerError> {
        if let Some(reason) = item.unsupported_reason() {
            return Err(WorkerError::new(WorkerErrorKind::UnsupportedItem(
                reason.to_string(),
            )));
        }

        let key = item.group_key();
        let delay = if item.is_grouped() {
            self.quiet_window
        } else {
            Duration::ZERO
        };

        let opened = {
            let mut entry = self.groups.entry(key.clone()).or_default();
            entry.push(item);
            entry.len() == 1
        };
        if !opened {
            debug!(group = %key, "Item joined open group");
            return Ok(());
        }

        debug!(group = %key, delay_ms = delay.as_millis() as u64, "Opened group");
        let aggregator = self.clone();
        self.tasks.spawn("group-flush", async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            aggregator.flush(key).await;
        });
        Ok(())
    }

    async fn flush(&self, key: String) {
        let Some((_, items)) = self.groups.remove(&key) else {
            return;
        };
        let Some(first) = items.first().cloned() else {
            warn!(group = %key, "Dispatched an empty group");
            return;
        };
        debug!(group = %key, items = items.len(), "Dispatching group");

        let outcome = AssertUnwindSafe(self.handler.handle(items))
            .catch_unwind()
            .await;
        let error: HeraldError = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                WorkerError::new(WorkerErrorKind::HandlerPanicked {
                    group: key,
                    message,
                })
                .into()
            }
        };
        (self.on_failure)(error, &first);
    }
}
