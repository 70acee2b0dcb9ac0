//! Turning finished media groups into stored posts.

use crate::aggregator::GroupHandler;
use crate::notice::send_expiring;
use crate::tasks::BackgroundTasks;
use crate::transport::{SendOptions, Transport};
use async_trait::async_trait;
use herald_core::{InboundItem, Post};
use herald_error::{HeraldResult, WorkerError, WorkerErrorKind};
use herald_store::PostStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Text of the acknowledgement sent for a stored submission.
pub const ACCEPTED_NOTICE: &str = "+";

/// Stores every group it receives as a new unscheduled post.
///
/// The submitter gets a short-lived acknowledgement replying to the first
/// item of the group.
#[derive(Clone)]
pub struct PostIntake {
    store: Arc<PostStore>,
    transport: Arc<dyn Transport>,
    template: Post,
    notice_lifetime: Duration,
    tasks: BackgroundTasks,
}

impl std::fmt::Debug for PostIntake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostIntake")
            .field("template", &self.template)
            .field("notice_lifetime", &self.notice_lifetime)
            .finish_non_exhaustive()
    }
}

impl PostIntake {
    /// Create an intake whose posts start with `default_text`.
    pub fn new(
        store: Arc<PostStore>,
        transport: Arc<dyn Transport>,
        default_text: impl Into<String>,
        notice_lifetime: Duration,
    ) -> Self {
        let template = Post {
            text: default_text.into(),
            ..Post::default()
        };
        Self {
            store,
            transport,
            template,
            notice_lifetime,
            tasks: BackgroundTasks::new(),
        }
    }

    /// Track notices in a shared task set.
    pub fn with_tasks(mut self, tasks: BackgroundTasks) -> Self {
        self.tasks = tasks;
        self
    }

    /// Fields every new post starts with.
    pub fn template(&self) -> &Post {
        &self.template
    }
}

#[async_trait]
impl GroupHandler for PostIntake {
    #[instrument(skip_all, fields(items = items.len()))]
    async fn handle(&self, items: Vec<InboundItem>) -> HeraldResult<()> {
        let first = items
            .first()
            .ok_or_else(|| WorkerError::new(WorkerErrorKind::EmptyGroup))?;
        let (chat_id, item_id) = (first.chat_id, first.item_id);

        let post = self.store.add_from_items(&self.template, &items).await?;
        info!(id = %post.id, files = post.files.len(), "Stored submission");

        send_expiring(
            &self.tasks,
            self.transport.clone(),
            chat_id,
            ACCEPTED_NOTICE,
            SendOptions::default().with_reply_to(Some(item_id)),
            self.notice_lifetime,
        );
        Ok(())
    }
}
