//! Wiring of every component into one running bot.

use crate::aggregator::MediaGroupAggregator;
use crate::config::BotConfig;
use crate::intake::PostIntake;
use crate::publisher::Publisher;
use crate::summary::ScheduleSummary;
use crate::tasks::BackgroundTasks;
use crate::transcoder::Transcoder;
use crate::transport::Transport;
use crate::worker::{Worker, WorkerSettings};
use herald_error::{HeraldResult, PostError};
use herald_store::{KeyValueStore, PostStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// Every component of a running bot, sharing one store and one task set.
#[derive(Debug, Clone)]
pub struct HeraldServer {
    config: BotConfig,
    store: Arc<PostStore>,
    worker: Worker,
    aggregator: MediaGroupAggregator,
    tasks: BackgroundTasks,
}

impl HeraldServer {
    /// Wire the components described by `config`.
    ///
    /// `bot_id` scopes the store keys when several bots share a backend.
    pub fn new(
        config: BotConfig,
        bot_id: Option<i64>,
        kv: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let tasks = BackgroundTasks::new();
        let store = Arc::new(
            PostStore::new(kv, config.store().key_space(bot_id))
                .with_max_item_bytes(*config.store().max_item_bytes()),
        );

        let publisher = Publisher::new(
            Arc::clone(&transport),
            transcoder,
            config.temporary_files_directory().clone(),
        );
        let worker = Worker::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            publisher,
            WorkerSettings::from(&config),
        )
        .with_tasks(tasks.clone());

        let intake = PostIntake::new(
            Arc::clone(&store),
            transport,
            config.default_post_text().clone(),
            config.aggregator().notice_lifetime(),
        )
        .with_tasks(tasks.clone());
        let aggregator =
            MediaGroupAggregator::new(Arc::new(intake), config.aggregator().quiet_window())
                .with_tasks(tasks.clone());

        Self {
            config,
            store,
            worker,
            aggregator,
            tasks,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Shared post store.
    pub fn store(&self) -> &Arc<PostStore> {
        &self.store
    }

    /// Scheduling worker.
    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Entry point for inbound items.
    pub fn aggregator(&self) -> &MediaGroupAggregator {
        &self.aggregator
    }

    /// Start the schedule loop.
    #[instrument(skip(self))]
    pub fn start(&self) -> JoinHandle<()> {
        info!(
            channel_id = self.config.channel_id(),
            default_slots = self.config.default_slots().len(),
            "Starting Herald"
        );
        self.worker.spawn()
    }

    /// Summary of the schedule under the current default slots.
    pub async fn summary(&self) -> Result<ScheduleSummary, PostError> {
        let defaults = self.worker.default_slots().await;
        ScheduleSummary::collect(&self.store, &defaults).await
    }

    /// Abort all background work.
    pub async fn shutdown(&self) -> HeraldResult<()> {
        self.tasks.shutdown().await;
        info!("Herald stopped");
        Ok(())
    }
}
