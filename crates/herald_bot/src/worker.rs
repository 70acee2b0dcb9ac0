//! The scheduling worker: publish cadence and acknowledgement correlation.

use crate::config::BotConfig;
use crate::publisher::{Publisher, ScratchFiles};
use crate::published::PublishedMap;
use crate::sink::{ErrorSink, log_errors};
use crate::tasks::BackgroundTasks;
use crate::transport::{OutboundItem, SendOptions, SentMessage, Transport};
use chrono::{Local, NaiveTime, Timelike};
use herald_core::{ChatId, MessageId, Post, PostChange, SourcePolicy, TimeSlot, UNSPECIFIED};
use herald_error::{HeraldError, HeraldResult, PostError, WorkerError, WorkerErrorKind};
use herald_store::PostStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, info, instrument, warn};

/// Runtime settings of a [`Worker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Destination channel
    pub channel_id: ChatId,
    /// Discussion chat where acknowledgements appear
    pub comments_id: ChatId,
    /// Period between schedule checks
    pub tick: Duration,
    /// Delay past the minute boundary of the first check
    pub start_skew: Duration,
    /// How long to wait for an acknowledgement
    pub correlation_timeout: Duration,
    /// How often to look for it
    pub correlation_poll: Duration,
    /// Caption markup mode
    pub parse_mode: Option<String>,
    /// Publish silently
    pub disable_notification: bool,
    /// Publish without link previews
    pub disable_web_page_preview: bool,
    /// Initial default schedule
    pub default_slots: Vec<TimeSlot>,
}

impl WorkerSettings {
    /// Settings with the stock cadence for the given chats.
    pub fn new(channel_id: ChatId, comments_id: ChatId) -> Self {
        Self {
            channel_id,
            comments_id,
            tick: Duration::from_secs(60),
            start_skew: Duration::from_secs(5),
            correlation_timeout: Duration::from_secs(60),
            correlation_poll: Duration::from_secs(10),
            parse_mode: None,
            disable_notification: false,
            disable_web_page_preview: false,
            default_slots: Vec::new(),
        }
    }
}

impl From<&BotConfig> for WorkerSettings {
    fn from(config: &BotConfig) -> Self {
        let worker = config.worker();
        Self {
            channel_id: *config.channel_id(),
            comments_id: *config.comments_id(),
            tick: Duration::from_secs(*worker.tick_seconds()),
            start_skew: Duration::from_secs(*worker.start_skew_seconds()),
            correlation_timeout: Duration::from_secs(*worker.correlation_timeout_seconds()),
            correlation_poll: Duration::from_secs(*worker.correlation_poll_seconds()),
            parse_mode: Some(config.parse_mode().clone()).filter(|mode| !mode.is_empty()),
            disable_notification: *config.disable_notification(),
            disable_web_page_preview: *config.disable_web_page_preview(),
            default_slots: config.default_slots().clone(),
        }
    }
}

/// What is still owed after the primary album went out.
#[derive(Debug, Clone)]
enum FollowUp {
    Sources(Vec<OutboundItem>),
    Comment(String),
}

/// Publishes due posts and delivers their follow-ups.
///
/// Clones share all state. Background work (correlation polls and mapping
/// expiries) is tracked in [`Worker::tasks`].
#[derive(Clone)]
pub struct Worker {
    store: Arc<PostStore>,
    transport: Arc<dyn Transport>,
    publisher: Publisher,
    settings: Arc<WorkerSettings>,
    default_slots: Arc<RwLock<Vec<TimeSlot>>>,
    published: Arc<PublishedMap>,
    tasks: BackgroundTasks,
    on_error: ErrorSink,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("settings", &self.settings)
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Create a worker that logs background errors.
    pub fn new(
        store: Arc<PostStore>,
        transport: Arc<dyn Transport>,
        publisher: Publisher,
        settings: WorkerSettings,
    ) -> Self {
        let default_slots = settings.default_slots.clone();
        Self {
            store,
            transport,
            publisher,
            settings: Arc::new(settings),
            default_slots: Arc::new(RwLock::new(default_slots)),
            published: Arc::new(PublishedMap::new()),
            tasks: BackgroundTasks::new(),
            on_error: log_errors(),
        }
    }

    /// Send background errors to `sink` instead of the log.
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.on_error = sink;
        self
    }

    /// Track background work in a shared task set.
    pub fn with_tasks(mut self, tasks: BackgroundTasks) -> Self {
        self.tasks = tasks;
        self
    }

    /// Settings in use.
    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Background work started by this worker.
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Run the schedule forever.
    ///
    /// Sleeps to the next minute boundary plus the start skew, checks the
    /// schedule once, then once per tick.
    pub async fn run(&self) {
        let second = u64::from(Local::now().second());
        let wait = Duration::from_secs(60 - second.min(59)) + self.settings.start_skew;
        info!(wait_secs = wait.as_secs(), "Worker waiting for the first check");
        sleep(wait).await;
        self.check(Local::now().time()).await;

        let period = self.settings.tick;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.check(Local::now().time()).await;
        }
    }

    /// Run the schedule on a new task.
    pub fn spawn(&self) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move { worker.run().await })
    }

    async fn check(&self, time: NaiveTime) {
        if let Err(e) = self.post_for_slot(time).await {
            (self.on_error)(e);
        }
    }

    /// Publish one post due at `time`, if there is any.
    ///
    /// An empty exact slot falls back to the unscheduled posts only when the
    /// slot is a default slot. Nothing to publish is `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn post_for_slot(&self, time: NaiveTime) -> HeraldResult<Option<Vec<SentMessage>>> {
        let slot = TimeSlot::from_time(time);
        let post = match self.store.random_by_slot(&slot.to_string()).await {
            Ok(post) => post,
            Err(e) if e.is_not_found() => {
                if !self.default_slots.read().await.contains(&slot) {
                    debug!(%slot, "Nothing scheduled");
                    return Ok(None);
                }
                match self.store.random_by_slot(UNSPECIFIED).await {
                    Ok(post) => post,
                    Err(e) if e.is_not_found() => {
                        debug!(%slot, "Default slot with no unscheduled posts");
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        info!(%slot, id = %post.id, "Publishing post");
        self.publish(post).await.map(Some)
    }

    /// Options for publishing to the channel.
    pub fn send_options(&self, protected: bool) -> SendOptions {
        SendOptions::default()
            .with_protected(protected)
            .with_parse_mode(self.settings.parse_mode.clone())
            .with_disable_notification(self.settings.disable_notification)
            .with_disable_web_page_preview(self.settings.disable_web_page_preview)
    }

    /// Publish to the channel and remove the post once nothing is owed.
    pub async fn publish(&self, post: Post) -> HeraldResult<Vec<SentMessage>> {
        let options = self.send_options(post.is_protected);
        self.publish_to(post, self.settings.channel_id, options, true)
            .await
    }

    /// Publish `post` to `destination`.
    ///
    /// After the primary album is delivered, the sources album or the comment
    /// is owed as a follow-up. On the channel it is delivered in the background
    /// as a reply to the acknowledgement in the discussion chat; anywhere else
    /// it is sent right away. With `delete_when_done`, the post is removed from
    /// the store once nothing is owed.
    ///
    /// # Errors
    ///
    /// Returns the first failure to build or send the primary album, or to
    /// send an immediate follow-up.
    #[instrument(skip_all, fields(id = %post.id, destination = destination))]
    pub async fn publish_to(
        &self,
        post: Post,
        destination: ChatId,
        options: SendOptions,
        delete_when_done: bool,
    ) -> HeraldResult<Vec<SentMessage>> {
        let mut scratch = ScratchFiles::new();
        let outcome = match self.publisher.build(&post, &mut scratch).await {
            Ok(albums) => self
                .transport
                .send_album(destination, &albums.primary, &options)
                .await
                .map(|sent| (albums.sources, sent))
                .map_err(HeraldError::from),
            Err(e) => Err(e),
        };
        for e in scratch.cleanup().await {
            (self.on_error)(e.into());
        }
        let (sources, sent) = outcome?;
        info!(messages = sent.len(), "Published primary album");

        self.remember(&post.id, sent.iter().map(|m| m.message_id).collect())
            .await;

        match self.follow_up(&post, sources) {
            Some(follow_up) if destination == self.settings.channel_id => {
                let worker = self.clone();
                let id = post.id.clone();
                self.tasks.spawn("correlation", async move {
                    worker.correlate(id, follow_up, delete_when_done).await;
                });
            }
            Some(follow_up) => {
                let options = SendOptions::default()
                    .with_protected(post.is_protected)
                    .with_parse_mode(self.settings.parse_mode.clone());
                self.send_follow_up(destination, &follow_up, &options)
                    .await?;
                if delete_when_done {
                    self.remove_quietly(&post.id).await;
                }
            }
            None => {
                if delete_when_done {
                    self.remove_quietly(&post.id).await;
                }
            }
        }

        Ok(sent)
    }

    fn follow_up(&self, post: &Post, sources: Vec<OutboundItem>) -> Option<FollowUp> {
        match post.source_policy.effective() {
            SourcePolicy::Always if !sources.is_empty() => Some(FollowUp::Sources(sources)),
            policy => {
                if policy == SourcePolicy::Always {
                    warn!(id = %post.id, "Sources requested but the post has no documents");
                }
                (!post.comment.is_empty()).then(|| FollowUp::Comment(post.comment.clone()))
            }
        }
    }

    async fn send_follow_up(
        &self,
        destination: ChatId,
        follow_up: &FollowUp,
        options: &SendOptions,
    ) -> HeraldResult<()> {
        match follow_up {
            FollowUp::Sources(items) => {
                self.transport
                    .send_album(destination, items, options)
                    .await?;
            }
            FollowUp::Comment(text) => {
                self.transport.send_text(destination, text, options).await?;
            }
        }
        Ok(())
    }

    async fn remove_quietly(&self, id: &str) {
        match self.store.remove(id).await {
            Ok(()) => debug!(id, "Removed published post"),
            Err(e) => (self.on_error)(e.into()),
        }
    }

    async fn remember(&self, post_id: &str, messages: Vec<MessageId>) {
        self.published.record(post_id, &messages).await;

        let published = self.published.clone();
        let grace = self.settings.correlation_timeout * 2;
        let post_id = post_id.to_string();
        self.tasks.spawn("published-expiry", async move {
            sleep(grace).await;
            published.forget(&post_id, &messages).await;
        });
    }

    /// Wait for the acknowledgement of `post_id`, then deliver the follow-up.
    ///
    /// Gives up after the correlation timeout and leaves the post stored.
    #[instrument(skip(self, follow_up))]
    async fn correlate(&self, post_id: String, follow_up: FollowUp, delete_when_done: bool) {
        let poll = self.settings.correlation_poll;
        let deadline = Instant::now() + self.settings.correlation_timeout;
        let mut ticker = interval_at(Instant::now() + poll, poll);

        loop {
            ticker.tick().await;
            if Instant::now() > deadline {
                (self.on_error)(
                    WorkerError::new(WorkerErrorKind::CorrelationTimeout(post_id.clone())).into(),
                );
                return;
            }

            let post = match self.store.get(&post_id).await {
                Ok(post) => post,
                Err(e) => {
                    (self.on_error)(e.into());
                    continue;
                }
            };
            if post.comments_message_id == 0 {
                continue;
            }

            let options = SendOptions::default()
                .with_reply_to(Some(post.comments_message_id))
                .with_protected(post.is_protected)
                .with_parse_mode(self.settings.parse_mode.clone());
            match self
                .send_follow_up(self.settings.comments_id, &follow_up, &options)
                .await
            {
                Ok(()) => info!(reply_to = post.comments_message_id, "Delivered follow-up"),
                Err(e) => (self.on_error)(e),
            }
            if delete_when_done {
                self.remove_quietly(&post_id).await;
            }
            return;
        }
    }

    /// Post a delivered channel message was published from, while remembered.
    pub async fn published_post(&self, message_id: MessageId) -> Option<String> {
        self.published.lookup(message_id).await
    }

    /// Record that `forwarded_message_id` showed up in the discussion chat as
    /// `comments_message_id`.
    ///
    /// Returns whether a stored post was updated. A post removed meanwhile is
    /// not an error.
    #[instrument(skip(self))]
    pub async fn acknowledge(
        &self,
        forwarded_message_id: MessageId,
        comments_message_id: MessageId,
    ) -> HeraldResult<bool> {
        let Some(id) = self.published.lookup(forwarded_message_id).await else {
            return Ok(false);
        };
        match self
            .store
            .change(&id, PostChange::CommentsMessageId(comments_message_id))
            .await
        {
            Ok(_) => {
                debug!(id, "Post acknowledged");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Current default schedule.
    pub async fn default_slots(&self) -> Vec<TimeSlot> {
        self.default_slots.read().await.clone()
    }

    /// Replace the default schedule and return the previous one.
    ///
    /// # Errors
    ///
    /// Returns error, leaving the schedule untouched, if any entry is not an
    /// `HH:MM` time.
    pub async fn set_default_slots<S: AsRef<str>>(
        &self,
        slots: &[S],
    ) -> Result<Vec<TimeSlot>, PostError> {
        let parsed = slots
            .iter()
            .map(|slot| {
                let parsed = TimeSlot::parse(slot.as_ref())?;
                if parsed.is_unspecified() {
                    return Err(PostError::invalid(format!(
                        "{:?} is not a time of day",
                        slot.as_ref()
                    )));
                }
                Ok(parsed)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut current = self.default_slots.write().await;
        info!(slots = ?parsed, "Default schedule changed");
        Ok(std::mem::replace(&mut *current, parsed))
    }

    /// Abort background work.
    pub async fn shutdown(&self) {
        self.tasks.shutdown().await;
    }
}
