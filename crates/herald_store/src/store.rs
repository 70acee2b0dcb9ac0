//! The post repository.

use crate::keys::{KeySpace, PostField};
use crate::kv::KeyValueStore;
use herald_core::{
    ChatId, FileKind, InboundItem, InboundMedia, MessageId, Post, PostChange, PostFile,
    SourcePolicy, TimeSlot,
};
use herald_error::{PostError, PostErrorKind};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Durable CRUD for [`Post`] with slot and reverse-item indexes.
///
/// Every operation holds one coarse lock for its whole duration, so no two
/// operations interleave their key writes. Multi-key writes are not
/// transactional: `add` and `remove` attempt every step and report all
/// failed steps together as [`PostErrorKind::Aggregate`].
pub struct PostStore {
    kv: Arc<dyn KeyValueStore>,
    keys: KeySpace,
    max_item_bytes: u64,
    lock: Mutex<()>,
}

impl std::fmt::Debug for PostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostStore")
            .field("keys", &self.keys)
            .field("max_item_bytes", &self.max_item_bytes)
            .finish_non_exhaustive()
    }
}

/// Collects failures of best-effort steps.
#[derive(Default)]
struct Steps(Vec<String>);

impl Steps {
    fn record<T>(&mut self, step: &str, result: Result<T, PostError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.0.push(format!("{}: {}", step, e.kind));
                None
            }
        }
    }

    #[track_caller]
    fn finish(self) -> Result<(), PostError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(PostError::new(PostErrorKind::Aggregate(self.0)))
        }
    }
}

impl PostStore {
    /// Default per-item size ceiling, in bytes.
    pub const DEFAULT_MAX_ITEM_BYTES: u64 = 20_000_000;

    /// Create a store over `kv` using the given key layout.
    pub fn new(kv: Arc<dyn KeyValueStore>, keys: KeySpace) -> Self {
        Self {
            kv,
            keys,
            max_item_bytes: Self::DEFAULT_MAX_ITEM_BYTES,
            lock: Mutex::new(()),
        }
    }

    /// Set the largest accepted inbound item.
    pub fn with_max_item_bytes(mut self, max_item_bytes: u64) -> Self {
        self.max_item_bytes = max_item_bytes;
        self
    }

    /// Key layout in use.
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Largest accepted inbound item, in bytes.
    pub fn max_item_bytes(&self) -> u64 {
        self.max_item_bytes
    }

    /// All slots that currently hold at least one post, in ascending order.
    #[instrument(skip(self))]
    pub async fn time_slots(&self) -> Result<Vec<TimeSlot>, PostError> {
        let _guard = self.lock.lock().await;
        let raw = self.kv.smembers(&self.keys.times()).await?;
        let mut slots = raw
            .iter()
            .map(|value| {
                TimeSlot::parse(value).map_err(|_| {
                    PostError::new(PostErrorKind::Corrupted(format!(
                        "stored slot {:?} is malformed",
                        value
                    )))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        slots.sort();
        Ok(slots)
    }

    /// Fetch one post.
    ///
    /// # Errors
    ///
    /// Returns [`PostErrorKind::NotFound`] if no post has this id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Post, PostError> {
        let _guard = self.lock.lock().await;
        self.read(id).await
    }

    /// Every live post, in no particular order.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<Post>, PostError> {
        let _guard = self.lock.lock().await;
        let ids = self.kv.smembers(&self.keys.posts()).await?;
        self.read_many(&ids).await
    }

    /// Every post due at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`PostErrorKind::InvalidInput`] if `slot` is not a valid slot.
    #[instrument(skip(self))]
    pub async fn by_slot(&self, slot: &str) -> Result<Vec<Post>, PostError> {
        let slot = TimeSlot::parse(slot)?;
        let _guard = self.lock.lock().await;
        let ids = self.kv.smembers(&self.keys.time(&slot)).await?;
        self.read_many(&ids).await
    }

    /// A post picked uniformly at random among those due at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`PostErrorKind::NotFound`] if the slot is empty and
    /// [`PostErrorKind::InvalidInput`] if `slot` is not a valid slot.
    #[instrument(skip(self))]
    pub async fn random_by_slot(&self, slot: &str) -> Result<Post, PostError> {
        let slot = TimeSlot::parse(slot)?;
        let _guard = self.lock.lock().await;
        match self.kv.srandmember(&self.keys.time(&slot)).await? {
            Some(id) => self.read(&id).await,
            None => Err(PostError::not_found(format!("no posts at {}", slot))),
        }
    }

    /// Build a post from the items of one submission and store it.
    ///
    /// Scalar fields come from `template`; files, original item ids and the
    /// publisher come from `items`. The id is the group key of the first item.
    ///
    /// # Errors
    ///
    /// - [`PostErrorKind::InvalidInput`] if there are no items, the first has
    ///   no sender, or an item carries no supported media
    /// - [`PostErrorKind::TooLarge`] if an item exceeds the size limit
    /// - [`PostErrorKind::AlreadyExists`] if the submission was already stored
    #[instrument(skip(self, template, items), fields(items = items.len()))]
    pub async fn add_from_items(
        &self,
        template: &Post,
        items: &[InboundItem],
    ) -> Result<Post, PostError> {
        let first = items
            .first()
            .ok_or_else(|| PostError::invalid("no items provided"))?;
        let publisher_id = first
            .sender_id
            .ok_or_else(|| PostError::invalid("broken item is given"))?;

        let files = items
            .iter()
            .map(|item| self.file_for(item))
            .collect::<Result<Vec<_>, _>>()?;

        let post = Post {
            id: first.group_key(),
            time_slot: template.time_slot,
            text: template.text.clone(),
            comment: template.comment.clone(),
            source_policy: template.source_policy,
            is_protected: template.is_protected,
            files,
            comments_message_id: template.comments_message_id,
            publisher_id,
            original_item_ids: items.iter().map(|item| item.item_id).collect(),
        };

        let _guard = self.lock.lock().await;
        self.put(&post).await
    }

    /// Store a pre-built post and return it as read back.
    ///
    /// # Errors
    ///
    /// Returns [`PostErrorKind::InvalidInput`] if the post breaks an invariant,
    /// [`PostErrorKind::AlreadyExists`] if the id is taken, and
    /// [`PostErrorKind::Aggregate`] if some writes failed.
    #[instrument(skip(self, post), fields(id = %post.id))]
    pub async fn add(&self, post: Post) -> Result<Post, PostError> {
        let _guard = self.lock.lock().await;
        self.put(&post).await
    }

    /// Change one field of a stored post.
    ///
    /// The post is removed and stored again so every index follows the new
    /// values. A failure while removing is logged and the post is still
    /// stored again.
    #[instrument(skip(self, change), fields(change = %change))]
    pub async fn change(&self, id: &str, change: PostChange) -> Result<Post, PostError> {
        let _guard = self.lock.lock().await;
        let mut post = self.read(id).await?;
        change.apply(&mut post)?;
        post.validate()?;

        if let Err(e) = self.delete(id).await {
            warn!(id, error = %e, "Errors occurred while removing post before re-adding it");
        }
        self.write(&post).await
    }

    /// Delete a post together with its index entries.
    ///
    /// Removing an absent id is a no-op. Every deletion step is attempted;
    /// failed steps are reported together.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<(), PostError> {
        let _guard = self.lock.lock().await;
        self.delete(id).await
    }

    /// Whether a post with this id is live.
    #[instrument(skip(self))]
    pub async fn contains(&self, id: &str) -> Result<bool, PostError> {
        let _guard = self.lock.lock().await;
        self.kv.sismember(&self.keys.posts(), id).await
    }

    /// Post built from the given original item, if it is still stored.
    #[instrument(skip(self))]
    pub async fn find_by_item(
        &self,
        publisher_id: ChatId,
        item_id: MessageId,
    ) -> Result<Option<String>, PostError> {
        let _guard = self.lock.lock().await;
        self.kv.get(&self.keys.reverse(publisher_id, item_id)).await
    }

    #[track_caller]
    fn file_for(&self, item: &InboundItem) -> Result<PostFile, PostError> {
        if let Some(reason) = item.unsupported_reason() {
            return Err(PostError::invalid(format!("{} are not supported", reason)));
        }
        if let Some(size) = item.declared_size()
            && size > self.max_item_bytes
        {
            return Err(PostError::new(PostErrorKind::TooLarge {
                item: item.remote_id().unwrap_or_default().to_string(),
                size,
                limit: self.max_item_bytes,
            }));
        }

        let kind = match &item.media {
            InboundMedia::Photo { .. } => FileKind::Photo,
            InboundMedia::Video { .. } => FileKind::Video,
            InboundMedia::Document { mime, .. } => {
                let mime = mime.to_ascii_lowercase();
                if mime.starts_with("image") {
                    FileKind::DocPhoto
                } else if mime.starts_with("video") {
                    FileKind::DocVideo
                } else {
                    return Err(PostError::invalid(format!(
                        "documents of type {} are not supported",
                        mime
                    )));
                }
            }
            _ => {
                return Err(PostError::invalid(
                    "item with no supported media is provided",
                ));
            }
        };
        let remote_id = item.remote_id().unwrap_or_default();
        Ok(PostFile::new(kind, remote_id))
    }

    async fn read_many(&self, ids: &[String]) -> Result<Vec<Post>, PostError> {
        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            posts.push(self.read(id).await?);
        }
        Ok(posts)
    }

    async fn scalar(&self, id: &str, field: PostField) -> Result<String, PostError> {
        self.kv
            .get(&self.keys.post(id, field))
            .await?
            .ok_or_else(|| corrupted(id, field, "is missing"))
    }

    async fn read(&self, id: &str) -> Result<Post, PostError> {
        let Some(time) = self.kv.get(&self.keys.post(id, PostField::Time)).await? else {
            return Err(PostError::not_found(format!("post {}", id)));
        };
        let time_slot = TimeSlot::parse(&time).map_err(|_| corrupted(id, PostField::Time, &time))?;

        let text = self.scalar(id, PostField::Text).await?;
        let comment = self.scalar(id, PostField::Comment).await?;

        let raw_policy = self.scalar(id, PostField::PostSources).await?;
        let source_policy = raw_policy
            .parse::<u8>()
            .ok()
            .and_then(SourcePolicy::from_code)
            .ok_or_else(|| corrupted(id, PostField::PostSources, &raw_policy))?;

        let raw_protected = self.scalar(id, PostField::IsProtected).await?;
        let is_protected = raw_protected
            .parse::<bool>()
            .map_err(|_| corrupted(id, PostField::IsProtected, &raw_protected))?;

        let raw_release = self.scalar(id, PostField::ReleaseId).await?;
        let comments_message_id = raw_release
            .parse::<MessageId>()
            .map_err(|_| corrupted(id, PostField::ReleaseId, &raw_release))?;

        let files = self
            .kv
            .lrange(&self.keys.post(id, PostField::Files))
            .await?
            .iter()
            .map(|entry| decode_file(entry).ok_or_else(|| corrupted(id, PostField::Files, entry)))
            .collect::<Result<Vec<_>, _>>()?;

        let msg_ids = self
            .kv
            .lrange(&self.keys.post(id, PostField::MsgIds))
            .await?
            .iter()
            .map(|entry| {
                entry
                    .parse::<i64>()
                    .map_err(|_| corrupted(id, PostField::MsgIds, entry))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let Some((publisher_id, original_item_ids)) = msg_ids.split_first() else {
            return Err(corrupted(id, PostField::MsgIds, "is empty"));
        };

        Ok(Post {
            id: id.to_string(),
            time_slot,
            text,
            comment,
            source_policy,
            is_protected,
            files,
            comments_message_id,
            publisher_id: *publisher_id,
            original_item_ids: original_item_ids.to_vec(),
        })
    }

    async fn put(&self, post: &Post) -> Result<Post, PostError> {
        post.validate()?;
        if self.kv.sismember(&self.keys.posts(), &post.id).await? {
            return Err(PostError::new(PostErrorKind::AlreadyExists(post.id.clone())));
        }
        self.write(post).await
    }

    /// Write every field and index entry of `post`, replacing what is there.
    ///
    /// Unguarded: the id may still be listed in the posts set after an
    /// incomplete removal, and adding it again is harmless.
    async fn write(&self, post: &Post) -> Result<Post, PostError> {
        let id = post.id.as_str();
        let slot = post.time_slot.to_string();
        let files: Vec<String> = post.files.iter().map(encode_file).collect();
        let msg_ids: Vec<String> = std::iter::once(post.publisher_id)
            .chain(post.original_item_ids.iter().copied())
            .map(|value| value.to_string())
            .collect();

        let mut steps = Steps::default();
        let scalars = [
            (PostField::Time, slot.clone()),
            (PostField::Text, post.text.clone()),
            (PostField::Comment, post.comment.clone()),
            (PostField::PostSources, post.source_policy.code().to_string()),
            (PostField::IsProtected, post.is_protected.to_string()),
            (PostField::ReleaseId, post.comments_message_id.to_string()),
        ];
        for (field, value) in &scalars {
            let key = self.keys.post(id, *field);
            steps.record(&key, self.kv.set(&key, value).await);
        }
        for (field, values) in [(PostField::Files, &files), (PostField::MsgIds, &msg_ids)] {
            let key = self.keys.post(id, field);
            // Leftovers of an incomplete removal must not be appended to.
            if steps.record(&key, self.kv.del(&key).await).is_some() {
                steps.record(&key, self.kv.rpush(&key, values).await);
            }
        }

        let slot_key = self.keys.time(&post.time_slot);
        steps.record(&slot_key, self.kv.sadd(&slot_key, id).await);
        let posts_key = self.keys.posts();
        steps.record(&posts_key, self.kv.sadd(&posts_key, id).await);
        let times_key = self.keys.times();
        steps.record(&times_key, self.kv.sadd(&times_key, &slot).await);
        for item_id in &post.original_item_ids {
            let key = self.keys.reverse(post.publisher_id, *item_id);
            steps.record(&key, self.kv.set(&key, id).await);
        }
        steps.finish()?;

        debug!(id, slot = %slot, files = post.files.len(), "Stored post");
        self.read(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), PostError> {
        let mut steps = Steps::default();
        let posts_key = self.keys.posts();
        match self.kv.sismember(&posts_key, id).await {
            Ok(false) => return Ok(()),
            Ok(true) => {}
            Err(e) => {
                steps.record::<()>(&posts_key, Err(e));
            }
        }

        // Index entries are derived from the stored fields, so read them first.
        let slot = steps
            .record(
                "time",
                self.kv.get(&self.keys.post(id, PostField::Time)).await,
            )
            .flatten()
            .and_then(|value| TimeSlot::parse(&value).ok());
        let msg_ids = steps
            .record(
                "msg_ids",
                self.kv.lrange(&self.keys.post(id, PostField::MsgIds)).await,
            )
            .unwrap_or_default();

        for field in PostField::ALL {
            let key = self.keys.post(id, field);
            steps.record(&key, self.kv.del(&key).await);
        }
        steps.record(&posts_key, self.kv.srem(&posts_key, id).await);

        if let Some(slot) = slot {
            let slot_key = self.keys.time(&slot);
            steps.record(&slot_key, self.kv.srem(&slot_key, id).await);
            if let Some(0) = steps.record(&slot_key, self.kv.scard(&slot_key).await) {
                let times_key = self.keys.times();
                steps.record(&times_key, self.kv.srem(&times_key, &slot.to_string()).await);
            }
        }

        let ids: Vec<i64> = msg_ids.iter().filter_map(|v| v.parse().ok()).collect();
        if let Some((publisher_id, item_ids)) = ids.split_first() {
            for item_id in item_ids {
                let key = self.keys.reverse(*publisher_id, *item_id);
                steps.record(&key, self.kv.del(&key).await);
            }
        }

        debug!(id, failed_steps = steps.0.len(), "Removed post");
        steps.finish()
    }
}

fn encode_file(file: &PostFile) -> String {
    format!("{} {}", file.kind.code(), file.remote_id)
}

fn decode_file(entry: &str) -> Option<PostFile> {
    let (code, remote_id) = entry.split_once(' ')?;
    let kind = FileKind::from_code(code.parse().ok()?)?;
    if remote_id.is_empty() {
        return None;
    }
    Some(PostFile::new(kind, remote_id))
}

#[track_caller]
fn corrupted(id: &str, field: PostField, value: &str) -> PostError {
    PostError::new(PostErrorKind::Corrupted(format!(
        "post {} field {}: {:?}",
        id, field, value
    )))
}
