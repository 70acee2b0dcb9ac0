//! Key layout of the post store.

use herald_core::{ChatId, MessageId, TimeSlot};

/// Per-post keys under `{prefix}:post:{id}:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PostField {
    /// Slot string, `HH:MM` or `NA`
    #[display("time")]
    Time,
    /// Primary caption
    #[display("text")]
    Text,
    /// Secondary caption
    #[display("comment")]
    Comment,
    /// Source policy as its numeric code
    #[display("post_sources")]
    PostSources,
    /// `"true"` or `"false"`
    #[display("is_protected")]
    IsProtected,
    /// Correlated acknowledgement message id
    #[display("release_id")]
    ReleaseId,
    /// List of `"<kind digit> <remote id>"`
    #[display("files")]
    Files,
    /// List of publisher id followed by original item ids
    #[display("msg_ids")]
    MsgIds,
}

impl PostField {
    /// Every per-post key, in the order they are written.
    pub const ALL: [PostField; 8] = [
        PostField::Time,
        PostField::Text,
        PostField::Comment,
        PostField::PostSources,
        PostField::IsProtected,
        PostField::Files,
        PostField::ReleaseId,
        PostField::MsgIds,
    ];
}

/// Renders keys for one namespace.
///
/// # Examples
///
/// ```
/// use herald_store::{KeySpace, PostField};
///
/// let keys = KeySpace::new("herald:42");
/// assert_eq!(keys.times(), "herald:42:times");
/// assert_eq!(keys.post("g1", PostField::Files), "herald:42:post:g1:files");
/// assert_eq!(keys.reverse(1000, 7), "herald:42:1000:7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// Create a key space under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Set of slots that have at least one post.
    pub fn times(&self) -> String {
        format!("{}:times", self.prefix)
    }

    /// Set of post ids due at `slot`.
    pub fn time(&self, slot: &TimeSlot) -> String {
        format!("{}:time:{}", self.prefix, slot)
    }

    /// Set of all live post ids.
    pub fn posts(&self) -> String {
        format!("{}:posts", self.prefix)
    }

    /// One field of a post.
    pub fn post(&self, id: &str, field: PostField) -> String {
        format!("{}:post:{}:{}", self.prefix, id, field)
    }

    /// Reverse index entry from an original inbound item to its post.
    pub fn reverse(&self, publisher_id: ChatId, item_id: MessageId) -> String {
        format!("{}:{}:{}", self.prefix, publisher_id, item_id)
    }
}
