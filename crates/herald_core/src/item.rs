//! Raw inbound media items, as received from a submitter.

use crate::{ChatId, MessageId};
use serde::{Deserialize, Serialize};

/// Media carried by an inbound item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMedia {
    /// Compressed photo
    Photo {
        /// Backend file identifier
        remote_id: String,
        /// Declared size in bytes, if known
        size: Option<u64>,
    },
    /// Compressed video
    Video {
        /// Backend file identifier
        remote_id: String,
        /// Declared size in bytes, if known
        size: Option<u64>,
    },
    /// Any file sent as a document
    Document {
        /// Backend file identifier
        remote_id: String,
        /// Declared MIME type
        mime: String,
        /// Declared size in bytes, if known
        size: Option<u64>,
    },
    /// Voice note
    Voice,
    /// Sticker
    Sticker,
    /// Round video note
    VideoNote,
    /// Anything without media (plain text, polls, ...)
    Other,
}

/// One raw item of a submission.
///
/// # Examples
///
/// ```
/// use herald_core::{InboundItemBuilder, InboundMedia};
///
/// let item = InboundItemBuilder::default()
///     .chat_id(42)
///     .item_id(7)
///     .sender_id(Some(42))
///     .media(InboundMedia::Photo { remote_id: "p1".into(), size: None })
///     .build()
///     .unwrap();
///
/// assert_eq!(item.group_key(), "42_7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct InboundItem {
    /// Chat the item arrived in
    pub chat_id: ChatId,
    /// Item (message) id within the chat
    pub item_id: MessageId,
    /// Shared album identifier, when the item is part of a multi-file submission
    #[builder(default)]
    #[serde(default)]
    pub group_id: Option<String>,
    /// Submitter, when known
    #[builder(default)]
    #[serde(default)]
    pub sender_id: Option<ChatId>,
    /// Attached media
    pub media: InboundMedia,
}

impl InboundItem {
    /// Identity of the group this item belongs to.
    ///
    /// The shared album id when present, otherwise `{chat_id}_{item_id}`,
    /// which can never collide with a real album id.
    pub fn group_key(&self) -> String {
        match &self.group_id {
            Some(group) if !group.is_empty() => group.clone(),
            _ => format!("{}_{}", self.chat_id, self.item_id),
        }
    }

    /// Whether the item arrived as part of an album.
    pub fn is_grouped(&self) -> bool {
        self.group_id.as_deref().is_some_and(|g| !g.is_empty())
    }

    /// Why the item can never become part of a post, if it can't.
    pub fn unsupported_reason(&self) -> Option<&'static str> {
        match self.media {
            InboundMedia::Voice => Some("voice messages"),
            InboundMedia::Sticker => Some("stickers"),
            InboundMedia::VideoNote => Some("video notes"),
            _ => None,
        }
    }

    /// Backend file id of the attached media, if any.
    pub fn remote_id(&self) -> Option<&str> {
        match &self.media {
            InboundMedia::Photo { remote_id, .. }
            | InboundMedia::Video { remote_id, .. }
            | InboundMedia::Document { remote_id, .. } => Some(remote_id),
            _ => None,
        }
    }

    /// Declared size of the attached media, if any.
    pub fn declared_size(&self) -> Option<u64> {
        match &self.media {
            InboundMedia::Photo { size, .. }
            | InboundMedia::Video { size, .. }
            | InboundMedia::Document { size, .. } => *size,
            _ => None,
        }
    }
}
