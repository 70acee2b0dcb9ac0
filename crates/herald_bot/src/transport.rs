//! Messaging backend seam.

use async_trait::async_trait;
use derive_getters::Getters;
use herald_core::{ChatId, MessageId};
use herald_error::TransportError;
use std::path::{Path, PathBuf};

/// Result type for backend calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// A message as delivered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{}/{}", chat_id, message_id)]
pub struct SentMessage {
    /// Chat the message lives in
    pub chat_id: ChatId,
    /// Id of the message within the chat
    pub message_id: MessageId,
}

/// Where the bytes of an outbound item come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A file already stored on the backend
    Remote(String),
    /// A file on local disk, uploaded on send
    Local(PathBuf),
}

/// How an outbound item is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum OutboundKind {
    /// Inline photo
    #[display("photo")]
    Photo,
    /// Inline video
    #[display("video")]
    Video,
    /// Downloadable file
    #[display("document")]
    Document,
}

/// One item of an outbound album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundItem {
    /// Display kind
    pub kind: OutboundKind,
    /// File reference
    pub source: MediaSource,
    /// Caption, empty for none
    pub caption: String,
}

impl OutboundItem {
    /// Create an item without a caption.
    pub fn new(kind: OutboundKind, source: MediaSource) -> Self {
        Self {
            kind,
            source,
            caption: String::new(),
        }
    }
}

/// A backend file handle, as returned by [`Transport::file_by_id`].
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct RemoteFile {
    /// Backend file identifier
    remote_id: String,
    /// Size in bytes, if the backend reports it
    size: Option<u64>,
}

impl RemoteFile {
    /// Create a handle.
    pub fn new(remote_id: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            remote_id: remote_id.into(),
            size,
        }
    }
}

/// Options of one send call.
///
/// # Examples
///
/// ```
/// use herald_bot::SendOptions;
///
/// let options = SendOptions::default()
///     .with_reply_to(Some(42))
///     .with_protected(true);
/// assert_eq!(options.reply_to, Some(42));
/// assert!(options.parse_mode.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct SendOptions {
    /// Message to reply to, in the destination chat
    pub reply_to: Option<MessageId>,
    /// Forbid forwarding and saving
    pub protected: bool,
    /// Caption markup mode understood by the backend
    pub parse_mode: Option<String>,
    /// Deliver silently
    pub disable_notification: bool,
    /// Do not render link previews
    pub disable_web_page_preview: bool,
}

/// The RPC surface of the messaging backend.
///
/// Every call may fail; retries are the implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send items as one album.
    ///
    /// # Returns
    ///
    /// One delivered message per item, in order.
    async fn send_album(
        &self,
        destination: ChatId,
        items: &[OutboundItem],
        options: &SendOptions,
    ) -> TransportResult<Vec<SentMessage>>;

    /// Send a text message.
    async fn send_text(
        &self,
        destination: ChatId,
        text: &str,
        options: &SendOptions,
    ) -> TransportResult<SentMessage>;

    /// Delete a delivered message.
    async fn delete(&self, message: SentMessage) -> TransportResult<()>;

    /// Resolve a backend file id to a downloadable handle.
    async fn file_by_id(&self, remote_id: &str) -> TransportResult<RemoteFile>;

    /// Download a file to `local_path`.
    async fn download(&self, file: &RemoteFile, local_path: &Path) -> TransportResult<()>;
}
