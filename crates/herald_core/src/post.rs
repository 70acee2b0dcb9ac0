//! The schedulable post and its parts.

use crate::{ChatId, MessageId, TimeSlot};
use herald_error::PostError;
use serde::{Deserialize, Serialize};

/// Upper bound for `text` and `comment`, in UTF-16 code units.
pub const MAX_CAPTION_UNITS: usize = 4096;

/// Whether the original, untranscoded files are re-posted as a follow-up.
///
/// Stored as its numeric discriminant.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::FromRepr,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourcePolicy {
    /// Decide at publish time (currently behaves as `Never`)
    #[default]
    Auto = 0,
    /// Always post the sources
    Always = 1,
    /// Never post the sources; only the comment, if any
    Never = 2,
}

impl SourcePolicy {
    /// Numeric code used in storage.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a stored numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::from_repr(code)
    }

    /// The policy actually applied at publish time.
    ///
    /// `Auto` has no detection behind it and is published as `Never`.
    pub fn effective(self) -> Self {
        match self {
            Self::Auto => Self::Never,
            other => other,
        }
    }
}

/// How a file was submitted, which decides how it is published.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::FromRepr,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileKind {
    /// Compressed photo, forwarded as-is
    Photo = 0,
    /// Compressed video, forwarded as-is
    Video = 1,
    /// Image sent as a document; published as a photo, original kept as source
    DocPhoto = 2,
    /// Video sent as a document; published as a video, original kept as source
    DocVideo = 3,
}

impl FileKind {
    /// Numeric code used in storage.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a stored numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::from_repr(code)
    }

    /// Whether the file was submitted as a document and has a source to re-post.
    pub fn is_document(self) -> bool {
        matches!(self, Self::DocPhoto | Self::DocVideo)
    }
}

/// A file reference on the messaging backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostFile {
    /// How the file is published
    pub kind: FileKind,
    /// Backend file identifier
    pub remote_id: String,
}

impl PostFile {
    /// Create a new file reference.
    pub fn new(kind: FileKind, remote_id: impl Into<String>) -> Self {
        Self {
            kind,
            remote_id: remote_id.into(),
        }
    }
}

/// A schedulable unit: one or more files plus two captions.
///
/// # Examples
///
/// ```
/// use herald_core::{FileKind, PostBuilder, PostFile, TimeSlot};
///
/// let post = PostBuilder::default()
///     .id("album-1")
///     .time_slot(TimeSlot::parse("11:11").unwrap())
///     .files(vec![PostFile::new(FileKind::Photo, "photo-1")])
///     .publisher_id(1000)
///     .original_item_ids(vec![7])
///     .build()
///     .unwrap();
///
/// assert!(post.validate().is_ok());
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct Post {
    /// Stable identity derived from the originating submission
    pub id: String,
    /// When the post is due
    #[builder(default)]
    #[serde(default)]
    pub time_slot: TimeSlot,
    /// Primary caption
    #[builder(default)]
    #[serde(default)]
    pub text: String,
    /// Secondary "sources/comment" caption
    #[builder(default)]
    #[serde(default)]
    pub comment: String,
    /// Follow-up policy for original files
    #[builder(default)]
    #[serde(default)]
    pub source_policy: SourcePolicy,
    /// Forwarding/saving restriction on the destination
    #[builder(default)]
    #[serde(default)]
    pub is_protected: bool,
    /// Ordered, non-empty file list
    pub files: Vec<PostFile>,
    /// Id of the acknowledging message in the comments chat, 0 until correlated
    #[builder(default)]
    #[serde(default)]
    pub comments_message_id: MessageId,
    /// Who submitted the post
    pub publisher_id: ChatId,
    /// Raw inbound items the post was built from
    pub original_item_ids: Vec<MessageId>,
}

impl Post {
    /// Check every invariant a stored post must hold.
    #[track_caller]
    pub fn validate(&self) -> Result<(), PostError> {
        if self.id.is_empty() {
            return Err(PostError::invalid("post id is empty"));
        }
        check_caption("text", &self.text)?;
        check_caption("comment", &self.comment)?;
        if self.publisher_id == 0 {
            return Err(PostError::invalid(format!(
                "post {} has no publisher",
                self.id
            )));
        }
        if self.files.is_empty() {
            return Err(PostError::invalid(format!("post {} has no files", self.id)));
        }
        if self.original_item_ids.is_empty() {
            return Err(PostError::invalid(format!(
                "post {} has no original items",
                self.id
            )));
        }
        if self.comments_message_id < 0 {
            return Err(PostError::invalid(format!(
                "post {} has a negative comments message id",
                self.id
            )));
        }
        Ok(())
    }

    /// Whether any file has an original to post as a source.
    pub fn has_sources(&self) -> bool {
        self.files.iter().any(|f| f.kind.is_document())
    }
}

#[track_caller]
fn check_caption(field: &str, value: &str) -> Result<(), PostError> {
    let units = value.encode_utf16().count();
    if units > MAX_CAPTION_UNITS {
        return Err(PostError::invalid(format!(
            "{} is {} characters long (max {})",
            field, units, MAX_CAPTION_UNITS
        )));
    }
    Ok(())
}
