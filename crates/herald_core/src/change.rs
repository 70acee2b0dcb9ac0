//! Single-field post edits.

use crate::{MessageId, Post, SourcePolicy, TimeSlot};
use herald_error::PostError;
use serde::{Deserialize, Serialize};

/// One mutable field of a [`Post`] together with its new value.
///
/// # Examples
///
/// ```
/// use herald_core::{Post, PostChange, TimeSlot};
///
/// let mut post = Post::default();
/// PostChange::Time("11:11".to_string()).apply(&mut post).unwrap();
/// assert_eq!(post.time_slot, TimeSlot::parse("11:11").unwrap());
///
/// assert!(PostChange::Time("25:00".to_string()).apply(&mut post).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum PostChange {
    /// New time slot, validated on apply
    #[display("time -> {}", _0)]
    Time(String),
    /// New primary caption
    #[display("text")]
    Text(String),
    /// New secondary caption
    #[display("comment")]
    Comment(String),
    /// New follow-up policy
    #[display("source policy -> {}", _0)]
    SourcePolicy(SourcePolicy),
    /// New protection flag
    #[display("protected -> {}", _0)]
    Protected(bool),
    /// Correlated acknowledgement message id
    #[display("comments message id -> {}", _0)]
    CommentsMessageId(MessageId),
}

impl PostChange {
    /// Apply the change in place. The post is left untouched on error.
    #[track_caller]
    pub fn apply(&self, post: &mut Post) -> Result<(), PostError> {
        match self {
            Self::Time(value) => post.time_slot = TimeSlot::parse(value)?,
            Self::Text(value) => post.text = value.clone(),
            Self::Comment(value) => post.comment = value.clone(),
            Self::SourcePolicy(policy) => post.source_policy = *policy,
            Self::Protected(flag) => post.is_protected = *flag,
            Self::CommentsMessageId(id) => {
                if *id < 0 {
                    return Err(PostError::invalid(format!(
                        "comments message id {} is negative",
                        id
                    )));
                }
                post.comments_message_id = *id;
            }
        }
        Ok(())
    }
}
