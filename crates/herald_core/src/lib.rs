//! Core data types for the Herald channel scheduler.
//!
//! This crate provides the domain model shared by the store and the bot:
//! posts, their time slots and files, field changes, and raw inbound items.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod item;
mod post;
mod slot;
mod telemetry;

pub use change::PostChange;
pub use item::{InboundItem, InboundItemBuilder, InboundMedia};
pub use post::{FileKind, MAX_CAPTION_UNITS, Post, PostBuilder, PostFile, SourcePolicy};
pub use slot::{TimeSlot, UNSPECIFIED};
pub use telemetry::{init_telemetry, shutdown_telemetry};

/// Identifier of a chat, channel or user on the messaging backend.
pub type ChatId = i64;

/// Identifier of a message within a chat.
pub type MessageId = i64;
