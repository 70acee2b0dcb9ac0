//! Test utilities for Herald bot tests.
//!
//! This module provides mock collaborators and post/item helpers.

#![allow(dead_code)]

pub mod mock_transport;

pub use mock_transport::{Call, MockTranscoder, MockTransport};

use herald_core::{FileKind, InboundItem, InboundItemBuilder, InboundMedia, Post, PostBuilder, PostFile};
use herald_store::{KeySpace, MemoryStore, PostStore};
use std::sync::Arc;

/// Channel the worker publishes to in tests.
pub const CHANNEL: i64 = -100;

/// Discussion chat of [`CHANNEL`].
pub const COMMENTS: i64 = -200;

/// Submitter used by the helpers.
pub const PUBLISHER: i64 = 1000;

/// Fresh store over an in-memory backend.
pub fn memory_store() -> Arc<PostStore> {
    Arc::new(PostStore::new(
        Arc::new(MemoryStore::new()),
        KeySpace::new("test"),
    ))
}

/// Post at `slot` with one photo.
pub fn photo_post(id: &str, slot: &str) -> Post {
    post_with_files(id, slot, vec![PostFile::new(FileKind::Photo, format!("{}-photo", id))])
}

/// Post at `slot` with the given files.
pub fn post_with_files(id: &str, slot: &str, files: Vec<PostFile>) -> Post {
    PostBuilder::default()
        .id(id)
        .time_slot(herald_core::TimeSlot::parse(slot).expect("valid slot"))
        .files(files)
        .publisher_id(PUBLISHER)
        .original_item_ids(vec![1])
        .build()
        .expect("valid post")
}

/// Photo item, grouped when `group` is given.
pub fn photo_item(item_id: i64, group: Option<&str>) -> InboundItem {
    InboundItemBuilder::default()
        .chat_id(PUBLISHER)
        .item_id(item_id)
        .group_id(group.map(str::to_string))
        .sender_id(Some(PUBLISHER))
        .media(InboundMedia::Photo {
            remote_id: format!("photo-{}", item_id),
            size: Some(1024),
        })
        .build()
        .expect("valid item")
}
