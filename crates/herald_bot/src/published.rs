//! Short-lived map from delivered channel messages to their posts.

use herald_core::MessageId;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Which post a just-delivered channel message came from.
///
/// Entries are inserted at publish time and forgotten after a grace window,
/// whether or not the acknowledgement ever arrived.
#[derive(Debug, Default)]
pub struct PublishedMap {
    entries: Mutex<HashMap<MessageId, String>>,
}

impl PublishedMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every message to `post_id`.
    pub async fn record(&self, post_id: &str, messages: &[MessageId]) {
        let mut entries = self.entries.lock().await;
        for message in messages {
            entries.insert(*message, post_id.to_string());
        }
    }

    /// Post a delivered message belongs to.
    pub async fn lookup(&self, message: MessageId) -> Option<String> {
        self.entries.lock().await.get(&message).cloned()
    }

    /// Drop the entries of `messages` that still point at `post_id`.
    pub async fn forget(&self, post_id: &str, messages: &[MessageId]) {
        let mut entries = self.entries.lock().await;
        for message in messages {
            if entries.get(message).is_some_and(|id| id == post_id) {
                entries.remove(message);
            }
        }
    }

    /// Number of tracked messages.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no messages are tracked.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
