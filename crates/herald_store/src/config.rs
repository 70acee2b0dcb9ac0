//! Store configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use crate::KeySpace;

/// Connection and limits of the post store.
///
/// # Examples
///
/// ```
/// use herald_store::StoreConfig;
///
/// let config: StoreConfig = toml::from_str("prefix = \"joi\"").unwrap();
/// assert_eq!(config.key_prefix(Some(42)), "joi:42");
/// assert_eq!(*config.max_item_bytes(), 20_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StoreConfig {
    /// Namespace of every key
    #[serde(default = "default_prefix")]
    prefix: String,
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    redis_url: String,
    /// Largest accepted inbound item, in bytes
    #[serde(default = "default_max_item_bytes")]
    max_item_bytes: u64,
}

fn default_prefix() -> String {
    "herald".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

/// The messaging backend refuses downloads above 20 MB.
fn default_max_item_bytes() -> u64 {
    20_000_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            redis_url: default_redis_url(),
            max_item_bytes: default_max_item_bytes(),
        }
    }
}

impl StoreConfig {
    /// Effective key prefix, scoped to a bot when one is given.
    pub fn key_prefix(&self, bot_id: Option<i64>) -> String {
        match bot_id {
            Some(id) => format!("{}:{}", self.prefix, id),
            None => self.prefix.clone(),
        }
    }

    /// Key space for the effective prefix.
    pub fn key_space(&self, bot_id: Option<i64>) -> KeySpace {
        KeySpace::new(self.key_prefix(bot_id))
    }
}
