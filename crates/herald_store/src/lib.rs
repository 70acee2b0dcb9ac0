//! Key-value backed post store for the Herald channel scheduler.
//!
//! [`PostStore`] keeps every post as a handful of plain keys plus three
//! indexes: posts per time slot, the set of live posts, and a reverse lookup
//! from `(publisher, original item)` to post id. Writes are sequences of
//! independent key operations serialized by one coarse lock.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use herald_core::{FileKind, PostBuilder, PostFile};
//! use herald_store::{KeySpace, MemoryStore, PostStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = PostStore::new(Arc::new(MemoryStore::new()), KeySpace::new("herald"));
//! let post = PostBuilder::default()
//!     .id("album-1")
//!     .files(vec![PostFile::new(FileKind::Photo, "photo-1")])
//!     .publisher_id(1000)
//!     .original_item_ids(vec![7])
//!     .build()
//!     .unwrap();
//!
//! store.add(post).await.unwrap();
//! assert!(store.contains("album-1").await.unwrap());
//! assert_eq!(store.find_by_item(1000, 7).await.unwrap().as_deref(), Some("album-1"));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod keys;
mod kv;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod store;

pub use config::StoreConfig;
pub use keys::{KeySpace, PostField};
pub use kv::KeyValueStore;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use store::PostStore;
