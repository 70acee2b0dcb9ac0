//! Key-value backend abstraction.

use async_trait::async_trait;
use herald_error::PostError;

/// Result type for backend operations.
pub type KvResult<T> = Result<T, PostError>;

/// The primitives the post store is written against.
///
/// Semantics follow Redis: sets and lists are created on first write,
/// and a set whose last member is removed disappears together with its key.
/// Backend failures are reported as [`herald_error::PostErrorKind::Backend`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a string value.
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Write a string value, replacing whatever was stored.
    async fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Delete a key of any type. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> KvResult<()>;

    /// Add a member to a set.
    async fn sadd(&self, key: &str, member: &str) -> KvResult<()>;

    /// Remove a member from a set.
    async fn srem(&self, key: &str, member: &str) -> KvResult<()>;

    /// All members of a set, in no particular order.
    async fn smembers(&self, key: &str) -> KvResult<Vec<String>>;

    /// A uniformly random member of a set, or `None` if it is empty.
    async fn srandmember(&self, key: &str) -> KvResult<Option<String>>;

    /// Number of members in a set.
    async fn scard(&self, key: &str) -> KvResult<usize>;

    /// Whether `member` belongs to the set.
    async fn sismember(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Append values to a list.
    async fn rpush(&self, key: &str, values: &[String]) -> KvResult<()>;

    /// Whole contents of a list.
    async fn lrange(&self, key: &str) -> KvResult<Vec<String>>;

    /// Every key starting with `prefix`.
    async fn keys(&self, prefix: &str) -> KvResult<Vec<String>>;
}
