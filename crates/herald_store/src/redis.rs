//! Redis key-value backend.

use crate::kv::{KeyValueStore, KvResult};
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use herald_error::PostError;
use tracing::{debug, instrument};

/// Key-value store backed by a pooled Redis connection.
pub struct RedisStore {
    pool: Pool,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisStore {
    /// Create a pool for `url` and check that the server answers.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is malformed or the server is unreachable.
    #[instrument(skip_all)]
    pub async fn connect(url: &str) -> KvResult<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(PostError::backend)?;
        let store = Self { pool };
        let mut conn = store.connection().await?;
        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(PostError::backend)?;
        debug!("Connected to Redis");
        Ok(store)
    }

    async fn connection(&self) -> KvResult<Connection> {
        self.pool.get().await.map_err(PostError::backend)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key).await.map_err(PostError::backend)
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(PostError::backend)
    }

    async fn del(&self, key: &str) -> KvResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await.map_err(PostError::backend)
    }

    async fn sadd(&self, key: &str, member: &str) -> KvResult<()> {
        let mut conn = self.connection().await?;
        conn.sadd::<_, _, ()>(key, member)
            .await
            .map_err(PostError::backend)
    }

    async fn srem(&self, key: &str, member: &str) -> KvResult<()> {
        let mut conn = self.connection().await?;
        conn.srem::<_, _, ()>(key, member)
            .await
            .map_err(PostError::backend)
    }

    async fn smembers(&self, key: &str) -> KvResult<Vec<String>> {
        let mut conn = self.connection().await?;
        conn.smembers(key).await.map_err(PostError::backend)
    }

    async fn srandmember(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.srandmember(key).await.map_err(PostError::backend)
    }

    async fn scard(&self, key: &str) -> KvResult<usize> {
        let mut conn = self.connection().await?;
        conn.scard(key).await.map_err(PostError::backend)
    }

    async fn sismember(&self, key: &str, member: &str) -> KvResult<bool> {
        let mut conn = self.connection().await?;
        conn.sismember(key, member)
            .await
            .map_err(PostError::backend)
    }

    async fn rpush(&self, key: &str, values: &[String]) -> KvResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        conn.rpush::<_, _, ()>(key, values)
            .await
            .map_err(PostError::backend)
    }

    async fn lrange(&self, key: &str) -> KvResult<Vec<String>> {
        let mut conn = self.connection().await?;
        conn.lrange(key, 0, -1).await.map_err(PostError::backend)
    }

    async fn keys(&self, prefix: &str) -> KvResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let mut keys: Vec<String> = conn
            .keys(format!("{}*", prefix))
            .await
            .map_err(PostError::backend)?;
        keys.sort();
        Ok(keys)
    }
}
