//! In-process key-value backend.

use crate::kv::{KeyValueStore, KvResult};
use async_trait::async_trait;
use herald_error::PostError;
use rand::seq::IteratorRandom;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(BTreeSet<String>),
    List(Vec<String>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Set(_) => "set",
            Value::List(_) => "list",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, Value>,
    failing: Vec<String>,
}

impl Inner {
    fn check_write(&self, key: &str) -> KvResult<()> {
        match self.failing.iter().find(|fragment| key.contains(fragment.as_str())) {
            Some(fragment) => Err(PostError::backend(format!(
                "injected write failure for {} (matches {})",
                key, fragment
            ))),
            None => Ok(()),
        }
    }

    fn set(&self, key: &str) -> KvResult<Option<&BTreeSet<String>>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(Value::Set(set)) => Ok(Some(set)),
            Some(other) => Err(wrong_type(key, "set", other)),
        }
    }

    fn list(&self, key: &str) -> KvResult<Option<&Vec<String>>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(Value::List(list)) => Ok(Some(list)),
            Some(other) => Err(wrong_type(key, "list", other)),
        }
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> PostError {
    PostError::backend(format!(
        "WRONGTYPE {} holds a {}, not a {}",
        key,
        found.type_name(),
        expected
    ))
}

/// Key-value store held in memory.
///
/// Used by tests and single-process deployments without Redis. Writes to
/// keys containing a registered fragment can be made to fail, which is how
/// partial multi-key failures are exercised.
///
/// # Examples
///
/// ```
/// use herald_store::{KeyValueStore, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let kv = MemoryStore::new();
/// kv.sadd("s", "a").await.unwrap();
/// kv.srem("s", "a").await.unwrap();
/// assert!(kv.keys("").await.unwrap().is_empty());
///
/// kv.fail_writes_matching(":text").await;
/// assert!(kv.set("post:1:text", "hi").await.is_err());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to a key containing `fragment` fail.
    pub async fn fail_writes_matching(&self, fragment: impl Into<String>) {
        self.inner.lock().await.failing.push(fragment.into());
    }

    /// Stop injecting write failures.
    pub async fn clear_failures(&self) {
        self.inner.lock().await.failing.clear();
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.data.len()
    }

    /// Whether no keys are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.data.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let inner = self.inner.lock().await;
        match inner.data.get(key) {
            None => Ok(None),
            Some(Value::Str(value)) => Ok(Some(value.clone())),
            Some(other) => Err(wrong_type(key, "string", other)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_write(key)?;
        inner
            .data
            .insert(key.to_string(), Value::Str(value.to_string()));
        Ok(())
    }

    async fn del(&self, key: &str) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_write(key)?;
        inner.data.remove(key);
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_write(key)?;
        let value = inner
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(BTreeSet::new()));
        match value {
            Value::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            other => Err(wrong_type(key, "set", other)),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_write(key)?;
        let now_empty = match inner.data.get_mut(key) {
            None => return Ok(()),
            Some(Value::Set(set)) => {
                set.remove(member);
                set.is_empty()
            }
            Some(other) => return Err(wrong_type(key, "set", other)),
        };
        if now_empty {
            inner.data.remove(key);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> KvResult<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .set(key)?
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn srandmember(&self, key: &str) -> KvResult<Option<String>> {
        let inner = self.inner.lock().await;
        let mut rng = rand::thread_rng();
        Ok(inner
            .set(key)?
            .and_then(|set| set.iter().choose(&mut rng).cloned()))
    }

    async fn scard(&self, key: &str) -> KvResult<usize> {
        let inner = self.inner.lock().await;
        Ok(inner.set(key)?.map(BTreeSet::len).unwrap_or(0))
    }

    async fn sismember(&self, key: &str, member: &str) -> KvResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.set(key)?.is_some_and(|set| set.contains(member)))
    }

    async fn rpush(&self, key: &str, values: &[String]) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_write(key)?;
        let value = inner
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()));
        match value {
            Value::List(list) => {
                list.extend(values.iter().cloned());
                Ok(())
            }
            other => Err(wrong_type(key, "list", other)),
        }
    }

    async fn lrange(&self, key: &str) -> KvResult<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.list(key)?.cloned().unwrap_or_default())
    }

    async fn keys(&self, prefix: &str) -> KvResult<Vec<String>> {
        let inner = self.inner.lock().await;
        let mut keys: Vec<String> = inner
            .data
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
