use herald_store::{KeyValueStore, MemoryStore};

#[tokio::test]
async fn sets_disappear_with_their_last_member() {
    let kv = MemoryStore::new();
    kv.sadd("s", "a").await.unwrap();
    kv.sadd("s", "b").await.unwrap();
    kv.sadd("s", "a").await.unwrap();
    assert_eq!(kv.scard("s").await.unwrap(), 2);
    assert!(kv.sismember("s", "b").await.unwrap());

    kv.srem("s", "a").await.unwrap();
    kv.srem("s", "b").await.unwrap();
    assert_eq!(kv.scard("s").await.unwrap(), 0);
    assert!(kv.is_empty().await);
}

#[tokio::test]
async fn random_member_of_missing_set_is_none() {
    let kv = MemoryStore::new();
    assert_eq!(kv.srandmember("missing").await.unwrap(), None);
    kv.sadd("s", "only").await.unwrap();
    assert_eq!(kv.srandmember("s").await.unwrap().as_deref(), Some("only"));
}

#[tokio::test]
async fn lists_keep_push_order() {
    let kv = MemoryStore::new();
    kv.rpush("l", &["1".to_string(), "2".to_string()]).await.unwrap();
    kv.rpush("l", &["3".to_string()]).await.unwrap();
    assert_eq!(kv.lrange("l").await.unwrap(), vec!["1", "2", "3"]);
    kv.del("l").await.unwrap();
    assert!(kv.lrange("l").await.unwrap().is_empty());
}

#[tokio::test]
async fn type_mismatch_is_a_backend_error() {
    let kv = MemoryStore::new();
    kv.set("k", "v").await.unwrap();
    assert!(kv.sadd("k", "m").await.is_err());
    assert!(kv.lrange("k").await.is_err());
}

#[tokio::test]
async fn injected_failures_only_hit_matching_writes() {
    let kv = MemoryStore::new();
    kv.fail_writes_matching(":files").await;
    assert!(kv.rpush("post:1:files", &["x".to_string()]).await.is_err());
    assert!(kv.set("post:1:text", "ok").await.is_ok());
    assert_eq!(kv.get("post:1:text").await.unwrap().as_deref(), Some("ok"));

    kv.clear_failures().await;
    assert!(kv.rpush("post:1:files", &["x".to_string()]).await.is_ok());
    assert_eq!(
        kv.keys("post:1:").await.unwrap(),
        vec!["post:1:files", "post:1:text"]
    );
}
