use herald_core::{
    FileKind, InboundItem, InboundItemBuilder, InboundMedia, Post, PostBuilder, PostChange,
    PostFile, SourcePolicy, TimeSlot,
};
use herald_error::PostErrorKind;
use herald_store::{KeySpace, KeyValueStore, MemoryStore, PostStore};
use std::collections::HashSet;
use std::sync::Arc;

const PREFIX: &str = "herald:testing";

fn store() -> (Arc<MemoryStore>, PostStore) {
    let kv = Arc::new(MemoryStore::new());
    let store = PostStore::new(kv.clone(), KeySpace::new(PREFIX));
    (kv, store)
}

fn post_1111() -> Post {
    PostBuilder::default()
        .id("testPost1111")
        .time_slot(TimeSlot::parse("11:11").unwrap())
        .text("test text 1111")
        .comment("test comment 1111")
        .source_policy(SourcePolicy::Always)
        .is_protected(true)
        .files(vec![
            PostFile::new(FileKind::Photo, "kitty photo 1111"),
            PostFile::new(FileKind::Video, "corgi video 1111"),
        ])
        .comments_message_id(777)
        .publisher_id(1000)
        .original_item_ids(vec![7, 8])
        .build()
        .unwrap()
}

fn post_na() -> Post {
    PostBuilder::default()
        .id("testPostNA")
        .text("test text 2222")
        .comment("test comment 2222")
        .source_policy(SourcePolicy::Always)
        .is_protected(true)
        .files(vec![
            PostFile::new(FileKind::DocPhoto, "kitty photo 2222"),
            PostFile::new(FileKind::DocVideo, "corgi video 2222"),
        ])
        .publisher_id(1000)
        .original_item_ids(vec![12, 13])
        .build()
        .unwrap()
}

fn item(item_id: i64, group: Option<&str>, media: InboundMedia) -> InboundItem {
    InboundItemBuilder::default()
        .chat_id(1000)
        .item_id(item_id)
        .group_id(group.map(str::to_string))
        .sender_id(Some(1000))
        .media(media)
        .build()
        .unwrap()
}

#[tokio::test]
async fn add_then_get_returns_equal_post() {
    let (_kv, store) = store();
    let stored = store.add(post_1111()).await.unwrap();
    assert_eq!(stored, post_1111());
    assert_eq!(store.get("testPost1111").await.unwrap(), post_1111());

    let stored = store.add(post_na()).await.unwrap();
    assert_eq!(stored, post_na());
}

#[tokio::test]
async fn add_rejects_duplicates_and_invalid_posts() {
    let (_kv, store) = store();
    store.add(post_1111()).await.unwrap();

    let err = store.add(post_1111()).await.unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::AlreadyExists(_)));

    let mut broken = post_na();
    broken.files.clear();
    let err = store.add(broken).await.unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::InvalidInput(_)));
    assert!(!store.contains("testPostNA").await.unwrap());
}

#[tokio::test]
async fn get_missing_post_is_not_found() {
    let (_kv, store) = store();
    let err = store.get("nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn remove_is_idempotent() {
    let (_kv, store) = store();
    store.add(post_1111()).await.unwrap();
    store.remove("testPost1111").await.unwrap();
    store.remove("testPost1111").await.unwrap();
    store.remove("never-existed").await.unwrap();
    assert!(!store.contains("testPost1111").await.unwrap());
}

#[tokio::test]
async fn remove_leaves_no_keys_behind() {
    let (kv, store) = store();
    store.add(post_1111()).await.unwrap();
    store.add(post_na()).await.unwrap();

    store.remove("testPost1111").await.unwrap();
    store.remove("testPostNA").await.unwrap();

    let left = kv.keys(PREFIX).await.unwrap();
    assert!(left.is_empty(), "keys left: {:?}", left);
    assert_eq!(store.find_by_item(1000, 7).await.unwrap(), None);
}

#[tokio::test]
async fn remove_keeps_slot_while_other_posts_share_it() {
    let (_kv, store) = store();
    store.add(post_1111()).await.unwrap();
    let mut sibling = post_1111();
    sibling.id = "sibling".into();
    sibling.original_item_ids = vec![9];
    store.add(sibling).await.unwrap();

    store.remove("testPost1111").await.unwrap();
    let slots = store.time_slots().await.unwrap();
    assert_eq!(slots, vec![TimeSlot::parse("11:11").unwrap()]);
    assert_eq!(store.by_slot("11:11").await.unwrap().len(), 1);
}

#[tokio::test]
async fn time_slots_are_sorted() {
    let (_kv, store) = store();
    store.add(post_na()).await.unwrap();
    store.add(post_1111()).await.unwrap();

    let slots: Vec<String> = store
        .time_slots()
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(slots, vec!["11:11", "NA"]);
}

#[tokio::test]
async fn by_slot_validates_the_slot() {
    let (_kv, store) = store();
    store.add(post_na()).await.unwrap();

    let err = store.by_slot("25:00").await.unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::InvalidInput(_)));

    let unscheduled = store.by_slot("").await.unwrap();
    assert_eq!(unscheduled, vec![post_na()]);
    assert!(store.by_slot("10:00").await.unwrap().is_empty());
}

#[tokio::test]
async fn random_by_slot_picks_a_member_or_reports_not_found() {
    let (_kv, store) = store();
    let err = store.random_by_slot("11:11").await.unwrap_err();
    assert!(err.is_not_found());

    store.add(post_1111()).await.unwrap();
    let mut other = post_1111();
    other.id = "other".into();
    other.original_item_ids = vec![99];
    store.add(other).await.unwrap();

    let mut seen = HashSet::new();
    for _ in 0..64 {
        seen.insert(store.random_by_slot("11:11").await.unwrap().id);
    }
    assert!(seen.is_subset(&HashSet::from(["testPost1111".to_string(), "other".to_string()])));
    assert!(!seen.is_empty());
}

#[tokio::test]
async fn all_lists_every_post() {
    let (_kv, store) = store();
    store.add(post_1111()).await.unwrap();
    store.add(post_na()).await.unwrap();

    let mut ids: Vec<String> = store.all().await.unwrap().into_iter().map(|p| p.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["testPost1111", "testPostNA"]);
}

#[tokio::test]
async fn change_time_moves_post_between_slots() {
    let (_kv, store) = store();
    store.add(post_na()).await.unwrap();

    let err = store
        .change("testPostNA", PostChange::Time("25:00".into()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::InvalidInput(_)));
    assert_eq!(store.get("testPostNA").await.unwrap(), post_na());

    let changed = store
        .change("testPostNA", PostChange::Time("11:11".into()))
        .await
        .unwrap();
    assert_eq!(changed.time_slot.to_string(), "11:11");
    assert_eq!(store.get("testPostNA").await.unwrap().time_slot.to_string(), "11:11");

    let slots: Vec<String> = store
        .time_slots()
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(slots, vec!["11:11"]);
}

#[tokio::test]
async fn change_keeps_reverse_index() {
    let (_kv, store) = store();
    store.add(post_1111()).await.unwrap();
    store
        .change("testPost1111", PostChange::CommentsMessageId(4242))
        .await
        .unwrap();

    let post = store.get("testPost1111").await.unwrap();
    assert_eq!(post.comments_message_id, 4242);
    assert_eq!(
        store.find_by_item(1000, 8).await.unwrap().as_deref(),
        Some("testPost1111")
    );
}

#[tokio::test]
async fn change_of_missing_post_is_not_found() {
    let (_kv, store) = store();
    let err = store
        .change("nope", PostChange::Protected(true))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn change_proceeds_when_cleanup_partially_fails() {
    let (kv, store) = store();
    store.add(post_1111()).await.unwrap();

    // The old slot index cannot be cleaned up.
    kv.fail_writes_matching(":time:11:11").await;
    let changed = store
        .change("testPost1111", PostChange::Time("NA".into()))
        .await
        .unwrap();
    assert!(changed.time_slot.is_unspecified());
    assert_eq!(store.get("testPost1111").await.unwrap().text, "test text 1111");
}

#[tokio::test]
async fn change_keeps_post_when_posts_set_cannot_be_updated() {
    let (kv, store) = store();
    store.add(post_1111()).await.unwrap();

    // The id stays in the posts set while the fields are rewritten.
    kv.fail_writes_matching(format!("{}:posts", PREFIX)).await;
    let err = store
        .change("testPost1111", PostChange::Text("new text".into()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::Aggregate(_)), "{err:?}");
    kv.clear_failures().await;

    assert!(store.contains("testPost1111").await.unwrap());
    let post = store.get("testPost1111").await.unwrap();
    assert_eq!(post.text, "new text");
    assert_eq!(post.time_slot, TimeSlot::parse("11:11").unwrap());
    assert_eq!(post.files.len(), 2);
    assert_eq!(
        store.find_by_item(1000, 7).await.unwrap().as_deref(),
        Some("testPost1111")
    );
    assert_eq!(store.by_slot("11:11").await.unwrap().len(), 1);
}

#[tokio::test]
async fn remove_attempts_every_step_and_joins_failures() {
    let (kv, store) = store();
    store.add(post_1111()).await.unwrap();

    kv.fail_writes_matching(":text").await;
    kv.fail_writes_matching(":comment").await;
    let err = store.remove("testPost1111").await.unwrap_err();
    match err.kind {
        PostErrorKind::Aggregate(steps) => assert_eq!(steps.len(), 2, "{:?}", steps),
        other => panic!("expected aggregate error, got {other:?}"),
    }

    // Everything else was still removed.
    assert!(!store.contains("testPost1111").await.unwrap());
    assert!(store.time_slots().await.unwrap().is_empty());
    assert_eq!(store.find_by_item(1000, 7).await.unwrap(), None);

    kv.clear_failures().await;
    let left = kv.keys(PREFIX).await.unwrap();
    assert_eq!(left.len(), 2, "{:?}", left);
}

#[tokio::test]
async fn add_from_items_builds_post_from_group() {
    let (_kv, store) = store();
    let template = PostBuilder::default()
        .id("")
        .text("default text")
        .files(Vec::new())
        .publisher_id(0)
        .original_item_ids(Vec::new())
        .build()
        .unwrap();
    let items = vec![
        item(
            5,
            Some("g1"),
            InboundMedia::Photo {
                remote_id: "p".into(),
                size: Some(100),
            },
        ),
        item(
            6,
            Some("g1"),
            InboundMedia::Document {
                remote_id: "d".into(),
                mime: "IMAGE/png".into(),
                size: Some(1_000),
            },
        ),
        item(
            7,
            Some("g1"),
            InboundMedia::Document {
                remote_id: "v".into(),
                mime: "video/mp4".into(),
                size: None,
            },
        ),
    ];

    let post = store.add_from_items(&template, &items).await.unwrap();
    assert_eq!(post.id, "g1");
    assert_eq!(post.text, "default text");
    assert_eq!(post.publisher_id, 1000);
    assert_eq!(post.original_item_ids, vec![5, 6, 7]);
    assert_eq!(
        post.files,
        vec![
            PostFile::new(FileKind::Photo, "p"),
            PostFile::new(FileKind::DocPhoto, "d"),
            PostFile::new(FileKind::DocVideo, "v"),
        ]
    );
    assert!(post.time_slot.is_unspecified());
    assert_eq!(store.find_by_item(1000, 6).await.unwrap().as_deref(), Some("g1"));

    let err = store.add_from_items(&template, &items).await.unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::AlreadyExists(_)));
}

#[tokio::test]
async fn add_from_items_singleton_uses_composite_id() {
    let (_kv, store) = store();
    let items = vec![item(
        42,
        None,
        InboundMedia::Video {
            remote_id: "v".into(),
            size: None,
        },
    )];
    let post = store.add_from_items(&Post::default(), &items).await.unwrap();
    assert_eq!(post.id, "1000_42");
}

#[tokio::test]
async fn oversized_item_is_rejected_without_partial_post() {
    let kv = Arc::new(MemoryStore::new());
    let store = PostStore::new(kv.clone(), KeySpace::new(PREFIX)).with_max_item_bytes(1_000);
    let items = vec![
        item(
            1,
            Some("big"),
            InboundMedia::Photo {
                remote_id: "small".into(),
                size: Some(10),
            },
        ),
        item(
            2,
            Some("big"),
            InboundMedia::Document {
                remote_id: "huge-doc".into(),
                mime: "video/mp4".into(),
                size: Some(5_000),
            },
        ),
    ];

    let err = store.add_from_items(&Post::default(), &items).await.unwrap_err();
    match &err.kind {
        PostErrorKind::TooLarge { item, size, limit } => {
            assert_eq!(item, "huge-doc");
            assert_eq!(*size, 5_000);
            assert_eq!(*limit, 1_000);
        }
        other => panic!("expected size error, got {other:?}"),
    }
    assert!(err.to_string().contains("huge-doc"));
    assert!(!store.contains("big").await.unwrap());
    assert!(kv.is_empty().await);
}

#[tokio::test]
async fn add_from_items_rejects_unsupported_and_empty_input() {
    let (_kv, store) = store();
    let err = store.add_from_items(&Post::default(), &[]).await.unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::InvalidInput(_)));

    let items = vec![item(3, None, InboundMedia::Sticker)];
    let err = store.add_from_items(&Post::default(), &items).await.unwrap_err();
    assert!(err.to_string().contains("stickers"));

    let items = vec![item(
        4,
        None,
        InboundMedia::Document {
            remote_id: "zip".into(),
            mime: "application/zip".into(),
            size: Some(1),
        },
    )];
    let err = store.add_from_items(&Post::default(), &items).await.unwrap_err();
    assert!(matches!(err.kind, PostErrorKind::InvalidInput(_)));
}

#[tokio::test]
async fn concurrent_operations_keep_indexes_consistent() {
    let kv = Arc::new(MemoryStore::new());
    let store = Arc::new(PostStore::new(kv.clone(), KeySpace::new(PREFIX)));

    let mut handles = Vec::new();
    for n in 0..20_i64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut post = post_1111();
            post.id = format!("post-{n}");
            post.original_item_ids = vec![n + 100];
            store.add(post).await.unwrap();
            if n % 2 == 0 {
                store.remove(&format!("post-{n}")).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.all().await.unwrap().len(), 10);
    assert_eq!(store.by_slot("11:11").await.unwrap().len(), 10);
}
