//! Tests for the schedule summary and the assembled server.

mod test_utils;

use herald_bot::{BotConfig, HeraldServer, ScheduleSummary};
use herald_core::TimeSlot;
use herald_store::MemoryStore;
use std::sync::Arc;
use test_utils::{MockTranscoder, MockTransport, memory_store, photo_item, photo_post};

fn slot(value: &str) -> TimeSlot {
    TimeSlot::parse(value).unwrap()
}

#[tokio::test]
async fn test_summary_counts_slots() {
    let store = memory_store();
    for (id, at) in [("a", "09:00"), ("b", "09:00"), ("c", "12:00"), ("d", "NA"), ("e", "NA"), ("f", "NA")] {
        store.add(photo_post(id, at)).await.unwrap();
    }

    let summary = ScheduleSummary::collect(&store, &[slot("09:00"), slot("18:00")])
        .await
        .unwrap();

    assert_eq!(summary.per_slot.get(&slot("09:00")), Some(&2));
    assert_eq!(summary.per_slot.get(&slot("12:00")), Some(&1));
    assert_eq!(summary.per_slot.len(), 2);
    assert_eq!(summary.free, 3);
    assert_eq!(summary.days_covered, 2);

    let report = summary.to_string();
    assert!(report.starts_with("09:00: 2\n12:00: 1\nFree: 3\n"));
    assert!(report.contains("Default schedule: 09:00, 18:00"));
    assert!(report.ends_with("Days full with posts: 2"));
}

#[tokio::test]
async fn test_summary_without_defaults() {
    let store = memory_store();
    store.add(photo_post("a", "NA")).await.unwrap();

    let summary = ScheduleSummary::collect(&store, &[]).await.unwrap();
    assert_eq!(summary.free, 1);
    assert_eq!(summary.days_covered, 0);
}

#[tokio::test(start_paused = true)]
async fn test_server_wires_intake_to_store() {
    let config = BotConfig::from_toml_str(
        r#"
        channel_id = -1001
        comments_id = -1002
        default_slots = ["09:00"]
        default_post_text = "fresh"
        "#,
    )
    .unwrap();
    let server = HeraldServer::new(
        config,
        Some(7),
        Arc::new(MemoryStore::new()),
        Arc::new(MockTransport::new()),
        Arc::new(MockTranscoder::new(false)),
    );
    assert_eq!(server.store().keys().prefix(), "herald:7");

    server.aggregator().submit(photo_item(1, Some("g"))).unwrap();
    server.aggregator().tasks().join_all().await;

    let post = server.store().get("g").await.unwrap();
    assert_eq!(post.text, "fresh");

    let summary = server.summary().await.unwrap();
    assert_eq!(summary.free, 1);
    assert_eq!(summary.days_covered, 1);

    server.shutdown().await.unwrap();
    assert!(server.aggregator().tasks().is_empty());
}
