//! Tests for configuration loading.

use herald_bot::{BotConfig, WorkerSettings};
use herald_core::TimeSlot;
use std::io::Write;
use std::time::Duration;

const MINIMAL: &str = r#"
channel_id = -1001
comments_id = -1002
"#;

#[test]
fn test_defaults_applied() {
    let config = BotConfig::from_toml_str(MINIMAL).unwrap();

    assert!(config.default_slots().is_empty());
    assert_eq!(config.temporary_files_directory().to_str(), Some("."));
    assert_eq!(config.default_post_text(), "");
    assert_eq!(config.parse_mode(), "MarkdownV2");
    assert!(!config.disable_notification());
    assert_eq!(config.store().prefix(), "herald");
    assert_eq!(*config.store().max_item_bytes(), 20_000_000);
    assert_eq!(*config.worker().tick_seconds(), 60);
    assert_eq!(*config.worker().start_skew_seconds(), 5);
    assert_eq!(config.aggregator().quiet_window(), Duration::from_secs(1));
    assert_eq!(config.aggregator().notice_lifetime(), Duration::from_secs(30));
    assert_eq!(config.transcoder().max_dimensions(), "3840x3840");
    assert_eq!(*config.transcoder().jpeg_quality(), 95);
}

#[test]
fn test_worker_settings_follow_config() {
    let config = BotConfig::from_toml_str(
        r#"
        channel_id = -1001
        comments_id = -1002
        default_slots = ["09:00", " 18:30 "]
        parse_mode = ""
        disable_web_page_preview = true

        [worker]
        correlation_timeout_seconds = 90
        correlation_poll_seconds = 15
        "#,
    )
    .unwrap();

    let settings = WorkerSettings::from(&config);
    assert_eq!(settings.channel_id, -1001);
    assert_eq!(settings.comments_id, -1002);
    assert_eq!(settings.correlation_timeout, Duration::from_secs(90));
    assert_eq!(settings.correlation_poll, Duration::from_secs(15));
    assert_eq!(settings.parse_mode, None);
    assert!(settings.disable_web_page_preview);
    assert_eq!(
        settings.default_slots,
        vec![
            TimeSlot::parse("09:00").unwrap(),
            TimeSlot::parse("18:30").unwrap()
        ]
    );
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        "comments_id = -1002",
        "channel_id = 0\ncomments_id = -1002",
        "channel_id = -1001\ncomments_id = -1002\ndefault_slots = [\"24:00\"]",
        "channel_id = -1001\ncomments_id = -1002\ndefault_slots = [\"NA\"]",
        "channel_id = -1001\ncomments_id = -1002\n[worker]\ntick_seconds = 0",
        "channel_id = -1001\ncomments_id = -1002\n[worker]\ncorrelation_poll_seconds = 61",
        "channel_id = -1001\ncomments_id = -1002\n[transcoder]\nmax_dimensions = \"big\"",
        "channel_id = -1001\ncomments_id = -1002\n[transcoder]\njpeg_quality = 0",
    ];
    for case in cases {
        assert!(BotConfig::from_toml_str(case).is_err(), "accepted: {}", case);
    }
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", MINIMAL).unwrap();
    writeln!(file, "default_post_text = \"#new\"").unwrap();

    let config = BotConfig::from_file(file.path()).unwrap();
    assert_eq!(config.default_post_text(), "#new");

    assert!(BotConfig::from_file(file.path().with_extension("missing")).is_err());
}
