//! Bot configuration loaded from TOML.

use crate::transcoder::TranscoderConfig;
use derive_getters::Getters;
use herald_core::{ChatId, TimeSlot};
use herald_error::{ConfigError, HeraldResult};
use herald_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Publish cadence and correlation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct WorkerConfig {
    /// Period between schedule checks
    #[serde(default = "default_tick_seconds")]
    tick_seconds: u64,
    /// Delay past the minute boundary of the first check
    #[serde(default = "default_start_skew_seconds")]
    start_skew_seconds: u64,
    /// How long to wait for the acknowledgement of a published post
    #[serde(default = "default_correlation_timeout_seconds")]
    correlation_timeout_seconds: u64,
    /// How often to look for the acknowledgement
    #[serde(default = "default_correlation_poll_seconds")]
    correlation_poll_seconds: u64,
}

fn default_tick_seconds() -> u64 {
    60
}

fn default_start_skew_seconds() -> u64 {
    5
}

fn default_correlation_timeout_seconds() -> u64 {
    60
}

fn default_correlation_poll_seconds() -> u64 {
    10
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            start_skew_seconds: default_start_skew_seconds(),
            correlation_timeout_seconds: default_correlation_timeout_seconds(),
            correlation_poll_seconds: default_correlation_poll_seconds(),
        }
    }
}

/// Media group buffering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct AggregatorConfig {
    /// Time a group stays open after its first item
    #[serde(default = "default_quiet_window_millis")]
    quiet_window_millis: u64,
    /// Lifetime of the acknowledgement sent for a stored submission
    #[serde(default = "default_notice_lifetime_seconds")]
    notice_lifetime_seconds: u64,
}

fn default_quiet_window_millis() -> u64 {
    1000
}

fn default_notice_lifetime_seconds() -> u64 {
    30
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            quiet_window_millis: default_quiet_window_millis(),
            notice_lifetime_seconds: default_notice_lifetime_seconds(),
        }
    }
}

impl AggregatorConfig {
    /// Quiet window as a duration.
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_millis)
    }

    /// Notice lifetime as a duration.
    pub fn notice_lifetime(&self) -> Duration {
        Duration::from_secs(self.notice_lifetime_seconds)
    }
}

/// Complete bot configuration.
///
/// # Examples
///
/// ```
/// use herald_bot::BotConfig;
///
/// let config = BotConfig::from_toml_str(
///     r#"
///     channel_id = -1001
///     comments_id = -1002
///     default_slots = ["09:00", "18:30"]
///
///     [worker]
///     correlation_timeout_seconds = 120
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.default_slots().len(), 2);
/// assert_eq!(config.parse_mode(), "MarkdownV2");
/// assert_eq!(*config.worker().correlation_timeout_seconds(), 120);
/// assert_eq!(*config.worker().correlation_poll_seconds(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct BotConfig {
    /// Destination channel
    channel_id: ChatId,
    /// Discussion chat linked to the channel
    comments_id: ChatId,
    /// Slots that fall back to unscheduled posts when empty
    #[serde(default)]
    default_slots: Vec<TimeSlot>,
    /// Where downloads and conversions are written
    #[serde(default = "default_temporary_files_directory")]
    temporary_files_directory: PathBuf,
    /// Text given to every new post
    #[serde(default)]
    default_post_text: String,
    /// Caption markup mode
    #[serde(default = "default_parse_mode")]
    parse_mode: String,
    /// Publish silently
    #[serde(default)]
    disable_notification: bool,
    /// Publish without link previews
    #[serde(default)]
    disable_web_page_preview: bool,
    /// Key-value store
    #[serde(default)]
    store: StoreConfig,
    /// Scheduling worker
    #[serde(default)]
    worker: WorkerConfig,
    /// Media group aggregator
    #[serde(default)]
    aggregator: AggregatorConfig,
    /// Image transcoder
    #[serde(default)]
    transcoder: TranscoderConfig,
}

fn default_temporary_files_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_parse_mode() -> String {
    "MarkdownV2".to_string()
}

impl BotConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> HeraldResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> HeraldResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_id == 0 {
            return Err(ConfigError::new("channel_id must be set"));
        }
        if self.comments_id == 0 {
            return Err(ConfigError::new("comments_id must be set"));
        }
        if self.default_slots.iter().any(TimeSlot::is_unspecified) {
            return Err(ConfigError::new("default_slots must be HH:MM times"));
        }
        let worker = &self.worker;
        if worker.tick_seconds == 0
            || worker.correlation_timeout_seconds == 0
            || worker.correlation_poll_seconds == 0
        {
            return Err(ConfigError::new("worker periods must be non-zero"));
        }
        if worker.correlation_poll_seconds > worker.correlation_timeout_seconds {
            return Err(ConfigError::new(format!(
                "correlation_poll_seconds ({}) exceeds correlation_timeout_seconds ({})",
                worker.correlation_poll_seconds, worker.correlation_timeout_seconds
            )));
        }
        self.transcoder.validate()
    }
}
