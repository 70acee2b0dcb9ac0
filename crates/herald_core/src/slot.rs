//! Publication time slots.

use chrono::{NaiveTime, Timelike};
use herald_error::PostError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Stored form of the "no specific time" slot.
pub const UNSPECIFIED: &str = "NA";

static SLOT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-1][0-9]|2[0-3]):([0-5][0-9])$").expect("slot pattern is a valid regex")
});

/// A `HH:MM` publication time, or the unscheduled bucket.
///
/// Slots order the same way their stored strings sort lexically: every
/// concrete time sorts before [`TimeSlot::Unspecified`].
///
/// # Examples
///
/// ```
/// use herald_core::TimeSlot;
///
/// let slot: TimeSlot = "09:30".parse().unwrap();
/// assert_eq!(slot.to_string(), "09:30");
/// assert_eq!(TimeSlot::parse("").unwrap(), TimeSlot::Unspecified);
/// assert_eq!(TimeSlot::parse("na").unwrap().to_string(), "NA");
/// assert!(TimeSlot::parse("25:00").is_err());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum TimeSlot {
    /// A concrete minute of the day
    At(NaiveTime),
    /// No specific time; picked when a default slot has nothing scheduled
    #[default]
    Unspecified,
}

impl TimeSlot {
    /// Parse a slot string: `HH:MM`, blank, or the sentinel (any case).
    #[track_caller]
    pub fn parse(value: &str) -> Result<Self, PostError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNSPECIFIED) {
            return Ok(Self::Unspecified);
        }
        let captures = SLOT_PATTERN
            .captures(trimmed)
            .ok_or_else(|| PostError::invalid(format!("{} is invalid time", value)))?;
        let hour: u32 = captures[1]
            .parse()
            .map_err(|_| PostError::invalid(format!("{} is invalid time", value)))?;
        let minute: u32 = captures[2]
            .parse()
            .map_err(|_| PostError::invalid(format!("{} is invalid time", value)))?;
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self::At)
            .ok_or_else(|| PostError::invalid(format!("{} is invalid time", value)))
    }

    /// Whether `value` would parse as a slot.
    pub fn is_valid(value: &str) -> bool {
        Self::parse(value).is_ok()
    }

    /// The slot a wall-clock time falls into (seconds are dropped).
    pub fn from_time(time: NaiveTime) -> Self {
        Self::At(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }

    /// Whether this is the unscheduled bucket.
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(time) => write!(f, "{}", time.format("%H:%M")),
            Self::Unspecified => f.write_str(UNSPECIFIED),
        }
    }
}

impl FromStr for TimeSlot {
    type Err = PostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = PostError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}
