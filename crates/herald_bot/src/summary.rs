//! Overview of what is scheduled.

use herald_core::TimeSlot;
use herald_error::PostError;
use herald_store::PostStore;
use std::collections::BTreeMap;
use std::fmt;
use tracing::instrument;

/// Post counts per slot and how long the unscheduled posts will last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Posts per concrete slot
    pub per_slot: BTreeMap<TimeSlot, usize>,
    /// Unscheduled posts
    pub free: usize,
    /// Default schedule the summary was computed for
    pub default_slots: Vec<TimeSlot>,
    /// Days every default slot can be filled
    pub days_covered: u64,
}

impl ScheduleSummary {
    /// Count the stored posts.
    #[instrument(skip_all)]
    pub async fn collect(
        store: &PostStore,
        default_slots: &[TimeSlot],
    ) -> Result<Self, PostError> {
        let mut per_slot: BTreeMap<TimeSlot, usize> = BTreeMap::new();
        let mut free: usize = 0;
        for post in store.all().await? {
            if post.time_slot.is_unspecified() {
                free += 1;
            } else {
                *per_slot.entry(post.time_slot).or_insert(0) += 1;
            }
        }

        let counts: Vec<u64> = default_slots
            .iter()
            .map(|slot| per_slot.get(slot).copied().unwrap_or(0) as u64)
            .collect();
        Ok(Self {
            days_covered: days_covered(&counts, free as u64),
            per_slot,
            free,
            default_slots: default_slots.to_vec(),
        })
    }
}

impl fmt::Display for ScheduleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (slot, count) in &self.per_slot {
            writeln!(f, "{}: {}", slot, count)?;
        }
        writeln!(f, "Free: {}", self.free)?;
        writeln!(f)?;
        let defaults: Vec<String> = self.default_slots.iter().map(|s| s.to_string()).collect();
        writeln!(f, "Default schedule: {}", defaults.join(", "))?;
        write!(f, "Days full with posts: {}", self.days_covered)
    }
}

/// Largest `d` such that topping every count up to `d` takes at most `free`.
///
/// Zero when there are no counts.
///
/// # Examples
///
/// ```
/// use herald_bot::days_covered;
///
/// assert_eq!(days_covered(&[0, 0], 5), 2);
/// assert_eq!(days_covered(&[3, 0], 2), 2);
/// assert_eq!(days_covered(&[], 10), 0);
/// ```
pub fn days_covered(counts: &[u64], free: u64) -> u64 {
    let (Some(&lowest), Some(&highest)) = (counts.iter().min(), counts.iter().max()) else {
        return 0;
    };
    let cost = |days: u64| -> u64 {
        counts
            .iter()
            .map(|&count| days.saturating_sub(count))
            .fold(0u64, u64::saturating_add)
    };

    let (mut low, mut high) = (lowest, highest.saturating_add(free));
    while low < high {
        let mid = low + (high - low).div_ceil(2);
        if cost(mid) <= free {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}
