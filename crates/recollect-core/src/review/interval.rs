//! Review interval calculation
//!
//! Intervals grow through a fixed list of base days, then double with every
//! further review. Emotional weight stretches an interval by up to 50% and a
//! live consolidation boost stretches it further. Retention follows an
//! exponential forgetting curve whose strength grows with reviews and
//! emotional weight.
//!
//! ## Core Formulas:
//! - Interval: base(n) * (1 + 0.5 * w) * (1 + p) days
//! - Retention: R = exp(-t / S) where S = (n + 1) * (1 + w)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::Memory;

/// Default base intervals in days, indexed by review count
pub const DEFAULT_BASE_INTERVALS_DAYS: [u32; 5] = [1, 3, 7, 14, 30];

/// Below this retention a due memory is urgent
pub const URGENT_RETENTION_THRESHOLD: f64 = 0.3;

/// Maximum extra stretch from emotional weight
const EMOTIONAL_STRETCH: f64 = 0.5;

/// Upper bound on any interval (100 years)
const MAX_INTERVAL_DAYS: f64 = 36_500.0;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Rejected base interval list
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleConfigError {
    #[error("review intervals must be positive")]
    ZeroInterval,
    #[error("review intervals must be ascending ({previous} then {next})")]
    NotAscending { previous: u32, next: u32 },
}

/// Base intervals for the review schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewScheduleConfig {
    base_intervals_days: Vec<u32>,
}

impl Default for ReviewScheduleConfig {
    fn default() -> Self {
        Self {
            base_intervals_days: DEFAULT_BASE_INTERVALS_DAYS.to_vec(),
        }
    }
}

impl ReviewScheduleConfig {
    /// Validate a base list. An empty list means the default schedule.
    pub fn new(base_intervals_days: Vec<u32>) -> Result<Self, ScheduleConfigError> {
        if base_intervals_days.is_empty() {
            return Ok(Self::default());
        }
        if base_intervals_days.contains(&0) {
            return Err(ScheduleConfigError::ZeroInterval);
        }
        for pair in base_intervals_days.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ScheduleConfigError::NotAscending {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self {
            base_intervals_days,
        })
    }

    pub fn base_intervals_days(&self) -> &[u32] {
        &self.base_intervals_days
    }

    /// Shortest interval any memory can get
    pub fn min_interval_days(&self) -> u32 {
        self.base_intervals_days
            .first()
            .copied()
            .unwrap_or(DEFAULT_BASE_INTERVALS_DAYS[0])
    }
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// Computes due times, retention and review bookkeeping
#[derive(Debug, Clone, Default)]
pub struct ReviewCalculator {
    config: ReviewScheduleConfig,
}

impl ReviewCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReviewScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReviewScheduleConfig {
        &self.config
    }

    /// Base days for the given review count.
    ///
    /// Past the end of the list the last entry doubles per extra review.
    pub fn base_factor(&self, review_count: u32) -> f64 {
        let list = self.config.base_intervals_days();
        let Some(&last) = list.last() else {
            return f64::from(DEFAULT_BASE_INTERVALS_DAYS[0]);
        };
        match list.get(review_count as usize) {
            Some(&days) => f64::from(days),
            None => {
                let extra = (review_count as usize - list.len()).min(64) as i32;
                f64::from(last) * 2f64.powi(extra)
            }
        }
    }

    pub fn emotional_boost(emotional_weight: f64) -> f64 {
        1.0 + emotional_weight.clamp(0.0, 1.0) * EMOTIONAL_STRETCH
    }

    pub fn priority_boost(priority_score: f64) -> f64 {
        if priority_score > 0.0 {
            1.0 + priority_score
        } else {
            1.0
        }
    }

    /// Interval in days from a memory's review anchor to its next review
    pub fn interval_days(&self, memory: &Memory, now: DateTime<Utc>) -> f64 {
        let days = self.base_factor(memory.review_count)
            * Self::emotional_boost(memory.emotional_weight)
            * Self::priority_boost(memory.effective_priority(now));
        days.min(MAX_INTERVAL_DAYS)
    }

    pub fn next_interval(&self, memory: &Memory, now: DateTime<Utc>) -> Duration {
        let seconds = (self.interval_days(memory, now) * 24.0 * 3600.0).round() as i64;
        Duration::seconds(seconds)
    }

    pub fn next_review_at(&self, memory: &Memory, now: DateTime<Utc>) -> DateTime<Utc> {
        memory
            .review_anchor()
            .checked_add_signed(self.next_interval(memory, now))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Strictly past the next review time
    pub fn is_due(&self, memory: &Memory, now: DateTime<Utc>) -> bool {
        now > self.next_review_at(memory, now)
    }

    /// Forgetting curve `exp(-days / ((reviews + 1) * (1 + weight)))`
    pub fn forgetting_curve_retention(
        review_count: u32,
        emotional_weight: f64,
        days_since_review: f64,
    ) -> f64 {
        let strength = (f64::from(review_count) + 1.0) * (1.0 + emotional_weight.clamp(0.0, 1.0));
        (-days_since_review.max(0.0) / strength).exp()
    }

    /// Estimated retention of a memory right now
    pub fn retention(&self, memory: &Memory, now: DateTime<Utc>) -> f64 {
        Self::forgetting_curve_retention(
            memory.review_count,
            memory.emotional_weight,
            memory.days_since_review(now),
        )
    }

    /// Due and already more likely forgotten than not
    pub fn needs_urgent_review(&self, memory: &Memory, now: DateTime<Utc>) -> bool {
        self.is_due(memory, now) && self.retention(memory, now) < URGENT_RETENTION_THRESHOLD
    }

    /// Apply one review: `last_reviewed_at = now`, `review_count + 1`.
    ///
    /// Returns the updated copy; persisting it is the caller's job. Each
    /// call counts as a separate review.
    pub fn mark_reviewed(&self, memory: &Memory, now: DateTime<Utc>) -> Memory {
        memory.reviewed(now)
    }

    /// "tomorrow", "in 3 days", "in 2 week(s)", "in 1 month(s)"
    pub fn describe_next_review(&self, memory: &Memory, now: DateTime<Utc>) -> String {
        let days = self.next_interval(memory, now).num_days();
        if days <= 1 {
            "tomorrow".to_string()
        } else if days < 7 {
            format!("in {days} days")
        } else if days < 30 {
            format!("in {} week(s)", days / 7)
        } else {
            format!("in {} month(s)", days / 30)
        }
    }
}
