//! Memory - The fundamental unit of recall
//!
//! Each memory carries:
//! - Immutable content, owner and delivery channel
//! - Hashtags derived from the content
//! - Review bookkeeping (count and last review)
//! - Emotional weight and a transient consolidation priority
//! - The encoding context captured when it was saved

use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::neuroscience::{EncodingContext, TimeOfDay};

/// Age after which a consolidation boost no longer applies
pub const CONSOLIDATION_WINDOW_DAYS: i64 = 7;

// ============================================================================
// MEMORY
// ============================================================================

/// A stored note with its scheduling and weighting state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Creator of the memory
    pub owner_id: i64,
    /// Where reviews of this memory are delivered
    pub channel_id: i64,
    /// Trimmed note text
    pub content: String,
    /// Hashtags found in the content, without the leading `#`
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Absent until the first review
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub review_count: u32,
    /// Sentiment intensity in [0, 1], fixed at creation
    pub emotional_weight: f64,
    /// Consolidation boost, zero once the memory is older than a week
    pub priority_score: f64,
    pub last_consolidated_at: DateTime<Utc>,
    pub time_of_day: TimeOfDay,
    pub day_of_week: Weekday,
    /// Free-form origin label ("cli", "chat", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Memory {
    /// Build a new memory from validated input.
    ///
    /// Content is trimmed, tags are extracted, and the encoding context is
    /// read from `at` in its own time zone. Timestamps keep millisecond
    /// precision so the value round-trips through storage unchanged.
    pub fn create<Tz: TimeZone>(
        input: SaveInput,
        emotional_weight: f64,
        at: &DateTime<Tz>,
    ) -> Result<Self, ValidationError> {
        input.validate()?;

        let content = input.content.trim().to_string();
        let context = EncodingContext::capture(at);
        let created_at = at.with_timezone(&Utc).trunc_subsecs(3);

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            owner_id: input.owner_id,
            channel_id: input.channel_id,
            tags: extract_tags(&content),
            content,
            created_at,
            last_reviewed_at: None,
            review_count: 0,
            emotional_weight: emotional_weight.clamp(0.0, 1.0),
            priority_score: 0.0,
            last_consolidated_at: created_at,
            time_of_day: context.time_of_day,
            day_of_week: context.day_of_week,
            source: input.source,
        })
    }

    pub fn encoding_context(&self) -> EncodingContext {
        EncodingContext {
            time_of_day: self.time_of_day,
            day_of_week: self.day_of_week,
        }
    }

    /// Timestamp reviews are scheduled from
    pub fn review_anchor(&self) -> DateTime<Utc> {
        self.last_reviewed_at.unwrap_or(self.created_at)
    }

    /// Time elapsed since creation
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Whole days elapsed since creation
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        self.age(now).num_days()
    }

    /// Fractional days since the last review (or creation)
    pub fn days_since_review(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now - self.review_anchor();
        (elapsed.num_seconds() as f64 / 86_400.0).max(0.0)
    }

    /// Priority score as seen by ranking and scheduling.
    ///
    /// A stored boost on a memory older than the consolidation window is
    /// stale until the next sweep clears it, so it reads as zero here.
    pub fn effective_priority(&self, now: DateTime<Utc>) -> f64 {
        if self.age(now) > Duration::days(CONSOLIDATION_WINDOW_DAYS) {
            0.0
        } else {
            self.priority_score.max(0.0)
        }
    }

    /// Young and reviewed fewer than twice
    pub fn is_fragile(&self, now: DateTime<Utc>) -> bool {
        self.age(now) <= Duration::days(CONSOLIDATION_WINDOW_DAYS) && self.review_count < 2
    }

    /// Copy with review bookkeeping applied
    pub(crate) fn reviewed(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.last_reviewed_at = Some(now.max(self.created_at));
        next.review_count = self.review_count.saturating_add(1);
        next
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for saving a new memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveInput {
    pub owner_id: i64,
    pub channel_id: i64,
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl SaveInput {
    pub fn new(owner_id: i64, channel_id: i64, content: impl Into<String>) -> Self {
        Self {
            owner_id,
            channel_id,
            content: content.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Reject input that cannot become a memory
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.owner_id == 0 {
            return Err(ValidationError::MissingOwner);
        }
        if self.channel_id == 0 {
            return Err(ValidationError::MissingChannel);
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(())
    }
}

/// Save-time rejection
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("owner id is required")]
    MissingOwner,
    #[error("channel id is required")]
    MissingChannel,
    #[error("memory content cannot be empty")]
    EmptyContent,
}

/// Extract `#tag` tokens in order, without the leading `#`.
///
/// Duplicates are dropped; a bare `#` is not a tag.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for word in content.split_whitespace() {
        let Some(tag) = word.strip_prefix('#') else {
            continue;
        };
        let tag = tag.trim_end_matches(|c: char| ".,!?;:".contains(c));
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn memory_at(created_at: DateTime<Utc>) -> Memory {
        Memory {
            id: "m1".to_string(),
            owner_id: 1,
            channel_id: 1,
            content: "test".to_string(),
            tags: vec![],
            created_at,
            last_reviewed_at: None,
            review_count: 0,
            emotional_weight: 0.0,
            priority_score: 0.4,
            last_consolidated_at: created_at,
            time_of_day: TimeOfDay::Morning,
            day_of_week: Weekday::Mon,
            source: None,
        }
    }

    #[test]
    fn test_extract_tags() {
        assert_eq!(extract_tags("Amazing day at work! #win"), vec!["win"]);
        assert_eq!(
            extract_tags("#health call doctor #health #todo, now"),
            vec!["health", "todo"]
        );
        assert!(extract_tags("no tags # here").is_empty());
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            SaveInput::new(0, 1, "x").validate(),
            Err(ValidationError::MissingOwner)
        );
        assert_eq!(
            SaveInput::new(1, 0, "x").validate(),
            Err(ValidationError::MissingChannel)
        );
        assert_eq!(
            SaveInput::new(1, 1, "   \n").validate(),
            Err(ValidationError::EmptyContent)
        );
        assert!(SaveInput::new(1, 1, "fine").validate().is_ok());
    }

    #[test]
    fn test_create_from_input() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap();
        let input = SaveInput::new(42, 7, "  Amazing day at work! #win  ").with_source("cli");
        let memory = Memory::create(input, 0.9, &at).unwrap();

        assert_eq!(memory.content, "Amazing day at work! #win");
        assert_eq!(memory.tags, vec!["win"]);
        assert_eq!(memory.review_count, 0);
        assert_eq!(memory.time_of_day, TimeOfDay::Morning);
        assert_eq!(memory.day_of_week, Weekday::Mon);
        assert_eq!(memory.source.as_deref(), Some("cli"));
        assert_eq!(memory.last_consolidated_at, at);
        assert!(Uuid::parse_str(&memory.id).is_ok());
    }

    #[test]
    fn test_create_rejects_invalid() {
        let at = Utc::now();
        assert_eq!(
            Memory::create(SaveInput::new(1, 1, ""), 0.0, &at),
            Err(ValidationError::EmptyContent)
        );
    }

    #[test]
    fn test_effective_priority_expires() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let memory = memory_at(created);

        assert_eq!(memory.effective_priority(created + Duration::days(3)), 0.4);
        assert_eq!(memory.effective_priority(created + Duration::days(8)), 0.0);
    }

    #[test]
    fn test_reviewed_increments_once() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let now = created + Duration::days(2);
        let reviewed = memory_at(created).reviewed(now);

        assert_eq!(reviewed.review_count, 1);
        assert_eq!(reviewed.last_reviewed_at, Some(now));
        assert_eq!(reviewed.reviewed(now).review_count, 2);
    }

    #[test]
    fn test_fragile_window() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut memory = memory_at(created);

        assert!(memory.is_fragile(created + Duration::days(7)));
        assert!(!memory.is_fragile(created + Duration::days(8)));

        memory.review_count = 2;
        assert!(!memory.is_fragile(created + Duration::days(1)));
    }
}
