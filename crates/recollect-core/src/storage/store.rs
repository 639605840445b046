//! Storage collaborator seam
//!
//! Everything the schedulers need from persistence. Implementations own the
//! memories; callers get copies and send back explicit updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::Memory;
use crate::review::ReviewCalculator;

use super::sqlite::Result;

/// One completed consolidation sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationHistoryRecord {
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub memories_examined: i64,
    pub memories_boosted: i64,
    pub boosts_expired: i64,
    pub failures: i64,
}

/// Memory persistence used by search, review and consolidation
pub trait MemoryStore: Send + Sync {
    /// Persist a fully built memory
    fn insert(&self, memory: &Memory) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<Memory>>;

    /// Delete a memory owned by `owner_id`.
    ///
    /// Fails with `Unauthorized` when the memory is missing or belongs to
    /// someone else.
    fn delete(&self, id: &str, owner_id: i64) -> Result<()>;

    /// Newest first
    fn recent(&self, owner_id: i64, limit: usize) -> Result<Vec<Memory>>;

    fn count(&self, owner_id: i64) -> Result<i64>;

    /// Memories across all owners that `calculator` says are due at `now`,
    /// longest-waiting first
    fn due_for_review(
        &self,
        calculator: &ReviewCalculator,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Memory>>;

    /// Memories eligible for a consolidation boost at `now`
    fn fragile(&self, now: DateTime<Utc>) -> Result<Vec<Memory>>;

    /// Memories past the consolidation window that still carry a boost
    fn expired_boosts(&self, now: DateTime<Utc>) -> Result<Vec<Memory>>;

    fn update_consolidation(
        &self,
        id: &str,
        priority_score: f64,
        consolidated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Persist review bookkeeping produced by
    /// [`ReviewCalculator::mark_reviewed`].
    ///
    /// Only applies when the stored count is exactly one less than the new
    /// count, so a review is never counted twice.
    fn record_review(&self, reviewed: &Memory) -> Result<()>;

    fn record_consolidation(&self, record: &ConsolidationHistoryRecord) -> Result<()>;
}

impl<T: MemoryStore + ?Sized> MemoryStore for std::sync::Arc<T> {
    fn insert(&self, memory: &Memory) -> Result<()> {
        (**self).insert(memory)
    }

    fn get(&self, id: &str) -> Result<Option<Memory>> {
        (**self).get(id)
    }

    fn delete(&self, id: &str, owner_id: i64) -> Result<()> {
        (**self).delete(id, owner_id)
    }

    fn recent(&self, owner_id: i64, limit: usize) -> Result<Vec<Memory>> {
        (**self).recent(owner_id, limit)
    }

    fn count(&self, owner_id: i64) -> Result<i64> {
        (**self).count(owner_id)
    }

    fn due_for_review(
        &self,
        calculator: &ReviewCalculator,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Memory>> {
        (**self).due_for_review(calculator, now, limit)
    }

    fn fragile(&self, now: DateTime<Utc>) -> Result<Vec<Memory>> {
        (**self).fragile(now)
    }

    fn expired_boosts(&self, now: DateTime<Utc>) -> Result<Vec<Memory>> {
        (**self).expired_boosts(now)
    }

    fn update_consolidation(
        &self,
        id: &str,
        priority_score: f64,
        consolidated_at: DateTime<Utc>,
    ) -> Result<()> {
        (**self).update_consolidation(id, priority_score, consolidated_at)
    }

    fn record_review(&self, reviewed: &Memory) -> Result<()> {
        (**self).record_review(reviewed)
    }

    fn record_consolidation(&self, record: &ConsolidationHistoryRecord) -> Result<()> {
        (**self).record_consolidation(record)
    }
}
