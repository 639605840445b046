//! Consolidation sweep
//!
//! Newly saved memories that have barely been reviewed get a temporary
//! priority boost, largest on the first day and shrinking over the first
//! week. Once a memory leaves that window its boost is cleared. The sweep
//! tolerates per-memory failures: each one is logged and skipped.

use std::time::Instant;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::memory::Memory;
use crate::storage::{ConsolidationHistoryRecord, MemoryStore};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Boost per age tier: (max whole days of age, base boost)
const AGE_TIERS: [(i64, f64); 3] = [(1, 0.5), (3, 0.3), (7, 0.15)];

/// Consolidation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationConfig {
    /// Local wall-clock time of the daily sweep
    pub run_at: NaiveTime,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            run_at: NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Boost for a fragile memory of the given age, scaled by emotional weight
pub fn priority_for_age(age_days: i64, emotional_weight: f64) -> f64 {
    AGE_TIERS
        .iter()
        .find(|(max_days, _)| age_days <= *max_days)
        .map(|(_, base)| base * (1.0 + emotional_weight.clamp(0.0, 1.0)))
        .unwrap_or(0.0)
}

// ============================================================================
// RUN TRACKING
// ============================================================================

/// Result of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    pub completed_at: DateTime<Utc>,
    pub memories_examined: i64,
    pub memories_boosted: i64,
    pub boosts_expired: i64,
    pub failures: i64,
    pub duration_ms: i64,
}

impl From<&ConsolidationReport> for ConsolidationHistoryRecord {
    fn from(report: &ConsolidationReport) -> Self {
        Self {
            completed_at: report.completed_at,
            duration_ms: report.duration_ms,
            memories_examined: report.memories_examined,
            memories_boosted: report.memories_boosted,
            boosts_expired: report.boosts_expired,
            failures: report.failures,
        }
    }
}

/// Tracks a sweep in progress
pub struct ConsolidationRun {
    start_time: Instant,
    pub memories_examined: i64,
    pub memories_boosted: i64,
    pub boosts_expired: i64,
    pub failures: i64,
}

impl ConsolidationRun {
    pub fn record_boost(&mut self) {
        self.memories_examined += 1;
        self.memories_boosted += 1;
    }

    pub fn record_unchanged(&mut self) {
        self.memories_examined += 1;
    }

    pub fn record_expiry(&mut self) {
        self.memories_examined += 1;
        self.boosts_expired += 1;
    }

    pub fn record_failure(&mut self) {
        self.memories_examined += 1;
        self.failures += 1;
    }

    /// Finish the run and create a report
    pub fn finish(self, completed_at: DateTime<Utc>) -> ConsolidationReport {
        ConsolidationReport {
            completed_at,
            memories_examined: self.memories_examined,
            memories_boosted: self.memories_boosted,
            boosts_expired: self.boosts_expired,
            failures: self.failures,
            duration_ms: self.start_time.elapsed().as_millis() as i64,
        }
    }
}

// ============================================================================
// SWEEP
// ============================================================================

/// Daily priority boost and expiry pass
pub struct ConsolidationSweep<S> {
    store: S,
    config: ConsolidationConfig,
}

impl<S: MemoryStore> ConsolidationSweep<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: ConsolidationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ConsolidationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    pub fn start_run(&self) -> ConsolidationRun {
        ConsolidationRun {
            start_time: Instant::now(),
            memories_examined: 0,
            memories_boosted: 0,
            boosts_expired: 0,
            failures: 0,
        }
    }

    /// Boost every fragile memory, clear boosts older than the window, and
    /// record the run
    pub fn run(&self, now: DateTime<Utc>) -> ConsolidationReport {
        let mut run = self.start_run();

        match self.store.fragile(now) {
            Ok(fragile) => {
                for memory in &fragile {
                    self.boost(memory, now, &mut run);
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to load fragile memories");
                run.failures += 1;
            }
        }

        match self.store.expired_boosts(now) {
            Ok(expired) => {
                for memory in &expired {
                    match self.store.update_consolidation(&memory.id, 0.0, now) {
                        Ok(()) => run.record_expiry(),
                        Err(e) => {
                            warn!(memory_id = %memory.id, error = %e, "Failed to clear boost");
                            run.record_failure();
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to load expired boosts");
                run.failures += 1;
            }
        }

        let report = run.finish(now);
        if let Err(e) = self.store.record_consolidation(&(&report).into()) {
            warn!(error = %e, "Failed to record consolidation history");
        }

        info!(
            examined = report.memories_examined,
            boosted = report.memories_boosted,
            expired = report.boosts_expired,
            failures = report.failures,
            duration_ms = report.duration_ms,
            "Consolidation sweep complete"
        );
        report
    }

    fn boost(&self, memory: &Memory, now: DateTime<Utc>, run: &mut ConsolidationRun) {
        let priority = priority_for_age(memory.age_days(now), memory.emotional_weight);
        match self.store.update_consolidation(&memory.id, priority, now) {
            Ok(()) if priority > 0.0 => run.record_boost(),
            Ok(()) => run.record_unchanged(),
            Err(e) => {
                warn!(memory_id = %memory.id, error = %e, "Failed to consolidate memory");
                run.record_failure();
            }
        }
    }
}
