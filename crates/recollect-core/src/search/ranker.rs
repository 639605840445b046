//! Relevance ranking
//!
//! Text relevance alone favours long, old, keyword-dense notes. The ranker
//! adds emotional weight, consolidation priority and a recency bonus so
//! that salient and fresh memories surface first.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::Memory;

use super::index::IndexHit;

/// Weights applied on top of the index score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingWeights {
    pub emotional: f64,
    pub priority: f64,
    /// Bonus for memories younger than `fresh_days`
    pub fresh_bonus: f64,
    pub fresh_days: i64,
    /// Bonus for memories younger than `recent_days`
    pub recent_bonus: f64,
    pub recent_days: i64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            emotional: 2.0,
            priority: 1.5,
            fresh_bonus: 1.0,
            fresh_days: 7,
            recent_bonus: 0.5,
            recent_days: 30,
        }
    }
}

/// A memory with its combined ordering key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMemory {
    pub memory: Memory,
    pub score: f64,
}

/// Combines index relevance with memory signals
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceRanker {
    weights: RankingWeights,
}

impl RelevanceRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: RankingWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    pub fn recency_bonus(&self, memory: &Memory, now: DateTime<Utc>) -> f64 {
        let age = memory.age(now);
        if age < Duration::days(self.weights.fresh_days) {
            self.weights.fresh_bonus
        } else if age < Duration::days(self.weights.recent_days) {
            self.weights.recent_bonus
        } else {
            0.0
        }
    }

    /// Combined key, higher is more relevant
    pub fn score(&self, memory: &Memory, native_score: f64, now: DateTime<Utc>) -> f64 {
        native_score
            + memory.emotional_weight * self.weights.emotional
            + memory.effective_priority(now) * self.weights.priority
            + self.recency_bonus(memory, now)
    }

    /// Score every hit and order descending.
    ///
    /// Ties keep the index order, so equal keys still follow text relevance.
    pub fn rank(&self, hits: Vec<IndexHit>, now: DateTime<Utc>) -> Vec<RankedMemory> {
        let mut ranked: Vec<RankedMemory> = hits
            .into_iter()
            .map(|hit| RankedMemory {
                score: self.score(&hit.memory, hit.native_score, now),
                memory: hit.memory,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}
