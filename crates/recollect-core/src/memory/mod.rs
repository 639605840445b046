//! Memory module - Core types and data structures
//!
//! - The `Memory` record and its derived timing helpers
//! - Save input and its validation
//! - Per-owner statistics

mod node;

pub use node::{
    CONSOLIDATION_WINDOW_DAYS, Memory, SaveInput, ValidationError, extract_tags,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// STATISTICS
// ============================================================================

/// Per-owner memory statistics
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Total number of memories
    pub total_memories: i64,
    /// Memories currently due for review
    pub due_for_review: i64,
    /// Memories still inside the consolidation window with fewer than 2 reviews
    pub fragile: i64,
    /// Average emotional weight across all memories
    pub average_emotional_weight: f64,
    /// Timestamp of the oldest memory
    pub oldest_memory: Option<DateTime<Utc>>,
    /// Timestamp of the newest memory
    pub newest_memory: Option<DateTime<Utc>>,
}
