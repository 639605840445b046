//! # Recollect Core
//!
//! Personal memory engine with spaced review:
//!
//! - **Capture**: notes are saved with their emotional weight, hashtags, and
//!   the part of day and weekday they were written in
//! - **Cascade Search**: FTS5 keyword search that falls back through
//!   progressively looser query shapes until something matches
//! - **Spaced Review**: intervals of 1, 3, 7, 14, 30 days that then double,
//!   stretched for emotional and freshly consolidated memories
//! - **Consolidation**: a daily sweep that boosts fragile young memories
//!
//! ## Context-Dependent Recall
//!
//! Encoding specificity (Tulving & Thomson, 1973): retrieval works best when
//! the retrieval context matches the encoding context. Queries such as
//! "coffee yesterday morning" are matched against the stored context.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recollect_core::{CascadeSearch, SaveInput, SearchQuery, Storage};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(Storage::new(None)?);
//! storage.save(SaveInput::new(42, 7, "Amazing day at work! #win"))?;
//!
//! let search = CascadeSearch::new(storage.clone());
//! let outcome = search.search(&SearchQuery::new(42, "amaz"));
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the binary
//! - `encryption`: SQLCipher database encryption via `RECOLLECT_ENCRYPTION_KEY`

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod consolidation;
pub mod memory;
pub mod review;
pub mod search;
pub mod storage;

/// Encoding-time signals: emotional weight and encoding context
pub mod neuroscience;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Memory types
pub use memory::{
    CONSOLIDATION_WINDOW_DAYS, Memory, MemoryStats, SaveInput, ValidationError, extract_tags,
};

// Storage layer
pub use storage::{ConsolidationHistoryRecord, MemoryStore, Result, Storage, StorageError};

// Search
pub use search::{
    CascadeOutcome, CascadeSearch, FullTextIndex, IndexHit, IndexQuery, RankedMemory,
    RankingWeights, RelevanceRanker, SearchPage, SearchQuery, Strategy,
};

// Review scheduling and delivery
pub use review::{
    Delivery, DeliveryError, DispatchConfig, DispatchReport, Messenger, ReviewCalculator,
    ReviewCard, ReviewDispatcher, ReviewScheduleConfig, ScheduleConfigError,
};

// Consolidation
pub use consolidation::{
    ConsolidationConfig, ConsolidationReport, ConsolidationScheduler, ConsolidationSweep,
};

// Neuroscience-inspired mechanisms
pub use neuroscience::{
    ContextCue, EmotionCategory, EncodingContext, SentimentScorer, TimeOfDay, extract_context,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current schema version
pub const SCHEMA_VERSION: u32 = 2;

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        CascadeSearch, ConsolidationSweep, Memory, MemoryStats, MemoryStore, Result,
        ReviewCalculator, ReviewDispatcher, SaveInput, SearchQuery, Storage, StorageError,
        Strategy,
    };

    // Neuroscience-inspired mechanisms
    pub use crate::{ContextCue, EmotionCategory, EncodingContext, SentimentScorer, TimeOfDay};
}
