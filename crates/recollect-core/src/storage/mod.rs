//! Storage Module
//!
//! SQLite-based storage layer with:
//! - FTS5 full-text search (porter stemming, tag column lookups)
//! - Review and consolidation bookkeeping
//! - Versioned schema migrations

mod migrations;
mod sqlite;
mod store;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Storage, StorageError};
pub use store::{ConsolidationHistoryRecord, MemoryStore};
