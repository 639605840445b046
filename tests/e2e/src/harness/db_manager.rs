//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Seeding helpers for owners, channels and emotional content
//! - Backdating relative to a fixed test clock
//! - Reopening the same file to check persistence

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use recollect_core::{Memory, MemoryStore, ReviewCalculator, SaveInput, Storage};
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
///
/// // A note written three days before the test clock
/// let memory = db.save_aged(1, "renew passport", Duration::days(3));
///
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The storage instance
    pub storage: Arc<Storage>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
    /// Fixed clock every helper is relative to
    now: DateTime<Utc>,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_recollect.db");
        let storage = Storage::new(Some(db_path.clone())).expect("Failed to create test storage");

        Self {
            storage: Arc::new(storage),
            _temp_dir: Some(temp_dir),
            db_path,
            now: Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap(),
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// The test clock (a Wednesday, noon UTC)
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Open a second storage on the same file
    pub fn reopen(&self) -> Storage {
        Storage::new(Some(self.db_path.clone())).expect("Failed to reopen test storage")
    }

    /// Number of memories owned by `owner_id`
    pub fn count(&self, owner_id: i64) -> i64 {
        self.storage.count(owner_id).unwrap_or(0)
    }

    /// Fetch a memory that must exist
    pub fn fetch(&self, id: &str) -> Memory {
        self.storage
            .get(id)
            .expect("Failed to read memory")
            .expect("Memory not found")
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Save a note at the test clock, delivered to channel `owner_id * 10`
    pub fn save(&self, owner_id: i64, content: &str) -> Memory {
        self.save_aged(owner_id, content, Duration::zero())
    }

    /// Save a note written `age` before the test clock
    pub fn save_aged(&self, owner_id: i64, content: &str, age: Duration) -> Memory {
        self.save_at(owner_id, content, self.now - age)
    }

    /// Save a note at an exact instant
    pub fn save_at(&self, owner_id: i64, content: &str, at: DateTime<Utc>) -> Memory {
        self.storage
            .save_at(SaveInput::new(owner_id, owner_id * 10, content), &at)
            .expect("Failed to save test memory")
    }

    /// Seed `count` plain notes, one hour apart, ending at the test clock
    pub fn seed_notes(&self, owner_id: i64, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let age = Duration::hours((count - i) as i64);
                self.save_aged(owner_id, &format!("Test note {i} about the budget"), age)
                    .id
            })
            .collect()
    }

    /// Seed notes spanning the emotional range
    pub fn seed_emotional(&self, owner_id: i64, age: Duration) -> Vec<Memory> {
        [
            "Groceries list",
            "Good meeting with the team",
            "Amazing concert tonight",
            "Devastating news from home",
        ]
        .iter()
        .map(|content| self.save_aged(owner_id, content, age))
        .collect()
    }

    /// Apply and persist one review at `at`
    pub fn review(&self, memory: &Memory, at: DateTime<Utc>) -> Memory {
        let reviewed = ReviewCalculator::new().mark_reviewed(memory, at);
        self.storage
            .record_review(&reviewed)
            .expect("Failed to record review");
        reviewed
    }
}
