//! SQLite Storage Implementation
//!
//! Memories live in one table with an external-content FTS5 index over
//! content and tags. The same `Storage` serves as the memory store and the
//! full-text index.

use chrono::{DateTime, Duration, Local, SecondsFormat, TimeZone, Utc};
use directories::ProjectDirs;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::memory::{
    CONSOLIDATION_WINDOW_DAYS, Memory, MemoryStats, SaveInput, ValidationError,
};
use crate::neuroscience::{SentimentScorer, TimeOfDay, parse_weekday, weekday_name};
use crate::review::ReviewCalculator;
use crate::search::{FullTextIndex, IndexHit, IndexQuery};

use super::store::{ConsolidationHistoryRecord, MemoryStore};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Memory not found
    #[error("Memory not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Rejected save input
    #[error("Invalid memory: {0}")]
    Validation(#[from] ValidationError),
    /// Memory missing or owned by someone else
    #[error("Memory {id} not found for owner {owner_id}")]
    Unauthorized { id: String, owner_id: i64 },
    /// Concurrent update lost the race
    #[error("Conflicting update: {0}")]
    Conflict(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Fixed-width UTC timestamps compare correctly as text
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn invalid_column(field: &str, value: &str, reason: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Invalid {} '{}': {}", field, value, reason),
        )),
    )
}

/// Translate `#tag` words into `tags` column filters. Everything else is
/// passed to FTS5 untouched.
fn to_match_expression(term: &str) -> String {
    term.split_whitespace()
        .map(|word| match word.strip_prefix('#') {
            Some(tag) if !tag.is_empty() => {
                format!("tags : \"{}\"", tag.replace('"', "\"\""))
            }
            _ => word.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite-backed memory store and full-text index
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making Storage `Send + Sync` so the daemon can
/// share one `Arc<Storage>` between search and both background loops.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    scorer: SentimentScorer,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("RECOLLECT_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA journal_size_limit = 67108864;",
        )?;

        Ok(())
    }

    /// Default database location in the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "recollect", "core").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("recollect.db"))
    }

    /// Open (or create) storage, applying pending migrations
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!(applied, path = %path.display(), "Database schema updated");
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            scorer: SentimentScorer::new(),
        })
    }

    fn lock_reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    // ========================================================================
    // SAVE
    // ========================================================================

    /// Save a new memory encoded now, in local time
    pub fn save(&self, input: SaveInput) -> Result<Memory> {
        self.save_at(input, &Local::now())
    }

    /// Save a new memory encoded at `at`.
    ///
    /// Validates the input, scores sentiment on the trimmed content,
    /// captures the encoding context in `at`'s time zone and persists.
    pub fn save_at<Tz: TimeZone>(&self, input: SaveInput, at: &DateTime<Tz>) -> Result<Memory> {
        input.validate()?;
        let weight = self.scorer.score(input.content.trim());
        let memory = Memory::create(input, weight, at)?;
        self.insert(&memory)?;

        tracing::debug!(
            memory_id = %memory.id,
            owner_id = memory.owner_id,
            emotional_weight = memory.emotional_weight,
            tags = memory.tags.len(),
            "Memory saved"
        );
        Ok(memory)
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| invalid_column(field_name, value, e))
    }

    /// Convert a row to Memory
    fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<Memory> {
        let tags_json: String = row.get("tags")?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

        let created_at: String = row.get("created_at")?;
        let last_consolidated_at: String = row.get("last_consolidated_at")?;
        let last_reviewed_at: Option<String> = row.get("last_reviewed_at")?;

        let time_of_day: String = row.get("time_of_day")?;
        let day_of_week: String = row.get("day_of_week")?;
        let review_count: i64 = row.get("review_count")?;

        Ok(Memory {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            channel_id: row.get("channel_id")?,
            content: row.get("content")?,
            tags,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
            last_reviewed_at: last_reviewed_at
                .map(|s| Self::parse_timestamp(&s, "last_reviewed_at"))
                .transpose()?,
            review_count: u32::try_from(review_count.max(0)).unwrap_or(u32::MAX),
            emotional_weight: row.get("emotional_weight")?,
            priority_score: row.get("priority_score")?,
            last_consolidated_at: Self::parse_timestamp(
                &last_consolidated_at,
                "last_consolidated_at",
            )?,
            time_of_day: TimeOfDay::parse_name(&time_of_day)
                .ok_or_else(|| invalid_column("time_of_day", &time_of_day, "unknown part of day"))?,
            day_of_week: parse_weekday(&day_of_week)
                .ok_or_else(|| invalid_column("day_of_week", &day_of_week, "unknown weekday"))?,
            source: row.get("source")?,
        })
    }

    fn query_memories(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Memory>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values), Self::row_to_memory)?;

        let mut result = Vec::new();
        for memory in rows {
            result.push(memory?);
        }
        Ok(result)
    }

    // ========================================================================
    // STATS AND HISTORY
    // ========================================================================

    /// Per-owner statistics at `now`
    pub fn stats(
        &self,
        owner_id: i64,
        calculator: &ReviewCalculator,
        now: DateTime<Utc>,
    ) -> Result<MemoryStats> {
        let fragile_cutoff = format_timestamp(&(now - Duration::days(CONSOLIDATION_WINDOW_DAYS)));

        let (total, average, oldest, newest, fragile) = {
            let reader = self.lock_reader()?;
            let (total, average, oldest, newest): (i64, f64, Option<String>, Option<String>) =
                reader.query_row(
                    "SELECT COUNT(*), COALESCE(AVG(emotional_weight), 0.0),
                            MIN(created_at), MAX(created_at)
                     FROM memories WHERE owner_id = ?1",
                    params![owner_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?;
            let fragile: i64 = reader.query_row(
                "SELECT COUNT(*) FROM memories
                 WHERE owner_id = ?1 AND created_at >= ?2 AND review_count < 2",
                params![owner_id, fragile_cutoff],
                |row| row.get(0),
            )?;
            (total, average, oldest, newest, fragile)
        };

        let due = self
            .review_candidates(Some(owner_id), calculator, now)?
            .iter()
            .filter(|m| calculator.is_due(m, now))
            .count() as i64;

        let parse = |s: Option<String>| -> Result<Option<DateTime<Utc>>> {
            s.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| StorageError::InvalidTimestamp(format!("{s}: {e}")))
            })
            .transpose()
        };

        Ok(MemoryStats {
            total_memories: total,
            due_for_review: due,
            fragile,
            average_emotional_weight: average,
            oldest_memory: parse(oldest)?,
            newest_memory: parse(newest)?,
        })
    }

    /// Most recent consolidation sweep, if any has run
    pub fn last_consolidation(&self) -> Result<Option<ConsolidationHistoryRecord>> {
        let reader = self.lock_reader()?;
        let row = reader
            .query_row(
                "SELECT completed_at, duration_ms, memories_examined, memories_boosted,
                        boosts_expired, failures
                 FROM consolidation_history
                 ORDER BY completed_at DESC LIMIT 1",
                [],
                |row| {
                    let completed_at: String = row.get(0)?;
                    Ok(ConsolidationHistoryRecord {
                        completed_at: Self::parse_timestamp(&completed_at, "completed_at")?,
                        duration_ms: row.get(1)?,
                        memories_examined: row.get(2)?,
                        memories_boosted: row.get(3)?,
                        boosts_expired: row.get(4)?,
                        failures: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Memories whose review anchor is old enough that they could be due.
    ///
    /// No memory can come due sooner than the first base interval, so that
    /// bound is applied in SQL and the calculator decides the rest.
    fn review_candidates(
        &self,
        owner_id: Option<i64>,
        calculator: &ReviewCalculator,
        now: DateTime<Utc>,
    ) -> Result<Vec<Memory>> {
        let min_days = i64::from(calculator.config().min_interval_days());
        let cutoff = format_timestamp(&(now - Duration::days(min_days)));

        let mut sql = String::from(
            "SELECT * FROM memories WHERE COALESCE(last_reviewed_at, created_at) < ?",
        );
        let mut values = vec![Value::Text(cutoff)];
        if let Some(owner_id) = owner_id {
            sql.push_str(" AND owner_id = ?");
            values.push(Value::Integer(owner_id));
        }
        sql.push_str(" ORDER BY COALESCE(last_reviewed_at, created_at) ASC");

        self.query_memories(&sql, values)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

impl MemoryStore for Storage {
    fn insert(&self, memory: &Memory) -> Result<()> {
        let tags_json = serde_json::to_string(&memory.tags)
            .map_err(|e| StorageError::Init(format!("Failed to encode tags: {e}")))?;

        let writer = self.lock_writer()?;
        writer.execute(
            "INSERT INTO memories (
                id, owner_id, channel_id, content, tags, created_at,
                last_reviewed_at, review_count, emotional_weight, priority_score,
                last_consolidated_at, time_of_day, day_of_week, source
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                memory.id,
                memory.owner_id,
                memory.channel_id,
                memory.content,
                tags_json,
                format_timestamp(&memory.created_at),
                memory.last_reviewed_at.as_ref().map(format_timestamp),
                memory.review_count,
                memory.emotional_weight,
                memory.priority_score,
                format_timestamp(&memory.last_consolidated_at),
                memory.time_of_day.as_str(),
                weekday_name(memory.day_of_week),
                memory.source,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Memory>> {
        let reader = self.lock_reader()?;
        let memory = reader
            .query_row(
                "SELECT * FROM memories WHERE id = ?1",
                params![id],
                Self::row_to_memory,
            )
            .optional()?;
        Ok(memory)
    }

    fn delete(&self, id: &str, owner_id: i64) -> Result<()> {
        let writer = self.lock_writer()?;
        let rows = writer.execute(
            "DELETE FROM memories WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(StorageError::Unauthorized {
                id: id.to_string(),
                owner_id,
            });
        }
        Ok(())
    }

    fn recent(&self, owner_id: i64, limit: usize) -> Result<Vec<Memory>> {
        self.query_memories(
            "SELECT * FROM memories WHERE owner_id = ? ORDER BY created_at DESC, seq DESC LIMIT ?",
            vec![Value::Integer(owner_id), Value::Integer(limit as i64)],
        )
    }

    fn count(&self, owner_id: i64) -> Result<i64> {
        let reader = self.lock_reader()?;
        let count = reader.query_row(
            "SELECT COUNT(*) FROM memories WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn due_for_review(
        &self,
        calculator: &ReviewCalculator,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Memory>> {
        Ok(self
            .review_candidates(None, calculator, now)?
            .into_iter()
            .filter(|m| calculator.is_due(m, now))
            .take(limit)
            .collect())
    }

    fn fragile(&self, now: DateTime<Utc>) -> Result<Vec<Memory>> {
        let cutoff = format_timestamp(&(now - Duration::days(CONSOLIDATION_WINDOW_DAYS)));
        self.query_memories(
            "SELECT * FROM memories
             WHERE created_at >= ? AND created_at <= ? AND review_count < 2
             ORDER BY created_at ASC",
            vec![Value::Text(cutoff), Value::Text(format_timestamp(&now))],
        )
    }

    fn expired_boosts(&self, now: DateTime<Utc>) -> Result<Vec<Memory>> {
        let cutoff = format_timestamp(&(now - Duration::days(CONSOLIDATION_WINDOW_DAYS)));
        self.query_memories(
            "SELECT * FROM memories
             WHERE created_at < ? AND priority_score > 0
             ORDER BY created_at ASC",
            vec![Value::Text(cutoff)],
        )
    }

    fn update_consolidation(
        &self,
        id: &str,
        priority_score: f64,
        consolidated_at: DateTime<Utc>,
    ) -> Result<()> {
        let writer = self.lock_writer()?;
        let rows = writer.execute(
            "UPDATE memories SET priority_score = ?2, last_consolidated_at = ?3 WHERE id = ?1",
            params![id, priority_score.max(0.0), format_timestamp(&consolidated_at)],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn record_review(&self, reviewed: &Memory) -> Result<()> {
        let Some(reviewed_at) = reviewed.last_reviewed_at else {
            return Err(StorageError::Conflict(format!(
                "memory {} has no review timestamp",
                reviewed.id
            )));
        };
        let previous_count = reviewed.review_count.saturating_sub(1);

        let writer = self.lock_writer()?;
        let rows = writer.execute(
            "UPDATE memories SET last_reviewed_at = ?2, review_count = ?3
             WHERE id = ?1 AND review_count = ?4",
            params![
                reviewed.id,
                format_timestamp(&reviewed_at),
                reviewed.review_count,
                previous_count
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::Conflict(format!(
                "memory {} is not at review {}",
                reviewed.id, previous_count
            )));
        }
        Ok(())
    }

    fn record_consolidation(&self, record: &ConsolidationHistoryRecord) -> Result<()> {
        let writer = self.lock_writer()?;
        writer.execute(
            "INSERT INTO consolidation_history (
                completed_at, duration_ms, memories_examined, memories_boosted,
                boosts_expired, failures
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_timestamp(&record.completed_at),
                record.duration_ms,
                record.memories_examined,
                record.memories_boosted,
                record.boosts_expired,
                record.failures,
            ],
        )?;
        Ok(())
    }
}

// ============================================================================
// FULL-TEXT INDEX
// ============================================================================

impl FullTextIndex for Storage {
    /// FTS5 match with bm25 relevance, negated so higher is better.
    ///
    /// A context filter narrows a match and never stands in for one, so an
    /// empty term matches nothing.
    fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>> {
        let term = query.term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let mut values = vec![Value::Text(to_match_expression(term))];
        let mut sql = String::from(
            "SELECT m.*, -bm25(memories_fts) AS relevance
             FROM memories_fts JOIN memories m ON m.seq = memories_fts.rowid
             WHERE memories_fts MATCH ?",
        );

        sql.push_str(" AND m.owner_id = ?");
        values.push(Value::Integer(query.owner_id));

        if let Some(cue) = &query.context {
            if let Some(time_of_day) = cue.time_of_day {
                sql.push_str(" AND m.time_of_day = ?");
                values.push(Value::Text(time_of_day.as_str().to_string()));
            }
            if let Some(day) = cue.day_of_week {
                sql.push_str(" AND m.day_of_week = ?");
                values.push(Value::Text(weekday_name(day).to_string()));
            }
        }

        sql.push_str(" ORDER BY relevance DESC, m.created_at DESC, m.seq DESC");
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::Integer(query.limit as i64));
        values.push(Value::Integer(query.offset as i64));

        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(IndexHit {
                memory: Self::row_to_memory(row)?,
                native_score: row.get("relevance")?,
            })
        })?;

        let mut hits = Vec::new();
        for hit in rows {
            hits.push(hit?);
        }
        Ok(hits)
    }
}

// ============================================================================
// TESTS
// ============================================================================
