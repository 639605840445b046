//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: memories with porter FTS5 index",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Consolidation history and review scheduling indexes",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
///
/// `seq` is the stable rowid the external-content FTS table points at.
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    owner_id INTEGER NOT NULL,
    channel_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,

    -- Review bookkeeping
    last_reviewed_at TEXT,
    review_count INTEGER NOT NULL DEFAULT 0,

    -- Weighting
    emotional_weight REAL NOT NULL DEFAULT 0.0,
    priority_score REAL NOT NULL DEFAULT 0.0,
    last_consolidated_at TEXT NOT NULL,

    -- Encoding context
    time_of_day TEXT NOT NULL,
    day_of_week TEXT NOT NULL,

    -- Provenance
    source TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_owner_created ON memories(owner_id, created_at);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

-- FTS5 virtual table for full-text search
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    content,
    tags,
    content='memories',
    content_rowid='seq',
    tokenize='porter unicode61'
);

-- Triggers to keep FTS in sync. Content and tags never change after
-- insert, so review and consolidation updates skip the index.
CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, content, tags)
    VALUES (NEW.seq, NEW.content, NEW.tags);
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, tags)
    VALUES ('delete', OLD.seq, OLD.content, OLD.tags);
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE OF content, tags ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, tags)
    VALUES ('delete', OLD.seq, OLD.content, OLD.tags);
    INSERT INTO memories_fts(rowid, content, tags)
    VALUES (NEW.seq, NEW.content, NEW.tags);
END;

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Consolidation run history, review anchor index
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS consolidation_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    completed_at TEXT NOT NULL,
    duration_ms INTEGER NOT NULL,
    memories_examined INTEGER NOT NULL DEFAULT 0,
    memories_boosted INTEGER NOT NULL DEFAULT 0,
    boosts_expired INTEGER NOT NULL DEFAULT 0,
    failures INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_consolidation_completed ON consolidation_history(completed_at);

CREATE INDEX IF NOT EXISTS idx_memories_review_anchor
    ON memories(COALESCE(last_reviewed_at, created_at));

INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
