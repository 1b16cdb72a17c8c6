//! SQLite schema definitions.

use rusqlite::Connection;

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the AIKnowSys database.
///
/// Timestamps are stored as RFC 3339 TEXT so rows stay greppable and
/// sort lexicographically in timestamp order. Topic and keyword lists
/// are stored as JSON arrays. `search_text` is a denormalized
/// lowercase concatenation used by the LIKE-based search path; it is
/// recomputed on every write and by `rebuild_index`.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

-- Sessions: one row per calendar date
CREATE TABLE IF NOT EXISTS sessions (
    date TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    topics TEXT NOT NULL DEFAULT '[]',
    author TEXT NOT NULL,
    plan TEXT,
    status TEXT NOT NULL DEFAULT 'in-progress',
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    search_text TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_sessions_author ON sessions(author);
CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);
CREATE INDEX IF NOT EXISTS idx_sessions_plan ON sessions(plan);
CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated DESC);

-- Plans: lifecycle-tracked units of work
CREATE TABLE IF NOT EXISTS plans (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PLANNED',
    topics TEXT NOT NULL DEFAULT '[]',
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    started TEXT,
    completed TEXT,
    content TEXT NOT NULL DEFAULT '',
    search_text TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_plans_author ON plans(author);
CREATE INDEX IF NOT EXISTS idx_plans_status ON plans(status);
CREATE INDEX IF NOT EXISTS idx_plans_updated ON plans(updated DESC);

-- Learned patterns: keyword-indexed knowledge snippets
CREATE TABLE IF NOT EXISTS patterns (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'draft',
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    search_text TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_patterns_category ON patterns(category);
CREATE INDEX IF NOT EXISTS idx_patterns_updated ON patterns(updated DESC);

-- Active plan pointers: one row per author
CREATE TABLE IF NOT EXISTS active_pointers (
    author TEXT PRIMARY KEY,
    current_plan_id TEXT,
    status TEXT,
    updated TEXT NOT NULL
);
";

/// Apply the schema to a connection. Idempotent.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            CURRENT_SCHEMA_VERSION,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_twice() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
