//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const CREATE_JOURNAL_ENTRIES: &str = "
CREATE TABLE IF NOT EXISTS journal_entries (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL DEFAULT '',
    entry_type TEXT NOT NULL DEFAULT 'text',
    audio_url TEXT,
    is_draft INTEGER NOT NULL DEFAULT 0,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_journal_entries_published
    ON journal_entries (is_deleted, is_draft);
";

const CREATE_ANALYSIS_RESULTS: &str = "
CREATE TABLE IF NOT EXISTS analysis_results (
    id TEXT PRIMARY KEY,
    journal_entry_id TEXT NOT NULL,
    analysis_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    result TEXT,
    error_message TEXT,
    retry_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_analysis_results_entry_type
    ON analysis_results (journal_entry_id, analysis_type);
CREATE INDEX IF NOT EXISTS idx_analysis_results_type_status
    ON analysis_results (analysis_type, status);
";

const CREATE_QUEUE_JOBS: &str = "
CREATE TABLE IF NOT EXISTS queue_jobs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    data TEXT NOT NULL,
    priority INTEGER NOT NULL,
    state TEXT NOT NULL,
    attempts_made INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL,
    backoff_ms INTEGER NOT NULL,
    ready_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    processed_at INTEGER,
    finished_at INTEGER,
    failed_reason TEXT
);
CREATE INDEX IF NOT EXISTS idx_queue_jobs_dispatch
    ON queue_jobs (state, priority DESC, seq);
CREATE INDEX IF NOT EXISTS idx_queue_jobs_finished
    ON queue_jobs (state, finished_at);
";

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_journal_entries_table",
        sql: CREATE_JOURNAL_ENTRIES,
    },
    Migration {
        version: 2,
        description: "create_analysis_results_table",
        sql: CREATE_ANALYSIS_RESULTS,
    },
    Migration {
        version: 3,
        description: "create_queue_jobs_table",
        sql: CREATE_QUEUE_JOBS,
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            params![migration.version, migration.description],
        )?;
    }

    Ok(())
}
