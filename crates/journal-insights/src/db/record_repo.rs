//! Analysis record repository: CRUD operations for the `analysis_results` table.
//!
//! One row per (journal entry, analysis kind). Re-analysis goes through
//! [`begin_processing`], a single upsert, so concurrent jobs for the same pair
//! never produce a second row.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::analysis::kind::AnalysisKind;
use crate::analysis::record::{AnalysisRecord, AnalysisStatus};

fn record_from_row(row: &Row<'_>) -> Result<AnalysisRecord, DatabaseError> {
    let analysis_type: String = row.get("analysis_type")?;
    let status: String = row.get("status")?;
    let result: Option<String> = row.get("result")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let analysis_type =
        analysis_type
            .parse::<AnalysisKind>()
            .map_err(|e| DatabaseError::InvalidValue {
                column: "analysis_type",
                value: e.0,
            })?;
    let status = status
        .parse::<AnalysisStatus>()
        .map_err(|value| DatabaseError::InvalidValue {
            column: "status",
            value,
        })?;
    let result = result
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|source| DatabaseError::Json {
            column: "result",
            source,
        })?;

    Ok(AnalysisRecord {
        id: row.get("id")?,
        journal_entry_id: row.get("journal_entry_id")?,
        analysis_type,
        status,
        result,
        error_message: row.get("error_message")?,
        retry_count: row.get("retry_count")?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn collect_records(
    conn: &rusqlite::Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<AnalysisRecord>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(record_from_row(row)?);
    }
    Ok(records)
}

/// Moves the record for `(entry_id, kind)` into `processing`, creating it when
/// absent. An existing record has its error cleared and, when `count_retry`
/// is set, its `retry_count` incremented.
pub fn begin_processing(
    db: &Database,
    entry_id: &str,
    kind: AnalysisKind,
    count_retry: bool,
) -> Result<AnalysisRecord, DatabaseError> {
    let now = format_timestamp(Utc::now());
    let new_id = uuid::Uuid::new_v4().to_string();
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "INSERT INTO analysis_results (id, journal_entry_id, analysis_type, status,
             result, error_message, retry_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'processing', NULL, NULL, 0, ?4, ?4)
             ON CONFLICT (journal_entry_id, analysis_type) DO UPDATE SET
                status = 'processing',
                error_message = NULL,
                retry_count = retry_count + ?5,
                updated_at = ?4
             RETURNING *",
        )?;
        let mut rows = stmt.query(params![new_id, entry_id, kind.as_str(), now, count_retry as i64])?;
        match rows.next()? {
            Some(row) => record_from_row(row),
            None => Err(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows)),
        }
    })
}

/// Stores a successful result and clears any previous error.
pub fn mark_completed(
    db: &Database,
    id: &str,
    result: &serde_json::Value,
) -> Result<(), DatabaseError> {
    let payload = serde_json::to_string(result).map_err(|source| DatabaseError::Json {
        column: "result",
        source,
    })?;
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE analysis_results SET status = 'completed', result = ?2,
             error_message = NULL, updated_at = ?3 WHERE id = ?1",
            params![id, payload, format_timestamp(Utc::now())],
        )?;
        Ok(())
    })
}

/// Records a failure. Any previous result is dropped; a failed record carries
/// only its error.
pub fn mark_failed(db: &Database, id: &str, error_message: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE analysis_results SET status = 'failed', result = NULL,
             error_message = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, error_message, format_timestamp(Utc::now())],
        )?;
        Ok(())
    })
}

/// Finds a record by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<AnalysisRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM analysis_results WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        rows.next()?.map(record_from_row).transpose()
    })
}

/// Finds the record for one (entry, kind) pair.
pub fn find_for_pair(
    db: &Database,
    entry_id: &str,
    kind: AnalysisKind,
) -> Result<Option<AnalysisRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let id: Option<String> = conn
            .query_row(
                "SELECT id FROM analysis_results
                 WHERE journal_entry_id = ?1 AND analysis_type = ?2",
                params![entry_id, kind.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    })?
    .map(|id| find_by_id(db, &id))
    .transpose()
    .map(Option::flatten)
}

/// All records of an entry, newest first.
pub fn find_by_entry(db: &Database, entry_id: &str) -> Result<Vec<AnalysisRecord>, DatabaseError> {
    db.with_conn(|conn| {
        collect_records(
            conn,
            "SELECT * FROM analysis_results WHERE journal_entry_id = ?1
             ORDER BY created_at DESC",
            params![entry_id],
        )
    })
}

/// Records with the given status, optionally narrowed to one kind, newest first.
pub fn find_by_status(
    db: &Database,
    status: AnalysisStatus,
    kind: Option<AnalysisKind>,
) -> Result<Vec<AnalysisRecord>, DatabaseError> {
    db.with_conn(|conn| match kind {
        Some(kind) => collect_records(
            conn,
            "SELECT * FROM analysis_results WHERE status = ?1 AND analysis_type = ?2
             ORDER BY created_at DESC",
            params![status.as_str(), kind.as_str()],
        ),
        None => collect_records(
            conn,
            "SELECT * FROM analysis_results WHERE status = ?1 ORDER BY created_at DESC",
            params![status.as_str()],
        ),
    })
}

/// Counts records with the given status.
pub fn count_by_status(db: &Database, status: AnalysisStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM analysis_results WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
