//! Queue job repository: the durable broker behind [`crate::queue::JobQueue`].
//!
//! Every state change is a single statement (or one transaction) under the
//! connection lock, so a job is never handed to two workers.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::queue::job::{backoff_delay, FailOutcome, JobCounts, QueueJobState, QueuedJob};

fn job_from_row(row: &Row<'_>) -> Result<QueuedJob, DatabaseError> {
    let state: String = row.get("state")?;
    let state = state
        .parse::<QueueJobState>()
        .map_err(|value| DatabaseError::InvalidValue {
            column: "state",
            value,
        })?;
    let backoff_ms: i64 = row.get("backoff_ms")?;
    Ok(QueuedJob {
        id: row.get("id")?,
        name: row.get("name")?,
        data: row.get("data")?,
        priority: row.get("priority")?,
        state,
        attempts_made: row.get("attempts_made")?,
        max_attempts: row.get("max_attempts")?,
        backoff_ms: backoff_ms.max(0) as u64,
        ready_at: row.get("ready_at")?,
        created_at: row.get("created_at")?,
        processed_at: row.get("processed_at")?,
        finished_at: row.get("finished_at")?,
        failed_reason: row.get("failed_reason")?,
    })
}

fn insert_row(conn: &Connection, job: &QueuedJob) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO queue_jobs (id, name, data, priority, state, attempts_made, max_attempts,
         backoff_ms, ready_at, created_at, processed_at, finished_at, failed_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            job.id,
            job.name,
            job.data,
            job.priority,
            job.state.as_str(),
            job.attempts_made,
            job.max_attempts,
            job.backoff_ms as i64,
            job.ready_at,
            job.created_at,
            job.processed_at,
            job.finished_at,
            job.failed_reason,
        ],
    )?;
    Ok(())
}

/// Inserts jobs in one transaction: either all of them land or none do.
pub fn insert_all(db: &Database, jobs: &[QueuedJob]) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        for job in jobs {
            insert_row(&tx, job)?;
        }
        tx.commit()?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<QueuedJob>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM queue_jobs WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        rows.next()?.map(job_from_row).transpose()
    })
}

/// Moves the highest-priority, oldest ready waiting job to active and counts
/// the delivery.
pub fn claim_next(db: &Database, now: i64) -> Result<Option<QueuedJob>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "UPDATE queue_jobs
             SET state = 'active', attempts_made = attempts_made + 1, processed_at = ?1
             WHERE seq = (
                SELECT seq FROM queue_jobs
                WHERE state = 'waiting' AND ready_at <= ?1
                ORDER BY priority DESC, seq ASC
                LIMIT 1
             )
             RETURNING *",
        )?;
        let mut rows = stmt.query(params![now])?;
        rows.next()?.map(job_from_row).transpose()
    })
}

/// Marks an active job completed and trims completed history to `keep` jobs.
/// Returns false when the job was not active.
pub fn complete(db: &Database, id: &str, now: i64, keep: u32) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE queue_jobs SET state = 'completed', finished_at = ?2, failed_reason = NULL
             WHERE id = ?1 AND state = 'active'",
            params![id, now],
        )?;
        trim_state(conn, QueueJobState::Completed, keep)?;
        Ok(changed > 0)
    })
}

/// Settles a failed attempt: back to waiting with backoff while attempts
/// remain and the failure is retryable, otherwise failed for good.
pub fn fail(
    db: &Database,
    id: &str,
    reason: &str,
    retryable: bool,
    now: i64,
    keep_failed: u32,
) -> Result<FailOutcome, DatabaseError> {
    db.with_conn(|conn| {
        let attempts: Option<(u32, u32, i64)> = conn
            .query_row(
                "SELECT attempts_made, max_attempts, backoff_ms FROM queue_jobs
                 WHERE id = ?1 AND state = 'active'",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        let Some((attempts_made, max_attempts, backoff_ms)) = attempts else {
            return Ok(FailOutcome::NotActive);
        };

        if retryable && attempts_made < max_attempts {
            let delay = backoff_delay(backoff_ms.max(0) as u64, attempts_made);
            conn.execute(
                "UPDATE queue_jobs SET state = 'waiting', ready_at = ?2, failed_reason = ?3
                 WHERE id = ?1",
                params![id, now + delay.as_millis() as i64, reason],
            )?;
            return Ok(FailOutcome::Retrying {
                next_attempt: attempts_made + 1,
                delay,
            });
        }

        conn.execute(
            "UPDATE queue_jobs SET state = 'failed', finished_at = ?2, failed_reason = ?3
             WHERE id = ?1",
            params![id, now, reason],
        )?;
        trim_state(conn, QueueJobState::Failed, keep_failed)?;
        Ok(FailOutcome::Failed)
    })
}

/// Keeps only the `keep` most recently finished jobs in `state`.
fn trim_state(conn: &Connection, state: QueueJobState, keep: u32) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM queue_jobs WHERE state = ?1 AND seq NOT IN (
            SELECT seq FROM queue_jobs WHERE state = ?1
            ORDER BY finished_at DESC, seq DESC
            LIMIT ?2
         )",
        params![state.as_str(), keep],
    )?;
    Ok(removed)
}

/// Jobs per state.
pub fn counts(db: &Database) -> Result<JobCounts, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM queue_jobs GROUP BY state")?;
        let mut rows = stmt.query([])?;
        let mut counts = JobCounts::default();
        while let Some(row) = rows.next()? {
            let state: String = row.get(0)?;
            let count: u64 = row.get(1)?;
            match state.parse::<QueueJobState>() {
                Ok(QueueJobState::Waiting) => counts.waiting = count,
                Ok(QueueJobState::Active) => counts.active = count,
                Ok(QueueJobState::Completed) => counts.completed = count,
                Ok(QueueJobState::Failed) => counts.failed = count,
                Err(other) => log::warn!("Ignoring queue jobs in unknown state '{}'", other),
            }
        }
        Ok(counts)
    })
}

/// Moves every failed job back to waiting with `attempts` more deliveries.
pub fn retry_all_failed(db: &Database, attempts: u32, now: i64) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE queue_jobs
             SET state = 'waiting', max_attempts = attempts_made + ?1, ready_at = ?2,
                 finished_at = NULL, failed_reason = NULL
             WHERE state = 'failed'",
            params![attempts, now],
        )?;
        Ok(changed)
    })
}

/// Deletes finished jobs in `state` whose finish time is at or before
/// `finished_before`, oldest first, at most `limit` of them (0 = no limit).
pub fn clean(
    db: &Database,
    state: QueueJobState,
    finished_before: i64,
    limit: u32,
) -> Result<usize, DatabaseError> {
    // SQLite treats a negative LIMIT as unbounded.
    let limit: i64 = if limit == 0 { -1 } else { i64::from(limit) };
    db.with_conn(|conn| {
        let removed = conn.execute(
            "DELETE FROM queue_jobs WHERE seq IN (
                SELECT seq FROM queue_jobs
                WHERE state = ?1 AND finished_at IS NOT NULL AND finished_at <= ?2
                ORDER BY finished_at ASC
                LIMIT ?3
             )",
            params![state.as_str(), finished_before, limit],
        )?;
        Ok(removed)
    })
}

/// Returns jobs left active by a previous process to waiting.
pub fn recover_stalled(db: &Database, now: i64) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE queue_jobs SET state = 'waiting', ready_at = ?1 WHERE state = 'active'",
            params![now],
        )?;
        Ok(changed)
    })
}
