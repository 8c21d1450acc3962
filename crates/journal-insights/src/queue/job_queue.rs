//! Persistent, priority-ordered analysis job queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::db::{now_millis, queue_repo, Database};
use crate::error::QueueError;
use crate::queue::job::{
    FailOutcome, JobCounts, JobOptions, QueueJobData, QueueJobState, QueuedJob, PROCESS_ENTRY_JOB,
};

/// Handle to the analysis queue. Cloning shares the same store and wake-up
/// signal.
///
/// Delivery is at-least-once: a job is retried with exponential backoff until
/// its attempts run out, and jobs left active by a crash come back through
/// [`JobQueue::recover_stalled`].
#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    settings: Arc<QueueConfig>,
    notify: Arc<Notify>,
}

impl JobQueue {
    pub fn new(db: Database, settings: QueueConfig) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn settings(&self) -> &QueueConfig {
        &self.settings
    }

    /// Wake-up signal raised whenever new work becomes available.
    pub fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    fn build(&self, data: &QueueJobData, options: JobOptions) -> Result<QueuedJob, QueueError> {
        let payload = serde_json::to_string(data).map_err(QueueError::Encode)?;
        let now = now_millis();
        Ok(QueuedJob {
            id: uuid::Uuid::new_v4().to_string(),
            name: PROCESS_ENTRY_JOB.to_string(),
            data: payload,
            priority: options.priority,
            state: QueueJobState::Waiting,
            attempts_made: 0,
            max_attempts: options.attempts.max(1),
            backoff_ms: options.backoff_ms,
            ready_at: now + options.delay_ms as i64,
            created_at: now,
            processed_at: None,
            finished_at: None,
            failed_reason: None,
        })
    }

    fn wake(&self, jobs: usize) {
        for _ in 0..jobs {
            self.notify.notify_one();
        }
    }

    /// Enqueues one job with the default options for its kind.
    pub async fn enqueue(&self, data: QueueJobData) -> Result<QueuedJob, QueueError> {
        let options = JobOptions::for_kind(data.analysis_type, &self.settings);
        self.enqueue_with(data, options).await
    }

    /// Enqueues one job with explicit options.
    pub async fn enqueue_with(
        &self,
        data: QueueJobData,
        options: JobOptions,
    ) -> Result<QueuedJob, QueueError> {
        let job = self.build(&data, options)?;
        queue_repo::insert_all(&self.db, std::slice::from_ref(&job))?;
        debug!(
            job_id = %job.id,
            entry_id = %data.journal_entry_id,
            kind = %data.analysis_type,
            priority = job.priority,
            "Job enqueued"
        );
        self.wake(1);
        Ok(job)
    }

    /// Enqueues all jobs in one transaction, each with its kind's defaults.
    pub async fn enqueue_bulk(&self, data: Vec<QueueJobData>) -> Result<Vec<QueuedJob>, QueueError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let jobs = data
            .iter()
            .map(|d| self.build(d, JobOptions::for_kind(d.analysis_type, &self.settings)))
            .collect::<Result<Vec<_>, _>>()?;
        queue_repo::insert_all(&self.db, &jobs)?;
        debug!(count = jobs.len(), "Jobs enqueued in bulk");
        self.wake(jobs.len());
        Ok(jobs)
    }

    pub async fn counts(&self) -> Result<JobCounts, QueueError> {
        Ok(queue_repo::counts(&self.db)?)
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<QueuedJob>, QueueError> {
        Ok(queue_repo::find_by_id(&self.db, id)?)
    }

    /// Sends every failed job back for a fresh set of attempts. Returns how
    /// many were re-submitted.
    pub async fn retry_all_failed(&self) -> Result<usize, QueueError> {
        let attempts = self.settings.attempts.max(1);
        let retried = queue_repo::retry_all_failed(&self.db, attempts, now_millis())?;
        if retried > 0 {
            info!(count = retried, "Re-submitted failed jobs");
            self.wake(retried);
        }
        Ok(retried)
    }

    /// Removes completed and failed jobs that finished more than `grace` ago,
    /// at most `limit` per state (0 = no limit). Returns how many were removed.
    pub async fn clean(&self, grace: Duration, limit: u32) -> Result<usize, QueueError> {
        let cutoff = now_millis() - grace.as_millis() as i64;
        let mut removed = 0;
        for state in [QueueJobState::Completed, QueueJobState::Failed] {
            removed += queue_repo::clean(&self.db, state, cutoff, limit)?;
        }
        if removed > 0 {
            info!(count = removed, "Cleaned finished jobs");
        }
        Ok(removed)
    }

    /// [`JobQueue::clean`] with the configured grace period and limit.
    pub async fn clean_default(&self) -> Result<usize, QueueError> {
        self.clean(self.settings.clean_grace(), self.settings.clean_limit)
            .await
    }

    /// Claims the next ready job, if any.
    pub async fn claim_next(&self) -> Result<Option<QueuedJob>, QueueError> {
        Ok(queue_repo::claim_next(&self.db, now_millis())?)
    }

    /// Marks an active job completed. Returns false if it was not active.
    pub async fn complete(&self, id: &str) -> Result<bool, QueueError> {
        Ok(queue_repo::complete(
            &self.db,
            id,
            now_millis(),
            self.settings.remove_on_complete,
        )?)
    }

    /// Settles a failed attempt, scheduling a retry when one is allowed.
    pub async fn fail(
        &self,
        id: &str,
        reason: &str,
        retryable: bool,
    ) -> Result<FailOutcome, QueueError> {
        Ok(queue_repo::fail(
            &self.db,
            id,
            reason,
            retryable,
            now_millis(),
            self.settings.remove_on_fail,
        )?)
    }

    /// Returns jobs stuck in active (from a process that died mid-job) to
    /// waiting.
    pub async fn recover_stalled(&self) -> Result<usize, QueueError> {
        let recovered = queue_repo::recover_stalled(&self.db, now_millis())?;
        if recovered > 0 {
            info!(count = recovered, "Recovered stalled jobs");
            self.wake(recovered);
        }
        Ok(recovered)
    }
}
