//! The analysis orchestrator: decides what to analyze, submits jobs and runs
//! them when the worker pool delivers them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::builder::AnalysisBuilder;
use super::entry::{EntryStore, JournalEntry};
use super::error::AnalysisError;
use super::executor::{AnalysisExecutor, AnalysisModel};
use super::kind::AnalysisKind;
use super::record::{AnalysisRecord, AnalysisStatus};
use super::transcription::{transcribe_url, Transcriber};
use crate::db::{record_repo, Database};
use crate::queue::{JobCounts, JobQueue, QueueJobData, QueuedJob};
use crate::sanitize::describe_content;
use crate::worker::{JobError, JobHandler};

/// Kinds queued for every newly created entry.
pub const DEFAULT_KINDS: [AnalysisKind; 2] = [AnalysisKind::Mood, AnalysisKind::Energy];

#[derive(Clone)]
pub struct AnalysisService {
    db: Database,
    queue: JobQueue,
    entries: Arc<dyn EntryStore>,
    executor: AnalysisExecutor,
    transcriber: Arc<dyn Transcriber>,
    audio_dir: PathBuf,
}

impl AnalysisService {
    pub fn new(
        db: Database,
        queue: JobQueue,
        entries: Arc<dyn EntryStore>,
        model: Arc<dyn AnalysisModel>,
        transcriber: Arc<dyn Transcriber>,
        audio_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            queue,
            entries,
            executor: AnalysisExecutor::new(model),
            transcriber,
            audio_dir,
        }
    }

    /// Starts composing a set of analyses to run.
    pub fn builder(&self) -> AnalysisBuilder<'_> {
        AnalysisBuilder::new(self)
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    fn snapshot(entry: &JournalEntry, kind: AnalysisKind) -> QueueJobData {
        QueueJobData {
            journal_entry_id: entry.id.clone(),
            analysis_type: kind,
            content: entry.content.clone(),
            audio_url: entry.audio_url.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Queues one job per kind for the entry, in a single batch.
    pub async fn queue_analysis_for_entry(
        &self,
        entry_id: &str,
        kinds: &[AnalysisKind],
    ) -> Result<Vec<QueuedJob>, AnalysisError> {
        let entry = self
            .entries
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| AnalysisError::EntryNotFound(entry_id.to_string()))?;

        let jobs = kinds
            .iter()
            .map(|&kind| Self::snapshot(&entry, kind))
            .collect();
        let queued = self.queue.enqueue_bulk(jobs).await?;

        info!(
            entry_id,
            jobs = queued.len(),
            content = %describe_content(&entry.content),
            "Queued analysis for entry"
        );
        Ok(queued)
    }

    /// Queues the default analyses for a new entry. Never fails: a queueing
    /// error is logged as a degraded-mode event and `false` is returned.
    pub async fn queue_default_analysis(&self, entry_id: &str) -> bool {
        match self.queue_analysis_for_entry(entry_id, &DEFAULT_KINDS).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    event = "analysis_enqueue_degraded",
                    entry_id,
                    error = %e,
                    "Default analysis could not be queued"
                );
                false
            }
        }
    }

    /// Queues one job of `kind` for every published entry. Returns the number
    /// of jobs queued.
    pub async fn reprocess_all_entries(&self, kind: AnalysisKind) -> Result<usize, AnalysisError> {
        self.process_all_entries(&[kind]).await
    }

    /// Queues one job per kind for every published entry, all in one batch.
    pub async fn process_all_entries(&self, kinds: &[AnalysisKind]) -> Result<usize, AnalysisError> {
        let entries = self.entries.find_published().await?;

        let jobs: Vec<QueueJobData> = entries
            .iter()
            .filter(|entry| entry.is_published())
            .flat_map(|entry| kinds.iter().map(move |&kind| Self::snapshot(entry, kind)))
            .collect();
        let queued = self.queue.enqueue_bulk(jobs).await?.len();

        info!(
            jobs = queued,
            kinds = ?kinds,
            "Queued entries for reprocessing"
        );
        Ok(queued)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Runs one analysis job and persists its outcome on the record.
    ///
    /// The first delivery of a job for a pair that already has a record
    /// counts as a re-analysis. Later deliveries of the same job (queue
    /// retries) do not.
    pub async fn process_journal_entry(
        &self,
        job: &QueueJobData,
        attempt: u32,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let entry_id = job.journal_entry_id.as_str();
        let kind = job.analysis_type;

        let content = self.resolve_content(job).await?;

        let record = record_repo::begin_processing(&self.db, entry_id, kind, attempt <= 1)?;
        debug!(
            record_id = %record.id,
            retry_count = record.retry_count,
            "Record marked processing"
        );

        match self.executor.analyze(kind, &content).await {
            Ok(output) => {
                record_repo::mark_completed(&self.db, &record.id, &output.to_value())?;
                info!(entry_id, %kind, "Analysis completed");
            }
            Err(e) => {
                let err = AnalysisError::from(e);
                if let Err(db_err) = record_repo::mark_failed(&self.db, &record.id, &err.to_string()) {
                    error!(record_id = %record.id, "Failed to record analysis failure: {}", db_err);
                }
                warn!(entry_id, %kind, "Analysis failed: {}", err);
                return Err(err);
            }
        }

        record_repo::find_by_id(&self.db, &record.id)?
            .ok_or(AnalysisError::RecordNotFound(record.id))
    }

    /// Text to analyze: the snapshot, else the entry's current content, else
    /// a fresh transcription of the entry's recording (saved onto the entry).
    /// The entry must still exist even when the snapshot carries the text.
    async fn resolve_content(&self, job: &QueueJobData) -> Result<String, AnalysisError> {
        let entry = self
            .entries
            .find_by_id(&job.journal_entry_id)
            .await?
            .ok_or_else(|| AnalysisError::EntryNotFound(job.journal_entry_id.clone()))?;

        if !job.content.trim().is_empty() {
            return Ok(job.content.clone());
        }
        if !entry.needs_transcription() {
            return Ok(entry.content);
        }
        let Some(audio_url) = entry.audio_url.clone() else {
            return Ok(entry.content);
        };

        let text = transcribe_url(self.transcriber.as_ref(), &self.audio_dir, &audio_url)
            .await
            .map_err(|source| AnalysisError::Transcription {
                audio_url: audio_url.clone(),
                source,
            })?;
        self.entries.update_content(&entry.id, &text).await?;
        Ok(text)
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    /// All records of an entry, newest first.
    pub async fn results_for_entry(&self, entry_id: &str) -> Result<Vec<AnalysisRecord>, AnalysisError> {
        Ok(record_repo::find_by_entry(&self.db, entry_id)?)
    }

    pub async fn completed_results(&self) -> Result<Vec<AnalysisRecord>, AnalysisError> {
        Ok(record_repo::find_by_status(&self.db, AnalysisStatus::Completed, None)?)
    }

    pub async fn completed_results_by_kind(
        &self,
        kind: AnalysisKind,
    ) -> Result<Vec<AnalysisRecord>, AnalysisError> {
        Ok(record_repo::find_by_status(
            &self.db,
            AnalysisStatus::Completed,
            Some(kind),
        )?)
    }

    pub async fn get_record(&self, id: &str) -> Result<AnalysisRecord, AnalysisError> {
        record_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| AnalysisError::RecordNotFound(id.to_string()))
    }

    pub async fn record_for(
        &self,
        entry_id: &str,
        kind: AnalysisKind,
    ) -> Result<Option<AnalysisRecord>, AnalysisError> {
        Ok(record_repo::find_for_pair(&self.db, entry_id, kind)?)
    }

    // -----------------------------------------------------------------------
    // Queue operations
    // -----------------------------------------------------------------------

    pub async fn job_counts(&self) -> Result<JobCounts, AnalysisError> {
        Ok(self.queue.counts().await?)
    }

    pub async fn retry_failed_jobs(&self) -> Result<usize, AnalysisError> {
        Ok(self.queue.retry_all_failed().await?)
    }

    pub async fn clean_queue(&self, grace: Duration, limit: u32) -> Result<usize, AnalysisError> {
        Ok(self.queue.clean(grace, limit).await?)
    }
}

#[async_trait]
impl JobHandler for AnalysisService {
    async fn handle(&self, job: &QueueJobData, attempt: u32) -> Result<(), JobError> {
        self.process_journal_entry(job, attempt)
            .await
            .map(|_| ())
            .map_err(JobError::from)
    }
}
