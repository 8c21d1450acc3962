//! Composition root: wires the database, queue, orchestrator and worker pool
//! from one [`Config`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::analysis::{AnalysisModel, AnalysisService, EntryStore, Transcriber};
use crate::broadcast::{JobEvent, JobEventBroadcaster};
use crate::config::{validate_config, Config};
use crate::db::entry_repo::EntryRepository;
use crate::db::Database;
use crate::error::{InsightsError, Result};
use crate::queue::JobQueue;
use crate::sanitize::redact_path;
use crate::worker::WorkerPool;

pub struct AnalysisRuntime {
    config: Config,
    db: Database,
    queue: JobQueue,
    service: AnalysisService,
    events: JobEventBroadcaster,
    pool: Option<WorkerPool>,
}

impl AnalysisRuntime {
    /// Opens the configured database and uses its `journal_entries` table as
    /// the entry store.
    pub fn open(
        config: Config,
        model: Arc<dyn AnalysisModel>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Result<Self> {
        validate_config(&config)?;
        let path = config
            .database
            .resolved_path()
            .ok_or(InsightsError::NoDatabasePath)?;
        let db = Database::open(&path)?;
        info!(database = %redact_path(&path), "Analysis database ready");

        let entries = Arc::new(EntryRepository::new(db.clone()));
        Self::with_database(config, db, entries, model, transcriber)
    }

    /// Builds the runtime over an existing database and entry store.
    pub fn with_database(
        config: Config,
        db: Database,
        entries: Arc<dyn EntryStore>,
        model: Arc<dyn AnalysisModel>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Result<Self> {
        validate_config(&config)?;

        let queue = JobQueue::new(db.clone(), config.queue.clone());
        let service = AnalysisService::new(
            db.clone(),
            queue.clone(),
            entries,
            model,
            transcriber,
            config.audio.directory.clone(),
        );
        let events = JobEventBroadcaster::new(config.events.capacity);

        Ok(Self {
            config,
            db,
            queue,
            service,
            events,
            pool: None,
        })
    }

    /// Recovers jobs stalled by a previous run and starts the worker pool.
    /// Calling it on a running runtime does nothing.
    pub async fn start(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        self.queue.recover_stalled().await?;

        let handler = Arc::new(self.service.clone());
        self.pool = Some(WorkerPool::start(
            self.queue.clone(),
            handler,
            self.config.workers.concurrency,
            Some(self.events.clone()),
        ));
        Ok(())
    }

    /// Stops claiming jobs and waits for in-flight ones to finish.
    pub async fn stop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.stop().await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_some()
    }

    pub fn service(&self) -> &AnalysisService {
        &self.service
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }
}
