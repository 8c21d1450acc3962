use std::sync::Arc;

use futures_util::future::join_all;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::broadcast::{JobEvent, JobEventBroadcaster};
use crate::queue::{FailOutcome, JobQueue, QueuedJob};
use crate::worker::job::JobHandler;

/// Fixed set of async workers draining a [`JobQueue`].
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    /// Spawns `concurrency` workers on the current tokio runtime. A zero
    /// concurrency is raised to one.
    pub fn start(
        queue: JobQueue,
        handler: Arc<dyn JobHandler>,
        concurrency: usize,
        events: Option<JobEventBroadcaster>,
    ) -> Self {
        let concurrency = concurrency.max(1);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let workers = (0..concurrency)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    queue.clone(),
                    Arc::clone(&handler),
                    events.clone(),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        info!("Started {} workers", concurrency);

        Self { workers, shutdown }
    }

    /// Stops claiming new jobs. Jobs already claimed run to completion.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Waits for every worker to exit. Call after [`WorkerPool::shutdown`].
    pub async fn wait(self) {
        let results = join_all(self.workers).await;
        for (i, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                error!("Worker {} panicked: {}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    /// Shuts down and waits for in-flight jobs.
    pub async fn stop(self) {
        self.shutdown();
        self.wait().await;
    }
}

async fn run_worker(
    worker_id: usize,
    queue: JobQueue,
    handler: Arc<dyn JobHandler>,
    events: Option<JobEventBroadcaster>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("Worker {} started", worker_id);

    let notify = queue.notifier();
    let poll_interval = queue.settings().poll_interval();

    loop {
        if *shutdown.borrow() {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match queue.claim_next().await {
            Ok(Some(job)) => {
                process_job(worker_id, &queue, handler.as_ref(), events.as_ref(), job).await;
                continue;
            }
            Ok(None) => {}
            Err(e) => error!("Worker {} failed to claim a job: {}", worker_id, e),
        }

        tokio::select! {
            _ = notify.notified() => {}
            _ = tokio::time::sleep(poll_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!("Worker {} lost its pool", worker_id);
                    break;
                }
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

async fn process_job(
    worker_id: usize,
    queue: &JobQueue,
    handler: &dyn JobHandler,
    events: Option<&JobEventBroadcaster>,
    job: QueuedJob,
) {
    let attempt = job.attempts_made;
    let emit = |event: JobEvent| {
        if let Some(events) = events {
            events.send(event);
        }
    };

    let data = match job.data() {
        Ok(data) => data,
        Err(e) => {
            let reason = format!("Undecodable job payload: {}", e);
            warn!(job_id = %job.id, "{}", reason);
            emit(JobEvent::active(&job.id, attempt));
            if let Err(e) = queue.fail(&job.id, &reason, false).await {
                error!(job_id = %job.id, "Failed to settle job: {}", e);
            }
            emit(JobEvent::failed(&job.id, attempt, &reason, false));
            return;
        }
    };

    let span = info_span!(
        "job",
        worker = worker_id,
        job_id = %job.id,
        entry_id = %data.journal_entry_id,
        kind = %data.analysis_type,
        attempt
    );

    async {
        debug!("Job active");
        emit(JobEvent::active(&job.id, attempt).for_target(&data.journal_entry_id, data.analysis_type));

        match handler.handle(&data, attempt).await {
            Ok(()) => {
                if let Err(e) = queue.complete(&job.id).await {
                    error!("Failed to mark job completed: {}", e);
                }
                info!("Job completed");
                emit(
                    JobEvent::completed(&job.id, attempt)
                        .for_target(&data.journal_entry_id, data.analysis_type),
                );
            }
            Err(err) => {
                let will_retry = match queue.fail(&job.id, &err.message, err.retryable).await {
                    Ok(FailOutcome::Retrying { next_attempt, delay }) => {
                        warn!(
                            next_attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Job failed, retrying: {}",
                            err
                        );
                        true
                    }
                    Ok(_) => {
                        error!(retryable = err.retryable, "Job failed: {}", err);
                        false
                    }
                    Err(e) => {
                        error!("Failed to record job failure '{}': {}", err, e);
                        false
                    }
                };
                emit(
                    JobEvent::failed(&job.id, attempt, &err.message, will_retry)
                        .for_target(&data.journal_entry_id, data.analysis_type),
                );
            }
        }
    }
    .instrument(span)
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::kind::AnalysisKind;
    use crate::broadcast::JobEventKind;
    use crate::config::QueueConfig;
    use crate::db::Database;
    use crate::queue::{QueueJobData, QueueJobState};
    use crate::worker::job::JobError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FlakyHandler {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl JobHandler for FlakyHandler {
        async fn handle(&self, _job: &QueueJobData, _attempt: u32) -> Result<(), JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(JobError::retryable("model unavailable"));
            }
            Ok(())
        }
    }

    fn fast_queue() -> JobQueue {
        let db = Database::open_in_memory().expect("Failed to create test database");
        JobQueue::new(
            db,
            QueueConfig {
                delay_ms: 0,
                backoff_ms: 5,
                poll_interval_ms: 5,
                ..QueueConfig::default()
            },
        )
    }

    fn data() -> QueueJobData {
        QueueJobData {
            journal_entry_id: "e1".to_string(),
            analysis_type: AnalysisKind::Mood,
            content: "fine day".to_string(),
            audio_url: None,
        }
    }

    async fn wait_for_state(queue: &JobQueue, id: &str, state: QueueJobState) {
        for _ in 0..400 {
            if let Some(job) = queue.get_job(id).await.unwrap() {
                if job.state == state {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached {}", id, state);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_creation_and_shutdown() {
        let handler = Arc::new(FlakyHandler {
            failures_left: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        });
        let pool = WorkerPool::start(fast_queue(), handler, 2, None);
        assert!(!pool.is_shutdown());

        pool.shutdown();
        assert!(pool.is_shutdown());
        pool.wait().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_retry_then_complete_emits_events() {
        let queue = fast_queue();
        let handler = Arc::new(FlakyHandler {
            failures_left: AtomicU32::new(1),
            calls: AtomicU32::new(0),
        });
        let events = JobEventBroadcaster::new(32);
        let mut rx = events.subscribe();

        let pool = WorkerPool::start(queue.clone(), handler.clone(), 1, Some(events));
        let job = queue.enqueue(data()).await.unwrap();
        wait_for_state(&queue, &job.id, QueueJobState::Completed).await;
        pool.stop().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);

        let kinds: Vec<(JobEventKind, u32, bool)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.kind, e.attempt, e.will_retry))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (JobEventKind::Active, 1, false),
                (JobEventKind::Failed, 1, true),
                (JobEventKind::Active, 2, false),
                (JobEventKind::Completed, 2, false),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_exhausted_attempts_fail_job() {
        let queue = fast_queue();
        let handler = Arc::new(FlakyHandler {
            failures_left: AtomicU32::new(10),
            calls: AtomicU32::new(0),
        });
        let pool = WorkerPool::start(queue.clone(), handler.clone(), 2, None);
        let job = queue.enqueue(data()).await.unwrap();
        wait_for_state(&queue, &job.id, QueueJobState::Failed).await;
        pool.stop().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        let job = queue.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(job.failed_reason.as_deref(), Some("model unavailable"));
    }
}
