pub mod job;
pub mod job_queue;

pub use job::{
    backoff_delay, FailOutcome, JobCounts, JobOptions, QueueJobData, QueueJobState, QueuedJob,
    PROCESS_ENTRY_JOB,
};
pub use job_queue::JobQueue;
