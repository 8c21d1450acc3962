pub mod job;
pub mod pool;

pub use job::{JobError, JobHandler};
pub use pool::WorkerPool;
