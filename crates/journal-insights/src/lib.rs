pub mod analysis;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod queue;
pub mod runtime;
pub mod sanitize;
pub mod telemetry;
pub mod worker;

pub use analysis::{
    AnalysisBuilder, AnalysisError, AnalysisKind, AnalysisModel, AnalysisRecord, AnalysisService,
    AnalysisStatus, EntryStore, JournalEntry, Transcriber,
};
pub use broadcast::{JobEvent, JobEventBroadcaster, JobEventKind};
pub use config::{load_config, load_config_from_str, Config};
pub use db::Database;
pub use error::{ConfigError, InsightsError, QueueError, Result};
pub use queue::{JobCounts, JobQueue, QueueJobData};
pub use runtime::AnalysisRuntime;
pub use worker::{JobError, JobHandler, WorkerPool};
