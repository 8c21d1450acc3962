//! Analysis domain: entries, kinds, results and records, plus the
//! orchestrator that turns entries into queued jobs and jobs into records.

pub mod builder;
pub mod entry;
pub mod error;
pub mod executor;
pub mod kind;
pub mod options;
pub mod record;
pub mod result;
pub mod service;
pub mod transcription;

pub use builder::AnalysisBuilder;
pub use entry::{EntryStore, EntryStoreError, EntryType, JournalEntry};
pub use error::AnalysisError;
pub use executor::{AnalysisExecutor, AnalysisModel, ModelError};
pub use kind::{AnalysisKind, UnknownKind};
pub use options::{
    AnalysisConfig, CustomSelection, EnergyOptions, MoodOptions, NutritionOptions, TriggerOptions,
};
pub use record::{AnalysisRecord, AnalysisStatus};
pub use result::{
    AnalysisOutput, EnergyAnalysis, Macros, MoodAnalysis, NutritionAnalysis, RiskLevel,
    Sentiment, TriggerAnalysis,
};
pub use service::{AnalysisService, DEFAULT_KINDS};
pub use transcription::{AudioClip, Transcriber, TranscriptionError};
