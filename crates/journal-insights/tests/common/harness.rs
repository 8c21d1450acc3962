//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` struct provides:
//! - A file-backed database and an audio directory inside a temp dir
//! - An `AnalysisRuntime` wired to a scripted model and transcriber
//! - Polling helpers for waiting on asynchronous job outcomes

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use journal_insights::analysis::{
    AnalysisKind, AnalysisModel, AnalysisRecord, AnalysisStatus, AudioClip, EnergyAnalysis,
    JournalEntry, ModelError, MoodAnalysis, NutritionAnalysis, RiskLevel, Sentiment, Transcriber,
    TranscriptionError, TriggerAnalysis,
};
use journal_insights::config::Config;
use journal_insights::db::entry_repo;
use journal_insights::{AnalysisRuntime, AnalysisService, Database, JobCounts};

use super::builders::ConfigBuilder;

/// Model double that fails the first N calls of a kind and records the
/// order in which kinds were requested.
#[derive(Default)]
pub struct ScriptedModel {
    failures: Mutex<HashMap<AnalysisKind, u32>>,
    calls: Mutex<Vec<(AnalysisKind, String)>>,
}

impl ScriptedModel {
    /// The next `times` calls for `kind` fail with a request error.
    pub fn fail_next(&self, kind: AnalysisKind, times: u32) {
        self.failures.lock().unwrap().insert(kind, times);
    }

    pub fn calls(&self) -> Vec<(AnalysisKind, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, kind: AnalysisKind) -> usize {
        self.calls().iter().filter(|(k, _)| *k == kind).count()
    }

    fn record(&self, kind: AnalysisKind, content: &str) -> Result<(), ModelError> {
        self.calls
            .lock()
            .unwrap()
            .push((kind, content.to_string()));
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&kind) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(ModelError::Request(format!("{} model unavailable", kind)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AnalysisModel for ScriptedModel {
    async fn analyze_mood(&self, content: &str) -> Result<MoodAnalysis, ModelError> {
        self.record(AnalysisKind::Mood, content)?;
        Ok(MoodAnalysis {
            sentiment: Sentiment::Positive,
            emotions: vec!["content".to_string()],
            mood_scale: 7.0,
            confidence: 0.8,
        })
    }

    async fn analyze_energy(&self, content: &str) -> Result<EnergyAnalysis, ModelError> {
        self.record(AnalysisKind::Energy, content)?;
        Ok(EnergyAnalysis {
            energy_level: 6.0,
            fatigue_indicators: vec![],
            sleep_quality: Some(7.0),
            confidence: 0.7,
        })
    }

    async fn analyze_nutrition(&self, content: &str) -> Result<NutritionAnalysis, ModelError> {
        self.record(AnalysisKind::Nutrition, content)?;
        Ok(NutritionAnalysis {
            food_mentions: vec!["salad".to_string()],
            estimated_calories: Some(350.0),
            macros: None,
            meal_timing: Some(vec!["lunch".to_string()]),
            confidence: 0.6,
        })
    }

    async fn analyze_triggers(&self, content: &str) -> Result<TriggerAnalysis, ModelError> {
        self.record(AnalysisKind::Triggers, content)?;
        Ok(TriggerAnalysis {
            stressor: vec!["deadline".to_string()],
            cravings: vec![],
            risk_factors: vec![],
            coping_strategies: vec!["breathing".to_string()],
            risk_level: RiskLevel::Medium,
            confidence: 0.75,
        })
    }
}

/// Transcriber double that returns fixed text and keeps every clip it saw.
pub struct RecordingTranscriber {
    text: String,
    clips: Mutex<Vec<AudioClip>>,
}

impl RecordingTranscriber {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            clips: Mutex::new(Vec::new()),
        }
    }

    pub fn clips(&self) -> Vec<AudioClip> {
        self.clips.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for RecordingTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, TranscriptionError> {
        self.clips.lock().unwrap().push(clip);
        Ok(self.text.clone())
    }
}

/// Test harness providing an isolated pipeline for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    pub audio_dir: PathBuf,
    pub runtime: AnalysisRuntime,
    pub model: Arc<ScriptedModel>,
    pub transcriber: Arc<RecordingTranscriber>,
}

impl TestHarness {
    /// A harness with the fast test configuration. Workers are not started.
    pub fn new() -> Self {
        Self::with_config(ConfigBuilder::new())
    }

    pub fn with_config(builder: ConfigBuilder) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let audio_dir = temp_dir.path().join("uploads").join("audio");
        std::fs::create_dir_all(&audio_dir).expect("Failed to create audio dir");

        let config: Config = builder
            .database_path(&temp_dir.path().join("data").join("insights.db"))
            .audio_directory(audio_dir.clone())
            .build();

        let model = Arc::new(ScriptedModel::default());
        let transcriber = Arc::new(RecordingTranscriber::new("I slept well and feel calm"));
        let runtime = AnalysisRuntime::open(config, model.clone(), transcriber.clone())
            .expect("Failed to open runtime");

        Self {
            temp_dir,
            audio_dir,
            runtime,
            model,
            transcriber,
        }
    }

    pub fn db(&self) -> &Database {
        self.runtime.database()
    }

    pub fn service(&self) -> &AnalysisService {
        self.runtime.service()
    }

    pub async fn start(&mut self) {
        self.runtime.start().await.expect("Failed to start runtime");
    }

    pub async fn stop(&mut self) {
        self.runtime.stop().await;
    }

    pub fn insert_text_entry(&self, content: &str) -> JournalEntry {
        let entry = JournalEntry::text(content);
        entry_repo::insert(self.db(), &entry).expect("Failed to insert entry");
        entry
    }

    /// Writes `bytes` to the audio directory and inserts an untranscribed
    /// audio entry pointing at it.
    pub fn insert_audio_entry(&self, filename: &str, bytes: &[u8]) -> JournalEntry {
        std::fs::write(self.audio_dir.join(filename), bytes).expect("Failed to write audio");
        let entry = JournalEntry::audio(format!(
            "http://localhost:3001/uploads/audio/{}",
            filename
        ));
        entry_repo::insert(self.db(), &entry).expect("Failed to insert entry");
        entry
    }

    pub fn entry(&self, id: &str) -> JournalEntry {
        entry_repo::find_by_id(self.db(), id)
            .expect("Failed to load entry")
            .expect("Entry missing")
    }

    pub async fn counts(&self) -> JobCounts {
        self.service().job_counts().await.expect("Failed to count jobs")
    }

    /// Waits until the record for (entry, kind) reaches `status`.
    pub async fn wait_for_record(
        &self,
        entry_id: &str,
        kind: AnalysisKind,
        status: AnalysisStatus,
    ) -> AnalysisRecord {
        let service = self.service();
        wait_for(move || async move {
            service
                .record_for(entry_id, kind)
                .await
                .ok()
                .flatten()
                .filter(|r| r.status == status)
        })
        .await
        .unwrap_or_else(|| panic!("record {}/{} never reached {}", entry_id, kind, status))
    }

    /// Waits until no job is waiting or active.
    pub async fn wait_until_drained(&self) -> JobCounts {
        wait_for(move || async move {
            let counts = self.counts().await;
            (counts.waiting == 0 && counts.active == 0).then_some(counts)
        })
        .await
        .expect("queue never drained")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `check` every 10ms for up to 5s.
pub async fn wait_for<T, F, Fut>(mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..500 {
        if let Some(value) = check().await {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}
