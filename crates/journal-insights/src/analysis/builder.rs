//! Fluent composition of the analyses to run.
//!
//! ```ignore
//! service
//!     .builder()
//!     .with_mood_analysis()
//!     .with_trigger_analysis()
//!     .execute_for(&entry_id)
//!     .await?;
//! ```

use super::error::AnalysisError;
use super::kind::AnalysisKind;
use super::options::{
    AnalysisConfig, CustomSelection, EnergyOptions, MoodOptions, NutritionOptions, TriggerOptions,
};
use super::service::AnalysisService;
use crate::queue::QueuedJob;

/// Ordered set of analyses. Adding a kind that is already present replaces
/// its options and keeps its position.
pub struct AnalysisBuilder<'a> {
    service: &'a AnalysisService,
    configs: Vec<AnalysisConfig>,
}

impl<'a> AnalysisBuilder<'a> {
    pub fn new(service: &'a AnalysisService) -> Self {
        Self {
            service,
            configs: Vec::new(),
        }
    }

    pub fn with(mut self, config: AnalysisConfig) -> Self {
        match self.configs.iter_mut().find(|c| c.kind() == config.kind()) {
            Some(existing) => *existing = config,
            None => self.configs.push(config),
        }
        self
    }

    pub fn with_mood_analysis(self) -> Self {
        self.with(AnalysisConfig::with_defaults(AnalysisKind::Mood))
    }

    pub fn with_mood_analysis_options(self, options: MoodOptions) -> Self {
        self.with(AnalysisConfig::Mood(options))
    }

    pub fn with_energy_analysis(self) -> Self {
        self.with(AnalysisConfig::with_defaults(AnalysisKind::Energy))
    }

    pub fn with_energy_analysis_options(self, options: EnergyOptions) -> Self {
        self.with(AnalysisConfig::Energy(options))
    }

    pub fn with_nutrition_analysis(self) -> Self {
        self.with(AnalysisConfig::with_defaults(AnalysisKind::Nutrition))
    }

    pub fn with_nutrition_analysis_options(self, options: NutritionOptions) -> Self {
        self.with(AnalysisConfig::Nutrition(options))
    }

    pub fn with_trigger_analysis(self) -> Self {
        self.with(AnalysisConfig::with_defaults(AnalysisKind::Triggers))
    }

    pub fn with_trigger_analysis_options(self, options: TriggerOptions) -> Self {
        self.with(AnalysisConfig::Triggers(options))
    }

    /// Mood and energy.
    pub fn default_analysis(self) -> Self {
        self.with_mood_analysis().with_energy_analysis()
    }

    /// Mood, energy and triggers.
    pub fn healthcare_analysis(self) -> Self {
        self.default_analysis().with_trigger_analysis()
    }

    /// Mood, energy and nutrition.
    pub fn nutrition_analysis(self) -> Self {
        self.default_analysis().with_nutrition_analysis()
    }

    /// Adds every kind the selection includes.
    pub fn custom(self, selection: CustomSelection) -> Self {
        selection
            .configs()
            .into_iter()
            .fold(self, |builder, config| builder.with(config))
    }

    pub fn configs(&self) -> &[AnalysisConfig] {
        &self.configs
    }

    pub fn kinds(&self) -> Vec<AnalysisKind> {
        self.configs.iter().map(|c| c.kind()).collect()
    }

    /// Queues the selected analyses for one entry.
    pub async fn execute_for(self, entry_id: &str) -> Result<Vec<QueuedJob>, AnalysisError> {
        let kinds = self.kinds();
        self.service.queue_analysis_for_entry(entry_id, &kinds).await
    }

    /// Queues the selected analyses for every published entry. Returns the
    /// number of jobs queued.
    pub async fn execute_for_all(self) -> Result<usize, AnalysisError> {
        let kinds = self.kinds();
        self.service.process_all_entries(&kinds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::entry::{EntryStore, EntryStoreError, JournalEntry};
    use crate::analysis::executor::{AnalysisModel, ModelError};
    use crate::analysis::result::{
        EnergyAnalysis, MoodAnalysis, NutritionAnalysis, TriggerAnalysis,
    };
    use crate::analysis::transcription::{AudioClip, Transcriber, TranscriptionError};
    use crate::config::QueueConfig;
    use crate::db::Database;
    use crate::queue::JobQueue;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct Unused;

    #[async_trait]
    impl AnalysisModel for Unused {
        async fn analyze_mood(&self, _: &str) -> Result<MoodAnalysis, ModelError> {
            Err(ModelError::Request("unused".to_string()))
        }
        async fn analyze_energy(&self, _: &str) -> Result<EnergyAnalysis, ModelError> {
            Err(ModelError::Request("unused".to_string()))
        }
        async fn analyze_nutrition(&self, _: &str) -> Result<NutritionAnalysis, ModelError> {
            Err(ModelError::Request("unused".to_string()))
        }
        async fn analyze_triggers(&self, _: &str) -> Result<TriggerAnalysis, ModelError> {
            Err(ModelError::Request("unused".to_string()))
        }
    }

    #[async_trait]
    impl Transcriber for Unused {
        async fn transcribe(&self, _: AudioClip) -> Result<String, TranscriptionError> {
            Err(TranscriptionError::Service("unused".to_string()))
        }
    }

    struct OneEntry(JournalEntry);

    #[async_trait]
    impl EntryStore for OneEntry {
        async fn find_by_id(&self, id: &str) -> Result<Option<JournalEntry>, EntryStoreError> {
            Ok((self.0.id == id).then(|| self.0.clone()))
        }
        async fn update_content(&self, _: &str, _: &str) -> Result<(), EntryStoreError> {
            Ok(())
        }
        async fn find_published(&self) -> Result<Vec<JournalEntry>, EntryStoreError> {
            Ok(vec![self.0.clone()])
        }
    }

    fn service(entry: JournalEntry) -> AnalysisService {
        let db = Database::open_in_memory().expect("Failed to create test database");
        AnalysisService::new(
            db.clone(),
            JobQueue::new(db, QueueConfig::default()),
            Arc::new(OneEntry(entry)),
            Arc::new(Unused),
            Arc::new(Unused),
            PathBuf::from("uploads/audio"),
        )
    }

    #[test]
    fn test_presets() {
        let svc = service(JournalEntry::text("x"));
        assert_eq!(
            svc.builder().default_analysis().kinds(),
            vec![AnalysisKind::Mood, AnalysisKind::Energy]
        );
        assert_eq!(
            svc.builder().healthcare_analysis().kinds(),
            vec![AnalysisKind::Mood, AnalysisKind::Energy, AnalysisKind::Triggers]
        );
        assert_eq!(
            svc.builder().nutrition_analysis().kinds(),
            vec![AnalysisKind::Mood, AnalysisKind::Energy, AnalysisKind::Nutrition]
        );
    }

    #[test]
    fn test_readding_kind_replaces_options() {
        let svc = service(JournalEntry::text("x"));
        let builder = svc
            .builder()
            .with_mood_analysis()
            .with_energy_analysis()
            .with_mood_analysis_options(MoodOptions {
                extract_emotions: false,
                ..MoodOptions::default()
            });

        assert_eq!(builder.kinds(), vec![AnalysisKind::Mood, AnalysisKind::Energy]);
        match builder.configs()[0] {
            AnalysisConfig::Mood(options) => assert!(!options.extract_emotions),
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn test_custom_merges_with_existing() {
        let svc = service(JournalEntry::text("x"));
        let builder = svc.builder().with_energy_analysis().custom(CustomSelection {
            include_energy: true,
            include_nutrition: true,
            ..CustomSelection::default()
        });
        assert_eq!(
            builder.kinds(),
            vec![AnalysisKind::Energy, AnalysisKind::Nutrition]
        );
    }

    #[tokio::test]
    async fn test_execute_for_queues_one_job_per_kind() {
        let entry = JournalEntry::text("x");
        let svc = service(entry.clone());

        let jobs = svc
            .builder()
            .with_trigger_analysis()
            .with_mood_analysis()
            .with_trigger_analysis()
            .execute_for(&entry.id)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(svc.job_counts().await.unwrap().waiting, 2);
    }

    #[tokio::test]
    async fn test_execute_for_all() {
        let svc = service(JournalEntry::text("x"));
        let queued = svc.builder().healthcare_analysis().execute_for_all().await.unwrap();
        assert_eq!(queued, 3);
    }
}
