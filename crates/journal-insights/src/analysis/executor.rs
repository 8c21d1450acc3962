//! Dispatch from an analysis kind to the matching model call.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::kind::AnalysisKind;
use super::result::{
    AnalysisOutput, EnergyAnalysis, MoodAnalysis, NutritionAnalysis, TriggerAnalysis,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The model could not be reached or refused the request.
    #[error("Model request failed: {0}")]
    Request(String),

    /// The model answered with something that is not a valid result.
    #[error("Malformed model output: {0}")]
    Malformed(String),
}

/// The language model behind the four extractions.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    async fn analyze_mood(&self, content: &str) -> Result<MoodAnalysis, ModelError>;

    async fn analyze_energy(&self, content: &str) -> Result<EnergyAnalysis, ModelError>;

    async fn analyze_nutrition(&self, content: &str) -> Result<NutritionAnalysis, ModelError>;

    async fn analyze_triggers(&self, content: &str) -> Result<TriggerAnalysis, ModelError>;
}

/// Runs one analysis and rejects results outside the documented ranges.
/// Holds no state of its own.
#[derive(Clone)]
pub struct AnalysisExecutor {
    model: Arc<dyn AnalysisModel>,
}

impl AnalysisExecutor {
    pub fn new(model: Arc<dyn AnalysisModel>) -> Self {
        Self { model }
    }

    pub async fn analyze(
        &self,
        kind: AnalysisKind,
        content: &str,
    ) -> Result<AnalysisOutput, ModelError> {
        debug!(%kind, content_len = content.len(), "Calling analysis model");

        let output = match kind {
            AnalysisKind::Mood => AnalysisOutput::Mood(self.model.analyze_mood(content).await?),
            AnalysisKind::Energy => {
                AnalysisOutput::Energy(self.model.analyze_energy(content).await?)
            }
            AnalysisKind::Nutrition => {
                AnalysisOutput::Nutrition(self.model.analyze_nutrition(content).await?)
            }
            AnalysisKind::Triggers => {
                AnalysisOutput::Triggers(self.model.analyze_triggers(content).await?)
            }
        };

        output.validate().map_err(ModelError::Malformed)?;
        Ok(output)
    }
}
