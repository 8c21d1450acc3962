//! The durable outcome of one (journal entry, analysis kind) pair.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::AnalysisKind;
use super::result::AnalysisOutput;

/// Record lifecycle.
///
/// `Pending` is reserved for a future "queued but not yet claimed" state;
/// records are created directly in `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "processing" => Ok(AnalysisStatus::Processing),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub journal_entry_id: String,
    pub analysis_type: AnalysisKind,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Explicit re-analyses of this pair. Queue redeliveries do not count.
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Decodes the stored payload into its typed form.
    pub fn output(&self) -> Option<Result<AnalysisOutput, serde_json::Error>> {
        self.result
            .clone()
            .map(|value| AnalysisOutput::from_value(self.analysis_type, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::{AnalysisOutput, EnergyAnalysis};

    #[test]
    fn test_status_round_trip() {
        for status in [
            AnalysisStatus::Pending,
            AnalysisStatus::Processing,
            AnalysisStatus::Completed,
            AnalysisStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<AnalysisStatus>().unwrap(), status);
        }
        assert!("superseded".parse::<AnalysisStatus>().is_err());
    }

    #[test]
    fn test_record_output_decodes_by_kind() {
        let energy = AnalysisOutput::Energy(EnergyAnalysis {
            energy_level: 3.0,
            fatigue_indicators: vec!["yawning".to_string()],
            sleep_quality: None,
            confidence: 0.8,
        });
        let now = Utc::now();
        let record = AnalysisRecord {
            id: "r1".to_string(),
            journal_entry_id: "e1".to_string(),
            analysis_type: AnalysisKind::Energy,
            status: AnalysisStatus::Completed,
            result: Some(energy.to_value()),
            error_message: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        };

        let decoded = record.output().unwrap().unwrap();
        assert_eq!(decoded, energy);
    }
}
