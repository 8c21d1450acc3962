use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue priority for trigger analysis. Risk factors should surface first.
pub const TRIGGER_PRIORITY: i64 = 10;
/// Queue priority for every other analysis kind.
pub const DEFAULT_PRIORITY: i64 = 5;

/// A category of structured extraction from journal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Mood,
    Energy,
    Nutrition,
    Triggers,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Mood,
        AnalysisKind::Energy,
        AnalysisKind::Nutrition,
        AnalysisKind::Triggers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Mood => "mood",
            AnalysisKind::Energy => "energy",
            AnalysisKind::Nutrition => "nutrition",
            AnalysisKind::Triggers => "triggers",
        }
    }

    /// Dequeue priority for jobs of this kind (higher runs first).
    pub fn queue_priority(&self) -> i64 {
        match self {
            AnalysisKind::Triggers => TRIGGER_PRIORITY,
            _ => DEFAULT_PRIORITY,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown analysis type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for AnalysisKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mood" => Ok(AnalysisKind::Mood),
            "energy" => Ok(AnalysisKind::Energy),
            "nutrition" => Ok(AnalysisKind::Nutrition),
            "triggers" => Ok(AnalysisKind::Triggers),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}
