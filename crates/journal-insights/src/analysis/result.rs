//! Structured results returned by the model for each analysis kind.

use serde::{Deserialize, Serialize};

use super::kind::AnalysisKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodAnalysis {
    pub sentiment: Sentiment,
    #[serde(default)]
    pub emotions: Vec<String>,
    /// 1-10.
    pub mood_scale: f64,
    /// 0-1.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyAnalysis {
    /// 1-10.
    pub energy_level: f64,
    #[serde(default)]
    pub fatigue_indicators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_quality: Option<f64>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fats: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionAnalysis {
    #[serde(default)]
    pub food_mentions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macros: Option<Macros>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_timing: Option<Vec<String>>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerAnalysis {
    #[serde(default)]
    pub stressor: Vec<String>,
    #[serde(default)]
    pub cravings: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub coping_strategies: Vec<String>,
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

/// The result of one analysis, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutput {
    Mood(MoodAnalysis),
    Energy(EnergyAnalysis),
    Nutrition(NutritionAnalysis),
    Triggers(TriggerAnalysis),
}

impl AnalysisOutput {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisOutput::Mood(_) => AnalysisKind::Mood,
            AnalysisOutput::Energy(_) => AnalysisKind::Energy,
            AnalysisOutput::Nutrition(_) => AnalysisKind::Nutrition,
            AnalysisOutput::Triggers(_) => AnalysisKind::Triggers,
        }
    }

    /// The bare payload stored in the record's `result` column.
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            AnalysisOutput::Mood(r) => serde_json::to_value(r),
            AnalysisOutput::Energy(r) => serde_json::to_value(r),
            AnalysisOutput::Nutrition(r) => serde_json::to_value(r),
            AnalysisOutput::Triggers(r) => serde_json::to_value(r),
        };
        // Plain structs of strings and numbers always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Decodes a stored payload using the record's kind as the discriminant.
    pub fn from_value(
        kind: AnalysisKind,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            AnalysisKind::Mood => AnalysisOutput::Mood(serde_json::from_value(value)?),
            AnalysisKind::Energy => AnalysisOutput::Energy(serde_json::from_value(value)?),
            AnalysisKind::Nutrition => AnalysisOutput::Nutrition(serde_json::from_value(value)?),
            AnalysisKind::Triggers => AnalysisOutput::Triggers(serde_json::from_value(value)?),
        })
    }

    /// Checks the documented numeric ranges. Returns a description of the
    /// first violation.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            AnalysisOutput::Mood(r) => {
                check_scale("moodScale", r.mood_scale)?;
                check_confidence(r.confidence)
            }
            AnalysisOutput::Energy(r) => {
                check_scale("energyLevel", r.energy_level)?;
                if let Some(quality) = r.sleep_quality {
                    check_scale("sleepQuality", quality)?;
                }
                check_confidence(r.confidence)
            }
            AnalysisOutput::Nutrition(r) => {
                if let Some(calories) = r.estimated_calories {
                    if !calories.is_finite() || calories < 0.0 {
                        return Err(format!("estimatedCalories {} is not a calorie count", calories));
                    }
                }
                check_confidence(r.confidence)
            }
            AnalysisOutput::Triggers(r) => check_confidence(r.confidence),
        }
    }
}

fn check_scale(field: &str, value: f64) -> Result<(), String> {
    if (1.0..=10.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} {} is outside 1-10", field, value))
    }
}

fn check_confidence(value: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("confidence {} is outside 0-1", value))
    }
}
