//! Per-kind extraction options carried by the analysis builder.
//!
//! The flags describe which parts of a result the caller is interested in.
//! They do not change which jobs are queued.

use serde::{Deserialize, Serialize};

use super::kind::AnalysisKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoodOptions {
    pub extract_sentiment: bool,
    pub extract_emotions: bool,
    pub extract_mood_scale: bool,
}

impl Default for MoodOptions {
    fn default() -> Self {
        Self {
            extract_sentiment: true,
            extract_emotions: true,
            extract_mood_scale: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnergyOptions {
    pub extract_energy_level: bool,
    pub extract_fatigue_indicators: bool,
    pub extract_sleep_quality: bool,
}

impl Default for EnergyOptions {
    fn default() -> Self {
        Self {
            extract_energy_level: true,
            extract_fatigue_indicators: true,
            extract_sleep_quality: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NutritionOptions {
    pub extract_food_mentions: bool,
    pub extract_calorie_estimates: bool,
    pub extract_macros: bool,
    pub extract_meal_timing: bool,
}

impl Default for NutritionOptions {
    fn default() -> Self {
        Self {
            extract_food_mentions: true,
            extract_calorie_estimates: true,
            extract_macros: true,
            extract_meal_timing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerOptions {
    pub extract_stressors: bool,
    pub extract_cravings: bool,
    pub extract_risk_factors: bool,
    pub extract_coping_strategies: bool,
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self {
            extract_stressors: true,
            extract_cravings: true,
            extract_risk_factors: true,
            extract_coping_strategies: true,
        }
    }
}

/// One selected analysis together with its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalysisConfig {
    Mood(MoodOptions),
    Energy(EnergyOptions),
    Nutrition(NutritionOptions),
    Triggers(TriggerOptions),
}

impl AnalysisConfig {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisConfig::Mood(_) => AnalysisKind::Mood,
            AnalysisConfig::Energy(_) => AnalysisKind::Energy,
            AnalysisConfig::Nutrition(_) => AnalysisKind::Nutrition,
            AnalysisConfig::Triggers(_) => AnalysisKind::Triggers,
        }
    }

    /// The kind with every extraction enabled.
    pub fn with_defaults(kind: AnalysisKind) -> Self {
        match kind {
            AnalysisKind::Mood => AnalysisConfig::Mood(MoodOptions::default()),
            AnalysisKind::Energy => AnalysisConfig::Energy(EnergyOptions::default()),
            AnalysisKind::Nutrition => AnalysisConfig::Nutrition(NutritionOptions::default()),
            AnalysisKind::Triggers => AnalysisConfig::Triggers(TriggerOptions::default()),
        }
    }
}

/// Independent include flags for a custom selection, with options for the
/// kinds that are included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSelection {
    #[serde(default)]
    pub include_mood: bool,
    #[serde(default)]
    pub include_energy: bool,
    #[serde(default)]
    pub include_nutrition: bool,
    #[serde(default)]
    pub include_triggers: bool,
    #[serde(default)]
    pub mood: MoodOptions,
    #[serde(default)]
    pub energy: EnergyOptions,
    #[serde(default)]
    pub nutrition: NutritionOptions,
    #[serde(default)]
    pub triggers: TriggerOptions,
}

impl CustomSelection {
    /// Selected analyses in mood, energy, nutrition, triggers order.
    pub fn configs(&self) -> Vec<AnalysisConfig> {
        let mut configs = Vec::new();
        if self.include_mood {
            configs.push(AnalysisConfig::Mood(self.mood));
        }
        if self.include_energy {
            configs.push(AnalysisConfig::Energy(self.energy));
        }
        if self.include_nutrition {
            configs.push(AnalysisConfig::Nutrition(self.nutrition));
        }
        if self.include_triggers {
            configs.push(AnalysisConfig::Triggers(self.triggers));
        }
        configs
    }
}
