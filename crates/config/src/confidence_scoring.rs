use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BunkWithWeights {
    pub name_match: Option<f64>,
    pub ai_parsing: Option<f64>,
    pub context: Option<f64>,
    pub reciprocal_bonus: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotBunkWithWeights {
    pub name_match: Option<f64>,
    pub ai_parsing: Option<f64>,
    pub context: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContextScores {
    pub base: Option<f64>,
    pub current_year: Option<f64>,
    pub previous_year_only: Option<f64>,
    pub social_signal_bonus: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SocialBonusConfig {
    pub max_distance_for_bonus: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BunkWithScoring {
    pub weights: BunkWithWeights,
    pub context_scores: ContextScores,
    pub social: SocialBonusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotBunkWithScoring {
    pub weights: NotBunkWithWeights,
    pub context_scores: ContextScores,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfidenceScoringConfig {
    pub bunk_with: BunkWithScoring,
    pub not_bunk_with: NotBunkWithScoring,
    pub ai_boost: Option<f64>,
}
