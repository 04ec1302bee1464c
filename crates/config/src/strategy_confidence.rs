use serde::{Deserialize, Serialize};

/// Confidence knobs shared by the shape of every matching strategy's config
/// section. Each strategy reads only the subset it needs and falls back to
/// its own hardcoded default when a field is `None` — this struct carries no
/// defaults of its own, per the "explicit `Option<f64>` with documented
/// fallbacks" configuration design.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StrategyConfidenceConfig {
    pub nickname_base: Option<f64>,
    pub spelling_base: Option<f64>,
    pub normalized_base: Option<f64>,
    pub soundex_base: Option<f64>,
    pub metaphone_base: Option<f64>,
    pub default_base: Option<f64>,
    pub parent_surname_base: Option<f64>,
    pub session_match: Option<f64>,
    pub same_session_boost: Option<f64>,
    pub different_session_penalty: Option<f64>,
    pub not_enrolled_penalty: Option<f64>,
}
