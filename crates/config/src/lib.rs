use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod confidence_scoring;
pub mod context_building;
pub mod name_matching;
pub mod school;
pub mod smart_resolution;
pub mod strategy_confidence;

pub use confidence_scoring::{
    BunkWithScoring, BunkWithWeights, ConfidenceScoringConfig, ContextScores, NotBunkWithScoring,
    NotBunkWithWeights, SocialBonusConfig,
};
pub use context_building::ContextBuildingConfig;
pub use name_matching::NameMatchingConfig;
pub use school::{SchoolDisambiguationConfig, DEFAULT_SCHOOL_ABBREVIATIONS};
pub use smart_resolution::SmartResolutionConfig;
pub use strategy_confidence::StrategyConfidenceConfig;

/// Top-level, tree-shaped resolution configuration. Every field is optional
/// at the leaf (`Option<f64>`/empty map) so that an absent TOML key falls
/// back to the strategy's own documented default rather than a config-wide
/// one.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub confidence_scoring: ConfidenceScoringConfig,
    pub exact_match: StrategyConfidenceConfig,
    pub fuzzy_match: StrategyConfidenceConfig,
    pub phonetic_match: StrategyConfidenceConfig,
    pub school_disambiguation: SchoolDisambiguationConfig,
    pub smart_resolution: SmartResolutionConfig,
    pub name_matching: NameMatchingConfig,
    pub context_building: ContextBuildingConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_overrides() {
        let config = AppConfig::default();
        assert!(config.confidence_scoring.ai_boost.is_none());
        assert!(config.name_matching.common_nicknames.is_empty());
    }

    #[test]
    fn load_from_missing_path_falls_back_to_default() {
        let config = AppConfig::load_from("/nonexistent/path/does-not-exist.toml").unwrap();
        assert!(config.exact_match.session_match.is_none());
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.confidence_scoring.ai_boost = Some(0.2);
        config.fuzzy_match.nickname_base = Some(0.85);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.confidence_scoring.ai_boost, Some(0.2));
        assert_eq!(loaded.fuzzy_match.nickname_base, Some(0.85));
    }
}
