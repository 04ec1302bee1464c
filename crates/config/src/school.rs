use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::strategy_confidence::StrategyConfidenceConfig;

/// Abbreviation pairs applied longest-phrase-first when normalizing a
/// school name for comparison (e.g. "Middle School" <-> "MS").
pub static DEFAULT_SCHOOL_ABBREVIATIONS: LazyLock<Vec<(&'static str, &'static str)>> =
    LazyLock::new(|| {
        vec![
            ("middle school", "ms"),
            ("elementary school", "es"),
            ("elementary", "es"),
            ("high school", "hs"),
            ("junior high school", "jh"),
            ("junior high", "jh"),
            ("primary school", "ps"),
            ("public school", "ps"),
            ("p.s.", "ps"),
            ("saint", "st"),
            ("st.", "st"),
            ("academy", "acad"),
            ("preparatory", "prep"),
            ("prep school", "prep"),
            ("montessori", "mont"),
            ("christian", "chr"),
            ("catholic", "cath"),
            ("international", "intl"),
            ("magnet", "mag"),
            ("charter", "chtr"),
        ]
    });

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SchoolDisambiguationConfig {
    #[serde(flatten)]
    pub confidence: StrategyConfidenceConfig,
    /// Overrides the default abbreviation table when non-empty.
    pub school_abbreviations: HashMap<String, String>,
}

impl SchoolDisambiguationConfig {
    /// The abbreviation pairs to apply, longest phrase first: the override
    /// table if configured, else the default table.
    pub fn abbreviation_pairs(&self) -> Vec<(String, String)> {
        if self.school_abbreviations.is_empty() {
            DEFAULT_SCHOOL_ABBREVIATIONS
                .iter()
                .map(|(f, a)| (f.to_string(), a.to_string()))
                .collect()
        } else {
            let mut pairs: Vec<(String, String)> = self
                .school_abbreviations
                .iter()
                .map(|(f, a)| (f.clone(), a.clone()))
                .collect();
            pairs.sort_by_key(|(full, _)| std::cmp::Reverse(full.len()));
            pairs
        }
    }
}
