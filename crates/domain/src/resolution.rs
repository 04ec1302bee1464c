use serde::{Deserialize, Serialize};

use crate::person::Person;

/// Free-form result metadata, with the keys every strategy/pipeline/service
/// stage is known to write out as named fields and anything else preserved
/// under `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionMetadata {
    pub reason: Option<String>,
    pub ambiguity_reason: Option<String>,
    pub match_count: Option<usize>,
    pub match_type: Option<String>,
    pub session_match: Option<String>,
    #[serde(default)]
    pub no_session_info: bool,
    #[serde(default)]
    pub impossible: bool,
    pub impossible_reason: Option<String>,
    #[serde(default)]
    pub below_threshold: bool,
    #[serde(default)]
    pub ai_provided_person_id: bool,
    #[serde(default)]
    pub found_in_last_years_bunk: bool,
    pub last_year_bunk: Option<String>,
    #[serde(default)]
    pub social_graph_enhanced: bool,
    #[serde(default)]
    pub smart_resolved: bool,
    #[serde(default)]
    pub candidates_ranked_by_social_score: bool,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The outcome of attempting to resolve one target name, produced by a
/// strategy, the pipeline, or the Phase-2 service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub person: Option<Person>,
    pub confidence: f64,
    pub method: String,
    #[serde(default)]
    pub candidates: Vec<Person>,
    #[serde(default)]
    pub metadata: ResolutionMetadata,
}

impl ResolutionResult {
    pub fn unresolved(method: impl Into<String>) -> Self {
        ResolutionResult {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.person.is_some()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }

    pub fn needs_review(&self) -> bool {
        self.is_ambiguous()
            || (self.is_resolved() && self.confidence < 0.8)
            || self.metadata.below_threshold
    }

    pub fn is_impossible(&self) -> bool {
        self.metadata.impossible
    }
}
