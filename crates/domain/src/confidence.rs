use crate::social::SocialSignals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCertainty {
    Exact,
    Partial,
    Ambiguous,
    None,
}

impl Default for MatchCertainty {
    fn default() -> Self {
        MatchCertainty::None
    }
}

/// Every signal that feeds the composite confidence score (§3 "Confidence
/// signals" / `original_source`'s `V2ConfidenceSignals`), grouped by the
/// stage that produces it.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceSignals {
    // parse
    pub ai_parse_confidence: f64,
    pub request_clarity: f64,
    pub match_certainty: MatchCertainty,
    pub requires_clarification: bool,
    pub ambiguity_reason: Option<String>,

    // name match
    pub name_match_exact: bool,
    pub name_match_unique: bool,
    pub name_disambiguation_score: f64,

    // context
    pub same_session: bool,
    pub grade_proximity: i32,
    pub age_proximity: f64,
    pub found_in_current_year: bool,
    pub found_in_previous_year_only: bool,

    // social (see SocialSignals)
    pub in_ego_network: bool,
    pub social_distance: u32,
    pub shared_connections: usize,
    pub network_density: f64,
    pub ego_network_size: usize,

    // source
    pub source_type: String,
    pub has_specific_names: bool,
}

impl ConfidenceSignals {
    pub const DEFAULT_GRADE_PROXIMITY: i32 = 999;
    pub const DEFAULT_AGE_PROXIMITY: f64 = 999.0;

    pub fn new() -> Self {
        ConfidenceSignals {
            grade_proximity: Self::DEFAULT_GRADE_PROXIMITY,
            age_proximity: Self::DEFAULT_AGE_PROXIMITY,
            social_distance: SocialSignals::NO_PATH_DISTANCE,
            source_type: "parent".to_string(),
            ..Default::default()
        }
    }

    pub fn apply_social(&mut self, signals: &SocialSignals) {
        self.in_ego_network = signals.in_ego_network;
        self.social_distance = signals.social_distance;
        self.shared_connections = signals.mutual_connections;
        self.network_density = signals.network_density;
        self.ego_network_size = signals.ego_network_size;
    }
}
