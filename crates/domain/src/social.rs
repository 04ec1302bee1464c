use serde::{Deserialize, Serialize};

/// Social-graph signals between a requester and a target, defaulting to
/// "no relationship" when neither appears in the session's graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSignals {
    pub in_ego_network: bool,
    pub social_distance: u32,
    pub mutual_connections: usize,
    pub network_density: f64,
    pub ego_network_size: usize,
    pub relationship_strength: f64,
    pub in_same_component: bool,
    pub found_by: String,
    #[serde(default)]
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub informational_only: bool,
}

impl SocialSignals {
    pub const NO_PATH_DISTANCE: u32 = 999;

    pub fn default_for(found_by: impl Into<String>) -> Self {
        SocialSignals {
            in_ego_network: false,
            social_distance: Self::NO_PATH_DISTANCE,
            mutual_connections: 0,
            network_density: 0.0,
            ego_network_size: 0,
            relationship_strength: 0.0,
            in_same_component: false,
            found_by: found_by.into(),
            relationship_types: Vec::new(),
            informational_only: false,
        }
    }
}
