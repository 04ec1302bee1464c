use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SmartResolutionConfig {
    pub enabled: Option<bool>,
    pub significant_connection_threshold: Option<f64>,
    pub min_connections_for_auto_resolve: Option<f64>,
    pub min_confidence_for_auto_resolve: Option<f64>,
    pub mutual_request_bonus: Option<f64>,
    pub common_friends_weight: Option<f64>,
    pub historical_bunking_weight: Option<f64>,
    pub connection_score_weight: Option<f64>,
}
