use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContextBuildingConfig {
    pub max_age_difference_months: Option<f64>,
}
