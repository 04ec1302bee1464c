use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NameMatchingConfig {
    /// Overrides the default nickname equivalence groups, keyed by full name.
    pub common_nicknames: HashMap<String, Vec<String>>,
}
