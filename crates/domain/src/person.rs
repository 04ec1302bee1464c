use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A parent or guardian listed against a `Person`, as recorded by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentName {
    pub first: String,
    pub last: String,
    pub relationship: String,
}

/// A roster person, immutable for the lifetime of one resolution run.
///
/// `cm_id` is the external roster's globally-unique identifier; `first_name`
/// is never empty for a well-formed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub cm_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub preferred_name: Option<String>,
    pub grade: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub school: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub session_cm_id: Option<i64>,
    #[serde(default)]
    pub parent_names: Vec<ParentName>,
}

impl Person {
    /// Distinct, non-empty parent surnames, in first-seen order.
    pub fn parent_last_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for parent in &self.parent_names {
            let last = parent.last.trim();
            if last.is_empty() {
                continue;
            }
            if seen.insert(last.to_lowercase()) {
                out.push(last.to_string());
            }
        }
        out
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
