use std::collections::{HashMap, HashSet};

/// Relationship details between a requester and one candidate, as derived
/// from a session's social graph.
#[derive(Debug, Clone, Default)]
pub struct CandidateRelationship {
    pub candidate_cm_id: i64,
    pub is_sibling: bool,
    pub is_classmate: bool,
    pub is_bunkmate: bool,
    /// Shortest-path hop count; `None` means no path (treated as +infinity).
    pub relationship_distance: Option<u32>,
    pub connection_strength: f64,
    pub mutual_connections: HashSet<i64>,
}

impl CandidateRelationship {
    pub fn new(candidate_cm_id: i64) -> Self {
        CandidateRelationship {
            candidate_cm_id,
            ..Default::default()
        }
    }
}

/// Context of relationships for one name-resolution attempt: every
/// candidate's relationship to the requester within a session.
#[derive(Debug, Clone, Default)]
pub struct RelationshipContext {
    pub requester_cm_id: i64,
    pub candidate_relationships: HashMap<i64, CandidateRelationship>,
}
