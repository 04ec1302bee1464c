use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bunk_domain::{CandidateRelationship, Person, RelationshipContext};
use bunk_strategies::{RelationshipBooster, RelationshipPick};

use crate::relationship_type::RelationshipType;
use crate::social_graph::SocialGraph;

/// Turns a session's social graph into per-candidate relationship context
/// and a bounded confidence boost, used to disambiguate fuzzy name matches.
pub struct RelationshipAnalyzer {
    social_graph: Arc<SocialGraph>,
}

impl RelationshipAnalyzer {
    pub const SIBLING_BOOST: f64 = 0.25;
    pub const BUNKMATE_BOOST: f64 = 0.15;
    pub const CLASSMATE_BOOST: f64 = 0.10;
    pub const INDIRECT_BOOST: f64 = 0.05;
    const BOOST_CAP: f64 = 0.3;
    const PICK_MARGIN: f64 = 0.1;

    pub fn new(social_graph: Arc<SocialGraph>) -> Self {
        RelationshipAnalyzer { social_graph }
    }

    pub async fn analyze_relationships(
        &self,
        requester_cm_id: i64,
        candidates: &[Person],
        session_cm_id: i64,
    ) -> RelationshipContext {
        let mut context = RelationshipContext { requester_cm_id, candidate_relationships: HashMap::new() };
        for candidate in candidates {
            let relationship = self.analyze_candidate(requester_cm_id, candidate.cm_id, session_cm_id).await;
            context.candidate_relationships.insert(candidate.cm_id, relationship);
        }
        context
    }

    async fn analyze_candidate(&self, requester_cm_id: i64, candidate_cm_id: i64, session_cm_id: i64) -> CandidateRelationship {
        let mut relationship = CandidateRelationship::new(candidate_cm_id);

        if !self.social_graph.contains_node(session_cm_id, requester_cm_id).await
            || !self.social_graph.contains_node(session_cm_id, candidate_cm_id).await
        {
            return relationship;
        }

        if let Some(edge) = self.social_graph.edge_between(session_cm_id, requester_cm_id, candidate_cm_id).await {
            relationship.is_sibling = edge.relationship_types.contains(&RelationshipType::Sibling);
            relationship.is_classmate = edge.relationship_types.contains(&RelationshipType::Classmate);
            relationship.is_bunkmate = edge.relationship_types.contains(&RelationshipType::Bunkmate);
            relationship.connection_strength = edge.weight;
        }

        relationship.relationship_distance =
            self.social_graph.shortest_path_length_between(session_cm_id, requester_cm_id, candidate_cm_id).await;

        let requester_neighbors = self.social_graph.neighbors_of(session_cm_id, requester_cm_id).await;
        let candidate_neighbors = self.social_graph.neighbors_of(session_cm_id, candidate_cm_id).await;
        relationship.mutual_connections =
            requester_neighbors.intersection(&candidate_neighbors).copied().collect();

        relationship
    }

    /// Confidence boost in `[0, 0.3]`: direct relationship types take the
    /// strongest applicable boost; lacking one, a distance-decayed boost
    /// applies for any indirect connection.
    pub fn get_confidence_boost(&self, context: &RelationshipContext, candidate_cm_id: i64) -> f64 {
        let Some(rel) = context.candidate_relationships.get(&candidate_cm_id) else {
            return 0.0;
        };

        let mut boost: f64 = 0.0;
        if rel.is_sibling {
            boost = boost.max(Self::SIBLING_BOOST);
        }
        if rel.is_bunkmate {
            boost = boost.max(Self::BUNKMATE_BOOST);
        }
        if rel.is_classmate {
            boost = boost.max(Self::CLASSMATE_BOOST);
        }

        if boost == 0.0 {
            if let Some(distance) = rel.relationship_distance {
                let distance_factor = 1.0 / (1.0 + distance as f64);
                boost = Self::INDIRECT_BOOST * distance_factor;
            }
        }

        boost.min(Self::BOOST_CAP)
    }

    pub fn describe_relationship(&self, context: &RelationshipContext, candidate_cm_id: i64) -> String {
        let Some(rel) = context.candidate_relationships.get(&candidate_cm_id) else {
            return "No relationship information available".to_string();
        };

        let mut relationships = Vec::new();
        if rel.is_sibling {
            relationships.push("sibling");
        }
        if rel.is_bunkmate {
            relationships.push("bunkmate");
        }
        if rel.is_classmate {
            relationships.push("classmate");
        }

        if !relationships.is_empty() {
            let mut description = format!("Direct relationship: {}", relationships.join(", "));
            if !rel.mutual_connections.is_empty() {
                description.push_str(&format!(" ({} mutual connections)", rel.mutual_connections.len()));
            }
            description
        } else if rel.relationship_distance.is_some() {
            format!("Indirect connection through {} mutual connections", rel.mutual_connections.len())
        } else {
            "No known relationship".to_string()
        }
    }
}

#[async_trait]
impl RelationshipBooster for RelationshipAnalyzer {
    async fn confidence_boost(&self, requester_cm_id: i64, candidate_cm_id: i64, session_cm_id: i64) -> f64 {
        let relationship = self.analyze_candidate(requester_cm_id, candidate_cm_id, session_cm_id).await;
        let mut context = RelationshipContext { requester_cm_id, candidate_relationships: HashMap::new() };
        context.candidate_relationships.insert(candidate_cm_id, relationship);
        self.get_confidence_boost(&context, candidate_cm_id)
    }

    async fn pick_best(&self, requester_cm_id: i64, candidates: &[Person], session_cm_id: i64) -> Option<RelationshipPick> {
        if candidates.is_empty() {
            return None;
        }

        let context = self.analyze_relationships(requester_cm_id, candidates, session_cm_id).await;
        let mut scored: Vec<(&Person, f64)> =
            candidates.iter().map(|c| (c, self.get_confidence_boost(&context, c.cm_id))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let (best, best_boost) = scored[0];
        let runner_up_boost = scored.get(1).map(|(_, boost)| *boost).unwrap_or(0.0);

        if best_boost <= 0.0 || best_boost - runner_up_boost < Self::PICK_MARGIN {
            return None;
        }

        let description = self.describe_relationship(&context, best.cm_id);
        Some(RelationshipPick { person: best.clone(), boost: best_boost, description })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use bunk_domain::{AttendeeInfo, Person, Session, SessionType};
    use bunk_repository::{InMemoryAttendeeRepository, InMemoryPersonRepository, InMemorySessionRepository};

    use super::*;

    fn person(cm_id: i64, last: &str) -> Person {
        Person {
            cm_id,
            first_name: "Jamie".to_string(),
            last_name: last.to_string(),
            preferred_name: None,
            grade: None,
            birth_date: None,
            school: None,
            city: None,
            state: None,
            session_cm_id: Some(1),
            parent_names: Vec::new(),
        }
    }

    fn attendee(person_cm_id: i64, family_id: Option<&str>) -> AttendeeInfo {
        AttendeeInfo {
            person_cm_id,
            session_cm_id: 1,
            school: None,
            grade: None,
            city: None,
            state: None,
            family_id: family_id.map(str::to_string),
            current_bunk_id: None,
        }
    }

    async fn graph_with_two_siblings_and_a_stranger() -> StdArc<SocialGraph> {
        let people = vec![person(1, "Reyes"), person(2, "Reyes"), person(3, "Okafor")];
        let attendees = vec![
            (2026, attendee(1, Some("fam-reyes"))),
            (2026, attendee(2, Some("fam-reyes"))),
            (2026, attendee(3, None)),
        ];
        let sessions = vec![Session {
            session_cm_id: 1,
            year: 2026,
            name: "Session A".to_string(),
            session_type: SessionType::Main,
            parent_session_cm_id: None,
        }];

        let graph = StdArc::new(SocialGraph::new(
            StdArc::new(InMemoryPersonRepository::new(people)),
            StdArc::new(InMemoryAttendeeRepository::new(attendees, Vec::new())),
            StdArc::new(InMemorySessionRepository::new(sessions)),
            2026,
            vec![1],
        ));
        graph.initialize().await.unwrap();
        graph
    }

    #[tokio::test]
    async fn sibling_gets_the_strongest_boost() {
        let graph = graph_with_two_siblings_and_a_stranger().await;
        let analyzer = RelationshipAnalyzer::new(graph);

        let boost = analyzer.confidence_boost(1, 2, 1).await;
        assert_eq!(boost, RelationshipAnalyzer::SIBLING_BOOST);
    }

    #[tokio::test]
    async fn pick_best_requires_a_clear_margin() {
        let graph = graph_with_two_siblings_and_a_stranger().await;
        let analyzer = RelationshipAnalyzer::new(graph);

        let candidates = vec![person(2, "Reyes"), person(3, "Okafor")];
        let pick = analyzer.pick_best(1, &candidates, 1).await;
        let pick = pick.expect("sibling should win clearly over an unrelated stranger");
        assert_eq!(pick.person.cm_id, 2);
    }

    #[tokio::test]
    async fn pick_best_is_none_with_no_relationships() {
        let graph = graph_with_two_siblings_and_a_stranger().await;
        let analyzer = RelationshipAnalyzer::new(graph);

        let candidates = vec![person(3, "Okafor")];
        assert!(analyzer.pick_best(99, &candidates, 1).await.is_none());
    }
}
