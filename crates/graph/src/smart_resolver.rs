use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bunk_config::SmartResolutionConfig;
use bunk_domain::Person;

use crate::relationship_type::RelationshipType;
use crate::social_graph::SocialGraph;

/// Auto-resolves an ambiguous candidate list when one candidate's social
/// score clears the requester away from every runner-up by a wide enough
/// margin; otherwise hands back the full list ranked by score so a
/// downstream disambiguation step sees the most plausible candidates first.
pub struct SmartResolver {
    social_graph: Arc<SocialGraph>,
    config: SmartResolutionConfig,
}

impl SmartResolver {
    pub fn new(social_graph: Arc<SocialGraph>, config: SmartResolutionConfig) -> Self {
        SmartResolver { social_graph, config }
    }

    fn enabled(&self) -> bool {
        self.config.enabled.unwrap_or(true)
    }

    fn mutual_request_bonus(&self) -> f64 {
        self.config.mutual_request_bonus.unwrap_or(10.0)
    }

    fn common_friends_weight(&self) -> f64 {
        self.config.common_friends_weight.unwrap_or(1.0)
    }

    fn historical_bunking_weight(&self) -> f64 {
        self.config.historical_bunking_weight.unwrap_or(0.8)
    }

    fn connection_score_weight(&self) -> f64 {
        self.config.connection_score_weight.unwrap_or(0.7)
    }

    fn significant_connection_threshold(&self) -> f64 {
        self.config.significant_connection_threshold.unwrap_or(5.0)
    }

    fn min_connections_for_auto_resolve(&self) -> f64 {
        self.config.min_connections_for_auto_resolve.unwrap_or(3.0)
    }

    fn min_confidence_for_auto_resolve(&self) -> f64 {
        self.config.min_confidence_for_auto_resolve.unwrap_or(0.85)
    }

    /// `mutual_request_bonus` if a reciprocal request is already known,
    /// plus `common_friends_weight` per shared neighbor, plus
    /// `historical_bunking_weight` if the pair shares a bunkmate edge.
    pub async fn calculate_social_score(
        &self,
        requester_cm_id: i64,
        candidate_cm_id: i64,
        session_cm_id: i64,
        has_mutual_request: bool,
    ) -> f64 {
        let mut score = 0.0;
        if has_mutual_request {
            score += self.mutual_request_bonus();
        }

        if !self.social_graph.contains_node(session_cm_id, requester_cm_id).await
            || !self.social_graph.contains_node(session_cm_id, candidate_cm_id).await
        {
            return score;
        }

        let requester_neighbors = self.social_graph.neighbors_of(session_cm_id, requester_cm_id).await;
        let candidate_neighbors = self.social_graph.neighbors_of(session_cm_id, candidate_cm_id).await;
        let common = requester_neighbors.intersection(&candidate_neighbors).count();
        score += common as f64 * self.common_friends_weight();

        if let Some(edge) = self.social_graph.edge_between(session_cm_id, requester_cm_id, candidate_cm_id).await {
            if edge.relationship_types.contains(&RelationshipType::Bunkmate) {
                score += self.historical_bunking_weight();
            }
        }

        score
    }

    /// `0.6 + min(score/20, 1) · connection_score_weight · 0.4`.
    pub fn calculate_confidence_from_score(&self, score: f64) -> f64 {
        let normalized = (score / 20.0).min(1.0);
        0.6 + normalized * self.connection_score_weight() * 0.4
    }

    /// Returns `(auto_resolved, ranked_candidates)`. `ranked_candidates` is
    /// always the full input, sorted by social score descending, so a
    /// caller that can't auto-resolve still gets its top candidates in
    /// relevance order rather than arbitrary repository order.
    pub async fn smart_resolve_candidates(
        &self,
        requester_cm_id: i64,
        session_cm_id: i64,
        candidates: Vec<Person>,
        mutual_request_cm_ids: &HashSet<i64>,
    ) -> (Option<(i64, f64, String)>, Vec<Person>) {
        if !self.enabled() {
            return (None, candidates);
        }
        if candidates.is_empty() {
            return (None, Vec::new());
        }

        let mut scores: HashMap<i64, f64> = HashMap::new();
        for candidate in &candidates {
            let has_mutual = mutual_request_cm_ids.contains(&candidate.cm_id);
            let score = self
                .calculate_social_score(requester_cm_id, candidate.cm_id, session_cm_id, has_mutual)
                .await;
            scores.insert(candidate.cm_id, score);
        }

        let mut ranked = candidates;
        ranked.sort_by(|a, b| {
            let score_a = scores.get(&a.cm_id).copied().unwrap_or(0.0);
            let score_b = scores.get(&b.cm_id).copied().unwrap_or(0.0);
            score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
        });

        let best_score = scores.get(&ranked[0].cm_id).copied().unwrap_or(0.0);
        let second_best_score = ranked.get(1).and_then(|c| scores.get(&c.cm_id)).copied().unwrap_or(0.0);
        let score_diff = best_score - second_best_score;
        let confidence = self.calculate_confidence_from_score(best_score);

        if score_diff >= self.significant_connection_threshold()
            && best_score >= self.min_connections_for_auto_resolve()
            && confidence >= self.min_confidence_for_auto_resolve()
        {
            let best_cm_id = ranked[0].cm_id;
            tracing::info!(
                cm_id = best_cm_id,
                best_score,
                score_diff,
                confidence,
                "smart resolution auto-resolved candidate"
            );
            return (Some((best_cm_id, confidence, "social_graph_auto".to_string())), ranked);
        }

        tracing::debug!(best_score, score_diff, confidence, "smart resolution needs disambiguation");
        (None, ranked)
    }
}

#[cfg(test)]
mod tests {
    use bunk_domain::{AttendeeInfo, Person, Session, SessionType};
    use bunk_repository::{InMemoryAttendeeRepository, InMemoryPersonRepository, InMemorySessionRepository};

    use super::*;

    fn person(cm_id: i64) -> Person {
        Person {
            cm_id,
            first_name: "Sam".to_string(),
            last_name: "Rivera".to_string(),
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

    fn attendee(person_cm_id: i64, bunk_id: Option<&str>) -> AttendeeInfo {
        AttendeeInfo {
            person_cm_id,
            session_cm_id: 1,
            school: None,
            grade: None,
            city: None,
            state: None,
            family_id: None,
            current_bunk_id: bunk_id.map(str::to_string),
        }
    }

    async fn resolver_with_strongly_connected_pair() -> SmartResolver {
        let people = vec![person(1), person(2), person(3)];
        let attendees = vec![
            (2026, attendee(1, Some("Cedar"))),
            (2026, attendee(2, Some("Cedar"))),
            (2026, attendee(3, None)),
        ];
        let sessions = vec![Session {
            session_cm_id: 1,
            year: 2026,
            name: "Session A".to_string(),
            session_type: SessionType::Main,
            parent_session_cm_id: None,
        }];

        let graph = Arc::new(SocialGraph::new(
            Arc::new(InMemoryPersonRepository::new(people)),
            Arc::new(InMemoryAttendeeRepository::new(attendees, Vec::new())),
            Arc::new(InMemorySessionRepository::new(sessions)),
            2026,
            vec![1],
        ));
        graph.initialize().await.unwrap();

        SmartResolver::new(
            graph,
            SmartResolutionConfig {
                mutual_request_bonus: Some(10.0),
                significant_connection_threshold: Some(5.0),
                min_connections_for_auto_resolve: Some(3.0),
                min_confidence_for_auto_resolve: Some(0.85),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn mutual_request_auto_resolves_against_a_stranger() {
        let resolver = resolver_with_strongly_connected_pair().await;
        let mut mutual = HashSet::new();
        mutual.insert(2);

        let (auto, ranked) = resolver
            .smart_resolve_candidates(1, 1, vec![person(2), person(3)], &mutual)
            .await;

        let (cm_id, confidence, method) = auto.expect("mutual request plus bunkmate tie should auto-resolve");
        assert_eq!(cm_id, 2);
        assert_eq!(method, "social_graph_auto");
        assert!(confidence >= 0.85);
        assert_eq!(ranked[0].cm_id, 2);
    }

    #[tokio::test]
    async fn close_scores_do_not_auto_resolve() {
        let resolver = resolver_with_strongly_connected_pair().await;
        let (auto, ranked) = resolver.smart_resolve_candidates(1, 1, vec![person(2), person(3)], &HashSet::new()).await;
        assert!(auto.is_none());
        assert_eq!(ranked.len(), 2);
    }
}
