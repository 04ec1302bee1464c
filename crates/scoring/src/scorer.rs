use std::sync::Arc;

use bunk_config::ConfidenceScoringConfig;
use bunk_domain::{ConfidenceSignals, MatchCertainty, Person, ParsedRequest, RequestSource, RequestType, ResolutionResult};
use bunk_repository::{AttendeeRepository, PersonRepository};

use crate::social_graph_signals::SocialGraphSignals;

/// Turns a parsed request and its (optional) resolution outcome into a
/// single confidence scalar, weighing name-match certainty, enrollment
/// context, and social-graph signals differently per request type.
pub struct ConfidenceScorer {
    config: ConfidenceScoringConfig,
    attendee_repo: Option<Arc<dyn AttendeeRepository>>,
    social_graph_signals: Option<Arc<dyn SocialGraphSignals>>,
    person_repo: Option<Arc<dyn PersonRepository>>,
}

impl ConfidenceScorer {
    pub fn new(
        config: ConfidenceScoringConfig,
        attendee_repo: Option<Arc<dyn AttendeeRepository>>,
        social_graph_signals: Option<Arc<dyn SocialGraphSignals>>,
        person_repo: Option<Arc<dyn PersonRepository>>,
    ) -> Self {
        ConfidenceScorer { config, attendee_repo, social_graph_signals, person_repo }
    }

    /// Phase 1 scoring: no resolution outcome is known yet, so only the
    /// parse-time signals are available.
    pub fn score_parsed_request(&self, parsed_request: &ParsedRequest, resolution_result: Option<&ResolutionResult>) -> f64 {
        let signals = self.build_signals_from_parsed_request(parsed_request, resolution_result);
        self.calculate_score(&signals, parsed_request.request_type)
    }

    /// Phase 2 scoring: full signals including enrollment validation and
    /// social-graph context, plus the AI-provided-id boost.
    pub async fn score_resolution(
        &self,
        parsed_request: &ParsedRequest,
        resolution_result: &ResolutionResult,
        requester_cm_id: i64,
        session_cm_id: i64,
        year: i32,
    ) -> f64 {
        let signals = self
            .build_signals_from_resolution(parsed_request, resolution_result, requester_cm_id, session_cm_id, year)
            .await;
        let mut score = self.calculate_score(&signals, parsed_request.request_type);

        if Self::has_ai_provided_id(parsed_request, resolution_result) {
            let ai_boost = self.config.ai_boost.unwrap_or(0.15);
            score = (score + ai_boost).min(1.0);
            tracing::debug!(ai_boost, score, "applied AI confidence boost");
        }

        score.clamp(0.0, 1.0)
    }

    /// Signals for a Phase 3 disambiguation pass over an already-ambiguous
    /// candidate list, without a settled resolution to draw on.
    pub fn create_signals_for_disambiguation(
        &self,
        parsed_request: &ParsedRequest,
        candidates: &[Person],
        _requester_cm_id: i64,
    ) -> ConfidenceSignals {
        let mut signals = ConfidenceSignals::new();
        signals.ai_parse_confidence = parsed_request.confidence;
        signals.has_specific_names = parsed_request.target_name().is_some();
        signals.source_type = Self::map_source_type(parsed_request.source);
        signals.match_certainty = MatchCertainty::Ambiguous;
        signals.requires_clarification = true;
        signals.ambiguity_reason = Some(format!("{} candidates found", candidates.len()));
        signals
    }

    fn has_ai_provided_id(parsed_request: &ParsedRequest, resolution_result: &ResolutionResult) -> bool {
        if !resolution_result.is_resolved() {
            return false;
        }
        parsed_request.metadata.ai_provided_person_id || resolution_result.metadata.ai_provided_person_id
    }

    fn build_signals_from_parsed_request(
        &self,
        parsed_request: &ParsedRequest,
        resolution_result: Option<&ResolutionResult>,
    ) -> ConfidenceSignals {
        let mut signals = ConfidenceSignals::new();
        signals.ai_parse_confidence = parsed_request.confidence;
        signals.request_clarity = parsed_request.confidence;
        signals.source_type = Self::map_source_type(parsed_request.source);
        signals.has_specific_names = if parsed_request.request_type == RequestType::AgePreference {
            false
        } else {
            parsed_request.target_name().is_some()
        };

        if let Some(result) = resolution_result {
            if result.is_resolved() {
                signals.match_certainty =
                    if result.confidence > 0.9 { MatchCertainty::Exact } else { MatchCertainty::Partial };
                signals.name_match_exact = result.method == "exact_match";
                signals.name_match_unique = matches!(result.method.as_str(), "exact_match" | "unique_fuzzy");
                signals.name_disambiguation_score = result.confidence;
            } else if result.is_ambiguous() {
                signals.match_certainty = MatchCertainty::Ambiguous;
                signals.requires_clarification = true;
                signals.ambiguity_reason = Some(format!("{} candidates", result.candidates.len()));
            } else {
                signals.match_certainty = MatchCertainty::None;
            }
        }

        signals
    }

    async fn build_signals_from_resolution(
        &self,
        parsed_request: &ParsedRequest,
        resolution_result: &ResolutionResult,
        requester_cm_id: i64,
        session_cm_id: i64,
        year: i32,
    ) -> ConfidenceSignals {
        let mut signals = self.build_signals_from_parsed_request(parsed_request, Some(resolution_result));

        let Some(target) = resolution_result.person.as_ref().filter(|_| resolution_result.is_resolved()) else {
            return signals;
        };
        let target_cm_id = target.cm_id;

        if let Some(attendee_repo) = &self.attendee_repo {
            match attendee_repo.get_by_person_and_year(target_cm_id, year).await {
                Ok(Some(_)) => signals.found_in_current_year = true,
                Ok(None) => match attendee_repo.get_by_person_and_year(target_cm_id, year - 1).await {
                    Ok(Some(_)) => signals.found_in_previous_year_only = true,
                    Ok(None) => {}
                    Err(err) => tracing::debug!(%err, target_cm_id, year = year - 1, "prior-year attendee lookup failed"),
                },
                Err(err) => tracing::debug!(%err, target_cm_id, year, "attendee lookup failed while scoring"),
            }
        }

        if let Some(social) = &self.social_graph_signals {
            let social_data = social.get_signals(requester_cm_id, target_cm_id, session_cm_id).await;
            signals.apply_social(&social_data);
        }

        if let Some(person_repo) = &self.person_repo {
            if let Ok(Some(requester)) = person_repo.find_by_cm_id(requester_cm_id).await {
                if let (Some(requester_grade), Some(target_grade)) = (requester.grade, target.grade) {
                    signals.grade_proximity = (requester_grade - target_grade).abs();
                }
                if let (Some(requester_birth), Some(target_birth)) = (requester.birth_date, target.birth_date) {
                    let days = (requester_birth - target_birth).num_days().abs();
                    signals.age_proximity = days as f64 / 365.25;
                }
            }
        }

        signals
    }

    fn calculate_score(&self, signals: &ConfidenceSignals, request_type: RequestType) -> f64 {
        match request_type {
            RequestType::BunkWith => self.score_bunk_with(signals),
            RequestType::NotBunkWith => self.score_not_bunk_with(signals),
            RequestType::AgePreference => self.score_age_preference(signals),
        }
    }

    fn score_bunk_with(&self, signals: &ConfidenceSignals) -> f64 {
        let weights = &self.config.bunk_with.weights;
        let name_weight = weights.name_match.unwrap_or(0.70);
        let ai_weight = weights.ai_parsing.unwrap_or(0.15);
        let context_weight = weights.context.unwrap_or(0.10);
        let reciprocal_weight = weights.reciprocal_bonus.unwrap_or(0.05);

        let name_score = match signals.match_certainty {
            MatchCertainty::Exact => 1.0,
            MatchCertainty::Partial => 0.7,
            MatchCertainty::Ambiguous => 0.4,
            MatchCertainty::None => 0.0,
        };
        let ai_score = signals.ai_parse_confidence;

        let context_scores = &self.config.bunk_with.context_scores;
        let base_context = context_scores.base.unwrap_or(0.5);
        let current_year_score = context_scores.current_year.unwrap_or(0.8);
        let previous_year_only_score = context_scores.previous_year_only.unwrap_or(0.4);
        let social_signal_bonus = context_scores.social_signal_bonus.unwrap_or(0.1);
        let max_distance_for_bonus = self.config.bunk_with.social.max_distance_for_bonus.unwrap_or(2.0);

        let mut context_score = base_context;
        if signals.found_in_current_year {
            context_score = current_year_score;
        } else if signals.found_in_previous_year_only {
            context_score = previous_year_only_score;
        }
        if signals.in_ego_network {
            context_score = (context_score + social_signal_bonus).min(1.0);
        }
        if (signals.social_distance as f64) <= max_distance_for_bonus {
            context_score = (context_score + social_signal_bonus).min(1.0);
        }

        // Open question (a): no batch-level reciprocal detector is wired in
        // yet, so this term is always zero, same as upstream.
        let reciprocal_score = 0.0;

        let score = name_weight * name_score
            + ai_weight * ai_score
            + context_weight * context_score
            + reciprocal_weight * reciprocal_score;
        score.clamp(0.0, 1.0)
    }

    fn score_not_bunk_with(&self, signals: &ConfidenceSignals) -> f64 {
        let weights = &self.config.not_bunk_with.weights;
        let name_weight = weights.name_match.unwrap_or(0.75);
        let ai_weight = weights.ai_parsing.unwrap_or(0.20);
        let context_weight = weights.context.unwrap_or(0.05);

        let name_score = match signals.match_certainty {
            MatchCertainty::Exact => 1.0,
            MatchCertainty::Partial => 0.6,
            MatchCertainty::Ambiguous => 0.3,
            MatchCertainty::None => 0.0,
        };
        let ai_score = signals.ai_parse_confidence;

        let context_scores = &self.config.not_bunk_with.context_scores;
        let current_year_score = context_scores.current_year.unwrap_or(0.7);
        let previous_year_score = context_scores.previous_year_only.unwrap_or(0.3);
        let context_score = if signals.found_in_current_year { current_year_score } else { previous_year_score };

        let score = name_weight * name_score + ai_weight * ai_score + context_weight * context_score;
        score.clamp(0.0, 1.0)
    }

    /// Age preferences carry no target name to resolve, so the AI parser's
    /// own confidence is the whole signal.
    fn score_age_preference(&self, signals: &ConfidenceSignals) -> f64 {
        signals.ai_parse_confidence
    }

    fn map_source_type(source: RequestSource) -> String {
        match source {
            RequestSource::Family => "parent",
            RequestSource::Staff => "counselor",
            RequestSource::Notes => "staff",
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use bunk_domain::{AgePreference, AiHint, RequestMetadata, ResolutionMetadata, ResolutionTarget};

    use super::*;

    fn person(cm_id: i64) -> Person {
        Person {
            cm_id,
            first_name: "Robin".to_string(),
            last_name: "Park".to_string(),
            preferred_name: None,
            grade: Some(5),
            birth_date: None,
            school: None,
            city: None,
            state: None,
            session_cm_id: Some(1),
            parent_names: Vec::new(),
        }
    }

    fn bunk_with_request(confidence: f64) -> ParsedRequest {
        ParsedRequest {
            raw_text: "bunk with Robin".to_string(),
            request_type: RequestType::BunkWith,
            target: Some(ResolutionTarget::Named("Robin Park".to_string())),
            age_preference: None,
            source: RequestSource::Family,
            source_field: "notes".to_string(),
            confidence,
            ai_hint: AiHint::None,
            metadata: RequestMetadata::default(),
        }
    }

    #[test]
    fn age_preference_scores_directly_from_ai_confidence() {
        let scorer = ConfidenceScorer::new(ConfidenceScoringConfig::default(), None, None, None);
        let request = ParsedRequest {
            request_type: RequestType::AgePreference,
            age_preference: Some(AgePreference::Older),
            target: None,
            confidence: 0.73,
            ..bunk_with_request(0.73)
        };
        assert_eq!(scorer.score_parsed_request(&request, None), 0.73);
    }

    #[test]
    fn exact_match_with_full_confidence_scores_highly() {
        let scorer = ConfidenceScorer::new(ConfidenceScoringConfig::default(), None, None, None);
        let request = bunk_with_request(1.0);
        let mut resolution = ResolutionResult::unresolved("exact_match");
        resolution.person = Some(person(2));
        resolution.confidence = 0.95;
        resolution.method = "exact_match".to_string();

        let score = scorer.score_parsed_request(&request, Some(&resolution));
        assert!(score > 0.7, "expected a high score for an exact match, got {score}");
    }

    #[tokio::test]
    async fn ai_provided_id_boosts_the_final_score() {
        let scorer = ConfidenceScorer::new(ConfidenceScoringConfig::default(), None, None, None);
        let mut request = bunk_with_request(0.5);
        request.metadata.ai_provided_person_id = true;

        let mut resolution = ResolutionResult::unresolved("ai_provided_id");
        resolution.person = Some(person(3));
        resolution.confidence = 0.6;
        resolution.metadata = ResolutionMetadata { ai_provided_person_id: true, ..Default::default() };

        let without_boost = scorer.score_parsed_request(&request, Some(&resolution));
        let with_boost = scorer.score_resolution(&request, &resolution, 1, 1, 2026).await;
        assert!(with_boost >= without_boost);
    }

    #[test]
    fn disambiguation_signals_mark_ambiguity() {
        let scorer = ConfidenceScorer::new(ConfidenceScoringConfig::default(), None, None, None);
        let request = bunk_with_request(0.6);
        let signals = scorer.create_signals_for_disambiguation(&request, &[person(2), person(3)], 1);
        assert_eq!(signals.match_certainty, MatchCertainty::Ambiguous);
        assert!(signals.requires_clarification);
        assert_eq!(signals.ambiguity_reason.as_deref(), Some("2 candidates found"));
    }
}
