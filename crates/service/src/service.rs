use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use bunk_domain::{
    AiHint, ParseResult, ParsedRequest, Person, RequestSource, RequestType, ResolutionMetadata, ResolutionResult,
};
use bunk_graph::{SmartResolver, SocialGraph};
use bunk_names::{names_match_via_nicknames, parse_name};
use bunk_pipeline::ResolutionPipeline;
use bunk_repository::{AttendeeRepository, PersonRepository};
use bunk_scoring::ConfidenceScorer;
use tracing::{debug, warn};

use crate::case::{build_cases, ResolutionCase};
use crate::stats::ResolutionStats;

const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// A request resolved before a shortcut, tagged with the stats counter it
/// should feed, so the batch loop doesn't have to re-derive that from the
/// result's `method` string.
struct ShortcutOutcome {
    result: ResolutionResult,
    counter: ShortcutCounter,
}

#[derive(Clone, Copy)]
enum ShortcutCounter {
    StaffFiltered,
    PriorBunkmate,
    AiValidated,
    AiHallucination,
    AiCandidate,
}

/// Orchestrates Phase 2 name resolution over a batch of parsed requests:
/// staff filtering, AI-hint shortcuts, the fuzzy/phonetic pipeline, confidence
/// scoring, and social-graph enrichment, in that order.
pub struct Phase2ResolutionService {
    pipeline: Arc<ResolutionPipeline>,
    social_graph: Option<Arc<SocialGraph>>,
    smart_resolver: Option<SmartResolver>,
    confidence_scorer: Option<Arc<ConfidenceScorer>>,
    staff_name_filter: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
    attendee_repo: Arc<dyn AttendeeRepository>,
    person_repo: Arc<dyn PersonRepository>,
    stats: Mutex<ResolutionStats>,
}

impl Phase2ResolutionService {
    pub fn new(
        pipeline: Arc<ResolutionPipeline>,
        attendee_repo: Arc<dyn AttendeeRepository>,
        person_repo: Arc<dyn PersonRepository>,
    ) -> Self {
        Phase2ResolutionService {
            pipeline,
            social_graph: None,
            smart_resolver: None,
            confidence_scorer: None,
            staff_name_filter: None,
            attendee_repo,
            person_repo,
            stats: Mutex::new(ResolutionStats::default()),
        }
    }

    pub fn with_social_graph(mut self, social_graph: Arc<SocialGraph>, smart_resolver: SmartResolver) -> Self {
        self.social_graph = Some(social_graph);
        self.smart_resolver = Some(smart_resolver);
        self
    }

    pub fn with_confidence_scorer(mut self, scorer: Arc<ConfidenceScorer>) -> Self {
        self.confidence_scorer = Some(scorer);
        self
    }

    pub fn with_staff_name_filter(mut self, filter: Arc<dyn Fn(&str) -> bool + Send + Sync>) -> Self {
        self.staff_name_filter = Some(filter);
        self
    }

    fn incr(&self, f: impl FnOnce(&mut ResolutionStats)) {
        let mut stats = self.stats.lock().expect("resolution stats mutex poisoned");
        f(&mut stats);
    }

    pub fn get_stats(&self) -> ResolutionStats {
        self.stats.lock().expect("resolution stats mutex poisoned").clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock().expect("resolution stats mutex poisoned") = ResolutionStats::default();
    }

    /// Resolves every request across `parse_results`, returning one
    /// `Vec<ResolutionResult>` per input `ParseResult`, always the same
    /// length as that result's `parsed_requests`.
    pub async fn batch_resolve(&self, parse_results: &[ParseResult], year: i32) -> Vec<Vec<ResolutionResult>> {
        let cases = build_cases(parse_results);

        let mut grid: Vec<Vec<Option<ResolutionResult>>> =
            parse_results.iter().map(|r| vec![None; r.parsed_requests.len()]).collect();

        let mut pipeline_batch: Vec<(String, i64, Option<i64>, Option<i32>)> = Vec::new();
        let mut pipeline_slots: Vec<(usize, usize)> = Vec::new();

        for case in &cases {
            self.resolve_case_shortcuts(case, parse_results, year, &mut grid, &mut pipeline_batch, &mut pipeline_slots)
                .await;
        }

        if !pipeline_batch.is_empty() {
            match self.pipeline.batch_resolve(&pipeline_batch).await {
                Ok(results) => {
                    for ((parse_idx, req_idx), result) in pipeline_slots.into_iter().zip(results) {
                        grid[parse_idx][req_idx] = Some(result);
                    }
                }
                Err(err) => {
                    warn!(%err, "pipeline batch_resolve failed, leaving slots unresolved");
                }
            }
        }

        for case in &cases {
            self.finalize_case(case, parse_results, year, &mut grid).await;
        }

        self.build_results(parse_results, grid)
    }

    /// Runs the staff-filter / last-year-bunkmate / AI-hint shortcuts for one
    /// case, filling resolved slots into `grid` directly and routing anything
    /// left over into `pipeline_batch` for the shared fuzzy/phonetic pass.
    async fn resolve_case_shortcuts(
        &self,
        case: &ResolutionCase,
        parse_results: &[ParseResult],
        year: i32,
        grid: &mut [Vec<Option<ResolutionResult>>],
        pipeline_batch: &mut Vec<(String, i64, Option<i64>, Option<i32>)>,
        pipeline_slots: &mut Vec<(usize, usize)>,
    ) {
        let parse_result = &parse_results[case.parse_idx];
        let Some(context) = &parse_result.parse_request else { return };
        let requester_cm_id = context.requester_cm_id;
        let session_cm_id = context.session_cm_id;

        for &req_idx in &case.requests_needing_resolution {
            let request = &parse_result.parsed_requests[req_idx];
            let Some(target_name) = request.target_name() else { continue };

            if let Some(filter) = &self.staff_name_filter {
                if request.source == RequestSource::Staff && filter(target_name) {
                    grid[case.parse_idx][req_idx] = Some(staff_filtered_result(target_name));
                    self.incr(|s| s.staff_filtered += 1);
                    continue;
                }
            }

            if let Some(outcome) = self.try_shortcut(request, target_name, requester_cm_id, session_cm_id, year).await {
                apply_shortcut_counter(self, outcome.counter);
                grid[case.parse_idx][req_idx] = Some(outcome.result);
                continue;
            }

            pipeline_batch.push((target_name.to_string(), requester_cm_id, session_cm_id, Some(year)));
            pipeline_slots.push((case.parse_idx, req_idx));
        }
    }

    /// Tries, in order, the last-year-bunkmate shortcut and the two AI-hint
    /// shortcuts. Returns `None` when none apply, leaving the request for the
    /// shared pipeline pass.
    async fn try_shortcut(
        &self,
        request: &ParsedRequest,
        target_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: i32,
    ) -> Option<ShortcutOutcome> {
        let Some(session_cm_id) = session_cm_id else {
            return self.try_ai_hint_shortcut(request, target_name, requester_cm_id, year).await;
        };

        if request.metadata.has_last_year_context(&request.raw_text) {
            if let Some(result) =
                self.try_prior_bunkmate_resolution(target_name, requester_cm_id, session_cm_id, year).await
            {
                return Some(ShortcutOutcome { result, counter: ShortcutCounter::PriorBunkmate });
            }
        }

        self.try_ai_hint_shortcut(request, target_name, requester_cm_id, year).await
    }

    async fn try_ai_hint_shortcut(
        &self,
        request: &ParsedRequest,
        target_name: &str,
        requester_cm_id: i64,
        year: i32,
    ) -> Option<ShortcutOutcome> {
        match &request.ai_hint {
            AiHint::SingleId(id) => self.try_ai_id_validation(*id, target_name).await,
            AiHint::CandidateList(ids) => self.try_ai_candidate_resolution(ids, target_name, requester_cm_id, year).await,
            _ => None,
        }
    }

    /// Confirms a bunkmate shared a bunk with the requester last year and
    /// whose name matches the request's target, full-name matches scoring
    /// higher than first-name-only ones.
    async fn try_prior_bunkmate_resolution(
        &self,
        target_name: &str,
        requester_cm_id: i64,
        session_cm_id: i64,
        year: i32,
    ) -> Option<ResolutionResult> {
        let prior = self
            .attendee_repo
            .find_prior_year_bunkmates(requester_cm_id, session_cm_id, year)
            .await
            .ok()??;
        if prior.cm_ids.is_empty() {
            return None;
        }

        let bunkmates = self.person_repo.bulk_find_by_cm_ids(&prior.cm_ids).await.ok()?;
        let parsed = parse_name(target_name);

        let mut best: Option<(Person, f64)> = None;
        for person in bunkmates.into_values() {
            let Some(confidence) = validate_name_match(&parsed, &person) else { continue };
            if best.as_ref().is_none_or(|(_, c)| confidence > *c) {
                best = Some((person, confidence));
            }
        }

        let (person, confidence) = best?;
        debug!(target_name, prior_bunk = %prior.prior_bunk, confidence, "resolved via prior-year bunkmate");
        Some(ResolutionResult {
            person: Some(person),
            confidence,
            method: "prior_bunkmate_match".to_string(),
            candidates: Vec::new(),
            metadata: ResolutionMetadata {
                found_in_last_years_bunk: true,
                last_year_bunk: Some(prior.prior_bunk),
                ..Default::default()
            },
        })
    }

    /// Validates an AI-provided single candidate id against the target name
    /// before trusting it outright, to catch hallucinated ids.
    async fn try_ai_id_validation(&self, candidate_id: i64, target_name: &str) -> Option<ShortcutOutcome> {
        let person = self.person_repo.find_by_cm_id(candidate_id).await.ok()??;
        let parsed = parse_name(target_name);

        let confidence = validate_name_match(&parsed, &person).unwrap_or(0.0);
        if confidence >= 0.9 {
            return Some(ShortcutOutcome {
                result: ResolutionResult {
                    person: Some(person),
                    confidence: 0.95,
                    method: "ai_id_validated".to_string(),
                    candidates: Vec::new(),
                    metadata: ResolutionMetadata { ai_provided_person_id: true, ..Default::default() },
                },
                counter: ShortcutCounter::AiValidated,
            });
        }

        if names_match_via_nicknames(&normalize_candidate_name(&person), target_name, None) {
            return Some(ShortcutOutcome {
                result: ResolutionResult {
                    person: Some(person),
                    confidence: 0.95,
                    method: "ai_id_validated_normalized".to_string(),
                    candidates: Vec::new(),
                    metadata: ResolutionMetadata { ai_provided_person_id: true, ..Default::default() },
                },
                counter: ShortcutCounter::AiValidated,
            });
        }

        if confidence > 0.0 {
            return Some(ShortcutOutcome {
                result: ResolutionResult {
                    person: Some(person),
                    confidence: 0.75,
                    method: "ai_id_partial_overlap".to_string(),
                    candidates: Vec::new(),
                    metadata: ResolutionMetadata {
                        ai_provided_person_id: true,
                        reason: Some("partial name overlap with AI-provided id".to_string()),
                        ..Default::default()
                    },
                },
                counter: ShortcutCounter::AiValidated,
            });
        }

        warn!(candidate_id, target_name, "AI-provided id does not match target name, treating as hallucination");
        Some(ShortcutOutcome {
            result: ResolutionResult {
                person: None,
                confidence: 0.0,
                method: "ai_hallucination".to_string(),
                candidates: Vec::new(),
                metadata: ResolutionMetadata {
                    reason: Some(format!("AI-provided id {candidate_id} did not match \"{target_name}\"")),
                    ..Default::default()
                },
            },
            counter: ShortcutCounter::AiHallucination,
        })
    }

    /// Scores each AI-suggested candidate by session match and grade/age
    /// proximity to the requester, accepting the best-scoring one above a
    /// fixed bar.
    async fn try_ai_candidate_resolution(
        &self,
        candidate_ids: &[i64],
        target_name: &str,
        requester_cm_id: i64,
        year: i32,
    ) -> Option<ShortcutOutcome> {
        if candidate_ids.is_empty() {
            return None;
        }
        let candidates = self.person_repo.bulk_find_by_cm_ids(candidate_ids).await.ok()?;
        if candidates.is_empty() {
            return None;
        }

        let requester_session = self.attendee_repo.get_session_for_person(requester_cm_id, year).await.ok()?;
        let requester = self.person_repo.find_by_cm_id(requester_cm_id).await.ok()?;
        let requester_grade = requester.as_ref().and_then(|p| p.grade);
        let requester_birth = requester.as_ref().and_then(|p| p.birth_date);

        let parsed = parse_name(target_name);
        let mut best: Option<(Person, f64)> = None;

        for person in candidates.into_values() {
            if validate_name_match(&parsed, &person).is_none() {
                continue;
            }

            let mut score = 0.5_f64;

            match (requester_session, person.session_cm_id) {
                (Some(req_sess), Some(person_sess)) if req_sess == person_sess => score += 0.3,
                (Some(_), Some(_)) => score -= 0.1,
                _ => {}
            }

            match (requester_grade, person.grade) {
                (Some(rg), Some(pg)) if rg == pg => score += 0.2,
                (Some(rg), Some(pg)) if (rg - pg).abs() == 1 => score += 0.1,
                (Some(_), Some(_)) => score -= 0.2,
                _ => match (requester_birth, person.birth_date) {
                    (Some(rb), Some(pb)) if (rb - pb).num_days().abs() <= 365 => score += 0.15,
                    (Some(_), Some(_)) => score -= 0.15,
                    _ => {}
                },
            }

            score = score.clamp(0.0, 1.0);
            if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                best = Some((person, score));
            }
        }

        let (person, best_score) = best?;
        if best_score <= 0.5 {
            return None;
        }

        Some(ShortcutOutcome {
            result: ResolutionResult {
                person: Some(person),
                confidence: best_score.min(0.75),
                method: "ai_candidate_resolved".to_string(),
                candidates: Vec::new(),
                metadata: ResolutionMetadata { ai_provided_person_id: true, ..Default::default() },
            },
            counter: ShortcutCounter::AiCandidate,
        })
    }

    /// After the pipeline pass fills in whatever shortcuts left unresolved,
    /// runs confidence scoring and social-graph enrichment over every
    /// resolved slot in this case.
    async fn finalize_case(
        &self,
        case: &ResolutionCase,
        parse_results: &[ParseResult],
        year: i32,
        grid: &mut [Vec<Option<ResolutionResult>>],
    ) {
        let parse_result = &parse_results[case.parse_idx];
        let Some(context) = &parse_result.parse_request else { return };
        let requester_cm_id = context.requester_cm_id;
        let Some(session_cm_id) = context.session_cm_id else { return };

        for &req_idx in &case.requests_needing_resolution {
            let Some(result) = grid[case.parse_idx][req_idx].take() else { continue };
            let request = &parse_result.parsed_requests[req_idx];

            let mut result = result;
            if let Some(scorer) = &self.confidence_scorer {
                result.confidence =
                    scorer.score_resolution(request, &result, requester_cm_id, session_cm_id, year).await;
            }

            if result.is_resolved() {
                if let Some(social_graph) = &self.social_graph {
                    result = social_graph.enhance_resolution(result, requester_cm_id, session_cm_id).await;
                    self.incr(|s| s.networkx_enhanced += 1);
                }

                if let Some(resolver) = &self.smart_resolver {
                    let mutual_request_cm_ids = HashSet::new();
                    let candidates = std::mem::take(&mut result.candidates);
                    let (picked, ranked) =
                        resolver.smart_resolve_candidates(requester_cm_id, session_cm_id, candidates, &mutual_request_cm_ids).await;
                    result.candidates = ranked;
                    if !result.candidates.is_empty() {
                        result.metadata.candidates_ranked_by_social_score = true;
                    }
                    if let Some((person_cm_id, score, reason)) = picked {
                        if let Ok(Some(person)) = self.person_repo.find_by_cm_id(person_cm_id).await {
                            result.person = Some(person);
                            result.confidence = result.confidence.max(score);
                            result.method = "smart_resolved".to_string();
                            result.metadata.smart_resolved = true;
                            result.metadata.reason = Some(reason);
                            self.incr(|s| s.smart_resolved += 1);
                        }
                    }
                }
            }

            grid[case.parse_idx][req_idx] = Some(result);
        }
    }

    /// Assembles the final per-`ParseResult` output, filling every slot a
    /// parse result declares: age preferences and placeholder targets get a
    /// direct result, resolved/unresolved named targets carry whatever the
    /// resolution loop produced, and anything still empty gets the
    /// `resolution_incomplete` sentinel. Invalid parse results short-circuit
    /// to one `invalid_parse` slot per declared request.
    fn build_results(&self, parse_results: &[ParseResult], mut grid: Vec<Vec<Option<ResolutionResult>>>) -> Vec<Vec<ResolutionResult>> {
        let mut output = Vec::with_capacity(parse_results.len());

        for (parse_idx, parse_result) in parse_results.iter().enumerate() {
            if !parse_result.is_valid {
                output.push(
                    parse_result
                        .parsed_requests
                        .iter()
                        .map(|_| invalid_parse_result())
                        .collect(),
                );
                continue;
            }

            let mut row = Vec::with_capacity(parse_result.parsed_requests.len());
            for (req_idx, request) in parse_result.parsed_requests.iter().enumerate() {
                let result = if request.request_type == RequestType::AgePreference {
                    self.incr(|s| s.age_preferences += 1);
                    age_preference_result(request, self.confidence_scorer.as_deref())
                } else if request.target_name().is_none() {
                    placeholder_result(request)
                } else if let Some(result) = grid[parse_idx][req_idx].take() {
                    result
                } else {
                    ResolutionResult {
                        method: "resolution_incomplete".to_string(),
                        confidence: 0.0,
                        ..Default::default()
                    }
                };

                self.update_stats(&result);
                row.push(result);
            }
            output.push(row);
        }

        output
    }

    fn update_stats(&self, result: &ResolutionResult) {
        self.incr(|s| {
            s.total_processed += 1;
            if result.is_resolved() {
                if result.confidence >= HIGH_CONFIDENCE_THRESHOLD {
                    s.high_confidence_resolved += 1;
                } else {
                    s.low_confidence_resolved += 1;
                }
            } else if result.is_ambiguous() {
                s.ambiguous += 1;
            } else if result.method != "age_preference" && result.method != "placeholder_expansion" {
                s.failed += 1;
            }
        });
    }
}

fn apply_shortcut_counter(service: &Phase2ResolutionService, counter: ShortcutCounter) {
    service.incr(|s| match counter {
        ShortcutCounter::StaffFiltered => s.staff_filtered += 1,
        ShortcutCounter::PriorBunkmate => s.prior_bunkmate_resolved += 1,
        ShortcutCounter::AiValidated => s.ai_validated_resolved += 1,
        ShortcutCounter::AiHallucination => s.ai_hallucinations_detected += 1,
        ShortcutCounter::AiCandidate => s.ai_candidate_resolved += 1,
    });
}

/// Cascades from a full-name nickname-aware match down to a first-name-only
/// match when the request gave no last name, mirroring the shortcuts' own
/// preference for the strongest available evidence.
fn validate_name_match(parsed_target: &bunk_names::ParsedName, candidate: &Person) -> Option<f64> {
    if parsed_target.is_complete {
        let last_matches = bunk_names::last_name_matches(&parsed_target.last, &candidate.last_name)
            || candidate.parent_last_names().iter().any(|p| bunk_names::last_name_matches(&parsed_target.last, p));
        let first_matches = names_match_via_nicknames(&parsed_target.first, &candidate.first_name, None)
            || candidate
                .preferred_name
                .as_deref()
                .is_some_and(|preferred| names_match_via_nicknames(&parsed_target.first, preferred, None));
        if first_matches && last_matches {
            return Some(0.95);
        }
        return None;
    }

    let first_matches = names_match_via_nicknames(&parsed_target.first, &candidate.first_name, None)
        || candidate
            .preferred_name
            .as_deref()
            .is_some_and(|preferred| names_match_via_nicknames(&parsed_target.first, preferred, None));
    first_matches.then_some(0.90)
}

fn normalize_candidate_name(person: &Person) -> String {
    format!("{} {}", person.first_name, person.last_name)
}

fn staff_filtered_result(target_name: &str) -> ResolutionResult {
    ResolutionResult {
        method: "staff_filtered".to_string(),
        confidence: 0.0,
        metadata: ResolutionMetadata {
            reason: Some(format!("\"{target_name}\" matched the staff-name filter")),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn invalid_parse_result() -> ResolutionResult {
    ResolutionResult {
        method: "invalid_parse".to_string(),
        confidence: 0.0,
        ..Default::default()
    }
}

fn placeholder_result(request: &ParsedRequest) -> ResolutionResult {
    let reason = if request.is_last_year_bunkmates() {
        "expanded from last-year-bunkmates placeholder upstream"
    } else if request.is_sibling_placeholder() {
        "expanded from sibling placeholder upstream"
    } else {
        "no target name to resolve"
    };
    ResolutionResult {
        method: "placeholder_expansion".to_string(),
        confidence: 0.0,
        metadata: ResolutionMetadata { reason: Some(reason.to_string()), ..Default::default() },
        ..Default::default()
    }
}

fn age_preference_result(request: &ParsedRequest, scorer: Option<&ConfidenceScorer>) -> ResolutionResult {
    let confidence = match scorer {
        Some(scorer) => scorer.score_parsed_request(request, None),
        None => request.confidence,
    };
    ResolutionResult {
        method: "age_preference".to_string(),
        confidence,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use bunk_domain::{AgePreference, ParseRequestContext, RequestMetadata, ResolutionTarget};
    use bunk_repository::memory::BunkAssignment;
    use bunk_repository::{InMemoryAttendeeRepository, InMemoryPersonRepository};
    use bunk_strategies::ExactMatchStrategy;

    use super::*;

    fn person(cm_id: i64, first: &str, last: &str) -> Person {
        Person {
            cm_id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            preferred_name: None,
            grade: None,
            birth_date: None,
            school: None,
            city: None,
            state: None,
            session_cm_id: None,
            parent_names: Vec::new(),
        }
    }

    fn named_request(raw_text: &str, target: &str) -> ParsedRequest {
        ParsedRequest {
            raw_text: raw_text.to_string(),
            request_type: RequestType::BunkWith,
            target: Some(ResolutionTarget::Named(target.to_string())),
            age_preference: None,
            source: RequestSource::Family,
            source_field: "notes".to_string(),
            confidence: 0.8,
            ai_hint: AiHint::None,
            metadata: RequestMetadata::default(),
        }
    }

    fn age_preference_request() -> ParsedRequest {
        ParsedRequest {
            raw_text: "wants an older bunkmate".to_string(),
            request_type: RequestType::AgePreference,
            target: None,
            age_preference: Some(AgePreference::Older),
            source: RequestSource::Family,
            source_field: "notes".to_string(),
            confidence: 0.6,
            ai_hint: AiHint::None,
            metadata: RequestMetadata::default(),
        }
    }

    fn service(people: Vec<Person>) -> Phase2ResolutionService {
        let person_repo: Arc<dyn PersonRepository> = Arc::new(InMemoryPersonRepository::new(people));
        let attendee_repo: Arc<dyn AttendeeRepository> =
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new()));
        let pipeline = Arc::new(ResolutionPipeline::new(
            vec![Box::new(ExactMatchStrategy::new(person_repo.clone(), attendee_repo.clone()))],
            person_repo.clone(),
            attendee_repo.clone(),
        ));
        Phase2ResolutionService::new(pipeline, attendee_repo, person_repo)
    }

    #[tokio::test]
    async fn output_length_matches_input_for_every_parse_result() {
        let svc = service(vec![person(1, "Ella", "Fitzgerald")]);
        let parse_results = vec![
            ParseResult {
                parse_request: Some(ParseRequestContext {
                    requester_cm_id: 99,
                    requester_grade: None,
                    session_cm_id: Some(10),
                    year: Some(2026),
                }),
                parsed_requests: vec![named_request("bunk with Ella", "Ella Fitzgerald"), age_preference_request()],
                is_valid: true,
            },
            ParseResult { parse_request: None, parsed_requests: vec![named_request("bunk with Nobody", "Nobody Here")], is_valid: false },
        ];

        let results = svc.batch_resolve(&parse_results, 2026).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].len(), 2);
        assert_eq!(results[1].len(), 1);
        assert_eq!(results[1][0].method, "invalid_parse");
    }

    #[tokio::test]
    async fn named_request_resolves_via_pipeline_and_age_preference_bypasses_it() {
        let svc = service(vec![person(1, "Ella", "Fitzgerald")]);
        let parse_results = vec![ParseResult {
            parse_request: Some(ParseRequestContext {
                requester_cm_id: 99,
                requester_grade: None,
                session_cm_id: Some(10),
                year: Some(2026),
            }),
            parsed_requests: vec![named_request("bunk with Ella", "Ella Fitzgerald"), age_preference_request()],
            is_valid: true,
        }];

        let results = svc.batch_resolve(&parse_results, 2026).await;
        assert!(results[0][0].is_resolved());
        assert_eq!(results[0][1].method, "age_preference");
        assert_eq!(results[0][1].confidence, 0.6);

        let stats = svc.get_stats();
        assert_eq!(stats.age_preferences, 1);
        assert_eq!(stats.total_processed, 2);
    }

    #[tokio::test]
    async fn staff_filter_short_circuits_before_the_pipeline_runs() {
        let svc = service(vec![person(1, "Ella", "Fitzgerald")])
            .with_staff_name_filter(Arc::new(|name: &str| name.eq_ignore_ascii_case("Ella Fitzgerald")));

        let mut request = named_request("bunk with Ella", "Ella Fitzgerald");
        request.source = RequestSource::Staff;
        let parse_results = vec![ParseResult {
            parse_request: Some(ParseRequestContext {
                requester_cm_id: 99,
                requester_grade: None,
                session_cm_id: Some(10),
                year: Some(2026),
            }),
            parsed_requests: vec![request],
            is_valid: true,
        }];

        let results = svc.batch_resolve(&parse_results, 2026).await;
        assert_eq!(results[0][0].method, "staff_filtered");
        assert!(!results[0][0].is_resolved());
        assert_eq!(svc.get_stats().staff_filtered, 1);
    }

    #[tokio::test]
    async fn prior_bunkmate_shortcut_resolves_without_the_pipeline() {
        let person_repo: Arc<dyn PersonRepository> =
            Arc::new(InMemoryPersonRepository::new(vec![person(1, "Ella", "Fitzgerald"), person(2, "Sam", "Lee")]));
        let assignments = vec![
            BunkAssignment { person_cm_id: 99, year: 2025, bunk_id: "Cedar".to_string() },
            BunkAssignment { person_cm_id: 2, year: 2025, bunk_id: "Cedar".to_string() },
        ];
        let attendee_repo: Arc<dyn AttendeeRepository> =
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), assignments));
        let pipeline = Arc::new(ResolutionPipeline::new(
            vec![Box::new(ExactMatchStrategy::new(person_repo.clone(), attendee_repo.clone()))],
            person_repo.clone(),
            attendee_repo.clone(),
        ));
        let svc = Phase2ResolutionService::new(pipeline, attendee_repo, person_repo);

        let mut request = named_request("bunk with Sam from last year", "Sam Lee");
        request.metadata.keywords_found = vec!["from last year".to_string()];
        let parse_results = vec![ParseResult {
            parse_request: Some(ParseRequestContext {
                requester_cm_id: 99,
                requester_grade: None,
                session_cm_id: Some(10),
                year: Some(2026),
            }),
            parsed_requests: vec![request],
            is_valid: true,
        }];

        let results = svc.batch_resolve(&parse_results, 2026).await;
        assert_eq!(results[0][0].method, "prior_bunkmate_match");
        assert!(results[0][0].is_resolved());
        assert_eq!(svc.get_stats().prior_bunkmate_resolved, 1);
    }
}
