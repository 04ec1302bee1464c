use std::sync::Arc;

use async_trait::async_trait;
use bunk_config::StrategyConfidenceConfig;
use bunk_domain::{Person, ResolutionMetadata, ResolutionResult};
use bunk_names::nicknames::SPELLING_VARIATIONS;
use bunk_names::{find_nickname_variations, last_name_matches, parse_name, title_case};
use bunk_repository::{AttendeeRepository, PersonRepository, RepositoryError};

use crate::base::filter_self_references;
use crate::{ResolutionContext, ResolutionStrategy};

const DEFAULT_NICKNAME_BASE: f64 = 0.85;
const DEFAULT_NORMALIZED_BASE: f64 = 0.80;
const DEFAULT_CONFIDENCE: f64 = 0.75;
const DEFAULT_SESSION_MATCH: f64 = 0.85;
const DEFAULT_SAME_SESSION_BOOST: f64 = 0.0;
const DEFAULT_DIFFERENT_SESSION_PENALTY: f64 = -0.10;
const DEFAULT_NOT_ENROLLED_PENALTY: f64 = -0.05;
const DEFAULT_PARENT_SURNAME_BASE: f64 = 0.70;

/// A candidate a social graph picked as the clear best relationship match,
/// together with the boost that won it and a human-readable reason.
#[derive(Debug, Clone)]
pub struct RelationshipPick {
    pub person: Person,
    pub boost: f64,
    pub description: String,
}

/// Seam the social-graph crate implements so this strategy can fold
/// relationship signals into confidence without depending on the graph
/// crate's concrete `SocialGraph`/`RelationshipAnalyzer` types.
#[async_trait]
pub trait RelationshipBooster: Send + Sync {
    /// Confidence boost, typically in `[0, 0.3]`, for one candidate relative
    /// to the requester within one session.
    async fn confidence_boost(&self, requester_cm_id: i64, candidate_cm_id: i64, session_cm_id: i64) -> f64;

    /// The clear-winner candidate among several, only when its boost beats
    /// the runner-up by at least 0.1; `None` otherwise.
    async fn pick_best(
        &self,
        requester_cm_id: i64,
        candidates: &[Person],
        session_cm_id: i64,
    ) -> Option<RelationshipPick>;
}

/// Nickname, spelling-variation, normalized, and parent-surname matching, in
/// that order, each short-circuiting on a resolved or ambiguous result.
pub struct FuzzyMatchStrategy {
    person_repo: Arc<dyn PersonRepository>,
    attendee_repo: Arc<dyn AttendeeRepository>,
    relationship_booster: Option<Arc<dyn RelationshipBooster>>,
    config: StrategyConfidenceConfig,
}

impl FuzzyMatchStrategy {
    pub fn new(
        person_repo: Arc<dyn PersonRepository>,
        attendee_repo: Arc<dyn AttendeeRepository>,
        relationship_booster: Option<Arc<dyn RelationshipBooster>>,
        config: StrategyConfidenceConfig,
    ) -> Self {
        FuzzyMatchStrategy { person_repo, attendee_repo, relationship_booster, config }
    }

    async fn name_matches(
        &self,
        first: &str,
        last: &str,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<Vec<Person>, RepositoryError> {
        if let Some(candidates) = context.candidates {
            let first_t = title_case(first);
            Ok(candidates
                .iter()
                .filter(|c| title_case(&c.first_name) == first_t && last_name_matches(last, &c.last_name))
                .cloned()
                .collect())
        } else {
            self.person_repo
                .find_by_name(&title_case(first), &title_case(last), year)
                .await
        }
    }

    async fn person_session(
        &self,
        person_cm_id: i64,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<Option<i64>, RepositoryError> {
        if let Some(info) = context.attendee_info {
            return Ok(info.get(&person_cm_id).and_then(|a| a.session_cm_id));
        }
        let Some(year) = year else { return Ok(None) };
        self.attendee_repo.get_session_for_person(person_cm_id, year).await
    }

    fn apply_session_adjustment_simple(
        &self,
        base: f64,
        person_session: Option<i64>,
        requester_session: Option<i64>,
    ) -> f64 {
        match (person_session, requester_session) {
            (Some(p), Some(r)) if p == r => {
                base + self.config.same_session_boost.unwrap_or(DEFAULT_SAME_SESSION_BOOST)
            }
            (Some(_), Some(_)) => {
                base + self.config.different_session_penalty.unwrap_or(DEFAULT_DIFFERENT_SESSION_PENALTY)
            }
            _ => base + self.config.not_enrolled_penalty.unwrap_or(DEFAULT_NOT_ENROLLED_PENALTY),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn calculate_confidence(
        &self,
        person: &Person,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
        is_nickname: bool,
        is_spelling: bool,
        is_normalized: bool,
    ) -> Result<f64, RepositoryError> {
        let mut confidence = if is_nickname || is_spelling {
            self.config.nickname_base.unwrap_or(DEFAULT_NICKNAME_BASE)
        } else if is_normalized {
            self.config.normalized_base.unwrap_or(DEFAULT_NORMALIZED_BASE)
        } else {
            self.config.default_base.unwrap_or(DEFAULT_CONFIDENCE)
        };

        if year.is_some() && session_cm_id.is_some() {
            let person_session = self.person_session(person.cm_id, year, context).await?;
            confidence = self.apply_session_adjustment_simple(confidence, person_session, session_cm_id);
        } else {
            confidence += self.config.not_enrolled_penalty.unwrap_or(DEFAULT_NOT_ENROLLED_PENALTY);
        }

        // Skipped when `attendee_info` is pre-loaded (a batch pass), mirroring
        // the source's "skip for context path for performance" behavior.
        if let (Some(booster), Some(session_cm_id)) = (&self.relationship_booster, session_cm_id) {
            if context.attendee_info.is_none() {
                let boost = booster.confidence_boost(requester_cm_id, person.cm_id, session_cm_id).await;
                confidence = (confidence + boost).min(0.95);
            }
        }

        Ok(confidence)
    }

    async fn try_nickname_variations(
        &self,
        first_name: &str,
        last_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<ResolutionResult, RepositoryError> {
        for variant in find_nickname_variations(first_name, None) {
            let matches = self.name_matches(&variant, last_name, year, context).await?;
            let matches = filter_self_references(matches, requester_cm_id);
            if matches.is_empty() {
                continue;
            }
            if matches.len() == 1 {
                let person = matches.into_iter().next().unwrap();
                let confidence = self
                    .calculate_confidence(&person, requester_cm_id, session_cm_id, year, context, true, false, false)
                    .await?;
                let mut extra = serde_json::Map::new();
                extra.insert("variant".to_string(), serde_json::json!(variant));
                return Ok(ResolutionResult {
                    person: Some(person),
                    confidence,
                    method: self.name().to_string(),
                    metadata: ResolutionMetadata {
                        match_type: Some("nickname".to_string()),
                        extra,
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
            let mut extra = serde_json::Map::new();
            extra.insert("variant".to_string(), serde_json::json!(variant));
            let match_count = matches.len();
            return Ok(ResolutionResult {
                candidates: matches,
                confidence: 0.5,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    ambiguity_reason: Some("multiple_nickname_matches".to_string()),
                    match_count: Some(match_count),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }
        Ok(ResolutionResult::unresolved(self.name()))
    }

    async fn try_spelling_variations(
        &self,
        first_name: &str,
        last_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<ResolutionResult, RepositoryError> {
        let Some(variants) = SPELLING_VARIATIONS.get(first_name.to_lowercase().as_str()) else {
            return Ok(ResolutionResult::unresolved(self.name()));
        };

        for variant in variants.iter() {
            let matches = self.name_matches(variant, last_name, year, context).await?;
            let matches = filter_self_references(matches, requester_cm_id);
            if matches.is_empty() {
                continue;
            }
            if matches.len() == 1 {
                let person = matches.into_iter().next().unwrap();
                let confidence = self
                    .calculate_confidence(&person, requester_cm_id, session_cm_id, year, context, false, true, false)
                    .await?;
                let mut extra = serde_json::Map::new();
                extra.insert("variant".to_string(), serde_json::json!(variant));
                return Ok(ResolutionResult {
                    person: Some(person),
                    confidence,
                    method: self.name().to_string(),
                    metadata: ResolutionMetadata {
                        match_type: Some("spelling_variation".to_string()),
                        extra,
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
            let mut extra = serde_json::Map::new();
            extra.insert("variant".to_string(), serde_json::json!(variant));
            let match_count = matches.len();
            return Ok(ResolutionResult {
                candidates: matches,
                confidence: 0.5,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    ambiguity_reason: Some("multiple_spelling_matches".to_string()),
                    match_count: Some(match_count),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }
        Ok(ResolutionResult::unresolved(self.name()))
    }

    async fn try_normalized_search(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<ResolutionResult, RepositoryError> {
        let name_lower = name.to_lowercase();
        let mut match_type = "normalized".to_string();

        let mut matches: Vec<Person> = if let Some(candidates) = context.candidates {
            let mut out = Vec::new();
            for c in candidates {
                let full_lower = format!("{} {}", c.first_name, c.last_name).to_lowercase();
                if full_lower.contains(&name_lower) {
                    out.push(c.clone());
                } else if c
                    .preferred_name
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&name_lower))
                {
                    out.push(c.clone());
                    match_type = "preferred_name".to_string();
                }
            }
            out
        } else {
            let found = self.person_repo.find_by_normalized_name(name, year).await?;
            for m in &found {
                if let Some(pref) = m.preferred_name.as_deref() {
                    let pref_lower = pref.to_lowercase();
                    let first_search = name_lower.split_whitespace().next().unwrap_or("");
                    if !first_search.is_empty()
                        && pref_lower.contains(first_search)
                        && !m.first_name.to_lowercase().contains(first_search)
                    {
                        match_type = "preferred_name".to_string();
                        break;
                    }
                }
            }
            found
        };

        matches = filter_self_references(matches, requester_cm_id);

        if matches.is_empty() {
            let parts: Vec<&str> = name.trim().split_whitespace().collect();
            if parts.len() == 1 {
                for variant in find_nickname_variations(parts[0], None) {
                    let var_matches: Vec<Person> = if let Some(candidates) = context.candidates {
                        candidates
                            .iter()
                            .filter(|c| c.first_name.to_lowercase() == variant.to_lowercase())
                            .cloned()
                            .collect()
                    } else {
                        self.person_repo.find_by_first_name(&variant, year).await?
                    };
                    let var_matches = filter_self_references(var_matches, requester_cm_id);
                    if !var_matches.is_empty() {
                        matches = var_matches;
                        match_type = "first_name_nickname".to_string();
                        break;
                    }
                }
            }
        }

        if matches.is_empty() {
            return Ok(ResolutionResult::unresolved(self.name()));
        }

        if matches.len() == 1 {
            let person = matches.into_iter().next().unwrap();
            let confidence = self
                .calculate_confidence(&person, requester_cm_id, session_cm_id, year, context, false, false, true)
                .await?;
            return Ok(ResolutionResult {
                person: Some(person),
                confidence,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some(match_type),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if let Some(result) = self
            .disambiguate_with_session(&matches, session_cm_id, year, context)
            .await?
        {
            return Ok(result);
        }

        if let (Some(booster), Some(session_cm_id)) = (&self.relationship_booster, session_cm_id) {
            if let Some(pick) = booster.pick_best(requester_cm_id, &matches, session_cm_id).await {
                let mut extra = serde_json::Map::new();
                extra.insert("relationship_boost".to_string(), serde_json::json!(pick.boost));
                extra.insert("relationship_info".to_string(), serde_json::json!(pick.description));
                return Ok(ResolutionResult {
                    person: Some(pick.person),
                    confidence: 0.70 + pick.boost,
                    method: self.name().to_string(),
                    metadata: ResolutionMetadata {
                        match_type: Some("relationship_disambiguated".to_string()),
                        extra,
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
        }

        let match_count = matches.len();
        Ok(ResolutionResult {
            candidates: matches,
            confidence: 0.5,
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                ambiguity_reason: Some("multiple_normalized_matches".to_string()),
                match_count: Some(match_count),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn disambiguate_with_session(
        &self,
        candidates: &[Person],
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<Option<ResolutionResult>, RepositoryError> {
        let (Some(session_cm_id), Some(year)) = (session_cm_id, year) else {
            return Ok(None);
        };

        let mut same_session = Vec::new();
        for person in candidates {
            let person_session = self.person_session(person.cm_id, Some(year), context).await?;
            if person_session == Some(session_cm_id) {
                same_session.push(person.clone());
            }
        }

        if same_session.len() == 1 {
            let confidence = self.config.session_match.unwrap_or(DEFAULT_SESSION_MATCH);
            return Ok(Some(ResolutionResult {
                person: Some(same_session.into_iter().next().unwrap()),
                confidence,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("session_disambiguated".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }));
        }

        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    async fn try_parent_surname_match(
        &self,
        first_name: &str,
        last_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<ResolutionResult, RepositoryError> {
        let mut variants = vec![first_name.to_string()];
        variants.extend(find_nickname_variations(first_name, None));

        let mut all_matches: Vec<Person> = Vec::new();
        for variant in variants {
            let found: Vec<Person> = if let Some(candidates) = context.candidates {
                let variant_lower = variant.to_lowercase();
                let last_lower = last_name.to_lowercase();
                candidates
                    .iter()
                    .filter(|c| {
                        c.first_name.to_lowercase() == variant_lower
                            && c.parent_last_names().iter().any(|p| p.to_lowercase() == last_lower)
                    })
                    .cloned()
                    .collect()
            } else {
                self.person_repo
                    .find_by_first_and_parent_surname(&variant, last_name, year)
                    .await?
            };

            for person in found {
                if person.cm_id == requester_cm_id {
                    continue;
                }
                if !all_matches.iter().any(|p| p.cm_id == person.cm_id) {
                    all_matches.push(person);
                }
            }
        }

        if all_matches.is_empty() {
            return Ok(ResolutionResult::unresolved(self.name()));
        }

        if all_matches.len() == 1 {
            let person = all_matches.into_iter().next().unwrap();
            let base_conf = self.config.parent_surname_base.unwrap_or(DEFAULT_PARENT_SURNAME_BASE);
            let confidence = self
                .calculate_confidence(&person, requester_cm_id, session_cm_id, year, context, false, false, false)
                .await?
                .min(base_conf);
            let mut extra = serde_json::Map::new();
            extra.insert("inferred_surname".to_string(), serde_json::json!(last_name));
            return Ok(ResolutionResult {
                person: Some(person),
                confidence,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("parent_surname".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        let match_count = all_matches.len();
        Ok(ResolutionResult {
            candidates: all_matches,
            confidence: 0.45,
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                ambiguity_reason: Some("multiple_parent_surname_matches".to_string()),
                match_count: Some(match_count),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

#[async_trait]
impl ResolutionStrategy for FuzzyMatchStrategy {
    fn name(&self) -> &str {
        "fuzzy_match"
    }

    async fn resolve(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
    ) -> Result<ResolutionResult, RepositoryError> {
        self.resolve_with_context(name, requester_cm_id, session_cm_id, year, &ResolutionContext::default())
            .await
    }

    async fn resolve_with_context(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> Result<ResolutionResult, RepositoryError> {
        let parsed = parse_name(name);
        if parsed.first.is_empty() {
            return Ok(ResolutionResult {
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    reason: Some("empty_name".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if parsed.is_complete {
            let result = self
                .try_nickname_variations(&parsed.first, &parsed.last, requester_cm_id, session_cm_id, year, context)
                .await?;
            if result.is_resolved() || result.is_ambiguous() {
                return Ok(result);
            }

            let result = self
                .try_spelling_variations(&parsed.first, &parsed.last, requester_cm_id, session_cm_id, year, context)
                .await?;
            if result.is_resolved() || result.is_ambiguous() {
                return Ok(result);
            }
        }

        let result = self
            .try_normalized_search(name, requester_cm_id, session_cm_id, year, context)
            .await?;
        if result.is_resolved() || result.is_ambiguous() {
            return Ok(result);
        }

        if parsed.is_complete {
            let result = self
                .try_parent_surname_match(
                    &title_case(&parsed.first),
                    &title_case(&parsed.last),
                    requester_cm_id,
                    session_cm_id,
                    year,
                    context,
                )
                .await?;
            if result.is_resolved() || result.is_ambiguous() {
                return Ok(result);
            }
        }

        Ok(ResolutionResult {
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                reason: Some("no_fuzzy_match".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bunk_repository::{InMemoryAttendeeRepository, InMemoryPersonRepository};

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

    fn strategy(people: Vec<Person>) -> FuzzyMatchStrategy {
        FuzzyMatchStrategy::new(
            Arc::new(InMemoryPersonRepository::new(people)),
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new())),
            None,
            StrategyConfidenceConfig::default(),
        )
    }

    #[tokio::test]
    async fn resolves_via_nickname_group() {
        let strat = strategy(vec![person(1, "Michael", "Stern")]);
        let result = strat.resolve("Mike Stern", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.metadata.match_type.as_deref(), Some("nickname"));
        assert_eq!(result.confidence, 0.85 - 0.05);
    }

    #[tokio::test]
    async fn resolves_via_spelling_variation() {
        let strat = strategy(vec![person(1, "Sarah", "Cole")]);
        let result = strat.resolve("Sara Cole", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.metadata.match_type.as_deref(), Some("spelling_variation"));
    }

    #[tokio::test]
    async fn resolves_via_preferred_name() {
        let mut p = person(1, "Alexandra", "Chu");
        p.preferred_name = Some("Lexi".to_string());
        let strat = strategy(vec![p]);
        let result = strat.resolve("Lexi Chu", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
    }

    #[tokio::test]
    async fn no_match_reports_reason() {
        let strat = strategy(vec![]);
        let result = strat.resolve("Nobody Here", 99, None, None).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.metadata.reason.as_deref(), Some("no_fuzzy_match"));
    }
}
