//! Orders a chain of [`ResolutionStrategy`] implementations against one
//! target name, pre-loading batch context so resolving a whole roster of
//! requests doesn't degrade into one repository round trip per name.

mod cache;

pub use cache::{cache_key, ResolutionCache};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bunk_domain::ResolutionResult;
use bunk_repository::{AttendeeRepository, PersonRepository, RepositoryError};
use bunk_strategies::{AttendeeSnapshot, ResolutionContext, ResolutionStrategy};
use tracing::{debug, info, warn};

/// Confidence floor a resolved result must clear to be accepted outright,
/// independent of any configured `minimum_confidence`.
const ACCEPT_THRESHOLD: f64 = 0.8;

/// Narrows a candidate shortlist by how close it is to the requester —
/// e.g. grade or age proximity — before strategies run. The pipeline owns
/// at most one; `None` means no narrowing.
pub trait SpreadFilter: Send + Sync {
    fn filter(&self, requester_cm_id: i64, candidates: Vec<bunk_domain::Person>) -> Vec<bunk_domain::Person>;
}

/// Orders strategies, pre-loads batch context, caches accepted results, and
/// applies the minimum-confidence acceptance rule.
pub struct ResolutionPipeline {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
    person_repo: Arc<dyn PersonRepository>,
    attendee_repo: Arc<dyn AttendeeRepository>,
    cache: Option<ResolutionCache>,
    spread_filter: Option<Box<dyn SpreadFilter>>,
    minimum_confidence: f64,
}

impl ResolutionPipeline {
    pub fn new(
        strategies: Vec<Box<dyn ResolutionStrategy>>,
        person_repo: Arc<dyn PersonRepository>,
        attendee_repo: Arc<dyn AttendeeRepository>,
    ) -> Self {
        ResolutionPipeline {
            strategies,
            person_repo,
            attendee_repo,
            cache: None,
            spread_filter: None,
            minimum_confidence: 0.0,
        }
    }

    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = Some(ResolutionCache::new(capacity));
        self
    }

    pub fn with_spread_filter(mut self, filter: Box<dyn SpreadFilter>) -> Self {
        self.spread_filter = Some(filter);
        self
    }

    pub fn with_minimum_confidence(mut self, minimum_confidence: f64) -> Self {
        self.minimum_confidence = minimum_confidence;
        self
    }

    fn acceptance_floor(&self) -> f64 {
        ACCEPT_THRESHOLD.max(self.minimum_confidence)
    }

    /// Resolves one name, consulting the cache first and deriving the
    /// requester's session from the repository when not supplied.
    pub async fn resolve(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
    ) -> ResolutionResult {
        let key = cache_key(name, requester_cm_id, session_cm_id, year);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                debug!(%key, "resolution cache hit");
                return hit;
            }
        }

        let session_cm_id = match session_cm_id {
            Some(s) => Some(s),
            None => match year {
                Some(year) => self
                    .attendee_repo
                    .get_session_for_person(requester_cm_id, year)
                    .await
                    .unwrap_or(None),
                None => None,
            },
        };

        let result = self.run_strategies(name, requester_cm_id, session_cm_id, year).await;

        if let (Some(cache), true) = (&self.cache, result.is_resolved()) {
            cache.put(key, result.clone());
        }
        result
    }

    async fn run_strategies(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
    ) -> ResolutionResult {
        let mut best: Option<ResolutionResult> = None;
        let floor = self.acceptance_floor();

        for strategy in &self.strategies {
            let outcome = strategy.resolve(name, requester_cm_id, session_cm_id, year).await;
            let outcome = match outcome {
                Ok(r) => r,
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "strategy failed, skipping");
                    continue;
                }
            };

            if outcome.is_resolved() && outcome.confidence >= floor {
                debug!(strategy = strategy.name(), confidence = outcome.confidence, "accepted");
                return outcome;
            }

            best = Some(pick_better(best, outcome));
        }

        match best {
            Some(mut result) if result.is_resolved() && result.confidence < self.minimum_confidence => {
                result.person = None;
                result.confidence = 0.0;
                result.metadata.below_threshold = true;
                result
            }
            Some(result) => result,
            None => ResolutionResult::unresolved("pipeline"),
        }
    }

    /// Resolves a whole batch of `(name, requester_cm_id, session_cm_id,
    /// year)` requests, pre-loading the phonetic pool and attendee info
    /// exactly once regardless of batch size.
    pub async fn batch_resolve(
        &self,
        requests: &[(String, i64, Option<i64>, Option<i32>)],
    ) -> Result<Vec<ResolutionResult>, RepositoryError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let batch_year = requests.iter().find_map(|(_, _, _, year)| *year);
        let distinct_names: HashSet<&str> = requests.iter().map(|(name, ..)| name.trim()).collect();

        info!(
            batch_size = requests.len(),
            distinct_names = distinct_names.len(),
            year = ?batch_year,
            "batch_resolve starting"
        );

        let all_persons = self.person_repo.get_all_for_phonetic_matching(batch_year).await?;

        let mut ids: HashSet<i64> = requests.iter().map(|(_, requester, ..)| *requester).collect();
        ids.extend(all_persons.iter().map(|p| p.cm_id));

        let attendee_info = self.preload_attendee_info(&ids, batch_year).await?;

        let mut shortlists: HashMap<String, Vec<bunk_domain::Person>> = HashMap::new();
        for name in &distinct_names {
            let shortlist = self.shortlist_for_name(name, batch_year, &all_persons).await?;
            shortlists.insert((*name).to_string(), shortlist);
        }

        let mut results = Vec::with_capacity(requests.len());
        let mut accepted_by_strategy: HashMap<&str, usize> = HashMap::new();

        for (name, requester_cm_id, session_cm_id, year) in requests {
            let trimmed = name.trim();
            let key = cache_key(trimmed, *requester_cm_id, *session_cm_id, *year);
            if let Some(cache) = &self.cache {
                if let Some(hit) = cache.get(&key) {
                    results.push(hit);
                    continue;
                }
            }

            let session_cm_id = match session_cm_id {
                Some(s) => Some(*s),
                None => attendee_info.get(requester_cm_id).and_then(|a| a.session_cm_id),
            };

            let candidates = shortlists.get(trimmed).cloned().unwrap_or_default();
            let candidates = match &self.spread_filter {
                Some(filter) => filter.filter(*requester_cm_id, candidates),
                None => candidates,
            };

            let context = ResolutionContext {
                candidates: Some(&candidates),
                attendee_info: Some(&attendee_info),
                all_persons: Some(&all_persons),
            };

            let result = self
                .run_strategies_with_context(trimmed, *requester_cm_id, session_cm_id, *year, &context, &mut accepted_by_strategy)
                .await;

            if let (Some(cache), true) = (&self.cache, result.is_resolved()) {
                cache.put(key, result.clone());
            }
            results.push(result);
        }

        debug!(?accepted_by_strategy, "batch_resolve per-strategy accept counts");
        Ok(results)
    }

    async fn run_strategies_with_context(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
        accepted_by_strategy: &mut HashMap<&str, usize>,
    ) -> ResolutionResult {
        let mut best: Option<ResolutionResult> = None;
        let floor = self.acceptance_floor();

        for strategy in &self.strategies {
            let outcome = strategy
                .resolve_with_context(name, requester_cm_id, session_cm_id, year, context)
                .await;
            let outcome = match outcome {
                Ok(r) => r,
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "strategy failed, skipping");
                    continue;
                }
            };

            if outcome.is_resolved() && outcome.confidence >= floor {
                *accepted_by_strategy.entry(strategy.name()).or_insert(0) += 1;
                return outcome;
            }

            best = Some(pick_better(best, outcome));
        }

        match best {
            Some(mut result) if result.is_resolved() && result.confidence < self.minimum_confidence => {
                result.person = None;
                result.confidence = 0.0;
                result.metadata.below_threshold = true;
                result
            }
            Some(result) => result,
            None => ResolutionResult::unresolved("pipeline"),
        }
    }

    /// Derives a candidate shortlist for one distinct name: a full
    /// first+last lookup for two-or-more-token names, a first-name +
    /// initial-letter filter for "First I." patterns, and an empty list
    /// (forcing fallback to `all_persons`) for single-token names.
    async fn shortlist_for_name(
        &self,
        name: &str,
        year: Option<i32>,
        all_persons: &[bunk_domain::Person],
    ) -> Result<Vec<bunk_domain::Person>, RepositoryError> {
        let tokens: Vec<&str> = name.split_whitespace().collect();
        match tokens.as_slice() {
            [] | [_] => Ok(Vec::new()),
            [first, second] if second.chars().count() == 1 => {
                let initial = second.to_uppercase();
                let candidates = self.person_repo.find_by_first_name(first, year).await?;
                Ok(candidates
                    .into_iter()
                    .filter(|p| p.last_name.starts_with(&initial))
                    .collect())
            }
            [first, .., last] => {
                let candidates = self.person_repo.find_by_name(first, last, year).await?;
                if candidates.is_empty() {
                    Ok(all_persons
                        .iter()
                        .filter(|p| p.first_name.eq_ignore_ascii_case(first) && p.last_name.eq_ignore_ascii_case(last))
                        .cloned()
                        .collect())
                } else {
                    Ok(candidates)
                }
            }
        }
    }

    async fn preload_attendee_info(
        &self,
        ids: &HashSet<i64>,
        year: Option<i32>,
    ) -> Result<HashMap<i64, AttendeeSnapshot>, RepositoryError> {
        let Some(year) = year else { return Ok(HashMap::new()) };
        let id_list: Vec<i64> = ids.iter().copied().collect();
        let sessions = self.attendee_repo.bulk_get_sessions_for_persons(&id_list, year).await?;

        let mut map = HashMap::with_capacity(sessions.len());
        for (cm_id, session_cm_id) in sessions {
            let snapshot = match self.attendee_repo.get_by_person_and_year(cm_id, year).await? {
                Some(info) => AttendeeSnapshot {
                    session_cm_id: Some(session_cm_id),
                    school: info.school,
                    grade: info.grade,
                    city: info.city,
                    state: info.state,
                },
                None => AttendeeSnapshot { session_cm_id: Some(session_cm_id), ..Default::default() },
            };
            map.insert(cm_id, snapshot);
        }
        Ok(map)
    }
}

/// Prefers a resolved result over ambiguous, and ambiguous over a plain
/// unresolved one; between two resolved candidates, the higher confidence
/// wins.
fn pick_better(current: Option<ResolutionResult>, candidate: ResolutionResult) -> ResolutionResult {
    let Some(current) = current else { return candidate };

    let rank = |r: &ResolutionResult| -> (u8, f64) {
        if r.is_resolved() {
            (2, r.confidence)
        } else if r.is_ambiguous() {
            (1, r.confidence)
        } else {
            (0, r.confidence)
        }
    };

    if rank(&candidate) > rank(&current) {
        candidate
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bunk_domain::Person;
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

    fn pipeline(people: Vec<Person>) -> ResolutionPipeline {
        let person_repo: Arc<dyn PersonRepository> = Arc::new(InMemoryPersonRepository::new(people));
        let attendee_repo: Arc<dyn AttendeeRepository> =
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new()));
        ResolutionPipeline::new(
            vec![Box::new(ExactMatchStrategy::new(person_repo.clone(), attendee_repo.clone()))],
            person_repo,
            attendee_repo,
        )
    }

    #[tokio::test]
    async fn resolves_and_caches_a_unique_match() {
        let pipeline = pipeline(vec![person(1, "Ella", "Fitzgerald")]).with_cache(16);
        let result = pipeline.resolve("Ella Fitzgerald", 99, None, None).await;
        assert!(result.is_resolved());

        let key = cache_key("Ella Fitzgerald", 99, None, None);
        assert!(pipeline.cache.as_ref().unwrap().get(&key).is_some());
    }

    #[tokio::test]
    async fn batch_resolve_preserves_order_and_length() {
        let pipeline = pipeline(vec![person(1, "Ella", "Fitzgerald"), person(2, "Sam", "Lee")]);
        let requests = vec![
            ("Ella Fitzgerald".to_string(), 99, None, None),
            ("Sam Lee".to_string(), 99, None, None),
            ("Nobody Here".to_string(), 99, None, None),
        ];
        let results = pipeline.batch_resolve(&requests).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].person.as_ref().unwrap().cm_id, 1);
        assert_eq!(results[1].person.as_ref().unwrap().cm_id, 2);
        assert!(!results[2].is_resolved());
    }

    #[tokio::test]
    async fn below_minimum_confidence_is_demoted() {
        let pipeline = pipeline(vec![person(1, "Ella", "Fitzgerald")]).with_minimum_confidence(0.99);
        let result = pipeline.resolve("Ella Fitzgerald", 99, None, None).await;
        assert!(!result.is_resolved());
        assert!(result.metadata.below_threshold);
    }

    #[test]
    fn cache_key_normalizes_name_case() {
        let a = cache_key("Ella Fitzgerald", 1, Some(10), Some(2026));
        let b = cache_key("ella fitzgerald", 1, Some(10), Some(2026));
        assert_eq!(a, b);
    }
}
