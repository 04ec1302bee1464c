use std::sync::Arc;

use async_trait::async_trait;
use bunk_config::StrategyConfidenceConfig;
use bunk_domain::{Person, ResolutionMetadata, ResolutionResult};
use bunk_names::{find_nickname_variations, metaphone, nickname_groups, parse_name, soundex};
use bunk_repository::{AttendeeRepository, PersonRepository, RepositoryError};

use crate::base::filter_self_references;
use crate::{ResolutionContext, ResolutionStrategy};

const DEFAULT_SOUNDEX_BASE: f64 = 0.70;
const DEFAULT_METAPHONE_BASE: f64 = 0.65;
const DEFAULT_NICKNAME_BASE: f64 = 0.75;
const DEFAULT_CONFIDENCE: f64 = 0.60;
const DEFAULT_SESSION_MATCH: f64 = 0.75;
const DEFAULT_SAME_SESSION_BOOST: f64 = 0.05;
const DEFAULT_DIFFERENT_SESSION_PENALTY: f64 = -0.20;
const DEFAULT_NOT_ENROLLED_PENALTY: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Soundex,
    Metaphone,
    Nickname,
}

/// Soundex, then Metaphone, then nickname-group, then parent-surname-phonetic
/// matching over the same name — each a looser net than the last. The full
/// year-filtered roster is fetched exactly once per `resolve` call and
/// reused across all four passes, since phonetic comparison touches every
/// row regardless of how the name is spelled.
pub struct PhoneticMatchStrategy {
    person_repo: Arc<dyn PersonRepository>,
    attendee_repo: Arc<dyn AttendeeRepository>,
    config: StrategyConfidenceConfig,
}

impl PhoneticMatchStrategy {
    pub fn new(
        person_repo: Arc<dyn PersonRepository>,
        attendee_repo: Arc<dyn AttendeeRepository>,
        config: StrategyConfidenceConfig,
    ) -> Self {
        PhoneticMatchStrategy { person_repo, attendee_repo, config }
    }

    fn base_confidence(&self, kind: MatchKind) -> f64 {
        match kind {
            MatchKind::Soundex => self.config.soundex_base.unwrap_or(DEFAULT_SOUNDEX_BASE),
            MatchKind::Metaphone => self.config.metaphone_base.unwrap_or(DEFAULT_METAPHONE_BASE),
            MatchKind::Nickname => self.config.nickname_base.unwrap_or(DEFAULT_NICKNAME_BASE),
        }
    }

    fn apply_session_adjustment_simple(
        &self,
        base: f64,
        person_session: Option<i64>,
        requester_session: Option<i64>,
    ) -> f64 {
        let Some(requester_session) = requester_session else {
            return base + self.config.not_enrolled_penalty.unwrap_or(DEFAULT_NOT_ENROLLED_PENALTY);
        };
        match person_session {
            None => base + self.config.not_enrolled_penalty.unwrap_or(DEFAULT_NOT_ENROLLED_PENALTY),
            Some(p) if p == requester_session => {
                base + self.config.same_session_boost.unwrap_or(DEFAULT_SAME_SESSION_BOOST)
            }
            Some(_) => base + self.config.different_session_penalty.unwrap_or(DEFAULT_DIFFERENT_SESSION_PENALTY),
        }
    }

    async fn calculate_confidence(
        &self,
        person: &Person,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        kind: MatchKind,
    ) -> Result<f64, RepositoryError> {
        let base = self.base_confidence(kind);
        let person_session = match year {
            Some(year) => self.attendee_repo.get_session_for_person(person.cm_id, year).await?,
            None => None,
        };
        Ok(self.apply_session_adjustment_simple(base, person_session, session_cm_id))
    }

    /// Mirrors `_disambiguate_with_session`: resolves only when exactly one
    /// candidate shares the requester's session; otherwise leaves the
    /// ambiguity to the caller.
    async fn disambiguate_with_session(
        &self,
        candidates: &[Person],
        session_cm_id: i64,
        year: i32,
    ) -> Result<Option<Person>, RepositoryError> {
        let ids: Vec<i64> = candidates.iter().map(|p| p.cm_id).collect();
        let sessions = self.attendee_repo.bulk_get_sessions_for_persons(&ids, year).await?;
        let same_session: Vec<&Person> = candidates
            .iter()
            .filter(|p| sessions.get(&p.cm_id) == Some(&session_cm_id))
            .collect();
        Ok(if same_session.len() == 1 {
            Some(same_session[0].clone())
        } else {
            None
        })
    }

    async fn try_soundex_match(
        &self,
        first_name: &str,
        last_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        all_persons: &[Person],
    ) -> Result<ResolutionResult, RepositoryError> {
        let first_soundex = soundex(first_name);
        let last_soundex = soundex(last_name);

        let matches: Vec<Person> = all_persons
            .iter()
            .filter(|p| soundex(&p.first_name) == first_soundex && soundex(&p.last_name) == last_soundex)
            .cloned()
            .collect();
        let matches = filter_self_references(matches, requester_cm_id);

        self.finish(matches, requester_cm_id, session_cm_id, year, MatchKind::Soundex, "soundex", 0.4)
            .await
    }

    async fn try_metaphone_match(
        &self,
        first_name: &str,
        last_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        all_persons: &[Person],
    ) -> Result<ResolutionResult, RepositoryError> {
        let first_metaphone = metaphone(first_name);
        let last_metaphone = metaphone(last_name);

        let matches: Vec<Person> = all_persons
            .iter()
            .filter(|p| metaphone(&p.first_name) == first_metaphone && metaphone(&p.last_name) == last_metaphone)
            .cloned()
            .collect();
        let matches = filter_self_references(matches, requester_cm_id);

        self.finish(matches, requester_cm_id, session_cm_id, year, MatchKind::Metaphone, "metaphone", 0.35)
            .await
    }

    async fn try_nickname_match(
        &self,
        first_name: &str,
        last_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        all_persons: &[Person],
    ) -> Result<ResolutionResult, RepositoryError> {
        let search_first = first_name.to_lowercase();
        let search_last = last_name.to_lowercase();
        let groups = nickname_groups(None);

        let matches: Vec<Person> = all_persons
            .iter()
            .filter(|p| {
                let person_last = p.last_name.to_lowercase();
                if person_last != search_last {
                    return false;
                }
                let person_first = p.first_name.to_lowercase();
                names_match_in_groups(&search_first, &person_first, &groups)
            })
            .cloned()
            .collect();
        let matches = filter_self_references(matches, requester_cm_id);

        self.finish(matches, requester_cm_id, session_cm_id, year, MatchKind::Nickname, "nickname", 0.45)
            .await
    }

    async fn try_parent_surname_phonetic_match(
        &self,
        first_name: &str,
        last_name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        all_persons: &[Person],
    ) -> Result<ResolutionResult, RepositoryError> {
        let last_soundex = soundex(last_name);
        let last_metaphone = metaphone(last_name);

        let mut first_variations: std::collections::HashSet<String> = find_nickname_variations(first_name, None)
            .into_iter()
            .map(|v| v.to_lowercase())
            .collect();
        first_variations.insert(first_name.to_lowercase());

        let matches: Vec<Person> = all_persons
            .iter()
            .filter(|p| {
                let person_first = p.first_name.to_lowercase();
                let person_pref = p.preferred_name.as_deref().unwrap_or("").to_lowercase();
                if !first_variations.contains(&person_first) && !first_variations.contains(&person_pref) {
                    return false;
                }
                p.parent_last_names().iter().any(|surname| {
                    soundex(surname) == last_soundex || metaphone(surname) == last_metaphone
                })
            })
            .cloned()
            .collect();
        let matches = filter_self_references(matches, requester_cm_id);

        if matches.is_empty() {
            return Ok(ResolutionResult::unresolved(self.name()));
        }

        if matches.len() == 1 {
            let person = matches.into_iter().next().unwrap();
            let confidence = self
                .calculate_confidence(&person, session_cm_id, year, MatchKind::Soundex)
                .await?;
            let confidence = (confidence - 0.05).min(0.80);
            let mut extra = serde_json::Map::new();
            extra.insert("algorithm".to_string(), serde_json::json!("soundex+metaphone"));
            extra.insert("search_surname".to_string(), serde_json::json!(last_name));
            return Ok(ResolutionResult {
                person: Some(person),
                confidence,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("parent_surname_phonetic".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if let (Some(session_cm_id), Some(year)) = (session_cm_id, year) {
            if let Some(person) = self.disambiguate_with_session(&matches, session_cm_id, year).await? {
                let confidence = self
                    .calculate_confidence(&person, Some(session_cm_id), Some(year), MatchKind::Soundex)
                    .await?;
                let confidence = (confidence - 0.05).min(0.80);
                let mut extra = serde_json::Map::new();
                extra.insert("algorithm".to_string(), serde_json::json!("soundex+metaphone"));
                return Ok(ResolutionResult {
                    person: Some(person),
                    confidence,
                    method: self.name().to_string(),
                    metadata: ResolutionMetadata {
                        match_type: Some("parent_surname_phonetic".to_string()),
                        extra,
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
        }

        let match_count = matches.len();
        let mut extra = serde_json::Map::new();
        extra.insert("algorithm".to_string(), serde_json::json!("soundex+metaphone"));
        Ok(ResolutionResult {
            candidates: matches,
            confidence: 0.40,
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                ambiguity_reason: Some("multiple_parent_surname_phonetic_matches".to_string()),
                match_count: Some(match_count),
                extra,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    /// Shared tail for the soundex/metaphone/nickname passes: unique match
    /// resolves at the pass's base confidence; multiple tries session
    /// disambiguation first, then falls to an ambiguous result tagged with
    /// the algorithm name.
    async fn finish(
        &self,
        matches: Vec<Person>,
        _requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        kind: MatchKind,
        algorithm: &str,
        ambiguous_confidence: f64,
    ) -> Result<ResolutionResult, RepositoryError> {
        if matches.is_empty() {
            return Ok(ResolutionResult::unresolved(self.name()));
        }

        if matches.len() == 1 {
            let person = matches.into_iter().next().unwrap();
            let confidence = self.calculate_confidence(&person, session_cm_id, year, kind).await?;
            let mut extra = serde_json::Map::new();
            extra.insert("algorithm".to_string(), serde_json::json!(algorithm));
            return Ok(ResolutionResult {
                person: Some(person),
                confidence,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some(algorithm.to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if let (Some(session_cm_id), Some(year)) = (session_cm_id, year) {
            if let Some(person) = self.disambiguate_with_session(&matches, session_cm_id, year).await? {
                let mut extra = serde_json::Map::new();
                extra.insert("algorithm".to_string(), serde_json::json!(algorithm));
                let confidence = self.config.session_match.unwrap_or(DEFAULT_SESSION_MATCH);
                return Ok(ResolutionResult {
                    person: Some(person),
                    confidence,
                    method: self.name().to_string(),
                    metadata: ResolutionMetadata {
                        match_type: Some(format!("{algorithm}_with_session")),
                        extra,
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
        }

        let match_count = matches.len();
        let mut extra = serde_json::Map::new();
        extra.insert("algorithm".to_string(), serde_json::json!(algorithm));
        Ok(ResolutionResult {
            candidates: matches,
            confidence: ambiguous_confidence,
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                ambiguity_reason: Some(format!("multiple_{algorithm}_matches")),
                match_count: Some(match_count),
                extra,
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

fn names_match_in_groups(name1: &str, name2: &str, groups: &[std::collections::HashSet<String>]) -> bool {
    if name1 == name2 {
        return true;
    }
    groups.iter().any(|g| g.contains(name1) && g.contains(name2))
}

#[async_trait]
impl ResolutionStrategy for PhoneticMatchStrategy {
    fn name(&self) -> &str {
        "phonetic_match"
    }

    async fn resolve(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
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

        if !parsed.is_complete {
            return Ok(ResolutionResult {
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    reason: Some("no_phonetic_match".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        // Fetched exactly once per call, reused across every pass below.
        let all_persons = self.person_repo.get_all_for_phonetic_matching(year).await?;

        let result = self
            .try_soundex_match(&parsed.first, &parsed.last, requester_cm_id, session_cm_id, year, &all_persons)
            .await?;
        if result.is_resolved() || result.is_ambiguous() {
            return Ok(result);
        }

        let result = self
            .try_metaphone_match(&parsed.first, &parsed.last, requester_cm_id, session_cm_id, year, &all_persons)
            .await?;
        if result.is_resolved() || result.is_ambiguous() {
            return Ok(result);
        }

        let result = self
            .try_nickname_match(&parsed.first, &parsed.last, requester_cm_id, session_cm_id, year, &all_persons)
            .await?;
        if result.is_resolved() || result.is_ambiguous() {
            return Ok(result);
        }

        let result = self
            .try_parent_surname_phonetic_match(
                &parsed.first,
                &parsed.last,
                requester_cm_id,
                session_cm_id,
                year,
                &all_persons,
            )
            .await?;
        if result.is_resolved() || result.is_ambiguous() {
            return Ok(result);
        }

        Ok(ResolutionResult {
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                reason: Some("no_phonetic_match".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bunk_repository::InMemoryAttendeeRepository;

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

    /// Wraps a `PersonRepository` and counts calls to
    /// `get_all_for_phonetic_matching`, to verify the pool is fetched at
    /// most once per `resolve` call.
    struct CountingPersonRepo {
        inner: bunk_repository::InMemoryPersonRepository,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl PersonRepository for CountingPersonRepo {
        async fn find_by_cm_id(&self, cm_id: i64) -> Result<Option<Person>, RepositoryError> {
            self.inner.find_by_cm_id(cm_id).await
        }
        async fn find_by_name(
            &self,
            first_title: &str,
            last_title: &str,
            year: Option<i32>,
        ) -> Result<Vec<Person>, RepositoryError> {
            self.inner.find_by_name(first_title, last_title, year).await
        }
        async fn find_by_first_name(&self, first: &str, year: Option<i32>) -> Result<Vec<Person>, RepositoryError> {
            self.inner.find_by_first_name(first, year).await
        }
        async fn find_by_normalized_name(
            &self,
            raw: &str,
            year: Option<i32>,
        ) -> Result<Vec<Person>, RepositoryError> {
            self.inner.find_by_normalized_name(raw, year).await
        }
        async fn find_by_first_and_parent_surname(
            &self,
            first: &str,
            surname: &str,
            year: Option<i32>,
        ) -> Result<Vec<Person>, RepositoryError> {
            self.inner.find_by_first_and_parent_surname(first, surname, year).await
        }
        async fn get_all_for_phonetic_matching(&self, year: Option<i32>) -> Result<Vec<Person>, RepositoryError> {
            *self.calls.lock().unwrap() += 1;
            self.inner.get_all_for_phonetic_matching(year).await
        }
        async fn bulk_find_by_cm_ids(
            &self,
            ids: &[i64],
        ) -> Result<std::collections::HashMap<i64, Person>, RepositoryError> {
            self.inner.bulk_find_by_cm_ids(ids).await
        }
    }

    #[tokio::test]
    async fn resolves_via_soundex() {
        let repo = CountingPersonRepo {
            inner: bunk_repository::InMemoryPersonRepository::new(vec![person(1, "Robert", "Smith")]),
            calls: Mutex::new(0),
        };
        let person_repo: Arc<dyn PersonRepository> = Arc::new(repo);
        let strat = PhoneticMatchStrategy::new(
            person_repo,
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new())),
            StrategyConfidenceConfig::default(),
        );
        let result = strat.resolve("Rupert Smith", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.metadata.match_type.as_deref(), Some("soundex"));
    }

    #[tokio::test]
    async fn fetches_phonetic_pool_at_most_once_per_call() {
        let repo = Arc::new(CountingPersonRepo {
            inner: bunk_repository::InMemoryPersonRepository::new(vec![person(1, "Robert", "Smith")]),
            calls: Mutex::new(0),
        });
        let strat = PhoneticMatchStrategy::new(
            repo.clone(),
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new())),
            StrategyConfidenceConfig::default(),
        );
        strat.resolve("Rupert Smith", 99, None, None).await.unwrap();
        assert_eq!(*repo.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn resolves_via_nickname_group_when_last_name_matches_exactly() {
        let strat = PhoneticMatchStrategy::new(
            Arc::new(bunk_repository::InMemoryPersonRepository::new(vec![person(1, "Michael", "Stern")])),
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new())),
            StrategyConfidenceConfig::default(),
        );
        let result = strat.resolve("Mike Stern", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.metadata.match_type.as_deref(), Some("nickname"));
    }

    #[tokio::test]
    async fn incomplete_name_is_unresolved() {
        let strat = PhoneticMatchStrategy::new(
            Arc::new(bunk_repository::InMemoryPersonRepository::new(vec![])),
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new())),
            StrategyConfidenceConfig::default(),
        );
        let result = strat.resolve("Cher", 99, None, None).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.metadata.reason.as_deref(), Some("no_phonetic_match"));
    }
}
