use std::sync::Arc;

use async_trait::async_trait;
use bunk_domain::{Person, ResolutionMetadata, ResolutionResult};
use bunk_names::{last_name_matches, parse_name, title_case};
use bunk_repository::{AttendeeRepository, PersonRepository, RepositoryError};

use crate::base::{build_ambiguous_result, filter_self_references};
use crate::{ResolutionContext, ResolutionStrategy};

/// Highest-confidence strategy: requires a complete first+last name and
/// matches it verbatim (case-folded via title-casing) against the roster.
/// Falls back to a parent-surname match when nothing matches directly.
pub struct ExactMatchStrategy {
    person_repo: Arc<dyn PersonRepository>,
    attendee_repo: Arc<dyn AttendeeRepository>,
}

impl ExactMatchStrategy {
    pub fn new(
        person_repo: Arc<dyn PersonRepository>,
        attendee_repo: Arc<dyn AttendeeRepository>,
    ) -> Self {
        ExactMatchStrategy { person_repo, attendee_repo }
    }

    fn incomplete_name(&self) -> ResolutionResult {
        ResolutionResult {
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                reason: Some("incomplete_name".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn no_match(&self) -> ResolutionResult {
        ResolutionResult {
            method: self.name().to_string(),
            metadata: ResolutionMetadata {
                reason: Some("no_match".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn resolved(&self, person: Person, confidence: f64, metadata: ResolutionMetadata) -> ResolutionResult {
        ResolutionResult {
            person: Some(person),
            confidence,
            method: self.name().to_string(),
            metadata,
            ..Default::default()
        }
    }

    async fn resolve_unique(
        &self,
        person: Person,
        session_cm_id: Option<i64>,
        year: Option<i32>,
    ) -> Result<ResolutionResult, RepositoryError> {
        let Some(year) = year else {
            return Ok(self.resolved(
                person,
                0.90,
                ResolutionMetadata {
                    match_type: Some("unique".to_string()),
                    ..Default::default()
                },
            ));
        };
        let Some(session_cm_id) = session_cm_id else {
            return Ok(self.resolved(
                person,
                0.90,
                ResolutionMetadata {
                    no_session_info: true,
                    ..Default::default()
                },
            ));
        };

        let candidate_session = self
            .attendee_repo
            .get_session_for_person(person.cm_id, year)
            .await?;
        if candidate_session == Some(session_cm_id) {
            Ok(self.resolved(
                person,
                0.95,
                ResolutionMetadata {
                    session_match: Some("exact".to_string()),
                    ..Default::default()
                },
            ))
        } else {
            Ok(self.resolved(
                person,
                0.85,
                ResolutionMetadata {
                    session_match: Some("different".to_string()),
                    ..Default::default()
                },
            ))
        }
    }

    async fn disambiguate_multiple(
        &self,
        matches: Vec<Person>,
        session_cm_id: Option<i64>,
        year: i32,
    ) -> Result<ResolutionResult, RepositoryError> {
        let Some(session_cm_id) = session_cm_id else {
            return Ok(build_ambiguous_result(
                self.name(),
                matches,
                0.5,
                "multiple_matches_no_session",
                Default::default(),
            ));
        };

        let ids: Vec<i64> = matches.iter().map(|p| p.cm_id).collect();
        let sessions = self
            .attendee_repo
            .bulk_get_sessions_for_persons(&ids, year)
            .await?;

        let same_session: Vec<&Person> = matches
            .iter()
            .filter(|p| sessions.get(&p.cm_id) == Some(&session_cm_id))
            .collect();

        if same_session.len() == 1 {
            let person = same_session[0].clone();
            return Ok(self.resolved(
                person,
                0.95,
                ResolutionMetadata {
                    match_type: Some("unique_same_session".to_string()),
                    ..Default::default()
                },
            ));
        }

        if same_session.len() > 1 {
            return Ok(build_ambiguous_result(
                self.name(),
                matches,
                0.5,
                "multiple_same_session_matches",
                Default::default(),
            ));
        }

        let mut extra = serde_json::Map::new();
        extra.insert(
            "target_session".to_string(),
            serde_json::json!(sessions.get(&matches[0].cm_id)),
        );
        extra.insert("requester_session".to_string(), serde_json::json!(session_cm_id));
        Ok(ResolutionResult {
            person: None,
            confidence: 0.0,
            method: self.name().to_string(),
            candidates: matches,
            metadata: ResolutionMetadata {
                impossible: true,
                impossible_reason: Some("all_matches_in_different_sessions".to_string()),
                extra,
                ..Default::default()
            },
        })
    }

    async fn try_parent_surname_match(
        &self,
        first: &str,
        last: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
    ) -> Result<ResolutionResult, RepositoryError> {
        let first_t = title_case(first);
        let matches = self
            .person_repo
            .find_by_first_and_parent_surname(&first_t, last, year)
            .await?;
        let matches = filter_self_references(matches, requester_cm_id);

        if matches.is_empty() {
            return Ok(self.no_match());
        }

        let parent_meta = |extra: &mut serde_json::Map<String, serde_json::Value>| {
            extra.insert("parent_last_name".to_string(), serde_json::json!(last));
            extra.insert("camper_last_name".to_string(), serde_json::json!(last));
        };

        if matches.len() == 1 {
            let person = matches.into_iter().next().unwrap();
            let mut confidence = 0.90;
            if let (Some(year), Some(session_cm_id)) = (year, session_cm_id) {
                let sessions = self
                    .attendee_repo
                    .bulk_get_sessions_for_persons(&[person.cm_id], year)
                    .await?;
                if sessions.get(&person.cm_id) != Some(&session_cm_id) {
                    confidence = 0.80;
                }
            }
            let mut extra = serde_json::Map::new();
            parent_meta(&mut extra);
            return Ok(self.resolved(
                person,
                confidence,
                ResolutionMetadata {
                    match_type: Some("parent_surname".to_string()),
                    extra,
                    ..Default::default()
                },
            ));
        }

        let mut extra = serde_json::Map::new();
        parent_meta(&mut extra);
        Ok(build_ambiguous_result(
            self.name(),
            matches,
            0.45,
            "multiple_parent_surname_matches",
            extra,
        ))
    }

    fn resolve_unique_with_context(
        &self,
        person: Person,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        context: &ResolutionContext<'_>,
    ) -> ResolutionResult {
        let Some(_year) = year else {
            return self.resolved(
                person,
                0.90,
                ResolutionMetadata {
                    match_type: Some("unique".to_string()),
                    ..Default::default()
                },
            );
        };
        let Some(session_cm_id) = session_cm_id else {
            return self.resolved(
                person,
                0.90,
                ResolutionMetadata {
                    no_session_info: true,
                    ..Default::default()
                },
            );
        };

        let candidate_session = context
            .attendee_info
            .and_then(|m| m.get(&person.cm_id))
            .and_then(|a| a.session_cm_id);

        if candidate_session == Some(session_cm_id) {
            self.resolved(
                person,
                0.95,
                ResolutionMetadata {
                    session_match: Some("exact".to_string()),
                    ..Default::default()
                },
            )
        } else {
            self.resolved(
                person,
                0.85,
                ResolutionMetadata {
                    session_match: Some("different".to_string()),
                    ..Default::default()
                },
            )
        }
    }

    fn disambiguate_with_context(
        &self,
        matches: Vec<Person>,
        session_cm_id: Option<i64>,
        context: &ResolutionContext<'_>,
    ) -> ResolutionResult {
        let Some(session_cm_id) = session_cm_id else {
            return build_ambiguous_result(
                self.name(),
                matches,
                0.5,
                "multiple_matches_no_session",
                Default::default(),
            );
        };

        let session_of = |cm_id: i64| -> Option<i64> {
            context
                .attendee_info
                .and_then(|m| m.get(&cm_id))
                .and_then(|a| a.session_cm_id)
        };

        let same_session: Vec<&Person> = matches
            .iter()
            .filter(|p| session_of(p.cm_id) == Some(session_cm_id))
            .collect();

        if same_session.len() == 1 {
            let person = same_session[0].clone();
            return self.resolved(
                person,
                0.95,
                ResolutionMetadata {
                    match_type: Some("unique_same_session".to_string()),
                    ..Default::default()
                },
            );
        }

        if same_session.len() > 1 {
            return build_ambiguous_result(
                self.name(),
                matches,
                0.5,
                "multiple_same_session_matches",
                Default::default(),
            );
        }

        let mut extra = serde_json::Map::new();
        extra.insert("target_session".to_string(), serde_json::json!(session_of(matches[0].cm_id)));
        extra.insert("requester_session".to_string(), serde_json::json!(session_cm_id));
        ResolutionResult {
            person: None,
            confidence: 0.0,
            method: self.name().to_string(),
            candidates: matches,
            metadata: ResolutionMetadata {
                impossible: true,
                impossible_reason: Some("all_matches_in_different_sessions".to_string()),
                extra,
                ..Default::default()
            },
        }
    }

    fn try_parent_surname_match_with_context(
        &self,
        first: &str,
        last: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        context: &ResolutionContext<'_>,
    ) -> ResolutionResult {
        let first_t = title_case(first);
        let last_lower = last.to_lowercase();
        let pool: Vec<Person> = match context.candidates.filter(|c| !c.is_empty()) {
            Some(c) => c.to_vec(),
            None => context.all_persons.map(|c| c.to_vec()).unwrap_or_default(),
        };

        let matches: Vec<Person> = pool
            .into_iter()
            .filter(|c| {
                title_case(&c.first_name) == first_t
                    && c.parent_last_names()
                        .iter()
                        .any(|p| p.to_lowercase() == last_lower)
            })
            .collect();
        let matches = filter_self_references(matches, requester_cm_id);

        if matches.is_empty() {
            return self.no_match();
        }

        let parent_meta = |extra: &mut serde_json::Map<String, serde_json::Value>| {
            extra.insert("parent_last_name".to_string(), serde_json::json!(last));
            extra.insert("camper_last_name".to_string(), serde_json::json!(last));
        };

        if matches.len() == 1 {
            let person = matches.into_iter().next().unwrap();
            let candidate_session = context
                .attendee_info
                .and_then(|m| m.get(&person.cm_id))
                .and_then(|a| a.session_cm_id);
            let confidence = match (session_cm_id, candidate_session) {
                (Some(s), Some(c)) if s != c => 0.80,
                _ => 0.90,
            };
            let mut extra = serde_json::Map::new();
            parent_meta(&mut extra);
            return self.resolved(
                person,
                confidence,
                ResolutionMetadata {
                    match_type: Some("parent_surname".to_string()),
                    extra,
                    ..Default::default()
                },
            );
        }

        let mut extra = serde_json::Map::new();
        parent_meta(&mut extra);
        build_ambiguous_result(self.name(), matches, 0.45, "multiple_parent_surname_matches", extra)
    }
}

#[async_trait]
impl ResolutionStrategy for ExactMatchStrategy {
    fn name(&self) -> &str {
        "exact_match"
    }

    async fn resolve(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
    ) -> Result<ResolutionResult, RepositoryError> {
        let parsed = parse_name(name);
        if !parsed.is_complete {
            return Ok(self.incomplete_name());
        }

        let first_t = title_case(&parsed.first);
        let last_t = title_case(&parsed.last);
        let matches = self.person_repo.find_by_name(&first_t, &last_t, year).await?;
        let matches = filter_self_references(matches, requester_cm_id);

        if matches.is_empty() {
            return self
                .try_parent_surname_match(&parsed.first, &parsed.last, requester_cm_id, session_cm_id, year)
                .await;
        }

        if matches.len() == 1 {
            return self
                .resolve_unique(matches.into_iter().next().unwrap(), session_cm_id, year)
                .await;
        }

        match year {
            Some(year) => self.disambiguate_multiple(matches, session_cm_id, year).await,
            None => Ok(build_ambiguous_result(
                self.name(),
                matches,
                0.5,
                "multiple_matches_no_year",
                Default::default(),
            )),
        }
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
        if !parsed.is_complete {
            return Ok(self.incomplete_name());
        }

        let first_t = title_case(&parsed.first);
        let last_t = title_case(&parsed.last);
        let pool = context.candidates.map(|c| c.to_vec()).unwrap_or_default();
        let matches: Vec<Person> = pool
            .into_iter()
            .filter(|c| title_case(&c.first_name) == first_t && last_name_matches(&last_t, &c.last_name))
            .collect();
        let matches = filter_self_references(matches, requester_cm_id);

        if matches.is_empty() {
            return Ok(self.try_parent_surname_match_with_context(
                &parsed.first,
                &parsed.last,
                requester_cm_id,
                session_cm_id,
                context,
            ));
        }

        if matches.len() == 1 {
            return Ok(self.resolve_unique_with_context(
                matches.into_iter().next().unwrap(),
                session_cm_id,
                year,
                context,
            ));
        }

        if year.is_some() {
            Ok(self.disambiguate_with_context(matches, session_cm_id, context))
        } else {
            Ok(build_ambiguous_result(
                self.name(),
                matches,
                0.5,
                "multiple_matches_no_year",
                Default::default(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bunk_domain::ParentName;
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

    fn strategy(people: Vec<Person>) -> ExactMatchStrategy {
        ExactMatchStrategy::new(
            Arc::new(InMemoryPersonRepository::new(people)),
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new())),
        )
    }

    #[tokio::test]
    async fn resolves_unique_match_with_no_session_context() {
        let strat = strategy(vec![person(1, "Ella", "Fitzgerald")]);
        let result = strat.resolve("Ella Fitzgerald", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.confidence, 0.90);
        assert_eq!(result.metadata.match_type.as_deref(), Some("unique"));
    }

    #[tokio::test]
    async fn never_resolves_to_requester() {
        let strat = strategy(vec![person(1, "Ella", "Fitzgerald")]);
        let result = strat.resolve("Ella Fitzgerald", 1, None, None).await.unwrap();
        assert!(!result.is_resolved());
        assert_eq!(result.metadata.reason.as_deref(), Some("no_match"));
    }

    #[tokio::test]
    async fn falls_back_to_parent_surname_when_no_direct_match() {
        let mut camper = person(2, "Nora", "Quinn");
        camper.parent_names.push(ParentName {
            first: "Dana".to_string(),
            last: "Fitzgerald".to_string(),
            relationship: "mother".to_string(),
        });
        let strat = strategy(vec![camper]);
        let result = strat.resolve("Nora Fitzgerald", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.metadata.match_type.as_deref(), Some("parent_surname"));
    }

    #[tokio::test]
    async fn ambiguous_when_multiple_matches_and_no_year() {
        let strat = strategy(vec![person(1, "Sam", "Lee"), person(2, "Sam", "Lee")]);
        let result = strat.resolve("Sam Lee", 99, None, None).await.unwrap();
        assert!(result.is_ambiguous());
        assert_eq!(result.metadata.ambiguity_reason.as_deref(), Some("multiple_matches_no_year"));
    }

    #[tokio::test]
    async fn incomplete_name_returns_zero_confidence() {
        let strat = strategy(vec![]);
        let result = strat.resolve("Cher", 99, None, None).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.metadata.reason.as_deref(), Some("incomplete_name"));
    }
}
