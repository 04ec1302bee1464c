use std::sync::Arc;

use async_trait::async_trait;
use bunk_config::SchoolDisambiguationConfig;
use bunk_domain::{Person, ResolutionMetadata, ResolutionResult};
use bunk_names::{parse_name, title_case};
use bunk_repository::{AttendeeRepository, PersonRepository, RepositoryError};

use crate::base::filter_self_references;
use crate::{ResolutionContext, ResolutionStrategy};

/// Narrows same-name candidates by the requester's school, then by grade.
/// Runs its own grade-based disambiguation rather than the session-based
/// fallback the other strategies share, since two campers can attend the
/// same school across different sessions but are rarely in the same grade
/// unless they're actually the same person.
pub struct SchoolDisambiguationStrategy {
    person_repo: Arc<dyn PersonRepository>,
    attendee_repo: Arc<dyn AttendeeRepository>,
    config: SchoolDisambiguationConfig,
}

struct RequesterInfo {
    school: Option<String>,
    grade: Option<i32>,
    city: Option<String>,
    state: Option<String>,
}

impl SchoolDisambiguationStrategy {
    pub fn new(
        person_repo: Arc<dyn PersonRepository>,
        attendee_repo: Arc<dyn AttendeeRepository>,
        config: SchoolDisambiguationConfig,
    ) -> Self {
        SchoolDisambiguationStrategy { person_repo, attendee_repo, config }
    }

    fn normalize_school_name(&self, school: &str) -> String {
        let mut normalized = school.trim().to_lowercase();
        normalized.retain(|c| c != '.' && c != '\'' && c != ',');
        for (full, abbrev) in self.config.abbreviation_pairs() {
            normalized = normalized.replace(&full, &abbrev);
        }
        normalized.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Two school names are the same place if, after normalizing, one
    /// contains the other — and, when both sides carry city/state, those
    /// match exactly too. Missing location data on either side means the
    /// school name alone has to carry the decision.
    fn schools_match(
        &self,
        candidate_school: Option<&str>,
        requester_school: Option<&str>,
        candidate_city: Option<&str>,
        requester_city: Option<&str>,
        candidate_state: Option<&str>,
        requester_state: Option<&str>,
    ) -> bool {
        let (Some(candidate_school), Some(requester_school)) = (candidate_school, requester_school) else {
            return false;
        };
        if candidate_school.trim().is_empty() || requester_school.trim().is_empty() {
            return false;
        }

        let candidate_norm = self.normalize_school_name(candidate_school);
        let requester_norm = self.normalize_school_name(requester_school);
        let name_matches = candidate_norm == requester_norm
            || candidate_norm.contains(&requester_norm)
            || requester_norm.contains(&candidate_norm);
        if !name_matches {
            return false;
        }

        if let (Some(c_city), Some(r_city), Some(c_state), Some(r_state)) =
            (candidate_city, requester_city, candidate_state, requester_state)
        {
            return c_city.to_lowercase() == r_city.to_lowercase() && c_state.to_lowercase() == r_state.to_lowercase();
        }

        true
    }

    fn filter_same_school(&self, candidates: Vec<Person>, requester: &RequesterInfo) -> Vec<Person> {
        candidates
            .into_iter()
            .filter(|c| {
                self.schools_match(
                    c.school.as_deref(),
                    requester.school.as_deref(),
                    c.city.as_deref(),
                    requester.city.as_deref(),
                    c.state.as_deref(),
                    requester.state.as_deref(),
                )
            })
            .collect()
    }

    async fn try_grade_disambiguation(
        &self,
        candidates: &[Person],
        requester_grade: Option<i32>,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        school: &str,
    ) -> Result<Option<ResolutionResult>, RepositoryError> {
        let Some(requester_grade) = requester_grade else {
            return Ok(None);
        };

        let same_grade: Vec<&Person> = candidates.iter().filter(|c| c.grade == Some(requester_grade)).collect();
        if same_grade.len() == 1 {
            let person = same_grade[0].clone();
            let mut confidence = 0.85;
            if let (Some(year), Some(session_cm_id)) = (year, session_cm_id) {
                let sessions = self.attendee_repo.bulk_get_sessions_for_persons(&[person.cm_id], year).await?;
                match sessions.get(&person.cm_id) {
                    Some(s) if *s == session_cm_id => confidence = 0.90,
                    Some(_) => confidence = 0.75,
                    None => {}
                }
            }
            let mut extra = serde_json::Map::new();
            extra.insert("school".to_string(), serde_json::json!(school));
            extra.insert("grade".to_string(), serde_json::json!(requester_grade));
            return Ok(Some(ResolutionResult {
                person: Some(person),
                confidence,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("same_school_same_grade".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            }));
        }

        let close_grade: Vec<&Person> = candidates
            .iter()
            .filter(|c| c.grade.is_some_and(|g| (g - requester_grade).abs() <= 1))
            .collect();

        if close_grade.len() == 1 {
            let person = close_grade[0].clone();
            let grade_diff = person.grade.map(|g| (g - requester_grade).abs());
            let mut extra = serde_json::Map::new();
            extra.insert("school".to_string(), serde_json::json!(school));
            extra.insert("grade_diff".to_string(), serde_json::json!(grade_diff));
            return Ok(Some(ResolutionResult {
                person: Some(person),
                confidence: 0.70,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("same_school_close_grade".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            }));
        }

        if !close_grade.is_empty() {
            let min_diff = close_grade.iter().filter_map(|c| c.grade).map(|g| (g - requester_grade).abs()).min();
            if let Some(min_diff) = min_diff {
                let closest: Vec<&&Person> = close_grade
                    .iter()
                    .filter(|c| c.grade.is_some_and(|g| (g - requester_grade).abs() == min_diff))
                    .collect();
                if closest.len() == 1 {
                    let person = (*closest[0]).clone();
                    let mut extra = serde_json::Map::new();
                    extra.insert("school".to_string(), serde_json::json!(school));
                    extra.insert("grade_diff".to_string(), serde_json::json!(min_diff));
                    return Ok(Some(ResolutionResult {
                        person: Some(person),
                        confidence: 0.65,
                        method: self.name().to_string(),
                        metadata: ResolutionMetadata {
                            match_type: Some("same_school_closest_grade".to_string()),
                            extra,
                            ..Default::default()
                        },
                        ..Default::default()
                    }));
                }
            }
        }

        Ok(None)
    }

    fn try_grade_disambiguation_with_context(
        &self,
        candidates: &[Person],
        requester_grade: Option<i32>,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        school: &str,
        context: &ResolutionContext<'_>,
    ) -> Option<ResolutionResult> {
        let requester_grade = requester_grade?;

        let same_grade: Vec<&Person> = candidates.iter().filter(|c| c.grade == Some(requester_grade)).collect();
        if same_grade.len() == 1 {
            let person = same_grade[0].clone();
            let mut confidence = 0.85;
            if year.is_some() {
                if let Some(session_cm_id) = session_cm_id {
                    let candidate_session =
                        context.attendee_info.and_then(|m| m.get(&person.cm_id)).and_then(|a| a.session_cm_id);
                    match candidate_session {
                        Some(s) if s == session_cm_id => confidence = 0.90,
                        Some(_) => confidence = 0.75,
                        None => {}
                    }
                }
            }
            let mut extra = serde_json::Map::new();
            extra.insert("school".to_string(), serde_json::json!(school));
            extra.insert("grade".to_string(), serde_json::json!(requester_grade));
            return Some(ResolutionResult {
                person: Some(person),
                confidence,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("same_school_same_grade".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        let close_grade: Vec<&Person> = candidates
            .iter()
            .filter(|c| c.grade.is_some_and(|g| (g - requester_grade).abs() <= 1))
            .collect();

        if close_grade.len() == 1 {
            let person = close_grade[0].clone();
            let grade_diff = person.grade.map(|g| (g - requester_grade).abs());
            let mut extra = serde_json::Map::new();
            extra.insert("school".to_string(), serde_json::json!(school));
            extra.insert("grade_diff".to_string(), serde_json::json!(grade_diff));
            return Some(ResolutionResult {
                person: Some(person),
                confidence: 0.70,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("same_school_close_grade".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if !close_grade.is_empty() {
            let min_diff = close_grade.iter().filter_map(|c| c.grade).map(|g| (g - requester_grade).abs()).min()?;
            let closest: Vec<&&Person> = close_grade
                .iter()
                .filter(|c| c.grade.is_some_and(|g| (g - requester_grade).abs() == min_diff))
                .collect();
            if closest.len() == 1 {
                let person = (*closest[0]).clone();
                let mut extra = serde_json::Map::new();
                extra.insert("school".to_string(), serde_json::json!(school));
                extra.insert("grade_diff".to_string(), serde_json::json!(min_diff));
                return Some(ResolutionResult {
                    person: Some(person),
                    confidence: 0.65,
                    method: self.name().to_string(),
                    metadata: ResolutionMetadata {
                        match_type: Some("same_school_closest_grade".to_string()),
                        extra,
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
        }

        None
    }

    fn ambiguous(&self, candidates: Vec<Person>, confidence: f64, reason: &str, extra: serde_json::Map<String, serde_json::Value>) -> ResolutionResult {
        let match_count = candidates.len();
        ResolutionResult {
            person: None,
            confidence,
            method: self.name().to_string(),
            candidates,
            metadata: ResolutionMetadata {
                ambiguity_reason: Some(reason.to_string()),
                match_count: Some(match_count),
                extra,
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl ResolutionStrategy for SchoolDisambiguationStrategy {
    fn name(&self) -> &str {
        "school_disambiguation"
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
            return Ok(ResolutionResult {
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    reason: Some("incomplete_name".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        let first_t = title_case(&parsed.first);
        let last_t = title_case(&parsed.last);
        let candidates = self.person_repo.find_by_name(&first_t, &last_t, year).await?;
        let candidates = filter_self_references(candidates, requester_cm_id);

        if candidates.is_empty() {
            return Ok(ResolutionResult {
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    reason: Some("no_matches".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if candidates.len() == 1 {
            let person = candidates.into_iter().next().unwrap();
            return Ok(ResolutionResult {
                person: Some(person),
                confidence: 0.90,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("single_exact_match".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        let requester = self.person_repo.find_by_cm_id(requester_cm_id).await?;
        let Some(requester) = requester.filter(|r| r.school.is_some()) else {
            return Ok(self.ambiguous(candidates, 0.0, "no_requester_school", Default::default()));
        };

        let requester_info = RequesterInfo {
            school: requester.school.clone(),
            grade: requester.grade,
            city: requester.city.clone(),
            state: requester.state.clone(),
        };

        let same_school = self.filter_same_school(candidates, &requester_info);
        if same_school.is_empty() {
            return Ok(self.ambiguous(Vec::new(), 0.0, "no_same_school_matches", Default::default()));
        }

        let school = requester_info.school.clone().unwrap_or_default();

        if same_school.len() == 1 {
            if let Some(result) = self
                .try_grade_disambiguation(&same_school, requester_info.grade, session_cm_id, year, &school)
                .await?
            {
                return Ok(result);
            }
            let person = same_school.into_iter().next().unwrap();
            let mut extra = serde_json::Map::new();
            extra.insert("school".to_string(), serde_json::json!(school));
            extra.insert("match_count".to_string(), serde_json::json!(1));
            return Ok(ResolutionResult {
                person: Some(person),
                confidence: 0.75,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("same_school".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if let Some(result) = self
            .try_grade_disambiguation(&same_school, requester_info.grade, session_cm_id, year, &school)
            .await?
        {
            return Ok(result);
        }

        let mut extra = serde_json::Map::new();
        extra.insert("requester_school".to_string(), serde_json::json!(school));
        Ok(self.ambiguous(same_school, 0.5, "multiple_same_school_matches", extra))
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
            return Ok(ResolutionResult {
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    reason: Some("incomplete_name".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        let first_t = title_case(&parsed.first);
        let last_t = title_case(&parsed.last);
        let pool: Vec<Person> = match context.candidates.filter(|c| !c.is_empty()) {
            Some(c) => c.to_vec(),
            None => context.all_persons.map(|c| c.to_vec()).unwrap_or_default(),
        };
        let candidates: Vec<Person> = pool
            .into_iter()
            .filter(|c| title_case(&c.first_name) == first_t && title_case(&c.last_name) == last_t)
            .collect();
        let candidates = filter_self_references(candidates, requester_cm_id);

        if candidates.is_empty() {
            return Ok(ResolutionResult {
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    reason: Some("no_matches".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if candidates.len() == 1 {
            let person = candidates.into_iter().next().unwrap();
            return Ok(ResolutionResult {
                person: Some(person),
                confidence: 0.90,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("single_exact_match".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        // Mirrors the one DB fallback the context-driven path still makes:
        // requester school/grade/location come from the pre-loaded snapshot
        // when available, else a direct lookup.
        let snapshot = context.attendee_info.and_then(|m| m.get(&requester_cm_id));
        let requester_info = match snapshot {
            Some(s) if s.school.is_some() => RequesterInfo {
                school: s.school.clone(),
                grade: s.grade,
                city: s.city.clone(),
                state: s.state.clone(),
            },
            _ => {
                let requester = self.person_repo.find_by_cm_id(requester_cm_id).await?;
                let Some(requester) = requester.filter(|r| r.school.is_some()) else {
                    return Ok(self.ambiguous(candidates, 0.0, "no_requester_school", Default::default()));
                };
                RequesterInfo {
                    school: requester.school.clone(),
                    grade: requester.grade,
                    city: requester.city.clone(),
                    state: requester.state.clone(),
                }
            }
        };

        if requester_info.school.is_none() {
            return Ok(self.ambiguous(candidates, 0.0, "no_requester_school", Default::default()));
        }

        let same_school = self.filter_same_school(candidates, &requester_info);
        if same_school.is_empty() {
            return Ok(self.ambiguous(Vec::new(), 0.0, "no_same_school_matches", Default::default()));
        }

        let school = requester_info.school.clone().unwrap_or_default();

        if same_school.len() == 1 {
            if let Some(result) = self.try_grade_disambiguation_with_context(
                &same_school,
                requester_info.grade,
                session_cm_id,
                year,
                &school,
                context,
            ) {
                return Ok(result);
            }
            let person = same_school.into_iter().next().unwrap();
            let mut extra = serde_json::Map::new();
            extra.insert("school".to_string(), serde_json::json!(school));
            extra.insert("match_count".to_string(), serde_json::json!(1));
            return Ok(ResolutionResult {
                person: Some(person),
                confidence: 0.75,
                method: self.name().to_string(),
                metadata: ResolutionMetadata {
                    match_type: Some("same_school".to_string()),
                    extra,
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        if let Some(result) = self.try_grade_disambiguation_with_context(
            &same_school,
            requester_info.grade,
            session_cm_id,
            year,
            &school,
            context,
        ) {
            return Ok(result);
        }

        let mut extra = serde_json::Map::new();
        extra.insert("requester_school".to_string(), serde_json::json!(school));
        Ok(self.ambiguous(same_school, 0.5, "multiple_same_school_matches", extra))
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

    fn strategy(people: Vec<Person>) -> SchoolDisambiguationStrategy {
        SchoolDisambiguationStrategy::new(
            Arc::new(InMemoryPersonRepository::new(people)),
            Arc::new(InMemoryAttendeeRepository::new(Vec::new(), Vec::new())),
            SchoolDisambiguationConfig::default(),
        )
    }

    #[tokio::test]
    async fn single_exact_match_resolves_without_school_lookup() {
        let strat = strategy(vec![person(1, "Ella", "Fitzgerald")]);
        let result = strat.resolve("Ella Fitzgerald", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.confidence, 0.90);
        assert_eq!(result.metadata.match_type.as_deref(), Some("single_exact_match"));
    }

    #[tokio::test]
    async fn disambiguates_by_school_then_grade() {
        let mut requester = person(99, "Jane", "Requester");
        requester.school = Some("Lincoln Middle School".to_string());
        requester.grade = Some(7);

        let mut same_school_same_grade = person(1, "Sam", "Lee");
        same_school_same_grade.school = Some("Lincoln MS".to_string());
        same_school_same_grade.grade = Some(7);

        let mut same_school_other_grade = person(2, "Sam", "Lee");
        same_school_other_grade.school = Some("Lincoln Middle School".to_string());
        same_school_other_grade.grade = Some(5);

        let mut other_school = person(3, "Sam", "Lee");
        other_school.school = Some("Roosevelt High School".to_string());

        let strat =
            strategy(vec![requester, same_school_same_grade, same_school_other_grade, other_school]);
        let result = strat.resolve("Sam Lee", 99, None, None).await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.person.unwrap().cm_id, 1);
        assert_eq!(result.metadata.match_type.as_deref(), Some("same_school_same_grade"));
    }

    #[tokio::test]
    async fn ambiguous_without_requester_school() {
        let requester = person(99, "Jane", "Requester");
        let strat = strategy(vec![requester, person(1, "Sam", "Lee"), person(2, "Sam", "Lee")]);
        let result = strat.resolve("Sam Lee", 99, None, None).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.metadata.ambiguity_reason.as_deref(), Some("no_requester_school"));
    }

    #[tokio::test]
    async fn incomplete_name_is_unresolved() {
        let strat = strategy(vec![]);
        let result = strat.resolve("Cher", 99, None, None).await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.metadata.reason.as_deref(), Some("incomplete_name"));
    }
}
