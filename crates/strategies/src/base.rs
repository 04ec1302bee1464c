use std::collections::HashMap;

use bunk_domain::{Person, ResolutionMetadata, ResolutionResult};

/// Confidence deltas applied once a candidate's session is known relative to
/// the request's session context. Each strategy that shares this helper
/// supplies its own values — the magnitudes differ (phonetic matches are
/// penalized harder for a session mismatch than exact matches are).
#[derive(Debug, Clone, Copy)]
pub struct SessionAdjustment {
    pub same_session_boost: f64,
    pub different_session_penalty: f64,
    pub not_enrolled_penalty: f64,
}

impl Default for SessionAdjustment {
    /// `base_match_strategy.py`'s own defaults, used verbatim by any
    /// strategy that doesn't override them in its config section.
    fn default() -> Self {
        SessionAdjustment {
            same_session_boost: 0.05,
            different_session_penalty: -0.10,
            not_enrolled_penalty: -0.05,
        }
    }
}

/// Shared fallback used when a strategy's config carries neither a
/// match-type-specific base nor a `default_base`.
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Default confidence assigned to a unique same-session match when a
/// strategy's config doesn't override `session_match`.
pub const DEFAULT_SESSION_MATCH: f64 = 0.80;

/// Removes `requester_cm_id` from a set of name-matched candidates. Every
/// matching strategy runs this before deciding resolved/ambiguous/no-match,
/// since a requester can share their own name with themselves in the raw
/// roster scan but must never resolve to themselves.
pub fn filter_self_references(candidates: Vec<Person>, requester_cm_id: i64) -> Vec<Person> {
    candidates
        .into_iter()
        .filter(|c| c.cm_id != requester_cm_id)
        .collect()
}

/// Adjusts a base confidence for session context. `None` for either the
/// requested session or the candidate's own session means "no session
/// information available" and is treated the same as "not enrolled" —
/// there's nothing to compare against either way.
pub fn apply_session_adjustment(
    base_confidence: f64,
    session_cm_id: Option<i64>,
    person_session_cm_id: Option<i64>,
    adjustment: SessionAdjustment,
) -> f64 {
    match (session_cm_id, person_session_cm_id) {
        (Some(requested), Some(actual)) if requested == actual => {
            base_confidence + adjustment.same_session_boost
        }
        (Some(_), Some(_)) => base_confidence + adjustment.different_session_penalty,
        _ => base_confidence + adjustment.not_enrolled_penalty,
    }
}

/// Disambiguates a set of same-name candidates by session: resolves if
/// exactly one candidate's session matches `session_cm_id`, otherwise
/// returns an unresolved (not ambiguous) result — mirrors
/// `_disambiguate_with_session_context`'s narrow scope, leaving the
/// "still ambiguous" decision to the caller.
pub fn disambiguate_with_session_context(
    method: &str,
    candidates: &[Person],
    session_cm_id: Option<i64>,
    person_sessions: &HashMap<i64, i64>,
    session_match_confidence: f64,
) -> ResolutionResult {
    let Some(session_cm_id) = session_cm_id else {
        return ResolutionResult::unresolved(method);
    };
    let same_session: Vec<&Person> = candidates
        .iter()
        .filter(|c| person_sessions.get(&c.cm_id) == Some(&session_cm_id))
        .collect();

    if same_session.len() == 1 {
        let person = same_session[0].clone();
        return ResolutionResult {
            person: Some(person),
            confidence: session_match_confidence,
            method: method.to_string(),
            metadata: ResolutionMetadata {
                match_type: Some("session_disambiguated".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
    }

    ResolutionResult::unresolved(method)
}

/// Builds the standard "multiple candidates, couldn't narrow further"
/// result, with `reason` and `match_count` always present and any
/// strategy-specific keys folded into `extra`.
pub fn build_ambiguous_result(
    method: &str,
    candidates: Vec<Person>,
    confidence: f64,
    reason: &str,
    extra: serde_json::Map<String, serde_json::Value>,
) -> ResolutionResult {
    let match_count = candidates.len();
    ResolutionResult {
        person: None,
        confidence,
        method: method.to_string(),
        candidates,
        metadata: ResolutionMetadata {
            ambiguity_reason: Some(reason.to_string()),
            match_count: Some(match_count),
            extra,
            ..Default::default()
        },
    }
}
