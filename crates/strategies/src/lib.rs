use std::collections::HashMap;

use async_trait::async_trait;
use bunk_domain::{Person, ResolutionResult};
use bunk_repository::RepositoryError;

pub mod base;
pub mod exact_match;
pub mod fuzzy_match;
pub mod phonetic_match;
pub mod school_disambiguation;

pub use exact_match::ExactMatchStrategy;
pub use fuzzy_match::{FuzzyMatchStrategy, RelationshipBooster, RelationshipPick};
pub use phonetic_match::PhoneticMatchStrategy;
pub use school_disambiguation::SchoolDisambiguationStrategy;

/// Pre-loaded data a batch resolution pass hands to a strategy so it can
/// skip per-name repository round trips. `candidates` narrows the pool to
/// plausible name matches when the caller already knows how to filter;
/// `all_persons` is the unfiltered roster, used as a fallback pool by
/// strategies that need to search beyond `candidates` (e.g. parent-surname
/// lookups, school disambiguation on single-token targets).
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext<'a> {
    pub candidates: Option<&'a [Person]>,
    pub attendee_info: Option<&'a HashMap<i64, AttendeeSnapshot>>,
    pub all_persons: Option<&'a [Person]>,
}

/// The subset of enrollment data a strategy needs about one person, keyed
/// by `cm_id` in `ResolutionContext::attendee_info`.
#[derive(Debug, Clone, Default)]
pub struct AttendeeSnapshot {
    pub session_cm_id: Option<i64>,
    pub school: Option<String>,
    pub grade: Option<i32>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// A single name-resolution technique: exact lookup, fuzzy nickname/spelling
/// matching, phonetic matching, or school-based disambiguation.
///
/// `resolve` always goes to the repositories; `resolve_with_context` lets a
/// strategy reuse data a batch pass already loaded, defaulting to a plain
/// forward to `resolve` for strategies that gain nothing from pre-loading.
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
    ) -> Result<ResolutionResult, RepositoryError>;

    async fn resolve_with_context(
        &self,
        name: &str,
        requester_cm_id: i64,
        session_cm_id: Option<i64>,
        year: Option<i32>,
        _context: &ResolutionContext<'_>,
    ) -> Result<ResolutionResult, RepositoryError> {
        self.resolve(name, requester_cm_id, session_cm_id, year).await
    }
}
