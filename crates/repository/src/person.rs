use std::collections::HashMap;

use async_trait::async_trait;
use bunk_domain::Person;

use crate::error::RepositoryError;

/// Batch-oriented lookups over the person roster. Every query that accepts
/// `year` filters to that year to avoid cross-year name collisions; callers
/// pass `None` only when year-scoping is genuinely unavailable.
#[async_trait]
pub trait PersonRepository: Send + Sync {
    async fn find_by_cm_id(&self, cm_id: i64) -> Result<Option<Person>, RepositoryError>;

    async fn find_by_name(
        &self,
        first_title: &str,
        last_title: &str,
        year: Option<i32>,
    ) -> Result<Vec<Person>, RepositoryError>;

    async fn find_by_first_name(
        &self,
        first: &str,
        year: Option<i32>,
    ) -> Result<Vec<Person>, RepositoryError>;

    async fn find_by_normalized_name(
        &self,
        raw: &str,
        year: Option<i32>,
    ) -> Result<Vec<Person>, RepositoryError>;

    async fn find_by_first_and_parent_surname(
        &self,
        first: &str,
        surname: &str,
        year: Option<i32>,
    ) -> Result<Vec<Person>, RepositoryError>;

    /// The full year-filtered pool used by phonetic strategies. Must be
    /// fetched at most once per resolution call — reused across every
    /// phonetic algorithm rather than re-queried per algorithm.
    async fn get_all_for_phonetic_matching(
        &self,
        year: Option<i32>,
    ) -> Result<Vec<Person>, RepositoryError>;

    async fn bulk_find_by_cm_ids(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<i64, Person>, RepositoryError>;
}
