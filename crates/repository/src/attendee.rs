use std::collections::HashMap;

use async_trait::async_trait;
use bunk_domain::{AttendeeInfo, Person};

use crate::error::RepositoryError;

/// Result of a prior-year-bunkmates lookup: the bunkmates' cm_ids, the name
/// of the bunk they shared, and the year they shared it (for recency
/// weighting in social-graph construction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorBunkmates {
    pub cm_ids: Vec<i64>,
    pub prior_bunk: String,
    pub prior_year: i32,
}

#[async_trait]
pub trait AttendeeRepository: Send + Sync {
    async fn get_by_person_and_year(
        &self,
        cm_id: i64,
        year: i32,
    ) -> Result<Option<AttendeeInfo>, RepositoryError>;

    /// One call per year, covering every id in `ids` — the mandatory
    /// batch-loading path used by the resolution pipeline.
    async fn bulk_get_sessions_for_persons(
        &self,
        ids: &[i64],
        year: i32,
    ) -> Result<HashMap<i64, i64>, RepositoryError>;

    async fn get_session_for_person(
        &self,
        cm_id: i64,
        year: i32,
    ) -> Result<Option<i64>, RepositoryError>;

    async fn find_prior_year_bunkmates(
        &self,
        person_cm_id: i64,
        session_cm_id: i64,
        year: i32,
    ) -> Result<Option<PriorBunkmates>, RepositoryError>;

    async fn get_session_attendees(
        &self,
        session_cm_id: i64,
        year: i32,
    ) -> Result<Vec<AttendeeInfo>, RepositoryError>;

    async fn get_age_filtered_session_peers(
        &self,
        person_cm_id: i64,
        session_cm_id: i64,
        year: i32,
        max_age_diff_months: f64,
    ) -> Result<Vec<Person>, RepositoryError>;

    /// Batch form of [`AttendeeRepository::find_prior_year_bunkmates`] for
    /// social-graph construction, which looks this up for an entire
    /// session's roster. The default forwards one call per id; a backing
    /// store with a native batch query can override this for fewer round
    /// trips.
    async fn bulk_find_prior_year_bunkmates(
        &self,
        ids: &[i64],
        session_cm_id: i64,
        year: i32,
    ) -> Result<HashMap<i64, PriorBunkmates>, RepositoryError> {
        let mut out = HashMap::new();
        for &id in ids {
            if let Some(prior) = self.find_prior_year_bunkmates(id, session_cm_id, year).await? {
                out.insert(id, prior);
            }
        }
        Ok(out)
    }
}
