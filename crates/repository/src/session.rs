use async_trait::async_trait;
use bunk_domain::Session;

use crate::error::RepositoryError;

/// Sessions form a forest (a main session may have embedded/AG children).
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_by_cm_id(&self, session_cm_id: i64) -> Result<Option<Session>, RepositoryError>;

    async fn list_for_year(&self, year: i32) -> Result<Vec<Session>, RepositoryError>;

    /// Direct children of `session_cm_id` in the session forest.
    async fn get_children(&self, session_cm_id: i64) -> Result<Vec<Session>, RepositoryError>;

    /// `session_cm_id` plus every descendant session id, used when social
    /// graph construction needs to pull attendees from embedded/AG sessions
    /// as well as their main session.
    async fn get_expanded_session_ids(
        &self,
        session_cm_id: i64,
    ) -> Result<Vec<i64>, RepositoryError> {
        let mut ids = vec![session_cm_id];
        let mut frontier = self.get_children(session_cm_id).await?;
        while let Some(child) = frontier.pop() {
            ids.push(child.session_cm_id);
            frontier.extend(self.get_children(child.session_cm_id).await?);
        }
        Ok(ids)
    }
}
