use async_trait::async_trait;
use bunk_domain::SocialSignals;
use bunk_scoring::SocialGraphSignals;

use crate::social_graph::SocialGraph;

#[async_trait]
impl SocialGraphSignals for SocialGraph {
    async fn get_signals(&self, requester_cm_id: i64, target_cm_id: i64, session_cm_id: i64) -> SocialSignals {
        self.get_social_signals(requester_cm_id, target_cm_id, session_cm_id).await
    }
}
