use async_trait::async_trait;
use bunk_domain::SocialSignals;

/// The seam between confidence scoring and whatever social-graph backend is
/// in play, so `bunk-scoring` never depends on `bunk-graph` directly — the
/// graph crate implements this trait instead, keeping the dependency edge
/// pointing one way.
#[async_trait]
pub trait SocialGraphSignals: Send + Sync {
    async fn get_signals(&self, requester_cm_id: i64, target_cm_id: i64, session_cm_id: i64) -> SocialSignals;
}
