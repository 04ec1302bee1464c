use serde::Serialize;

/// Running counters over everything a [`crate::service::Phase2ResolutionService`]
/// has processed since construction or the last [`crate::service::Phase2ResolutionService::reset_stats`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionStats {
    pub total_processed: usize,
    pub high_confidence_resolved: usize,
    pub low_confidence_resolved: usize,
    pub ambiguous: usize,
    pub failed: usize,
    pub age_preferences: usize,
    pub networkx_enhanced: usize,
    pub staff_filtered: usize,
    pub prior_bunkmate_resolved: usize,
    pub ai_candidate_resolved: usize,
    pub ai_validated_resolved: usize,
    pub ai_hallucinations_detected: usize,
    pub smart_resolved: usize,
}
