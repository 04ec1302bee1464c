//! Turns per-request signals — parse confidence, resolution outcome,
//! enrollment history, social-graph context — into the single confidence
//! scalar the rest of the pipeline reports to callers.

pub mod scorer;
pub mod social_graph_signals;

pub use scorer::ConfidenceScorer;
pub use social_graph_signals::SocialGraphSignals;
