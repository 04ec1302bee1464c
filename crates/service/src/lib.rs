//! Ties the fuzzy/phonetic pipeline, confidence scoring, and social-graph
//! enrichment together into the batch entry point callers actually use:
//! staff filtering and AI-hint shortcuts first, the shared pipeline for
//! whatever's left, then scoring and enrichment over every resolved slot.

pub mod case;
pub mod service;
pub mod stats;

pub use case::ResolutionCase;
pub use service::Phase2ResolutionService;
pub use stats::ResolutionStats;
