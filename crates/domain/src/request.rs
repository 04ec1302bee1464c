use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    BunkWith,
    NotBunkWith,
    AgePreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestSource {
    Family,
    Staff,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgePreference {
    Older,
    Younger,
    Same,
}

/// Replaces the "magic string" sentinel check on `target_name`: a request
/// either names someone, or points at one of the two placeholders that are
/// expanded into concrete requests elsewhere and must bypass resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionTarget {
    Named(String),
    LastYearBunkmates,
    Sibling,
}

impl ResolutionTarget {
    pub fn name(&self) -> Option<&str> {
        match self {
            ResolutionTarget::Named(n) => Some(n.as_str()),
            _ => None,
        }
    }
}

/// Free-form metadata the upstream parser attaches to a request, modeled as
/// a tagged sum where the source's shape is known, with unknown keys
/// preserved under `extra` for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiHint {
    None,
    SingleId(i64),
    CandidateList(Vec<i64>),
    Historical { keywords: Vec<String> },
}

impl Default for AiHint {
    fn default() -> Self {
        AiHint::None
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub match_certainty: Option<String>,
    #[serde(default)]
    pub keywords_found: Vec<String>,
    #[serde(default)]
    pub ai_provided_person_id: bool,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RequestMetadata {
    /// "from last year" / "last year" / "from before", case-insensitive,
    /// checked against parsed keywords first and raw text as a fallback.
    pub fn has_last_year_context(&self, raw_text: &str) -> bool {
        const PATTERNS: [&str; 3] = ["from last year", "last year", "from before"];
        let joined = self.keywords_found.join(" ").to_lowercase();
        if PATTERNS.iter().any(|p| joined.contains(p)) {
            return true;
        }
        raw_text.to_lowercase().contains("last year")
    }
}

/// The shared per-row context every `ParsedRequest` in a `ParseResult` was
/// parsed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRequestContext {
    pub requester_cm_id: i64,
    pub requester_grade: Option<String>,
    pub session_cm_id: Option<i64>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRequest {
    pub raw_text: String,
    pub request_type: RequestType,
    pub target: Option<ResolutionTarget>,
    pub age_preference: Option<AgePreference>,
    pub source: RequestSource,
    pub source_field: String,
    pub confidence: f64,
    #[serde(default)]
    pub ai_hint: AiHint,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

impl ParsedRequest {
    pub fn target_name(&self) -> Option<&str> {
        self.target.as_ref().and_then(ResolutionTarget::name)
    }

    pub fn is_last_year_bunkmates(&self) -> bool {
        matches!(self.target, Some(ResolutionTarget::LastYearBunkmates))
    }

    pub fn is_sibling_placeholder(&self) -> bool {
        matches!(self.target, Some(ResolutionTarget::Sibling))
    }
}

/// One unit of Phase 1 output: the requests parsed from a single source row,
/// alongside the context they share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub parse_request: Option<ParseRequestContext>,
    pub parsed_requests: Vec<ParsedRequest>,
    pub is_valid: bool,
}
