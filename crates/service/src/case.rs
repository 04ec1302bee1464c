use bunk_domain::ParseResult;

/// Picks out which requests within one parsed source row still need
/// resolving — age preferences and the `LastYearBunkmates`/`Sibling`
/// placeholders are handled elsewhere and never reach the pipeline.
#[derive(Debug, Clone)]
pub struct ResolutionCase {
    pub parse_idx: usize,
    pub requests_needing_resolution: Vec<usize>,
}

impl ResolutionCase {
    pub fn needs_resolution(&self) -> bool {
        !self.requests_needing_resolution.is_empty()
    }
}

/// Builds one [`ResolutionCase`] per valid parse result in `results`, skipping
/// parse results the parser itself marked invalid — those are reported back
/// verbatim with no resolution attempted.
pub fn build_cases(results: &[ParseResult]) -> Vec<ResolutionCase> {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_valid)
        .map(|(parse_idx, result)| {
            let requests_needing_resolution = result
                .parsed_requests
                .iter()
                .enumerate()
                .filter(|(_, req)| req.target_name().is_some())
                .map(|(req_idx, _)| req_idx)
                .collect();
            ResolutionCase { parse_idx, requests_needing_resolution }
        })
        .collect()
}
