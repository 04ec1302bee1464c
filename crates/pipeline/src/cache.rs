use std::sync::Mutex;

use bunk_domain::ResolutionResult;
use bunk_names::normalize_name;
use lru::LruCache;

/// Builds the deterministic cache key
/// `"resolution:<lowered_name>:<requester>:<session|none>:<year|none>"`.
pub fn cache_key(name: &str, requester_cm_id: i64, session_cm_id: Option<i64>, year: Option<i32>) -> String {
    format!(
        "resolution:{}:{}:{}:{}",
        normalize_name(name),
        requester_cm_id,
        session_cm_id.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string()),
        year.map(|y| y.to_string()).unwrap_or_else(|| "none".to_string()),
    )
}

/// Bounded LRU cache of accepted resolutions, guarded by a mutex.
///
/// The original's cache is an unbounded dict; a bounded cache is a
/// deliberate divergence (see DESIGN.md) since eviction never changes a
/// resolution's outcome, only whether it's recomputed.
pub struct ResolutionCache {
    inner: Mutex<LruCache<String, ResolutionResult>>,
}

impl ResolutionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).unwrap();
        ResolutionCache { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn get(&self, key: &str) -> Option<ResolutionResult> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: String, value: ResolutionResult) {
        self.inner.lock().unwrap().put(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format_matches_the_documented_shape() {
        let key = cache_key("Ella Fitzgerald", 42, Some(7), Some(2026));
        assert_eq!(key, "resolution:ella fitzgerald:42:7:2026");
    }

    #[test]
    fn key_uses_none_placeholders() {
        let key = cache_key("Ella Fitzgerald", 42, None, None);
        assert_eq!(key, "resolution:ella fitzgerald:42:none:none");
    }

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let cache = ResolutionCache::new(1);
        cache.put("a".to_string(), ResolutionResult::unresolved("x"));
        cache.put("b".to_string(), ResolutionResult::unresolved("y"));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }
}
