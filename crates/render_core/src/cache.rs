// crates/render_core/src/cache.rs
//! Memoization of composite renders, keyed by (session, viewpoint).
//!
//! Entries are immutable PNG byte blobs and live until the session-lifecycle
//! collaborator purges them; the cache itself never expires anything by
//! time.

use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session_id: String,
    pub view_key: String,
}

impl CacheKey {
    pub fn new(session_id: &str, view_key: String) -> Self {
        Self {
            session_id: session_id.to_owned(),
            view_key,
        }
    }
}

/// Concurrent map of rendered composites. Tasks key it uniquely in practice
/// but it is shared state and treated as such.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: DashMap<CacheKey, Bytes>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn insert(&self, key: CacheKey, image: Bytes) {
        self.entries.insert(key, image);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry of one session.
    pub fn invalidate_session(&self, session_id: &str) {
        self.entries.retain(|k, _| k.session_id != session_id);
    }

    /// Removes entries for any session absent from the externally supplied
    /// valid-set. Driven by the session-lifecycle collaborator, not by
    /// elapsed time.
    pub fn sweep(&self, valid_sessions: &HashSet<String>) {
        let before = self.entries.len();
        self.entries.retain(|k, _| valid_sessions.contains(&k.session_id));
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "swept stale render cache entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(session: &str, view: &str) -> CacheKey {
        CacheKey::new(session, view.to_owned())
    }

    #[test]
    fn get_returns_inserted_bytes_unchanged() {
        let cache = RenderCache::new();
        let bytes = Bytes::from_static(b"png-bytes");
        cache.insert(key("s1", "0_0"), bytes.clone());

        assert_eq!(cache.get(&key("s1", "0_0")), Some(bytes));
        assert_eq!(cache.get(&key("s1", "5_0")), None);
        assert_eq!(cache.get(&key("s2", "0_0")), None);
    }

    #[test]
    fn insert_overwrites_keep_one_entry_per_key() {
        let cache = RenderCache::new();
        cache.insert(key("s1", "0_0"), Bytes::from_static(b"first"));
        cache.insert(key("s1", "0_0"), Bytes::from_static(b"second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("s1", "0_0")), Some(Bytes::from_static(b"second")));
    }

    #[test]
    fn invalidate_removes_only_that_session() {
        let cache = RenderCache::new();
        cache.insert(key("s1", "0_0"), Bytes::from_static(b"a"));
        cache.insert(key("s1", "5_0"), Bytes::from_static(b"b"));
        cache.insert(key("s2", "0_0"), Bytes::from_static(b"c"));

        cache.invalidate_session("s1");
        assert_eq!(cache.get(&key("s1", "0_0")), None);
        assert_eq!(cache.get(&key("s1", "5_0")), None);
        assert!(cache.get(&key("s2", "0_0")).is_some());
    }

    #[test]
    fn sweep_keeps_only_valid_sessions() {
        let cache = RenderCache::new();
        cache.insert(key("live", "0_0"), Bytes::from_static(b"a"));
        cache.insert(key("dead", "0_0"), Bytes::from_static(b"b"));

        let valid: HashSet<String> = ["live".to_owned()].into_iter().collect();
        cache.sweep(&valid);

        assert!(cache.get(&key("live", "0_0")).is_some());
        assert_eq!(cache.get(&key("dead", "0_0")), None);
    }
}
