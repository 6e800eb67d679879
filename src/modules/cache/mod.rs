//! Short-lived result cache.
//!
//! Stores successful payloads keyed by the canonical lookup-key form and
//! serves them for a fixed TTL, short-circuiting the fetch pipeline
//! entirely on a hit. Entries are replaced wholesale on overwrite and are
//! never served past their TTL. Eviction is TTL-only; no capacity cap is
//! enforced.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::gateway::LookupKey;

/// Default time-to-live for cached payloads.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    inserted_at: Instant,
}

/// TTL cache over successful lookup payloads.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_RESULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the payload for `key` if it was inserted less than one TTL ago.
    pub fn get(&self, key: &LookupKey) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    /// Store `payload` under `key`, replacing any previous entry.
    pub fn set(&self, key: &LookupKey, payload: Value) {
        self.set_at(key, payload, Instant::now());
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &LookupKey, now: Instant) -> Option<Value> {
        let guard = self.entries.read().ok()?;
        let entry = guard.get(&key.cache_key())?;
        if now.duration_since(entry.inserted_at) >= self.ttl {
            return None;
        }
        Some(entry.payload.clone())
    }

    fn set_at(&self, key: &LookupKey, payload: Value, now: Instant) {
        if let Ok(mut guard) = self.entries.write() {
            // Opportunistic sweep keeps dead entries from piling up between
            // overwrites of the same small key set.
            let ttl = self.ttl;
            guard.retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
            guard.insert(
                key.cache_key(),
                CacheEntry {
                    payload,
                    inserted_at: now,
                },
            );
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> LookupKey {
        LookupKey::new("123", "456").unwrap()
    }

    #[test]
    fn set_then_get_returns_value() {
        let cache = ResultCache::new();
        cache.set(&key(), json!({"itemid": 456}));
        assert_eq!(cache.get(&key()), Some(json!({"itemid": 456})));
    }

    #[test]
    fn expired_entry_is_absent() {
        let cache = ResultCache::with_ttl(Duration::from_secs(300));
        let inserted = Instant::now();
        cache.set_at(&key(), json!({"itemid": 456}), inserted);

        let just_before = inserted + Duration::from_secs(299);
        assert!(cache.get_at(&key(), just_before).is_some());

        let at_ttl = inserted + Duration::from_secs(300);
        assert!(cache.get_at(&key(), at_ttl).is_none());
    }

    #[test]
    fn overwrite_is_last_write_wins() {
        let cache = ResultCache::new();
        cache.set(&key(), json!({"rev": 1}));
        cache.set(&key(), json!({"rev": 2}));
        assert_eq!(cache.get(&key()), Some(json!({"rev": 2})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_drops_expired_entries_on_insert() {
        let cache = ResultCache::with_ttl(Duration::from_secs(300));
        let old = Instant::now();
        cache.set_at(&LookupKey::new("1", "1").unwrap(), json!(1), old);

        let later = old + Duration::from_secs(301);
        cache.set_at(&LookupKey::new("2", "2").unwrap(), json!(2), later);
        assert_eq!(cache.len(), 1);
    }
}
