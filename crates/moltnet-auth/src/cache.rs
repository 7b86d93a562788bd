//! A small bounded, TTL-expiring cache shared by the JWKS key cache and the
//! introspection-result cache (spec §5: "the JWKS cache has bounded size
//! and TTL"; "process-wide" state).

use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    entries: DashMap<K, (V, Instant)>,
    max_entries: usize,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.1 > Instant::now() => Some(entry.0.clone()),
            Some(_) => {
                drop(self.entries.remove(key));
                None
            }
            None => None,
        }
    }

    /// Insert, evicting expired entries first and, if still at capacity,
    /// one arbitrary entry. Not LRU — a size bound, not an access-ordered
    /// policy, is all the spec requires.
    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.1 > now);
        if self.entries.len() >= self.max_entries {
            if let Some(evict) = self.entries.iter().next().map(|e| e.key().clone()) {
                self.entries.remove(&evict);
            }
        }
        self.entries.insert(key, (value, now + self.ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = TtlCache::new(8, Duration::from_millis(0));
        cache.insert("k".to_string(), 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k".to_string()), None);
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        assert!(cache.entries.len() <= 2);
    }
}
