//! Generic in-process TTL cache, used for the retrieval engine's result
//! cache (§4.7) and the project reporting service's report cache (§4.10).
//! Safe for concurrent access; on write races, last-writer-wins.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, Instant)>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((value, stored_at)) if stored_at.elapsed() <= self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: K, value: V) {
        self.entries.lock().unwrap().insert(key, (value, Instant::now()));
    }

    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(v) = self.get(&key) {
            return v;
        }
        let v = compute();
        self.put(key, v.clone());
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_before_ttl_misses_after() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_millis(20));
        cache.put("k".to_string(), 42);
        assert_eq!(cache.get(&"k".to_string()), Some(42));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"k".to_string()), None);
    }

    #[test]
    fn get_or_insert_with_computes_once_per_key() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60));
        let first = cache.get_or_insert_with("a", || 1);
        let second = cache.get_or_insert_with("a", || 2);
        assert_eq!(first, 1);
        assert_eq!(second, 1);
    }
}
