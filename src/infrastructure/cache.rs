//! In-process TTL cache for derived read models.
//!
//! Entries expire after their TTL; once the cache is full the entry that
//! was inserted first is evicted. The cache is built once at start-up and
//! shared through [`AppState`](super::AppState).
//!
//! Every removal bumps a generation counter. A reader that computes a value
//! after a miss stores it with [`TtlCache::insert_unless_invalidated`], so a
//! value computed from data that changed meanwhile is never kept.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    /// Insertion sequence number, smallest is oldest
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub max_size: usize,
}

#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    max_size: usize,
    next_seq: AtomicU64,
    generation: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(default_ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            max_size: max_size.max(1),
            next_seq: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Fresh value for `key`. An expired entry is dropped on the way.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| !entry.is_fresh(now));
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.put(key, value, ttl);
    }

    /// Current invalidation generation. Read it before computing a value
    /// to cache.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store `value` only if nothing was invalidated since `since` was read
    /// from [`generation`](Self::generation). Returns whether it was kept.
    pub fn insert_unless_invalidated(&self, key: K, value: V, since: u64) -> bool {
        if self.generation() != since {
            return false;
        }
        let seq = self.put(key.clone(), value, self.default_ttl);

        // An invalidation that ran between the check and the put may have
        // missed this entry
        if self.generation() != since {
            self.entries.remove_if(&key, |_, entry| entry.seq == seq);
            return false;
        }
        true
    }

    fn put(&self, key: K, value: V, ttl: Duration) -> u64 {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_oldest();
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                seq,
            },
        );
        seq
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.bump_generation();
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop every entry whose key matches `predicate`.
    pub fn remove_where(&self, predicate: impl Fn(&K) -> bool) {
        self.bump_generation();
        self.entries.retain(|key, _| !predicate(key));
    }

    pub fn clear(&self) {
        self.bump_generation();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let total = self.entries.len();
        let valid = self
            .entries
            .iter()
            .filter(|entry| entry.is_fresh(now))
            .count();

        CacheStats {
            total,
            valid,
            expired: total.saturating_sub(valid),
            max_size: self.max_size,
        }
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.seq)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// Keys for the read models the API caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    HabitsSummary(i32),
    Leaderboard(u64),
}

pub type ResponseCache = TtlCache<CacheKey, serde_json::Value>;

impl TtlCache<CacheKey, serde_json::Value> {
    /// Forget everything derived from `user_id`'s data. Leaderboards rank
    /// every user, so they go too.
    pub fn invalidate_user(&self, user_id: i32) {
        self.remove_where(|key| match key {
            CacheKey::HabitsSummary(id) => *id == user_id,
            CacheKey::Leaderboard(_) => true,
        });
        tracing::debug!("Cache invalidated for user {}", user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn returns_fresh_values() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert!(cache.contains(&"a"));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert_with_ttl("short", 1, Duration::from_millis(20));
        cache.insert("long", 2);

        std::thread::sleep(Duration::from_millis(40));

        let stats = cache.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.expired, 1);

        assert_eq!(cache.get(&"short"), None);
        assert_eq!(cache.get(&"long"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn purge_drops_only_expired() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert_with_ttl(1, 1, Duration::ZERO);
        cache.insert_with_ttl(2, 2, Duration::ZERO);
        cache.insert(3, 3);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let cache: TtlCache<u32, &str> = TtlCache::new(Duration::from_secs(60), 2);
        cache.insert(1, "first");
        cache.insert(2, "second");
        cache.insert(3, "third");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some("second"));
        assert_eq!(cache.get(&3), Some("third"));
    }

    #[test]
    fn overwriting_a_key_does_not_evict() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(60), 2);
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.insert(2, 20);

        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&2), Some(20));
    }

    #[test]
    fn invalidate_user_keeps_other_summaries() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        cache.insert(CacheKey::HabitsSummary(1), json!({"total_habits": 1}));
        cache.insert(CacheKey::HabitsSummary(2), json!({"total_habits": 2}));
        cache.insert(CacheKey::Leaderboard(10), json!([]));

        cache.invalidate_user(1);

        assert!(!cache.contains(&CacheKey::HabitsSummary(1)));
        assert!(cache.contains(&CacheKey::HabitsSummary(2)));
        assert!(!cache.contains(&CacheKey::Leaderboard(10)));
    }

    #[test]
    fn value_computed_across_an_invalidation_is_dropped() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        let key = CacheKey::HabitsSummary(1);

        let before = cache.generation();
        // The user's data changes while the stale value is being computed
        cache.invalidate_user(1);
        let stale = json!({"total_habits": 0});
        assert!(!cache.insert_unless_invalidated(key.clone(), stale, before));
        assert!(!cache.contains(&key));

        let since = cache.generation();
        let fresh = json!({"total_habits": 1});
        assert!(cache.insert_unless_invalidated(key.clone(), fresh, since));
        assert_eq!(cache.get(&key), Some(json!({"total_habits": 1})));
    }

    #[test]
    fn plain_insert_ignores_generation() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(60), 10);
        let before = cache.generation();
        cache.remove(&7);
        assert_ne!(cache.generation(), before);
        cache.insert(1, 1);
        assert_eq!(cache.get(&1), Some(1));
    }

    #[test]
    fn clear_and_remove() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert_eq!(cache.remove(&1), Some(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
