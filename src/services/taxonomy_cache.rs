//! TTL-bounded, size-bounded cache of extracted taxonomies.
//!
//! Shared across concurrent requests in one process. Only successful
//! extractions are written; heuristic taxonomies never reach the cache.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::models::{CacheConfig, Taxonomy};
use crate::domain::ports::{Clock, SystemClock};
use crate::services::circuit_breaker::seconds;

/// Deterministic key over `(analysis_id, language, model_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(analysis_id: &str, language: &str, model_id: &str) -> Self {
        let mut hasher = Sha256::new();
        // Length-prefix each part so ("ab", "c") and ("a", "bc") differ.
        for part in [analysis_id, language, model_id] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    taxonomy: Arc<Taxonomy>,
    expires_at: DateTime<Utc>,
}

pub struct TaxonomyCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl TaxonomyCache {
    pub fn new(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_entries: max_entries.max(1),
            clock,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            seconds(config.ttl_secs),
            config.max_entries,
            Arc::new(SystemClock),
        )
    }

    /// Look up a taxonomy. Expired entries are reported as a miss and removed
    /// in the background.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Taxonomy>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.expires_at > now => return Some(Arc::clone(&entry.taxonomy)),
                Some(_) => {}
            }
        }

        self.remove_if_expired(key.clone());
        None
    }

    /// Insert a taxonomy. An empty taxonomy is not stored.
    ///
    /// At capacity, expired entries are evicted first, then the single entry
    /// closest to expiry.
    pub async fn set(&self, key: CacheKey, taxonomy: Taxonomy) {
        if taxonomy.is_empty() {
            return;
        }

        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            let expired = before - entries.len();

            if entries.len() >= self.max_entries {
                let nearest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(victim) = nearest {
                    entries.remove(&victim);
                    debug!(key = victim.as_str(), "Evicted taxonomy nearest expiry");
                }
            }
            if expired > 0 {
                debug!(expired, "Evicted expired taxonomies");
            }
        }

        entries.insert(
            key,
            CacheEntry {
                taxonomy: Arc::new(taxonomy),
                expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        );
    }

    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Remove `key` off the caller's path. The removal re-checks expiry so an
    /// entry refreshed in the meantime survives.
    fn remove_if_expired(&self, key: CacheKey) {
        let entries = Arc::clone(&self.entries);
        let clock = Arc::clone(&self.clock);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        runtime.spawn(async move {
            let mut entries = entries.write().await;
            let still_expired = entries
                .get(&key)
                .is_some_and(|entry| entry.expires_at <= clock.now());
            if still_expired {
                entries.remove(&key);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaxonomyDomain;
    use crate::domain::ports::ManualClock;

    fn taxonomy(name: &str) -> Taxonomy {
        Taxonomy::new(vec![TaxonomyDomain {
            name: name.to_string(),
            description: String::new(),
            file_indices: vec![0],
            features: vec![],
        }])
    }

    fn cache(max: usize) -> (TaxonomyCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = TaxonomyCache::new(Duration::hours(1), max, clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = CacheKey::new("run-1", "go", "model-x");
        let b = CacheKey::new("run-1", "go", "model-x");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, CacheKey::new("run-1", "go", "model-y"));
        assert_ne!(CacheKey::new("ab", "c", "m"), CacheKey::new("a", "bc", "m"));
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (cache, _) = cache(10);
        let key = CacheKey::new("a", "go", "m");
        cache.set(key.clone(), taxonomy("Auth")).await;

        let hit = cache.get(&key).await.expect("cached");
        assert_eq!(*hit, taxonomy("Auth"));
    }

    #[tokio::test]
    async fn test_empty_taxonomy_is_not_cached() {
        let (cache, _) = cache(10);
        let key = CacheKey::new("a", "go", "m");
        cache.set(key.clone(), Taxonomy::default()).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.size().await, 0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_and_removed() {
        let (cache, clock) = cache(10);
        let key = CacheKey::new("a", "go", "m");
        cache.set(key.clone(), taxonomy("Auth")).await;

        clock.advance(Duration::hours(1) + Duration::seconds(1));
        assert!(cache.get(&key).await.is_none());

        for _ in 0..50 {
            if cache.size().await == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.size().await, 0);
    }

    #[tokio::test]
    async fn test_refreshed_entry_survives_lazy_removal() {
        let (cache, clock) = cache(10);
        let key = CacheKey::new("a", "go", "m");
        cache.set(key.clone(), taxonomy("Old")).await;
        clock.advance(Duration::hours(2));

        // On the current-thread test runtime the background removal only runs
        // once we yield, which is after the refresh below.
        assert!(cache.get(&key).await.is_none());
        cache.set(key.clone(), taxonomy("New")).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(*cache.get(&key).await.expect("refreshed"), taxonomy("New"));
    }

    #[tokio::test]
    async fn test_evicts_expired_before_live() {
        let (cache, clock) = cache(2);
        let stale = CacheKey::new("stale", "go", "m");
        let live = CacheKey::new("live", "go", "m");
        cache.set(stale.clone(), taxonomy("Stale")).await;
        clock.advance(Duration::minutes(59));
        cache.set(live.clone(), taxonomy("Live")).await;
        clock.advance(Duration::minutes(2));

        cache.set(CacheKey::new("new", "go", "m"), taxonomy("New")).await;
        assert_eq!(cache.size().await, 2);
        assert!(cache.get(&live).await.is_some());
    }

    #[tokio::test]
    async fn test_evicts_nearest_expiry_when_all_live() {
        let (cache, clock) = cache(2);
        let first = CacheKey::new("first", "go", "m");
        let second = CacheKey::new("second", "go", "m");
        cache.set(first.clone(), taxonomy("First")).await;
        clock.advance(Duration::minutes(1));
        cache.set(second.clone(), taxonomy("Second")).await;
        clock.advance(Duration::minutes(1));

        let third = CacheKey::new("third", "go", "m");
        cache.set(third.clone(), taxonomy("Third")).await;

        assert_eq!(cache.size().await, 2);
        assert!(cache.get(&first).await.is_none());
        assert!(cache.get(&second).await.is_some());
        assert!(cache.get(&third).await.is_some());
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let (cache, _) = cache(1);
        let key = CacheKey::new("a", "go", "m");
        cache.set(key.clone(), taxonomy("One")).await;
        cache.set(key.clone(), taxonomy("Two")).await;
        assert_eq!(cache.size().await, 1);
        assert_eq!(*cache.get(&key).await.unwrap(), taxonomy("Two"));
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(TaxonomyCache::new(Duration::hours(1), 8, clock));
        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = CacheKey::new(&format!("run-{i}"), "go", "m");
                cache.set(key.clone(), taxonomy("Auth")).await;
                cache.get(&key).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(cache.size().await <= 8);
    }
}
