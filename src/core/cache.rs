// src/core/cache.rs

use moka::Expiry;
use moka::future::Cache;
use std::future::Future;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use strum::Display;
use tracing::{debug, info};

use crate::core::models::AggregatedVerdict;

/// Which expensive operation produced a cached value. Part of every key, so the same
/// subject looked up by two operations never collides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Reputation,
    SubdomainResolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: OperationKind,
    pub subject: String,
}

impl CacheKey {
    pub fn new(kind: OperationKind, subject: impl AsRef<str>) -> Self {
        Self {
            kind,
            subject: subject.as_ref().trim().to_ascii_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Reputation(Box<AggregatedVerdict>),
    /// `None` caches a definitive "does not resolve".
    Resolution(Option<IpAddr>),
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// Lets every entry carry its own lifetime. Replacing an entry restarts its clock.
struct PerEntryTtl;

impl Expiry<CacheKey, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-wide lookup cache with per-entry TTL and a hard entry cap.
///
/// Safe for concurrent readers and writers. Two workers computing the same key at the
/// same time both write and the last writer wins.
pub struct LookupCache {
    cache: Cache<CacheKey, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

impl LookupCache {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        info!(max_entries, "Lookup cache initialized.");

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the stored value if it was put less than its ttl ago.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        match self.cache.get(key).await {
            Some(entry) if entry.is_fresh() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(kind = %key.kind, subject = %key.subject, "Cache hit.");
                Some(entry.value)
            }
            Some(_) => {
                // Expired but not yet swept by moka.
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(kind = %key.kind, subject = %key.subject, "Cache entry expired.");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(kind = %key.kind, subject = %key.subject, "Cache miss.");
                None
            }
        }
    }

    /// Stores `value`, replacing whatever was there.
    pub async fn put(&self, key: CacheKey, value: CachedValue, ttl: Duration) {
        let entry = CacheEntry {
            value,
            created_at: Instant::now(),
            ttl,
        };
        self.cache.insert(key, entry).await;
    }

    /// Read-then-optionally-write: returns the cached value, or runs `compute` and stores
    /// its result. Errors are passed through and never stored.
    pub async fn get_or_try_compute<F, Fut, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<CachedValue, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedValue, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        let value = compute().await?;
        self.put(key, value.clone(), ttl).await;
        Ok(value)
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn resolution(ip: &str) -> CachedValue {
        CachedValue::Resolution(Some(ip.parse().unwrap()))
    }

    #[tokio::test]
    async fn get_within_ttl_returns_stored_value() {
        let cache = LookupCache::new(100);
        let key = CacheKey::new(OperationKind::SubdomainResolution, "www.example.com");
        cache.put(key.clone(), resolution("93.184.216.34"), Duration::from_secs(60)).await;

        assert_eq!(cache.get(&key).await, Some(resolution("93.184.216.34")));
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn entry_is_a_miss_after_ttl() {
        let cache = LookupCache::new(100);
        let key = CacheKey::new(OperationKind::SubdomainResolution, "api.example.com");
        cache.put(key.clone(), resolution("192.0.2.1"), Duration::from_millis(50)).await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get(&key).await, None);
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn keys_include_operation_kind() {
        let cache = LookupCache::new(100);
        let resolution_key = CacheKey::new(OperationKind::SubdomainResolution, "203.0.113.5");
        let reputation_key = CacheKey::new(OperationKind::Reputation, "203.0.113.5");
        cache.put(resolution_key.clone(), CachedValue::Resolution(None), Duration::from_secs(60)).await;

        assert_eq!(cache.get(&reputation_key).await, None);
        assert_eq!(cache.get(&resolution_key).await, Some(CachedValue::Resolution(None)));
    }

    #[tokio::test]
    async fn subject_is_case_insensitive() {
        let a = CacheKey::new(OperationKind::SubdomainResolution, "WWW.Example.com");
        let b = CacheKey::new(OperationKind::SubdomainResolution, "www.example.com");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn get_or_try_compute_runs_the_operation_once_within_ttl() {
        let cache = LookupCache::new(100);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new(OperationKind::SubdomainResolution, "mail.example.com");

        for _ in 0..3 {
            let calls = calls.clone();
            let value = cache
                .get_or_try_compute(key.clone(), Duration::from_secs(60), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(resolution("192.0.2.25"))
                })
                .await
                .unwrap();
            assert_eq!(value, resolution("192.0.2.25"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed_and_replaced() {
        let cache = LookupCache::new(100);
        let key = CacheKey::new(OperationKind::SubdomainResolution, "dev.example.com");
        cache.put(key.clone(), resolution("192.0.2.1"), Duration::from_millis(30)).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let value = cache
            .get_or_try_compute(key.clone(), Duration::from_secs(60), || async {
                Ok::<_, String>(resolution("192.0.2.2"))
            })
            .await
            .unwrap();

        assert_eq!(value, resolution("192.0.2.2"));
        assert_eq!(cache.get(&key).await, Some(resolution("192.0.2.2")));
    }

    #[tokio::test]
    async fn entry_count_never_exceeds_the_cap() {
        let cache = LookupCache::new(2);
        for i in 0..5 {
            let key = CacheKey::new(OperationKind::SubdomainResolution, format!("h{}.example.com", i));
            cache.put(key, resolution("192.0.2.1"), Duration::from_secs(60)).await;
        }
        assert!(cache.stats().await.entries <= 2);
    }

    #[tokio::test]
    async fn expired_lookup_does_not_drop_a_newer_put() {
        let cache = LookupCache::new(100);
        let key = CacheKey::new(OperationKind::SubdomainResolution, "cdn.example.com");
        cache.put(key.clone(), resolution("192.0.2.1"), Duration::from_millis(30)).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get(&key).await, None);
        cache.put(key.clone(), resolution("192.0.2.9"), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&key).await, Some(resolution("192.0.2.9")));
        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn failed_computations_are_not_stored() {
        let cache = LookupCache::new(100);
        let key = CacheKey::new(OperationKind::SubdomainResolution, "flaky.example.com");
        let result = cache
            .get_or_try_compute(key.clone(), Duration::from_secs(60), || async {
                Err::<CachedValue, _>("SERVFAIL".to_string())
            })
            .await;
        assert_eq!(result, Err("SERVFAIL".to_string()));
        assert_eq!(cache.get(&key).await, None);
    }
}
