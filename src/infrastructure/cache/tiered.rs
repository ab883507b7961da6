//! Two-level cache: process-local tier in front of a shared store
//!
//! Tier 1 is the moka-backed in-process map; tier 2 is a shared
//! network-backed store (Redis). Tier 2 is strictly best-effort: reads are
//! bounded by a short timeout, writes happen asynchronously, and any tier-2
//! failure degrades the cache to tier-1-only behavior instead of surfacing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};

use crate::domain::DomainError;
use crate::domain::cache::Cache;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};

/// Configuration for the tiered cache
#[derive(Debug, Clone)]
pub struct TieredCacheConfig {
    /// Process-local tier settings
    pub local: InMemoryCacheConfig,
    /// Upper bound for tier-1 entry TTLs; longer TTLs only apply in tier 2
    pub local_ttl_cap: Duration,
    /// Strict deadline for tier-2 reads
    pub shared_get_timeout: Duration,
    /// Deadline for the asynchronous tier-2 writes
    pub shared_set_timeout: Duration,
}

impl Default for TieredCacheConfig {
    fn default() -> Self {
        Self {
            local: InMemoryCacheConfig::default(),
            local_ttl_cap: Duration::from_secs(300),
            shared_get_timeout: Duration::from_millis(50),
            shared_set_timeout: Duration::from_millis(100),
        }
    }
}

impl TieredCacheConfig {
    pub fn with_local_ttl_cap(mut self, cap: Duration) -> Self {
        self.local_ttl_cap = cap;
        self
    }

    pub fn with_shared_get_timeout(mut self, timeout: Duration) -> Self {
        self.shared_get_timeout = timeout;
        self
    }
}

/// Point-in-time cache statistics for the health surface
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
    pub local_entries: usize,
    pub shared_enabled: bool,
}

/// Two-level cache with per-entry TTLs and shared hit/miss counters.
#[derive(Debug)]
pub struct TieredCache {
    local: InMemoryCache,
    shared: Option<Arc<dyn Cache>>,
    shared_enabled: AtomicBool,
    config: TieredCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    total_requests: AtomicU64,
}

impl TieredCache {
    /// Builds a tier-1-only cache. Used when no shared store is configured
    /// or its connectivity probe failed.
    pub fn memory_only(config: TieredCacheConfig) -> Self {
        Self {
            local: InMemoryCache::with_config(config.local.clone()),
            shared: None,
            shared_enabled: AtomicBool::new(false),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
        }
    }

    /// Builds a two-tier cache, probing the shared store first. A failed
    /// probe disables tier 2 for the process; `reprobe` can re-enable it.
    pub async fn with_shared(config: TieredCacheConfig, shared: Arc<dyn Cache>) -> Self {
        let enabled = match shared.ping().await {
            Ok(()) => {
                tracing::info!("Shared cache tier connected");
                true
            }
            Err(e) => {
                tracing::warn!("Shared cache unavailable, using memory only: {}", e);
                false
            }
        };

        Self {
            local: InMemoryCache::with_config(config.local.clone()),
            shared: Some(shared),
            shared_enabled: AtomicBool::new(enabled),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
        }
    }

    /// Re-probes a disabled shared tier, re-enabling it on success.
    pub async fn reprobe(&self) -> bool {
        let Some(shared) = &self.shared else {
            return false;
        };

        match shared.ping().await {
            Ok(()) => {
                self.shared_enabled.store(true, Ordering::SeqCst);
                tracing::info!("Shared cache tier re-enabled");
                true
            }
            Err(e) => {
                tracing::warn!("Shared cache reprobe failed: {}", e);
                false
            }
        }
    }

    /// Drops the shared tier for the remainder of the process lifetime.
    pub fn disable_shared(&self) {
        self.shared_enabled.store(false, Ordering::SeqCst);
    }

    fn shared_if_enabled(&self) -> Option<&Arc<dyn Cache>> {
        if self.shared_enabled.load(Ordering::SeqCst) {
            self.shared.as_ref()
        } else {
            None
        }
    }

    /// Looks a value up, fastest tier first. Returns `None` on a total
    /// miss; tier errors are absorbed and counted as misses.
    pub async fn get<V>(&self, key: &str) -> Option<V>
    where
        V: DeserializeOwned + Send,
    {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        // Tier 1: process-local
        match self.local.get_raw(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    counter!("qa_cache_hits_total", "tier" => "local").increment(1);
                    tracing::debug!(key, "Local cache hit");
                    return Some(value);
                }
                Err(e) => {
                    tracing::warn!(key, "Corrupt local cache entry: {}", e);
                    let _ = self.local.delete(key).await;
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(key, "Local cache read error: {}", e),
        }

        // Tier 2: shared store, under a strict deadline
        if let Some(shared) = self.shared_if_enabled() {
            match tokio::time::timeout(self.config.shared_get_timeout, shared.get_raw(key)).await {
                Ok(Ok(Some(raw))) => match serde_json::from_str(&raw) {
                    Ok(value) => {
                        // Promote into tier 1 with a capped TTL
                        if let Err(e) = self
                            .local
                            .set_raw(key, &raw, self.config.local_ttl_cap)
                            .await
                        {
                            tracing::warn!(key, "Failed to promote cache entry: {}", e);
                        }

                        self.hits.fetch_add(1, Ordering::Relaxed);
                        counter!("qa_cache_hits_total", "tier" => "shared").increment(1);
                        tracing::debug!(key, "Shared cache hit");
                        return Some(value);
                    }
                    Err(e) => tracing::warn!(key, "Corrupt shared cache entry: {}", e),
                },
                Ok(Ok(None)) => {}
                Ok(Err(e)) => tracing::warn!(key, "Shared cache read error: {}", e),
                Err(_) => tracing::warn!(key, "Shared cache read timed out"),
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("qa_cache_misses_total").increment(1);
        None
    }

    /// Writes immediately to tier 1 with `min(ttl, local_ttl_cap)` and
    /// fires a best-effort asynchronous tier-2 write with the full TTL.
    pub async fn set<V>(&self, key: &str, value: &V, ttl: Duration)
    where
        V: Serialize + Send + Sync,
    {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "Failed to serialize cache value: {}", e);
                return;
            }
        };

        let local_ttl = ttl.min(self.config.local_ttl_cap);
        if let Err(e) = self.local.set_raw(key, &raw, local_ttl).await {
            tracing::warn!(key, "Local cache write error: {}", e);
        }

        if let Some(shared) = self.shared_if_enabled() {
            let shared = Arc::clone(shared);
            let key = key.to_string();
            let timeout = self.config.shared_set_timeout;

            tokio::spawn(async move {
                match tokio::time::timeout(timeout, shared.set_raw(&key, &raw, ttl)).await {
                    Ok(Ok(())) => tracing::debug!(key, "Shared cache set"),
                    Ok(Err(e)) => tracing::warn!(key, "Shared cache write error: {}", e),
                    Err(_) => tracing::warn!(key, "Shared cache write timed out"),
                }
            });
        }
    }

    /// Removes matching keys from both tiers. Tier-2 failure is logged,
    /// never propagated.
    pub async fn invalidate(&self, pattern: &str) -> Result<usize, DomainError> {
        let removed = self.local.delete_pattern(pattern).await?;

        if let Some(shared) = self.shared_if_enabled() {
            if let Err(e) = shared.delete_pattern(pattern).await {
                tracing::warn!(pattern, "Shared cache invalidation error: {}", e);
            }
        }

        Ok(removed)
    }

    /// Clears tier 1 and detaches tier 2; called on service shutdown.
    pub async fn shutdown(&self) {
        self.disable_shared();
        if let Err(e) = self.local.clear().await {
            tracing::warn!("Failed to clear local cache on shutdown: {}", e);
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = self.total_requests.load(Ordering::Relaxed);

        let hit_rate = (hits as f64 / total.max(1) as f64) * 100.0;

        CacheStats {
            hits,
            misses,
            total_requests: total,
            hit_rate_percent: (hit_rate * 100.0).round() / 100.0,
            local_entries: self.local.size().await.unwrap_or(0),
            shared_enabled: self.shared_enabled.load(Ordering::SeqCst),
        }
    }
}
