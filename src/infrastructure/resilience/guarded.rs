//! Cache-then-breaker call combinator
//!
//! Composes the tiered cache and a circuit breaker around an expensive
//! operation: cache hit short-circuits, otherwise the operation runs under
//! the breaker and a successful result is written back with the configured
//! TTL. Call sites state their namespace, TTL, and key inputs explicitly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::domain::DomainError;
use crate::domain::cache::{CacheKeyGenerator, CacheKeyParams, FingerprintGenerator};
use crate::infrastructure::cache::TieredCache;

use super::circuit_breaker::CircuitBreaker;

/// Cache + circuit breaker wrapper for one class of operation.
#[derive(Debug, Clone)]
pub struct GuardedCall {
    cache: Arc<TieredCache>,
    breaker: Arc<CircuitBreaker>,
    namespace: String,
    ttl: Duration,
    key_generator: FingerprintGenerator,
}

impl GuardedCall {
    pub fn new(
        cache: Arc<TieredCache>,
        breaker: Arc<CircuitBreaker>,
        namespace: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            breaker,
            namespace: namespace.into(),
            ttl,
            key_generator: FingerprintGenerator::new(),
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Cache-or-call with every successful result cached.
    pub async fn call<T, F, Fut>(
        &self,
        params: &CacheKeyParams,
        operation: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        self.call_with(params, operation, |_| true).await
    }

    /// Cache-or-call where `cacheable` decides whether a successful result
    /// is worth storing (e.g. empty search results are not).
    pub async fn call_with<T, F, Fut, P>(
        &self,
        params: &CacheKeyParams,
        operation: F,
        cacheable: P,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
        P: FnOnce(&T) -> bool,
    {
        let key = self
            .key_generator
            .generate_with_namespace(&self.namespace, params);

        if let Some(cached) = self.cache.get::<T>(&key).await {
            return Ok(cached);
        }

        let value = self.breaker.call(operation).await?;

        if cacheable(&value) {
            self.cache.set(&key, &value, self.ttl).await;
        }

        Ok(value)
    }

    /// Drops all cached results in this wrapper's namespace.
    pub async fn invalidate_all(&self) -> Result<usize, DomainError> {
        self.cache.invalidate(&format!("{}:*", self.namespace)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::ProviderErrorKind;
    use crate::infrastructure::cache::TieredCacheConfig;
    use crate::infrastructure::resilience::CircuitBreakerConfig;

    fn guarded(namespace: &str) -> GuardedCall {
        let cache = Arc::new(TieredCache::memory_only(TieredCacheConfig::default()));
        let breaker = Arc::new(CircuitBreaker::new(
            namespace,
            CircuitBreakerConfig::new(2, Duration::from_secs(30)),
        ));
        GuardedCall::new(cache, breaker, namespace, Duration::from_secs(60))
    }

    fn params(primary: &str) -> CacheKeyParams {
        CacheKeyParams::new(primary)
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let guarded = guarded("embeddings");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: String = guarded
                .call(&params("hello"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("embedded".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "embedded");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_params_call_through() {
        let guarded = guarded("embeddings");
        let calls = AtomicUsize::new(0);

        let _: String = guarded
            .call(&params("a"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("va".to_string())
            })
            .await
            .unwrap();
        let _: String = guarded
            .call(&params("b"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("vb".to_string())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let guarded = guarded("embeddings");
        let calls = AtomicUsize::new(0);

        let result: Result<String, _> = guarded
            .call(&params("q"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::provider(
                    "upstream",
                    ProviderErrorKind::Timeout,
                    "deadline",
                ))
            })
            .await;
        assert!(result.is_err());

        let value: String = guarded
            .call(&params("q"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("recovered".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_uncacheable_results_call_through_again() {
        let guarded = guarded("search");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Vec<String> = guarded
                .call_with(
                    &params("q"),
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(Vec::new())
                    },
                    |results: &Vec<String>| !results.is_empty(),
                )
                .await
                .unwrap();
            assert!(value.is_empty());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_open_breaker_still_serves_cached_values() {
        let guarded = guarded("completions");

        let _: String = guarded
            .call(&params("q"), || async { Ok("answer".to_string()) })
            .await
            .unwrap();

        // Trip the breaker with a different key
        for _ in 0..2 {
            let _: Result<String, _> = guarded
                .call(&params("other"), || async {
                    Err(DomainError::provider(
                        "upstream",
                        ProviderErrorKind::Connection,
                        "down",
                    ))
                })
                .await;
        }

        // Cached key still works; uncached key fails fast
        let cached: String = guarded
            .call(&params("q"), || async {
                Err::<String, _>(DomainError::internal("should not run"))
            })
            .await
            .unwrap();
        assert_eq!(cached, "answer");

        let uncached: Result<String, _> = guarded
            .call(&params("fresh"), || async { Ok("nope".to_string()) })
            .await;
        assert!(matches!(uncached, Err(DomainError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_namespace() {
        let guarded = guarded("search");
        let calls = AtomicUsize::new(0);

        let _: String = guarded
            .call(&params("q"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("v".to_string())
            })
            .await
            .unwrap();

        guarded.invalidate_all().await.unwrap();

        let _: String = guarded
            .call(&params("q"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("v".to_string())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
