//! Multi-strategy search orchestration
//!
//! For one query: memoized result first, then the in-process index (no
//! network hop), then a concurrent race of the remote strategies. Each
//! remote attempt is bounded by its own timeout and guarded by its own
//! breaker; the first non-empty result wins and the losers are dropped.
//! Exhaustion yields an empty result set, never an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use metrics::counter;

use crate::domain::cache::{CacheKeyGenerator, CacheKeyParams, FingerprintGenerator};
use crate::domain::search::{QueryVector, SearchBackend, SearchResult};
use crate::domain::{DomainError, ProviderErrorKind};
use crate::infrastructure::cache::TieredCache;
use crate::infrastructure::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot,
};

const RESULT_NAMESPACE: &str = "search:results";

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct SearchOrchestratorConfig {
    /// TTL for memoized result sets
    pub result_ttl: Duration,
    /// Per-attempt deadline for each remote strategy
    pub strategy_timeout: Duration,
    /// Breaker settings applied to each remote strategy
    pub breaker: CircuitBreakerConfig,
}

impl Default for SearchOrchestratorConfig {
    fn default() -> Self {
        Self {
            result_ttl: Duration::from_secs(1800),
            strategy_timeout: Duration::from_secs(5),
            breaker: CircuitBreakerConfig::new(3, Duration::from_secs(30)),
        }
    }
}

/// One remote strategy with its breaker and success/failure tallies.
#[derive(Debug)]
struct StrategyHandle {
    backend: Arc<dyn SearchBackend>,
    breaker: Arc<CircuitBreaker>,
    timeout: Duration,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl StrategyHandle {
    /// One breaker-guarded, timeout-bound attempt. A timeout is recorded
    /// against this strategy's breaker like any other counted failure.
    async fn attempt(
        &self,
        query: &QueryVector,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let name = self.backend.name();

        let result = self
            .breaker
            .call(|| async {
                tokio::time::timeout(self.timeout, self.backend.search(query, top_k))
                    .await
                    .map_err(|_| {
                        DomainError::provider(
                            name,
                            ProviderErrorKind::Timeout,
                            format!("Strategy timed out after {:?}", self.timeout),
                        )
                    })?
            })
            .await;

        match &result {
            Ok(_) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(strategy = name, "Search strategy failed: {}", e);
            }
        }

        result
    }
}

/// Per-strategy view for the health surface
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyStats {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
    pub breaker: CircuitBreakerSnapshot,
}

/// Orchestrates the in-process index and the remote strategy race.
#[derive(Debug)]
pub struct SearchOrchestrator {
    index: Option<Arc<dyn SearchBackend>>,
    strategies: Vec<StrategyHandle>,
    cache: Arc<TieredCache>,
    key_generator: FingerprintGenerator,
    config: SearchOrchestratorConfig,
    exhaustions: AtomicU64,
}

impl SearchOrchestrator {
    pub fn new(cache: Arc<TieredCache>, config: SearchOrchestratorConfig) -> Self {
        Self {
            index: None,
            strategies: Vec::new(),
            cache,
            key_generator: FingerprintGenerator::new(),
            config,
            exhaustions: AtomicU64::new(0),
        }
    }

    /// Attaches the in-process index, tried before any remote strategy.
    pub fn with_index(mut self, index: Arc<dyn SearchBackend>) -> Self {
        self.index = Some(index);
        self
    }

    /// Adds a remote strategy with its own breaker, raced on fallback in
    /// registration order.
    pub fn with_strategy(self, backend: Arc<dyn SearchBackend>) -> Self {
        let timeout = self.config.strategy_timeout;
        self.with_strategy_timeout(backend, timeout)
    }

    /// Like [`with_strategy`](Self::with_strategy) but with a per-strategy
    /// deadline overriding the configured default.
    pub fn with_strategy_timeout(
        mut self,
        backend: Arc<dyn SearchBackend>,
        timeout: Duration,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(
            backend.name().to_string(),
            self.config.breaker.clone(),
        ));

        self.strategies.push(StrategyHandle {
            backend,
            breaker,
            timeout,
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });
        self
    }

    fn result_key(&self, query: &QueryVector, top_k: usize) -> String {
        let params = CacheKeyParams::new(query.digest())
            .with_component("top_k", top_k.to_string());
        self.key_generator
            .generate_with_namespace(RESULT_NAMESPACE, &params)
    }

    /// Returns the best available nearest-neighbor set. Infallible by
    /// design: exhaustion produces an empty vec, not an error.
    pub async fn search(&self, query: &QueryVector, top_k: usize) -> Vec<SearchResult> {
        if top_k == 0 {
            return Vec::new();
        }

        let key = self.result_key(query, top_k);

        if let Some(cached) = self.cache.get::<Vec<SearchResult>>(&key).await {
            tracing::debug!(top_k, "Serving memoized search result");
            return cached;
        }

        // Cheapest path: the in-process index has no external failure mode.
        if let Some(index) = &self.index {
            match index.search(query, top_k).await {
                Ok(results) if !results.is_empty() => {
                    counter!("qa_search_wins_total", "strategy" => index.name().to_string())
                        .increment(1);
                    self.cache.set(&key, &results, self.config.result_ttl).await;
                    return results;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(strategy = index.name(), "Index search failed: {}", e)
                }
            }
        }

        // Fallback race: first non-empty result wins, losers are dropped.
        let mut race: FuturesUnordered<_> = self
            .strategies
            .iter()
            .map(|handle| async move {
                let outcome = handle.attempt(query, top_k).await;
                (handle.backend.name(), outcome)
            })
            .collect();

        while let Some((name, outcome)) = race.next().await {
            match outcome {
                Ok(results) if !results.is_empty() => {
                    counter!("qa_search_wins_total", "strategy" => name.to_string())
                        .increment(1);
                    tracing::debug!(strategy = name, count = results.len(), "Race won");
                    self.cache.set(&key, &results, self.config.result_ttl).await;
                    return results;
                }
                Ok(_) => tracing::debug!(strategy = name, "Strategy returned no results"),
                // Already logged by the handle; the race continues.
                Err(_) => {}
            }
        }

        self.exhaustions.fetch_add(1, Ordering::Relaxed);
        counter!("qa_search_exhaustions_total").increment(1);
        tracing::warn!(top_k, "All search strategies exhausted");

        Vec::new()
    }

    /// Drops all memoized result sets.
    pub async fn invalidate_results(&self) -> Result<usize, DomainError> {
        self.cache.invalidate(&format!("{}:*", RESULT_NAMESPACE)).await
    }

    pub fn exhaustions(&self) -> u64 {
        self.exhaustions.load(Ordering::Relaxed)
    }

    pub async fn strategy_stats(&self) -> Vec<StrategyStats> {
        let mut stats = Vec::with_capacity(self.strategies.len());

        for handle in &self.strategies {
            stats.push(StrategyStats {
                name: handle.backend.name().to_string(),
                successes: handle.successes.load(Ordering::Relaxed),
                failures: handle.failures.load(Ordering::Relaxed),
                breaker: handle.breaker.snapshot().await,
            });
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::MockSearchBackend;
    use crate::infrastructure::cache::TieredCacheConfig;
    use crate::infrastructure::resilience::CircuitState;

    fn cache() -> Arc<TieredCache> {
        Arc::new(TieredCache::memory_only(TieredCacheConfig::default()))
    }

    fn config_with_timeout(timeout: Duration) -> SearchOrchestratorConfig {
        SearchOrchestratorConfig {
            strategy_timeout: timeout,
            ..SearchOrchestratorConfig::default()
        }
    }

    fn query() -> QueryVector {
        QueryVector::new(vec![0.6, 0.8]).unwrap()
    }

    fn results(prefix: &str, n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| {
                SearchResult::new(
                    format!("{}-{}", prefix, i),
                    "q",
                    "a",
                    0.9 - 0.1 * i as f32,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_loaded_index_short_circuits_remote_strategies() {
        let index = Arc::new(MockSearchBackend::new("index").with_results(results("idx", 1)));
        let remote = Arc::new(MockSearchBackend::new("remote").with_results(results("rem", 3)));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_index(index.clone())
            .with_strategy(remote.clone());

        let found = orchestrator.search(&query(), 5).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "idx-0");
        assert_eq!(remote.search_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_index_falls_back_to_race() {
        let index = Arc::new(MockSearchBackend::new("index"));
        let remote = Arc::new(MockSearchBackend::new("remote").with_results(results("rem", 2)));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_index(index)
            .with_strategy(remote.clone());

        let found = orchestrator.search(&query(), 5).await;

        assert_eq!(found.len(), 2);
        assert_eq!(remote.search_count(), 1);
    }

    #[tokio::test]
    async fn test_index_error_falls_back_to_race() {
        let index = Arc::new(
            MockSearchBackend::new("index").with_error(ProviderErrorKind::Other, "corrupt"),
        );
        let remote = Arc::new(MockSearchBackend::new("remote").with_results(results("rem", 1)));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_index(index)
            .with_strategy(remote);

        let found = orchestrator.search(&query(), 5).await;
        assert_eq!(found[0].id, "rem-0");
    }

    #[tokio::test]
    async fn test_timed_out_strategy_charged_to_its_breaker_only() {
        // A sleeps past its deadline; B answers later but within its own.
        let slow = Arc::new(
            MockSearchBackend::new("slow")
                .with_results(results("slow", 1))
                .with_delay(Duration::from_millis(300)),
        );
        let healthy = Arc::new(
            MockSearchBackend::new("healthy")
                .with_results(results("ok", 3))
                .with_delay(Duration::from_millis(100)),
        );

        let orchestrator =
            SearchOrchestrator::new(cache(), config_with_timeout(Duration::from_millis(200)))
                .with_strategy_timeout(slow, Duration::from_millis(50))
                .with_strategy(healthy);

        let found = orchestrator.search(&query(), 5).await;

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].id, "ok-0");

        let stats = orchestrator.strategy_stats().await;
        let slow_stats = stats.iter().find(|s| s.name == "slow").unwrap();
        let healthy_stats = stats.iter().find(|s| s.name == "healthy").unwrap();

        assert_eq!(slow_stats.failures, 1);
        assert_eq!(slow_stats.breaker.consecutive_failures, 1);
        assert_eq!(healthy_stats.failures, 0);
        assert_eq!(healthy_stats.breaker.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_fallback_completeness() {
        // No index; exactly one of two strategies has results.
        let empty = Arc::new(MockSearchBackend::new("empty"));
        let full = Arc::new(MockSearchBackend::new("full").with_results(results("f", 3)));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_strategy(empty)
            .with_strategy(full.clone());

        let found = orchestrator.search(&query(), 5).await;

        let expected = full.search(&query(), 5).await.unwrap();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_empty_never_errors() {
        let a = Arc::new(
            MockSearchBackend::new("a").with_error(ProviderErrorKind::Connection, "down"),
        );
        let b = Arc::new(MockSearchBackend::new("b"));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_strategy(a)
            .with_strategy(b);

        let found = orchestrator.search(&query(), 5).await;

        assert!(found.is_empty());
        assert_eq!(orchestrator.exhaustions(), 1);
    }

    #[tokio::test]
    async fn test_results_are_memoized() {
        let remote = Arc::new(MockSearchBackend::new("remote").with_results(results("r", 2)));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_strategy(remote.clone());

        let first = orchestrator.search(&query(), 5).await;
        let second = orchestrator.search(&query(), 5).await;

        assert_eq!(first, second);
        assert_eq!(remote.search_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_results_are_not_memoized() {
        let remote = Arc::new(MockSearchBackend::new("remote"));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_strategy(remote.clone());

        assert!(orchestrator.search(&query(), 5).await.is_empty());
        assert!(orchestrator.search(&query(), 5).await.is_empty());

        assert_eq!(remote.search_count(), 2);
    }

    #[tokio::test]
    async fn test_distinct_top_k_memoized_separately() {
        let remote = Arc::new(MockSearchBackend::new("remote").with_results(results("r", 5)));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_strategy(remote.clone());

        assert_eq!(orchestrator.search(&query(), 2).await.len(), 2);
        assert_eq!(orchestrator.search(&query(), 5).await.len(), 5);
        assert_eq!(remote.search_count(), 2);
    }

    #[tokio::test]
    async fn test_open_breaker_skips_strategy_without_calling_it() {
        let failing = Arc::new(
            MockSearchBackend::new("failing").with_error(ProviderErrorKind::Connection, "down"),
        );

        let config = SearchOrchestratorConfig {
            breaker: CircuitBreakerConfig::new(2, Duration::from_secs(3600)),
            ..SearchOrchestratorConfig::default()
        };
        let orchestrator =
            SearchOrchestrator::new(cache(), config).with_strategy(failing.clone());

        // Two exhausted searches trip the breaker
        let q = query();
        orchestrator.search(&q, 5).await;
        let q2 = QueryVector::new(vec![0.0, 1.0]).unwrap();
        orchestrator.search(&q2, 5).await;

        let stats = orchestrator.strategy_stats().await;
        assert_eq!(stats[0].breaker.state, CircuitState::Open);

        // Third search fails fast; the backend is not contacted again
        let q3 = QueryVector::new(vec![1.0, 0.0]).unwrap();
        assert!(orchestrator.search(&q3, 5).await.is_empty());
        assert_eq!(failing.search_count(), 2);
    }

    #[tokio::test]
    async fn test_top_k_zero_returns_empty_immediately() {
        let remote = Arc::new(MockSearchBackend::new("remote").with_results(results("r", 3)));

        let orchestrator = SearchOrchestrator::new(cache(), SearchOrchestratorConfig::default())
            .with_strategy(remote.clone());

        assert!(orchestrator.search(&query(), 0).await.is_empty());
        assert_eq!(remote.search_count(), 0);
    }
}
