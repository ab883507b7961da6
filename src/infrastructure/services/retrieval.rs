//! Retrieval service composition root
//!
//! Owns the long-lived cache, breakers, provider, and orchestrator, and
//! exposes the surface the request-mapping layer consumes: embed, complete,
//! search, warm, and health. Built once at startup, shut down explicitly.

use std::sync::Arc;

use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::DomainError;
use crate::domain::cache::CacheKeyParams;
use crate::domain::embedding::{
    ChatMessage, CompletionRequest, EmbeddingProvider, EmbeddingRequest,
};
use crate::domain::search::{QueryVector, SearchBackend, SearchResult};
use crate::infrastructure::cache::{CacheStats, TieredCache, create_cache};
use crate::infrastructure::embedding::{OpenAiConfig, OpenAiProvider};
use crate::infrastructure::http::HttpClient;
use crate::infrastructure::resilience::{
    CircuitBreaker, CircuitBreakerSnapshot, CircuitState, GuardedCall,
};
use crate::infrastructure::search::{
    ChromaBackend, ChromaConfig, CosineScanBackend, MemoryIndex, QaRecord, RecordStore,
};

use super::orchestrator::{
    SearchOrchestrator, SearchOrchestratorConfig, StrategyStats,
};

const ANSWER_SYSTEM_PROMPT: &str = "You answer questions using only the provided context. \
     If the context does not contain the answer, say you don't know.";

/// Overall service health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Health/stats surface for operators
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub cache: CacheStats,
    pub embedding_breaker: CircuitBreakerSnapshot,
    pub completion_breaker: CircuitBreakerSnapshot,
    pub strategies: Vec<StrategyStats>,
    pub search_exhaustions: u64,
    pub records_loaded: usize,
}

/// Builder for [`RetrievalService`]; components not supplied explicitly are
/// constructed from the configuration.
pub struct RetrievalServiceBuilder {
    config: AppConfig,
    cache: Option<Arc<TieredCache>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    extra_strategies: Vec<Arc<dyn SearchBackend>>,
}

impl RetrievalServiceBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cache: None,
            provider: None,
            extra_strategies: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<TieredCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Adds a remote search strategy beyond the configured ones.
    pub fn with_strategy(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.extra_strategies.push(backend);
        self
    }

    pub async fn connect(self) -> Result<RetrievalService, DomainError> {
        let config = self.config;

        let cache = match self.cache {
            Some(cache) => cache,
            None => create_cache(&config.cache).await,
        };

        let provider: Arc<dyn EmbeddingProvider> = match self.provider {
            Some(provider) => provider,
            None => {
                if config.embedding.api_key.is_empty() {
                    return Err(DomainError::configuration(
                        "Embedding provider API key is not configured",
                    ));
                }

                let http = Arc::new(HttpClient::with_timeout(
                    config.embedding.request_timeout(),
                )?);
                Arc::new(OpenAiProvider::new(
                    OpenAiConfig::new(&config.embedding.api_key)
                        .with_base_url(&config.embedding.base_url),
                    http,
                ))
            }
        };

        let embedding_breaker = Arc::new(CircuitBreaker::new(
            "embeddings",
            config.embedding.embedding_breaker.to_breaker_config(),
        ));
        let completion_breaker = Arc::new(CircuitBreaker::new(
            "completions",
            config.embedding.completion_breaker.to_breaker_config(),
        ));

        let embed_guard = GuardedCall::new(
            Arc::clone(&cache),
            embedding_breaker,
            "embeddings",
            config.embedding.embedding_ttl(),
        );
        let completion_guard = GuardedCall::new(
            Arc::clone(&cache),
            completion_breaker,
            "completions",
            config.embedding.completion_ttl(),
        );

        let store = Arc::new(RecordStore::new());

        let mut orchestrator = SearchOrchestrator::new(
            Arc::clone(&cache),
            SearchOrchestratorConfig {
                result_ttl: config.search.result_ttl(),
                strategy_timeout: config.search.strategy_timeout(),
                breaker: config.search.breaker.to_breaker_config(),
            },
        )
        .with_index(Arc::new(MemoryIndex::new(Arc::clone(&store))));

        if let Some(chroma_url) = &config.search.chroma_url {
            let http = Arc::new(HttpClient::with_timeout(config.search.strategy_timeout())?);
            orchestrator = orchestrator.with_strategy(Arc::new(ChromaBackend::new(
                ChromaConfig::new(chroma_url, config.search.collection_id.clone()),
                http,
            )));
        }

        for backend in self.extra_strategies {
            orchestrator = orchestrator.with_strategy(backend);
        }

        // Last resort: full scan over the same corpus the index serves
        orchestrator =
            orchestrator.with_strategy(Arc::new(CosineScanBackend::new(Arc::clone(&store))));

        tracing::info!(
            model = %config.embedding.model,
            "Retrieval service connected"
        );

        Ok(RetrievalService {
            cache,
            provider,
            embed_guard,
            completion_guard,
            orchestrator,
            store,
            embedding_model: config.embedding.model,
            completion_model: config.embedding.completion_model,
            batch_size: config.embedding.batch_size.max(1),
        })
    }
}

/// Long-lived service owning the resilience core.
pub struct RetrievalService {
    cache: Arc<TieredCache>,
    provider: Arc<dyn EmbeddingProvider>,
    embed_guard: GuardedCall,
    completion_guard: GuardedCall,
    orchestrator: SearchOrchestrator,
    store: Arc<RecordStore>,
    embedding_model: String,
    completion_model: String,
    batch_size: usize,
}

impl RetrievalService {
    pub fn builder(config: AppConfig) -> RetrievalServiceBuilder {
        RetrievalServiceBuilder::new(config)
    }

    /// Builds the whole service from configuration alone.
    pub async fn connect(config: AppConfig) -> Result<Self, DomainError> {
        Self::builder(config).connect().await
    }

    /// Embeds one text, cache-first and breaker-guarded.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("Text to embed must not be empty"));
        }

        let params = CacheKeyParams::new(text).with_component("model", &self.embedding_model);

        self.embed_guard
            .call(&params, || async {
                let request = EmbeddingRequest::single(&self.embedding_model, text);
                let response = self.provider.embed(request).await?;

                response.into_vectors().into_iter().next().ok_or_else(|| {
                    DomainError::internal("Provider returned no embedding for input")
                })
            })
            .await
    }

    /// Embeds many texts, chunked to the provider's batch limit. Each chunk
    /// is cached and guarded as one unit.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(DomainError::validation("Texts to embed must not be empty"));
        }

        let mut vectors = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let mut params = CacheKeyParams::from_serializable(&chunk)?;
            params = params.with_component("model", &self.embedding_model);

            let chunk_vectors: Vec<Vec<f32>> = self
                .embed_guard
                .call(&params, || async {
                    let request =
                        EmbeddingRequest::batch(&self.embedding_model, chunk.to_vec());
                    let response = self.provider.embed(request).await?;
                    let chunk_vectors = response.into_vectors();

                    if chunk_vectors.len() != chunk.len() {
                        return Err(DomainError::internal(format!(
                            "Provider returned {} embeddings for {} inputs",
                            chunk_vectors.len(),
                            chunk.len()
                        )));
                    }

                    Ok(chunk_vectors)
                })
                .await?;

            vectors.extend(chunk_vectors);
        }

        Ok(vectors)
    }

    /// Runs a chat completion, cache-first and breaker-guarded.
    pub async fn complete(&self, request: CompletionRequest) -> Result<String, DomainError> {
        let params = CacheKeyParams::from_serializable(&request)?;

        self.completion_guard
            .call(&params, || async { self.provider.complete(request.clone()).await })
            .await
    }

    /// Answers a question from retrieved context via the completion path.
    pub async fn answer(&self, question: &str, context: &str) -> Result<String, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::validation("Question must not be empty"));
        }

        let request = CompletionRequest::new(
            &self.completion_model,
            vec![
                ChatMessage::system(ANSWER_SYSTEM_PROMPT),
                ChatMessage::user(format!("Context:\n{}\n\nQuestion: {}", context, question)),
            ],
        )
        .with_temperature(0.2);

        self.complete(request).await
    }

    /// Nearest neighbors of a raw vector. Dependency trouble shows up as
    /// fewer or zero results, never as an error.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let query = QueryVector::new(vector)?;
        Ok(self.orchestrator.search(&query, top_k).await)
    }

    /// Embed-then-search convenience for text queries.
    pub async fn search_text(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let vector = self.embed(text).await?;
        self.search(vector, top_k).await
    }

    /// Pre-populates caches for the given queries. Individual failures are
    /// logged and skipped; returns how many queries were warmed.
    pub async fn warm(&self, queries: &[String], top_k: usize) -> usize {
        let mut warmed = 0;

        for query in queries {
            match self.search_text(query, top_k).await {
                Ok(results) => {
                    tracing::debug!(query, count = results.len(), "Warmed query");
                    warmed += 1;
                }
                Err(e) => tracing::warn!(query, "Failed to warm query: {}", e),
            }
        }

        tracing::info!(warmed, total = queries.len(), "Cache warm-up finished");
        warmed
    }

    /// Replaces the in-process corpus and drops now-stale memoized results.
    pub async fn load_records(&self, records: Vec<QaRecord>) -> Result<(), DomainError> {
        self.store.load(records).await?;

        if let Err(e) = self.orchestrator.invalidate_results().await {
            tracing::warn!("Failed to invalidate memoized results: {}", e);
        }

        Ok(())
    }

    pub async fn health(&self) -> HealthReport {
        let embedding_breaker = self.embed_guard.breaker().snapshot().await;
        let completion_breaker = self.completion_guard.breaker().snapshot().await;
        let strategies = self.orchestrator.strategy_stats().await;

        let any_open = embedding_breaker.state == CircuitState::Open
            || completion_breaker.state == CircuitState::Open
            || strategies.iter().any(|s| s.breaker.state == CircuitState::Open);

        HealthReport {
            status: if any_open {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            },
            cache: self.cache.stats().await,
            embedding_breaker,
            completion_breaker,
            strategies,
            search_exhaustions: self.orchestrator.exhaustions(),
            records_loaded: self.store.len().await,
        }
    }

    /// Releases held resources; the service must not be used afterwards.
    pub async fn shutdown(&self) {
        self.cache.shutdown().await;
        tracing::info!("Retrieval service shut down");
    }
}
