//! Chroma vector store backend

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::search::{QueryVector, SearchBackend, SearchResult};
use crate::domain::{DomainError, ProviderErrorKind};
use crate::infrastructure::http::HttpClientTrait;

const BACKEND_NAME: &str = "chroma";

/// Configuration for the Chroma backend
#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub base_url: String,
    pub collection_id: String,
}

impl ChromaConfig {
    pub fn new(base_url: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection_id: collection_id.into(),
        }
    }
}

/// Chroma query response: parallel arrays, one inner vec per query.
#[derive(Debug, Deserialize)]
struct ChromaQueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<serde_json::Value>>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

/// Remote vector store strategy speaking the Chroma HTTP API.
///
/// Chroma reports cosine distance; similarity is `1 - distance`. Rows the
/// conversion pushes outside [0, 1] are dropped by the shared sanitizer.
#[derive(Debug)]
pub struct ChromaBackend {
    config: ChromaConfig,
    http: Arc<dyn HttpClientTrait>,
}

impl ChromaBackend {
    pub fn new(config: ChromaConfig, http: Arc<dyn HttpClientTrait>) -> Self {
        Self { config, http }
    }

    fn query_url(&self) -> String {
        format!(
            "{}/api/v1/collections/{}/query",
            self.config.base_url, self.config.collection_id
        )
    }

    fn into_results(response: ChromaQueryResponse) -> Result<Vec<SearchResult>, DomainError> {
        let Some(ids) = response.ids.into_iter().next() else {
            return Ok(Vec::new());
        };

        let documents = response.documents.into_iter().next().unwrap_or_default();
        let metadatas = response.metadatas.into_iter().next().unwrap_or_default();
        let distances = response.distances.into_iter().next().unwrap_or_default();

        if distances.len() != ids.len() {
            return Err(DomainError::provider(
                BACKEND_NAME,
                ProviderErrorKind::Other,
                format!(
                    "Mismatched response arrays: {} ids, {} distances",
                    ids.len(),
                    distances.len()
                ),
            ));
        }

        let results = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let question = documents
                    .get(i)
                    .and_then(|d| d.clone())
                    .unwrap_or_default();
                let answer = metadatas
                    .get(i)
                    .and_then(|m| m.as_ref())
                    .and_then(|m| m.get("answer"))
                    .and_then(|a| a.as_str())
                    .unwrap_or_default()
                    .to_string();

                SearchResult::new(id, question, answer, 1.0 - distances[i])
            })
            .collect();

        Ok(SearchResult::sanitize(results))
    }
}

#[async_trait]
impl SearchBackend for ChromaBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn search(
        &self,
        query: &QueryVector,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "query_embeddings": [query.as_slice()],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });

        let response = self
            .http
            .post_json(BACKEND_NAME, &self.query_url(), vec![], &body)
            .await?;

        let parsed: ChromaQueryResponse = serde_json::from_value(response).map_err(|e| {
            DomainError::provider(
                BACKEND_NAME,
                ProviderErrorKind::Other,
                format!("Unexpected query response shape: {}", e),
            )
        })?;

        Self::into_results(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::HttpClient;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> ChromaBackend {
        ChromaBackend::new(
            ChromaConfig::new(server.uri(), "qa-main"),
            Arc::new(HttpClient::new().unwrap()),
        )
    }

    fn query() -> QueryVector {
        QueryVector::new(vec![0.1, 0.2, 0.3]).unwrap()
    }

    #[tokio::test]
    async fn test_search_converts_distances_to_similarity() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/collections/qa-main/query"))
            .and(body_partial_json(serde_json::json!({"n_results": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ids": [["r1", "r2"]],
                "documents": [["What is Rust?", "What is Go?"]],
                "metadatas": [[{"answer": "A language."}, {"answer": "Another one."}]],
                "distances": [[0.1, 0.4]]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let results = backend.search(&query(), 5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "r1");
        assert!((results[0].similarity - 0.9).abs() < 1e-6);
        assert_eq!(results[0].answer, "A language.");
        assert!((results[1].similarity - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_out_of_range_similarities_are_dropped() {
        let server = MockServer::start().await;

        // distance 1.5 gives similarity -0.5, which must not survive
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ids": [["near", "anti"]],
                "documents": [["q1", "q2"]],
                "metadatas": [[{"answer": "a1"}, {"answer": "a2"}]],
                "distances": [[0.2, 1.5]]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let results = backend.search(&query(), 5).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "near");
    }

    #[tokio::test]
    async fn test_empty_response_yields_empty_results() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ids": [[]],
                "documents": [[]],
                "metadatas": [[]],
                "distances": [[]]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let results = backend.search(&query(), 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_arrays_are_a_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ids": [["r1", "r2"]],
                "documents": [["q1", "q2"]],
                "metadatas": [[{"answer": "a1"}, {"answer": "a2"}]],
                "distances": [[0.1]]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let error = backend.search(&query(), 5).await.unwrap_err();
        assert_eq!(error.provider_kind(), Some(ProviderErrorKind::Other));
    }

    #[tokio::test]
    async fn test_missing_metadata_yields_empty_answer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ids": [["r1"]],
                "documents": [["q1"]],
                "metadatas": [[null]],
                "distances": [[0.3]]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let results = backend.search(&query(), 5).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].answer.is_empty());
    }

    #[tokio::test]
    async fn test_http_failure_surfaces_provider_kind() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let error = backend.search(&query(), 5).await.unwrap_err();
        assert_eq!(error.provider_kind(), Some(ProviderErrorKind::RateLimited));
    }
}
