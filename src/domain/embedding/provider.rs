//! Embedding/completion provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{CompletionRequest, EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Trait for the remote embedding/completion provider.
///
/// Both operations live on one trait because they share a single upstream
/// dependency (and therefore a single circuit breaker per operation kind).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for the given input
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Generate a chat completion
    async fn complete(&self, request: CompletionRequest) -> Result<String, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::embedding::{Embedding, EmbeddingUsage};
    use crate::domain::error::ProviderErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock provider producing deterministic embeddings from a text hash.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        name: &'static str,
        dimensions: usize,
        completion: Option<String>,
        error: Option<(ProviderErrorKind, String)>,
        embed_count: AtomicUsize,
    }

    impl MockEmbeddingProvider {
        pub fn new(name: &'static str, dimensions: usize) -> Self {
            Self {
                name,
                dimensions,
                completion: None,
                error: None,
                embed_count: AtomicUsize::new(0),
            }
        }

        pub fn with_completion(mut self, text: impl Into<String>) -> Self {
            self.completion = Some(text.into());
            self
        }

        pub fn with_error(mut self, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
            self.error = Some((kind, message.into()));
            self
        }

        pub fn embed_count(&self) -> usize {
            self.embed_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, DomainError> {
            self.embed_count.fetch_add(1, Ordering::SeqCst);

            if let Some((kind, ref message)) = self.error {
                return Err(DomainError::provider(self.name, kind, message));
            }

            let inputs = request.inputs();
            let embeddings: Vec<Embedding> = inputs
                .iter()
                .enumerate()
                .map(|(idx, text)| {
                    let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64));
                    let vector: Vec<f32> = (0..self.dimensions)
                        .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) - 0.5)
                        .collect();

                    Embedding::new(idx, vector)
                })
                .collect();

            let total_tokens = inputs.iter().map(|t| t.len() / 4).sum::<usize>() as u32;

            Ok(EmbeddingResponse::new(
                request.model().to_string(),
                embeddings,
                EmbeddingUsage::new(total_tokens, total_tokens),
            ))
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<String, DomainError> {
            if let Some((kind, ref message)) = self.error {
                return Err(DomainError::provider(self.name, kind, message));
            }

            self.completion.clone().ok_or_else(|| {
                DomainError::provider(
                    self.name,
                    ProviderErrorKind::Other,
                    "No mock completion configured",
                )
            })
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::embedding::EmbeddingInput;

        #[tokio::test]
        async fn test_mock_provider_single_input() {
            let provider = MockEmbeddingProvider::new("test", 128);
            let request = EmbeddingRequest::new("mock", EmbeddingInput::Single("Hello".into()));

            let response = provider.embed(request).await.unwrap();

            assert_eq!(response.embeddings().len(), 1);
            assert_eq!(response.embeddings()[0].vector().len(), 128);
            assert_eq!(provider.embed_count(), 1);
        }

        #[tokio::test]
        async fn test_deterministic_embeddings() {
            let provider = MockEmbeddingProvider::new("test", 64);
            let r1 = EmbeddingRequest::single("mock", "Hello");
            let r2 = EmbeddingRequest::single("mock", "Hello");

            let a = provider.embed(r1).await.unwrap();
            let b = provider.embed(r2).await.unwrap();

            assert_eq!(a.embeddings()[0].vector(), b.embeddings()[0].vector());
        }

        #[tokio::test]
        async fn test_mock_provider_error() {
            let provider = MockEmbeddingProvider::new("test", 128)
                .with_error(ProviderErrorKind::RateLimited, "429");

            let result = provider.embed(EmbeddingRequest::single("mock", "x")).await;

            assert!(matches!(
                result,
                Err(DomainError::Provider {
                    kind: ProviderErrorKind::RateLimited,
                    ..
                })
            ));
        }
    }
}
