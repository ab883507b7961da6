//! OpenAI-compatible embedding and completion provider

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::embedding::{
    CompletionRequest, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
};
use crate::domain::{DomainError, ProviderErrorKind};
use crate::infrastructure::http::HttpClientTrait;

const PROVIDER_NAME: &str = "openai";

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Provider speaking the OpenAI REST API (or any compatible endpoint).
#[derive(Debug)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
    http: Arc<dyn HttpClientTrait>,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig, http: Arc<dyn HttpClientTrait>) -> Self {
        Self { config, http }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        if request.input().is_empty() {
            return Err(DomainError::validation("Embedding input must not be empty"));
        }

        let url = format!("{}/embeddings", self.config.base_url);
        let body = serde_json::to_value(&request)
            .map_err(|e| DomainError::internal(format!("Failed to encode request: {}", e)))?;

        let auth = self.auth_header();
        let response = self
            .http
            .post_json(
                PROVIDER_NAME,
                &url,
                vec![("Authorization", auth.as_str())],
                &body,
            )
            .await?;

        let parsed: EmbeddingResponse = serde_json::from_value(response).map_err(|e| {
            DomainError::provider(
                PROVIDER_NAME,
                ProviderErrorKind::Other,
                format!("Unexpected embeddings response shape: {}", e),
            )
        })?;

        tracing::debug!(
            model = parsed.model(),
            count = parsed.embeddings().len(),
            tokens = parsed.usage().total_tokens(),
            "Generated embeddings"
        );

        Ok(parsed)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, DomainError> {
        if request.messages().is_empty() {
            return Err(DomainError::validation(
                "Completion request must contain at least one message",
            ));
        }

        let url = format!("{}/chat/completions", self.config.base_url);
        let body = serde_json::to_value(&request)
            .map_err(|e| DomainError::internal(format!("Failed to encode request: {}", e)))?;

        let auth = self.auth_header();
        let response = self
            .http
            .post_json(
                PROVIDER_NAME,
                &url,
                vec![("Authorization", auth.as_str())],
                &body,
            )
            .await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                DomainError::provider(
                    PROVIDER_NAME,
                    ProviderErrorKind::Other,
                    "Completion response missing message content",
                )
            })?;

        Ok(content.to_string())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
