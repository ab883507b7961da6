use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{DomainError, ProviderErrorKind};

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;
}

/// Real HTTP client using reqwest.
///
/// Transport failures are translated into provider error kinds so circuit
/// breakers can match them against their configured failure set:
/// timeouts → `Timeout`, connect/DNS failures → `Connection`, HTTP 429 →
/// `RateLimited`, anything else → `Other`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, DomainError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    fn classify(error: &reqwest::Error) -> ProviderErrorKind {
        if error.is_timeout() {
            ProviderErrorKind::Timeout
        } else if error.is_connect() {
            ProviderErrorKind::Connection
        } else {
            ProviderErrorKind::Other
        }
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await.map_err(|e| {
            DomainError::provider(provider, Self::classify(&e), format!("Request failed: {}", e))
        })?;

        let status = response.status();

        if !status.is_success() {
            let kind = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                ProviderErrorKind::RateLimited
            } else {
                ProviderErrorKind::Other
            };

            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::provider(
                provider,
                kind,
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        response.json().await.map_err(|e| {
            DomainError::provider(
                provider,
                ProviderErrorKind::Other,
                format!("Failed to parse response: {}", e),
            )
        })
    }
}
