use thiserror::Error;

/// Classification of errors returned by remote providers.
///
/// Circuit breakers only count a configured subset of these kinds as
/// failures; everything else propagates without affecting breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The provider rejected the request due to rate limiting (HTTP 429)
    RateLimited,
    /// The provider could not be reached (DNS, connect, TLS)
    Connection,
    /// The request exceeded its deadline
    Timeout,
    /// Any other provider-side failure
    Other,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorKind::RateLimited => write!(f, "rate_limited"),
            ProviderErrorKind::Connection => write!(f, "connection"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Provider error: {provider} ({kind}) - {message}")]
    Provider {
        provider: String,
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("Circuit breaker for '{dependency}' is open - requests blocked")]
    CircuitOpen { dependency: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn provider(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn circuit_open(dependency: impl Into<String>) -> Self {
        Self::CircuitOpen {
            dependency: dependency.into(),
        }
    }

    /// Returns the provider error kind, if this is a provider error.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this error belongs to the transient dependency class
    /// (network, timeout, rate limit). Transient errors are counted by
    /// circuit breakers and are subject to strategy fallback.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Provider {
                kind: ProviderErrorKind::RateLimited
                    | ProviderErrorKind::Connection
                    | ProviderErrorKind::Timeout,
                ..
            }
        )
    }
}
