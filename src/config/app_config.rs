use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::resilience::CircuitBreakerConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Shared tier connection URL; absent means memory-only
    pub redis_url: Option<String>,
    /// Namespace prefix for shared-tier keys
    pub key_prefix: String,
    /// Maximum entries in the process-local tier
    pub max_capacity: u64,
    /// Upper bound for process-local TTLs, in seconds
    pub local_ttl_cap_secs: u64,
    /// Strict deadline for shared-tier reads, in milliseconds
    pub shared_get_timeout_ms: u64,
}

impl CacheConfig {
    pub fn local_ttl_cap(&self) -> Duration {
        Duration::from_secs(self.local_ttl_cap_secs)
    }

    pub fn shared_get_timeout(&self) -> Duration {
        Duration::from_millis(self.shared_get_timeout_ms)
    }
}

/// Breaker settings in configuration shape
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub success_threshold: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_secs: 30,
            success_threshold: 1,
        }
    }
}

impl BreakerSettings {
    pub fn new(failure_threshold: u32, recovery_timeout_secs: u64) -> Self {
        Self {
            failure_threshold,
            recovery_timeout_secs,
            success_threshold: 1,
        }
    }

    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.failure_threshold,
            Duration::from_secs(self.recovery_timeout_secs),
        )
        .with_success_threshold(self.success_threshold)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub completion_model: String,
    pub request_timeout_secs: u64,
    /// Texts per upstream batch request
    pub batch_size: usize,
    pub embedding_ttl_secs: u64,
    pub completion_ttl_secs: u64,
    pub embedding_breaker: BreakerSettings,
    pub completion_breaker: BreakerSettings,
}

impl EmbeddingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn embedding_ttl(&self) -> Duration {
        Duration::from_secs(self.embedding_ttl_secs)
    }

    pub fn completion_ttl(&self) -> Duration {
        Duration::from_secs(self.completion_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Chroma base URL; absent means no remote vector backend
    pub chroma_url: Option<String>,
    pub collection_id: String,
    pub result_ttl_secs: u64,
    pub strategy_timeout_secs: u64,
    pub breaker: BreakerSettings,
}

impl SearchConfig {
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "qa".to_string(),
            max_capacity: 10_000,
            local_ttl_cap_secs: 300,
            shared_get_timeout_ms: 50,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-large".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 30,
            batch_size: 100,
            embedding_ttl_secs: 7200,
            completion_ttl_secs: 1800,
            embedding_breaker: BreakerSettings::new(3, 30),
            completion_breaker: BreakerSettings::new(2, 60),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chroma_url: None,
            collection_id: "qa-main".to_string(),
            result_ttl_secs: 1800,
            strategy_timeout_secs: 5,
            breaker: BreakerSettings::new(3, 30),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("QA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
