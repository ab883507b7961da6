//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, BreakerSettings, CacheConfig, EmbeddingConfig, LogFormat, LoggingConfig,
    SearchConfig,
};
