//! Cache construction from configuration

use std::sync::Arc;

use crate::config::CacheConfig;

use super::in_memory::InMemoryCacheConfig;
use super::redis::{RedisCache, RedisCacheConfig};
use super::tiered::{TieredCache, TieredCacheConfig};

/// Builds the tiered cache described by the configuration.
///
/// When a Redis URL is configured, connection and probe failures fall back
/// to a memory-only cache with a warning; the service never refuses to
/// start because the shared tier is down.
pub async fn create_cache(config: &CacheConfig) -> Arc<TieredCache> {
    let local = InMemoryCacheConfig::default()
        .with_max_capacity(config.max_capacity)
        .with_default_ttl(config.local_ttl_cap());

    let mut tiered_config = TieredCacheConfig::default()
        .with_local_ttl_cap(config.local_ttl_cap())
        .with_shared_get_timeout(config.shared_get_timeout());
    tiered_config.local = local;

    let Some(url) = &config.redis_url else {
        tracing::info!("No shared cache configured, using in-memory cache only");
        return Arc::new(TieredCache::memory_only(tiered_config));
    };

    let redis_config = RedisCacheConfig::new(url).with_key_prefix(config.key_prefix.clone());

    match RedisCache::connect(redis_config).await {
        Ok(redis) => Arc::new(TieredCache::with_shared(tiered_config, Arc::new(redis)).await),
        Err(e) => {
            tracing::warn!("Shared cache unavailable, using memory only: {}", e);
            Arc::new(TieredCache::memory_only(tiered_config))
        }
    }
}
