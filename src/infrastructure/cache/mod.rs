//! Cache infrastructure - tiered cache over in-memory and Redis backends

mod factory;
mod in_memory;
mod redis;
mod tiered;

pub use factory::create_cache;
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::{RedisCache, RedisCacheConfig};
pub use tiered::{CacheStats, TieredCache, TieredCacheConfig};
