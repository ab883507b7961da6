//! Resilience primitives - circuit breakers and guarded calls

mod circuit_breaker;
mod guarded;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState,
};
pub use guarded::GuardedCall;
