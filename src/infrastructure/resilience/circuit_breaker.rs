//! Circuit breaker for remote dependencies
//!
//! State machine: Closed -> Open after a run of consecutive counted
//! failures, Open -> HalfOpen lazily once the recovery timeout elapses,
//! HalfOpen -> Closed after enough consecutive successes, HalfOpen -> Open
//! on any counted failure. While Open, calls fail fast with
//! `DomainError::CircuitOpen` without invoking the wrapped operation.

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use metrics::counter;
use tokio::sync::Mutex;

use crate::domain::{DomainError, ProviderErrorKind};

/// Breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Configuration for a circuit breaker instance
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive counted failures that trip the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing
    pub recovery_timeout: Duration,
    /// Consecutive half-open successes required to close
    pub success_threshold: u32,
    /// Which provider error kinds count as failures; anything outside this
    /// set propagates without touching the failure counter
    pub failure_kinds: HashSet<ProviderErrorKind>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 1,
            failure_kinds: [
                ProviderErrorKind::RateLimited,
                ProviderErrorKind::Connection,
                ProviderErrorKind::Timeout,
                ProviderErrorKind::Other,
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            ..Self::default()
        }
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_failure_kinds(
        mut self,
        kinds: impl IntoIterator<Item = ProviderErrorKind>,
    ) -> Self {
        self.failure_kinds = kinds.into_iter().collect();
        self
    }
}

/// Mutable breaker state, guarded by a single mutex.
#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    last_failure: Option<String>,
}

/// Point-in-time breaker view for the health surface
#[derive(Debug, Clone, serde::Serialize)]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub last_failure: Option<String>,
}

/// Circuit breaker guarding calls to one named dependency.
///
/// The lock is held only while inspecting or updating counters; the
/// wrapped operation itself runs unlocked, so slow calls never serialize
/// behind each other.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `operation` under the breaker. Fails fast with `CircuitOpen`
    /// while the breaker is open and the recovery timeout has not elapsed.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        self.before_call().await?;

        let result = operation().await;

        match &result {
            Ok(_) => self.on_success().await,
            Err(e) => self.on_error(e).await,
        }

        result
    }

    /// Gate check before invoking the operation. Performs the lazy
    /// Open -> HalfOpen transition.
    async fn before_call(&self) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().await;

        if inner.state == CircuitState::Open {
            let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();

            if elapsed >= self.config.recovery_timeout {
                inner.state = CircuitState::HalfOpen;
                inner.consecutive_successes = 0;
                tracing::info!(breaker = %self.name, "Circuit breaker half-open, probing");
            } else {
                counter!("qa_breaker_rejections_total", "breaker" => self.name.clone())
                    .increment(1);
                return Err(DomainError::circuit_open(&self.name));
            }
        }

        Ok(())
    }

    async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.consecutive_successes += 1;

            if inner.consecutive_successes >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
                inner.last_failure = None;
                tracing::info!(breaker = %self.name, "Circuit breaker closed");
            }
        }
    }

    async fn on_error(&self, error: &DomainError) {
        // Only the configured kinds count; validation errors and the like
        // pass through without moving the state machine.
        let counted = error
            .provider_kind()
            .is_some_and(|kind| self.config.failure_kinds.contains(&kind));

        if !counted {
            return;
        }

        let mut inner = self.inner.lock().await;
        inner.consecutive_successes = 0;
        inner.consecutive_failures += 1;
        inner.last_failure = Some(error.to_string());

        let should_open = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if should_open {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            counter!("qa_breaker_opens_total", "breaker" => self.name.clone()).increment(1);
            tracing::warn!(
                breaker = %self.name,
                failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock().await;

        CircuitBreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            last_failure: inner.last_failure.clone(),
        }
    }

    /// Force-resets the breaker to closed. Operational escape hatch.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.opened_at = None;
        inner.last_failure = None;
        tracing::info!(breaker = %self.name, "Circuit breaker reset");
    }
}
