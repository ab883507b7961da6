//! Q&A Retrieval Resilience Core
//!
//! Retrieval of semantically similar Q&A pairs, built to stay fast and
//! available despite two unreliable dependencies: a remote
//! embedding/completion API and one or more vector-search backends.
//!
//! The core is three pieces:
//! - a tiered cache (process-local moka in front of shared Redis),
//! - per-dependency circuit breakers,
//! - a search orchestrator that tries the in-process index first and then
//!   races the remote strategies, memoizing results.
//!
//! [`RetrievalService`] is the composition root the request-mapping layer
//! consumes.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::search::{QueryVector, SearchResult};
pub use domain::{DomainError, ProviderErrorKind};
pub use infrastructure::services::{HealthReport, HealthStatus, RetrievalService};
