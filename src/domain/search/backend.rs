//! Search backend (strategy) trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::{QueryVector, SearchResult};
use crate::domain::DomainError;

/// One concrete nearest-neighbor search strategy.
///
/// Implementations normalize their native response into [`SearchResult`]s
/// with similarity in [0, 1] before returning.
#[async_trait]
pub trait SearchBackend: Send + Sync + Debug {
    /// Stable name used for breaker identity, stats and logging
    fn name(&self) -> &str;

    /// Return up to `top_k` nearest neighbors of the query
    async fn search(
        &self,
        query: &QueryVector,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;

    /// Check whether the backend is reachable
    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(true)
    }
}
