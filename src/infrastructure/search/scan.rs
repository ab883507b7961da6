//! Cosine-scan fallback strategy

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::search::{QueryVector, SearchBackend, SearchResult};

use super::store::RecordStore;

/// Last-resort strategy: full cosine scan over the shared record store.
///
/// Unlike the inner-product index this does not assume normalized
/// embeddings, so it stays correct even when the corpus was loaded from a
/// source that skipped normalization. Slower, but it cannot be unavailable.
#[derive(Debug)]
pub struct CosineScanBackend {
    store: Arc<RecordStore>,
}

impl CosineScanBackend {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SearchBackend for CosineScanBackend {
    fn name(&self) -> &str {
        "cosine_scan"
    }

    async fn search(
        &self,
        query: &QueryVector,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let records = self.store.snapshot().await;

        if records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query = query.clone();
        let results = tokio::task::spawn_blocking(move || {
            let mut scored: Vec<SearchResult> = records
                .iter()
                .map(|record| {
                    SearchResult::new(
                        record.id.clone(),
                        record.question.clone(),
                        record.answer.clone(),
                        query.cosine_similarity(&record.embedding),
                    )
                })
                .collect();

            scored = SearchResult::sanitize(scored);
            scored.truncate(top_k);
            scored
        })
        .await
        .map_err(|e| DomainError::internal(format!("Scan task failed: {}", e)))?;

        Ok(results)
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(!self.store.is_empty().await)
    }
}
