//! In-process inner-product index
//!
//! Fast path for queries over the loaded corpus. Record embeddings are
//! expected to be L2-normalized, so the inner product is the cosine
//! similarity. Scoring runs on the blocking pool to keep large corpora off
//! the reactor threads.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::search::{QueryVector, SearchBackend, SearchResult};

use super::store::RecordStore;

/// Brute-force inner-product search over the shared record store.
#[derive(Debug)]
pub struct MemoryIndex {
    store: Arc<RecordStore>,
}

impl MemoryIndex {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SearchBackend for MemoryIndex {
    fn name(&self) -> &str {
        "memory_index"
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

        if records[0].embedding.len() != query.dimensions() {
            return Err(DomainError::validation(format!(
                "Query has {} dimensions, index has {}",
                query.dimensions(),
                records[0].embedding.len()
            )));
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
                        query.dot(&record.embedding),
                    )
                })
                .collect();

            scored = SearchResult::sanitize(scored);
            scored.truncate(top_k);
            scored
        })
        .await
        .map_err(|e| DomainError::internal(format!("Index scoring task failed: {}", e)))?;

        Ok(results)
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(!self.store.is_empty().await)
    }
}
