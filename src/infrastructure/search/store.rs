//! Shared Q&A record store
//!
//! Both in-process strategies read from the same corpus snapshot. Loads
//! swap the whole snapshot atomically, so a search never observes a
//! half-replaced corpus.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::DomainError;

/// One Q&A pair with its precomputed embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

impl QaRecord {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            embedding,
        }
    }
}

/// Snapshot-swapped record store shared by the in-process strategies.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: RwLock<Arc<Vec<QaRecord>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Replaces the corpus. All records must share one embedding dimension.
    pub async fn load(&self, records: Vec<QaRecord>) -> Result<(), DomainError> {
        if let Some(first) = records.first() {
            let dims = first.embedding.len();

            if dims == 0 {
                return Err(DomainError::validation("Record embeddings cannot be empty"));
            }

            if let Some(bad) = records.iter().find(|r| r.embedding.len() != dims) {
                return Err(DomainError::validation(format!(
                    "Record '{}' has {} dimensions, expected {}",
                    bad.id,
                    bad.embedding.len(),
                    dims
                )));
            }
        }

        let count = records.len();
        *self.records.write().await = Arc::new(records);
        tracing::info!(count, "Loaded Q&A records");

        Ok(())
    }

    /// Cheap snapshot of the current corpus.
    pub async fn snapshot(&self) -> Arc<Vec<QaRecord>> {
        Arc::clone(&*self.records.read().await)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Embedding dimension of the loaded corpus, if any.
    pub async fn dimensions(&self) -> Option<usize> {
        self.records
            .read()
            .await
            .first()
            .map(|r| r.embedding.len())
    }
}
