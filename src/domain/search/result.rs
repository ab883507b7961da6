//! Search result type shared by all strategies

use serde::{Deserialize, Serialize};

/// One retrieved Q&A pair with its similarity to the query.
///
/// Every strategy normalizes its backend-specific response into this shape
/// before results are compared or returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub question: String,
    pub answer: String,
    /// Similarity to the query, in [0, 1]
    pub similarity: f32,
}

impl SearchResult {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        similarity: f32,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            similarity,
        }
    }

    /// Drops results whose similarity falls outside [0, 1] and sorts the
    /// remainder by descending similarity. The sort is stable, so ties keep
    /// their first-seen input order.
    pub fn sanitize(results: Vec<SearchResult>) -> Vec<SearchResult> {
        let before = results.len();

        let mut kept: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| r.similarity.is_finite() && (0.0..=1.0).contains(&r.similarity))
            .collect();

        let dropped = before - kept.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped results with out-of-range similarity");
        }

        kept.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        kept
    }
}
