//! Query vector type

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::DomainError;

/// Fixed-dimension query vector, immutable once produced.
///
/// The validating constructor is the only way in; every component must be
/// finite so similarity math downstream stays well-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryVector(Vec<f32>);

impl QueryVector {
    pub fn new(values: Vec<f32>) -> Result<Self, DomainError> {
        if values.is_empty() {
            return Err(DomainError::validation("Query vector cannot be empty"));
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::validation(
                "Query vector contains non-finite values",
            ));
        }

        Ok(Self(values))
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Inner product with another vector of the same dimension.
    pub fn dot(&self, other: &[f32]) -> f32 {
        self.0.iter().zip(other.iter()).map(|(a, b)| a * b).sum()
    }

    /// Cosine similarity with another vector. Zero-norm operands yield 0.0.
    pub fn cosine_similarity(&self, other: &[f32]) -> f32 {
        if self.0.len() != other.len() {
            return 0.0;
        }

        let dot: f32 = self.dot(other);
        let norm_a: f32 = self.0.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    /// Deterministic digest of the component bytes, used as the primary
    /// component of search cache keys.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for v in &self.0 {
            hasher.update(v.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_vector() {
        assert!(QueryVector::new(vec![]).is_err());
    }

    #[test]
    fn test_rejects_non_finite_values() {
        assert!(QueryVector::new(vec![0.1, f32::NAN]).is_err());
        assert!(QueryVector::new(vec![f32::INFINITY]).is_err());
    }

    #[test]
    fn test_cosine_similarity_identical_vectors() {
        let query = QueryVector::new(vec![0.6, 0.8]).unwrap();
        let sim = query.cosine_similarity(&[0.6, 0.8]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_vectors() {
        let query = QueryVector::new(vec![1.0, 0.0]).unwrap();
        let sim = query.cosine_similarity(&[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch_is_zero() {
        let query = QueryVector::new(vec![1.0, 0.0]).unwrap();
        assert_eq!(query.cosine_similarity(&[1.0]), 0.0);
    }

    #[test]
    fn test_digest_is_deterministic() {
        let a = QueryVector::new(vec![0.1, 0.2, 0.3]).unwrap();
        let b = QueryVector::new(vec![0.1, 0.2, 0.3]).unwrap();
        let c = QueryVector::new(vec![0.1, 0.2, 0.4]).unwrap();

        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn test_serde_round_trip() {
        let query = QueryVector::new(vec![0.25, -0.5]).unwrap();
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(json, "[0.25,-0.5]");

        let back: QueryVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
    }
}
