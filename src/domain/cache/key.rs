//! Fingerprint-based cache key generation
//!
//! Composite inputs are canonicalized (deterministic field ordering) and
//! hashed, so identical logical inputs always yield identical keys.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::DomainError;

/// Trait for generating cache keys from input data
pub trait CacheKeyGenerator: Send + Sync + Debug {
    /// Generates a cache key from the given components
    fn generate(&self, params: &CacheKeyParams) -> String;

    /// Generates a key with a namespace prefix
    fn generate_with_namespace(&self, namespace: &str, params: &CacheKeyParams) -> String {
        format!("{}:{}", namespace, self.generate(params))
    }
}

/// Parameters for cache key generation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier (e.g. query digest, model ID)
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    /// Creates new cache key parameters with a primary identifier
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    /// Adds a component to the key parameters
    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Creates parameters from a serializable value.
    ///
    /// The value goes through `serde_json::Value`, which sorts map keys,
    /// so two logically identical inputs canonicalize identically.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, DomainError> {
        let canonical = serde_json::to_value(value)
            .map_err(|e| DomainError::cache(format!("Failed to canonicalize key input: {}", e)))?;
        Ok(Self::new(canonical.to_string()))
    }
}

/// Fingerprint key generator: canonical components hashed with SHA-256.
///
/// Keys are fixed-length hex digests, safe for both the process-local map
/// and the shared store regardless of input size.
#[derive(Debug, Clone, Default)]
pub struct FingerprintGenerator;

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CacheKeyGenerator for FingerprintGenerator {
    fn generate(&self, params: &CacheKeyParams) -> String {
        let mut hasher = Sha256::new();
        hasher.update(params.primary.as_bytes());

        for (k, v) in &params.components {
            hasher.update(b"\x1f");
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
        }

        hex::encode(hasher.finalize())
    }
}
