//! Domain layer - types, traits and errors with no infrastructure concerns

pub mod cache;
pub mod embedding;
pub mod error;
pub mod search;

pub use error::{DomainError, ProviderErrorKind};
