//! Embedding/completion domain - types and provider trait

mod provider;
mod request;
mod response;

pub use provider::EmbeddingProvider;
pub use request::{ChatMessage, CompletionRequest, EmbeddingInput, EmbeddingRequest};
pub use response::{Embedding, EmbeddingResponse, EmbeddingUsage};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
