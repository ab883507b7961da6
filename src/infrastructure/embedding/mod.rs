//! Embedding provider implementations

mod openai;

pub use openai::{OpenAiConfig, OpenAiProvider};
