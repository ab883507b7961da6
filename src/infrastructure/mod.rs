//! Infrastructure layer - concrete implementations of the domain traits

pub mod cache;
pub mod embedding;
pub mod http;
pub mod logging;
pub mod resilience;
pub mod search;
pub mod services;
