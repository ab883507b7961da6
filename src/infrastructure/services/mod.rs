//! Service layer - orchestration and the composition root

mod orchestrator;
mod retrieval;

pub use orchestrator::{SearchOrchestrator, SearchOrchestratorConfig, StrategyStats};
pub use retrieval::{HealthReport, HealthStatus, RetrievalService, RetrievalServiceBuilder};
