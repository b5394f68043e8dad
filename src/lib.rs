//! AI Learning Path Generation Service - Library
//!
//! Core modules:
//! - generation: similarity matching, content generation, enrichment,
//!   materialization, scheduling, and the orchestrator
//! - store: SQLite persistence
//! - api: web API endpoints
//! - config: environment-driven configuration

pub mod api;
pub mod config;
pub mod generation;
pub mod store;

pub use config::AgentConfig;
pub use generation::orchestrator::GenerationOrchestrator;
pub use store::Store;
