//! Generation Module - Core of the Learning Path Service
//!
//! Implements the full path-generation pipeline:
//! - SimilarityMatcher: donor reuse across near-duplicate profiles
//! - ContentGenerator: cohort prompts and plan parsing
//! - ModuleMaterializer: enrichment + batch persistence
//! - ScheduleBuilder: weekly periods
//! - GenerationOrchestrator: status lifecycle and background jobs

pub mod capabilities;
pub mod clients;
pub mod content;
pub mod error;
pub mod materialize;
pub mod orchestrator;
pub mod resources;
pub mod schedule;
pub mod similarity;
pub mod types;

pub use capabilities::*;
pub use content::*;
pub use error::*;
pub use materialize::*;
pub use orchestrator::*;
pub use resources::*;
pub use schedule::*;
pub use similarity::*;
pub use types::*;
