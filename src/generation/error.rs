//! Generation Error Taxonomy
//!
//! Pre-dispatch errors (user/preferences/cohort/in-progress) surface
//! synchronously to the trigger; everything raised inside the async
//! phase is caught once by the orchestrator and recorded on the path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("User {0} has no onboarding preferences")]
    PreferencesMissing(i64),

    #[error("Unsupported cohort group: {0}")]
    UnsupportedCohort(String),

    #[error("Generation already in progress for path {0}")]
    GenerationInProgress(i64),

    #[error("Content generation failed: {0}")]
    ContentGeneration(String),

    #[error("Resource enrichment failed: {0}")]
    ResourceEnrichment(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type GenerationResult<T> = Result<T, GenerationError>;
