//! External Capability Boundaries
//!
//! Trait seams for everything the pipeline consumes from outside:
//! the generation model, video/image search, and the notification
//! sink. Production implementations live in `clients.rs`; tests
//! substitute canned and recording fakes.

use async_trait::async_trait;

use super::error::GenerationResult;

/// Tuning knobs for one model completion.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

/// The generative content capability. Must support a JSON-object
/// response mode; the returned value is parsed structurally by the
/// content generator.
#[async_trait]
pub trait ContentModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> GenerationResult<serde_json::Value>;
}

/// Requested video length bucket, derived from module minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBucket {
    Short,
    Medium,
    Long,
}

impl DurationBucket {
    /// `<4 -> short, 4-20 -> medium, >20 -> long`
    pub fn from_minutes(minutes: i64) -> Self {
        if minutes < 4 {
            DurationBucket::Short
        } else if minutes <= 20 {
            DurationBucket::Medium
        } else {
            DurationBucket::Long
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationBucket::Short => "short",
            DurationBucket::Medium => "medium",
            DurationBucket::Long => "long",
        }
    }
}

/// Keyed video search. `Ok(None)` means the query returned no hits;
/// the enricher treats errors and empty results identically.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str, bucket: DurationBucket)
        -> GenerationResult<Option<String>>;
}

/// Keyed image search used for module thumbnails.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, query: &str) -> GenerationResult<Option<String>>;
}

/// Best-effort, at-most-once lifecycle event sink. No acknowledgment;
/// emission failures are the implementation's problem, never the
/// pipeline's.
pub trait Notifier: Send + Sync {
    fn emit(&self, user_id: i64, event: &str, payload: serde_json::Value);
}

/// Default notifier: logs events. The real push transport is an
/// external collaborator.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn emit(&self, user_id: i64, event: &str, payload: serde_json::Value) {
        log::info!("notify user={} event={} payload={}", user_id, event, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_buckets() {
        assert_eq!(DurationBucket::from_minutes(0), DurationBucket::Short);
        assert_eq!(DurationBucket::from_minutes(3), DurationBucket::Short);
        assert_eq!(DurationBucket::from_minutes(4), DurationBucket::Medium);
        assert_eq!(DurationBucket::from_minutes(20), DurationBucket::Medium);
        assert_eq!(DurationBucket::from_minutes(21), DurationBucket::Long);
    }
}
