//! Resource Enricher
//!
//! Resolves video, thumbnail, and reading-resource links for a module
//! topic. External search capabilities are optional; every lookup has
//! a curated fallback chain expressed as an ordered (keyword, result)
//! table, first match wins. Video and thumbnail resolution are total:
//! they never fail and never return nothing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::capabilities::{DurationBucket, ImageSearch, VideoSearch};
use super::types::ModuleType;

/// Returned when no curated video keyword matches the topic.
const GENERIC_VIDEO_FALLBACK: &str =
    "https://www.youtube.com/results?search_query=free+online+course";

/// Ordered keyword -> video URL table, matched by case-insensitive
/// substring containment.
const VIDEO_FALLBACKS: &[(&str, &str)] = &[
    ("python", "https://www.youtube.com/watch?v=rfscVS0vtbw"),
    ("javascript", "https://www.youtube.com/watch?v=PkZNo7MFNFg"),
    ("rust", "https://www.youtube.com/watch?v=BpPEoZW5IiY"),
    ("sql", "https://www.youtube.com/watch?v=HXV3zeQKqGY"),
    ("machine learning", "https://www.youtube.com/watch?v=i_LwzRVP7bg"),
    ("data science", "https://www.youtube.com/watch?v=ua-CiDNNj30"),
    ("web development", "https://www.youtube.com/watch?v=nu_pCVPKzTk"),
    ("design", "https://www.youtube.com/watch?v=c9Wg6Cb_YlU"),
    ("marketing", "https://www.youtube.com/watch?v=nU-IIXBWlS4"),
    ("excel", "https://www.youtube.com/watch?v=Vl0H-qTclOg"),
    ("communication", "https://www.youtube.com/watch?v=HAnw168huqA"),
    ("finance", "https://www.youtube.com/watch?v=WEDIj9JBTC8"),
];

/// Ordered keyword -> reading-resource list table. No generic
/// fallback: unmatched topics get an empty list.
const READING_FALLBACKS: &[(&str, &[&str])] = &[
    (
        "python",
        &[
            "https://docs.python.org/3/tutorial/",
            "https://automatetheboringstuff.com/",
        ],
    ),
    (
        "javascript",
        &[
            "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Guide",
            "https://eloquentjavascript.net/",
        ],
    ),
    (
        "rust",
        &[
            "https://doc.rust-lang.org/book/",
            "https://doc.rust-lang.org/rust-by-example/",
        ],
    ),
    (
        "sql",
        &[
            "https://www.postgresql.org/docs/current/tutorial.html",
            "https://use-the-index-luke.com/",
        ],
    ),
    (
        "machine learning",
        &["https://scikit-learn.org/stable/user_guide.html"],
    ),
    (
        "web development",
        &["https://developer.mozilla.org/en-US/docs/Learn"],
    ),
    ("design", &["https://www.interaction-design.org/literature"]),
    ("finance", &["https://www.investopedia.com/financial-term-dictionary-4769738"]),
];

/// Everything the enricher resolves for one module.
#[derive(Debug, Clone)]
pub struct EnrichedResources {
    pub content_url: String,
    pub thumbnail_url: String,
    pub reading_resources: Vec<String>,
    pub format_metadata: serde_json::Value,
}

/// Resolves module resources through external search capabilities
/// with curated fallbacks.
#[derive(Clone)]
pub struct ResourceEnricher {
    video: Option<Arc<dyn VideoSearch>>,
    images: Option<Arc<dyn ImageSearch>>,
}

impl ResourceEnricher {
    pub fn new(
        video: Option<Arc<dyn VideoSearch>>,
        images: Option<Arc<dyn ImageSearch>>,
    ) -> Self {
        Self { video, images }
    }

    /// Enricher with no external capabilities: fallback tables only.
    pub fn offline() -> Self {
        Self {
            video: None,
            images: None,
        }
    }

    /// Resolve all resources for one topic. The three lookups run
    /// concurrently; the batch-level sequencing across modules is the
    /// materializer's job.
    pub async fn enrich(
        &self,
        topic: &str,
        duration_minutes: i64,
        module_type: ModuleType,
    ) -> EnrichedResources {
        let (content_url, thumbnail_url) = tokio::join!(
            self.find_video_url(topic, duration_minutes),
            self.find_thumbnail_url(topic),
        );
        EnrichedResources {
            content_url,
            thumbnail_url,
            reading_resources: self.reading_resources(topic),
            format_metadata: format_metadata(module_type, duration_minutes),
        }
    }

    /// Total video resolution: external search when configured, else
    /// the curated table, else the generic fallback.
    pub async fn find_video_url(&self, topic: &str, duration_minutes: i64) -> String {
        if let Some(client) = &self.video {
            let bucket = DurationBucket::from_minutes(duration_minutes);
            match client.search(topic, bucket).await {
                Ok(Some(url)) => return url,
                Ok(None) => {
                    log::debug!("video search empty for '{}', using fallback", topic)
                }
                Err(e) => log::warn!("video search failed for '{}': {}", topic, e),
            }
        }
        fallback_video_url(topic)
    }

    /// Total thumbnail resolution: external image search when
    /// configured, else a deterministically seeded placeholder (same
    /// topic, same placeholder).
    pub async fn find_thumbnail_url(&self, topic: &str) -> String {
        if let Some(client) = &self.images {
            match client.search(topic).await {
                Ok(Some(url)) => return url,
                Ok(None) => {
                    log::debug!("image search empty for '{}', using placeholder", topic)
                }
                Err(e) => log::warn!("image search failed for '{}': {}", topic, e),
            }
        }
        placeholder_thumbnail(topic)
    }

    /// Pure table lookup; empty when no keyword matches.
    pub fn reading_resources(&self, topic: &str) -> Vec<String> {
        let lowered = topic.to_lowercase();
        for (keyword, urls) in READING_FALLBACKS {
            if lowered.contains(keyword) {
                return urls.iter().map(|u| u.to_string()).collect();
            }
        }
        Vec::new()
    }
}

fn fallback_video_url(topic: &str) -> String {
    let lowered = topic.to_lowercase();
    for (keyword, url) in VIDEO_FALLBACKS {
        if lowered.contains(keyword) {
            return url.to_string();
        }
    }
    GENERIC_VIDEO_FALLBACK.to_string()
}

fn placeholder_thumbnail(topic: &str) -> String {
    let mut hasher = DefaultHasher::new();
    topic.to_lowercase().hash(&mut hasher);
    format!("https://picsum.photos/seed/{:x}/640/360", hasher.finish())
}

/// Pure mapping from module type to presentation metadata, merged
/// with the numeric duration.
pub fn format_metadata(module_type: ModuleType, duration_minutes: i64) -> serde_json::Value {
    let (kind, provider, quality) = match module_type {
        ModuleType::Video => ("video", "youtube", "hd"),
        ModuleType::Article => ("article", "web", "standard"),
        ModuleType::Course => ("course", "web", "standard"),
        ModuleType::Project => ("project", "github", "standard"),
        ModuleType::Interactive => ("interactive", "web", "standard"),
        ModuleType::Assessment => ("assessment", "internal", "standard"),
    };
    serde_json::json!({
        "type": kind,
        "provider": provider,
        "quality": quality,
        "duration": duration_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::capabilities::{DurationBucket, VideoSearch};
    use crate::generation::error::{GenerationError, GenerationResult};
    use async_trait::async_trait;

    struct FailingVideoSearch;

    #[async_trait]
    impl VideoSearch for FailingVideoSearch {
        async fn search(
            &self,
            _query: &str,
            _bucket: DurationBucket,
        ) -> GenerationResult<Option<String>> {
            Err(GenerationError::ResourceEnrichment("search down".to_string()))
        }
    }

    struct CannedVideoSearch(String);

    #[async_trait]
    impl VideoSearch for CannedVideoSearch {
        async fn search(
            &self,
            _query: &str,
            _bucket: DurationBucket,
        ) -> GenerationResult<Option<String>> {
            Ok(Some(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_video_url_is_total_without_client() {
        let enricher = ResourceEnricher::offline();
        // Keyword match, first table entry wins.
        let url = enricher.find_video_url("Advanced Python Patterns", 30).await;
        assert_eq!(url, "https://www.youtube.com/watch?v=rfscVS0vtbw");
        // No keyword match: the generic fallback, never empty.
        let url = enricher.find_video_url("underwater basket weaving", 30).await;
        assert_eq!(url, GENERIC_VIDEO_FALLBACK);
    }

    #[tokio::test]
    async fn test_video_search_error_falls_back() {
        let enricher = ResourceEnricher::new(Some(Arc::new(FailingVideoSearch)), None);
        let url = enricher.find_video_url("intro to sql", 10).await;
        assert_eq!(url, "https://www.youtube.com/watch?v=HXV3zeQKqGY");
    }

    #[tokio::test]
    async fn test_video_search_result_wins_over_fallback() {
        let enricher = ResourceEnricher::new(
            Some(Arc::new(CannedVideoSearch("https://example.com/v/1".to_string()))),
            None,
        );
        let url = enricher.find_video_url("intro to sql", 10).await;
        assert_eq!(url, "https://example.com/v/1");
    }

    #[tokio::test]
    async fn test_thumbnail_placeholder_is_deterministic() {
        let enricher = ResourceEnricher::offline();
        let a = enricher.find_thumbnail_url("Graph Theory").await;
        let b = enricher.find_thumbnail_url("graph theory").await;
        let c = enricher.find_thumbnail_url("linear algebra").await;
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("https://picsum.photos/seed/"));
    }

    #[test]
    fn test_reading_resources_empty_when_unmatched() {
        let enricher = ResourceEnricher::offline();
        assert!(!enricher.reading_resources("Learn Rust Fast").is_empty());
        assert!(enricher.reading_resources("origami folding").is_empty());
    }

    #[test]
    fn test_format_metadata_merges_duration() {
        let meta = format_metadata(ModuleType::Video, 45);
        assert_eq!(meta["type"], "video");
        assert_eq!(meta["provider"], "youtube");
        assert_eq!(meta["quality"], "hd");
        assert_eq!(meta["duration"], 45);

        let meta = format_metadata(ModuleType::Assessment, 15);
        assert_eq!(meta["provider"], "internal");
    }
}
