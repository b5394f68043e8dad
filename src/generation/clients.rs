//! External Capability Clients
//!
//! reqwest-backed implementations of the capability traits: an
//! OpenAI-compatible chat model in JSON-object response mode, YouTube
//! Data v3 video search, and Pexels photo search. All of these are
//! optional at runtime; absence of a key leaves the enricher on its
//! fallback tables.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::capabilities::{
    CompletionOptions, ContentModel, DurationBucket, ImageSearch, VideoSearch,
};
use super::error::{GenerationError, GenerationResult};

const MODEL_TIMEOUT: Duration = Duration::from_secs(90);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================
// CHAT MODEL (OpenAI-compatible, JSON mode)
// ============================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Chat-completion client against an OpenAI-compatible endpoint.
pub struct JsonChatModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl JsonChatModel {
    pub fn new(api_key: &str, model: &str) -> GenerationResult<Self> {
        if api_key.is_empty() {
            return Err(GenerationError::ContentGeneration(
                "model API key is not configured".to_string(),
            ));
        }
        let client = Client::builder().timeout(MODEL_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ContentModel for JsonChatModel {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> GenerationResult<serde_json::Value> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: options.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        parse_chat_content(response)
    }
}

fn parse_chat_content(response: ChatResponse) -> GenerationResult<serde_json::Value> {
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| {
            GenerationError::ContentGeneration("model returned no choices".to_string())
        })?;
    serde_json::from_str(&content)
        .map_err(|e| GenerationError::ContentGeneration(format!("non-JSON model output: {}", e)))
}

/// Stand-in model used when no API key is configured. Every run
/// through it fails and is recorded on the path like any other
/// content-generation failure.
pub struct UnconfiguredModel;

#[async_trait]
impl ContentModel for UnconfiguredModel {
    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> GenerationResult<serde_json::Value> {
        Err(GenerationError::ContentGeneration(
            "model API key is not configured".to_string(),
        ))
    }
}

// ============================================================
// YOUTUBE VIDEO SEARCH
// ============================================================

#[derive(Debug, Deserialize)]
struct YouTubeResponse {
    #[serde(default)]
    items: Vec<YouTubeItem>,
}

#[derive(Debug, Deserialize)]
struct YouTubeItem {
    id: YouTubeId,
}

#[derive(Debug, Deserialize)]
struct YouTubeId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

/// YouTube Data v3 search, first ranked result only.
pub struct YouTubeSearchClient {
    client: Client,
    api_key: String,
}

impl YouTubeSearchClient {
    pub fn new(api_key: &str) -> GenerationResult<Self> {
        let client = Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl VideoSearch for YouTubeSearchClient {
    async fn search(
        &self,
        query: &str,
        bucket: DurationBucket,
    ) -> GenerationResult<Option<String>> {
        let response = self
            .client
            .get("https://www.googleapis.com/youtube/v3/search")
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
                ("videoDuration", bucket.as_str()),
                ("q", query),
                ("key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<YouTubeResponse>()
            .await?;

        Ok(first_video_url(response))
    }
}

fn first_video_url(response: YouTubeResponse) -> Option<String> {
    response
        .items
        .into_iter()
        .filter_map(|item| item.id.video_id)
        .next()
        .map(|id| format!("https://www.youtube.com/watch?v={}", id))
}

// ============================================================
// PEXELS IMAGE SEARCH
// ============================================================

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PexelsSrc,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    medium: String,
}

/// Pexels photo search used for module thumbnails.
pub struct PexelsImageClient {
    client: Client,
    api_key: String,
}

impl PexelsImageClient {
    pub fn new(api_key: &str) -> GenerationResult<Self> {
        let client = Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ImageSearch for PexelsImageClient {
    async fn search(&self, query: &str) -> GenerationResult<Option<String>> {
        let response = self
            .client
            .get("https://api.pexels.com/v1/search")
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", "1")])
            .send()
            .await?
            .error_for_status()?
            .json::<PexelsResponse>()
            .await?;

        Ok(response.photos.into_iter().next().map(|p| p.src.medium))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_content_extracts_json() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "{\"modules\": []}"}}]
        }))
        .unwrap();
        let value = parse_chat_content(response).unwrap();
        assert!(value["modules"].is_array());
    }

    #[test]
    fn test_parse_chat_content_rejects_prose() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "Sure! Here is your plan..."}}]
        }))
        .unwrap();
        assert!(matches!(
            parse_chat_content(response),
            Err(GenerationError::ContentGeneration(_))
        ));

        let empty: ChatResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(parse_chat_content(empty).is_err());
    }

    #[test]
    fn test_first_video_url() {
        let response: YouTubeResponse = serde_json::from_value(serde_json::json!({
            "items": [{"id": {"videoId": "abc123"}}]
        }))
        .unwrap();
        assert_eq!(
            first_video_url(response),
            Some("https://www.youtube.com/watch?v=abc123".to_string())
        );

        let empty: YouTubeResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(first_video_url(empty), None);
    }

    #[test]
    fn test_missing_model_key_is_rejected() {
        assert!(JsonChatModel::new("", "gpt-4o-mini").is_err());
    }
}
