//! Service Configuration
//!
//! Everything comes from the environment. Search keys are optional:
//! when absent, the enricher stays on its curated fallback tables.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    /// SQLite file; None means the default path next to the binary.
    pub db_path: Option<PathBuf>,
    pub model_api_key: Option<String>,
    pub model_name: String,
    pub youtube_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            db_path: None,
            model_api_key: None,
            model_name: "gpt-4o-mini".to_string(),
            youtube_api_key: None,
            pexels_api_key: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            db_path: std::env::var("DATABASE_PATH").ok().map(PathBuf::from),
            model_api_key: non_empty(std::env::var("MODEL_API_KEY").ok()),
            model_name: std::env::var("MODEL_NAME").unwrap_or(defaults.model_name),
            youtube_api_key: non_empty(std::env::var("YOUTUBE_API_KEY").ok()),
            pexels_api_key: non_empty(std::env::var("PEXELS_API_KEY").ok()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
