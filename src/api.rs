//! Web API Module
//!
//! Thin HTTP surface over the generation pipeline. All endpoints
//! return JSON and require no authentication (prototype mode); the
//! real routing/auth stack is an external collaborator.

use crate::config::AgentConfig;
use crate::generation::{
    capabilities::{ContentModel, ImageSearch, LogNotifier, VideoSearch},
    clients::{JsonChatModel, PexelsImageClient, UnconfiguredModel, YouTubeSearchClient},
    error::GenerationError,
    orchestrator::GenerationOrchestrator,
    resources::ResourceEnricher,
    types::PathStatus,
};
use crate::store::Store;
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================
// APPLICATION STATE
// ============================================================

/// Shared application state
pub struct AppState {
    pub store: Store,
    pub orchestrator: Arc<GenerationOrchestrator>,
}

impl AppState {
    /// Wire the pipeline from configuration. Missing search keys
    /// leave the enricher on its fallback tables; a missing model key
    /// installs a stand-in that fails generation runs cleanly.
    pub fn from_config(config: &AgentConfig) -> Result<Self, rusqlite::Error> {
        let store = Store::open(config.db_path.clone())?;

        let model: Arc<dyn ContentModel> = match &config.model_api_key {
            Some(key) => match JsonChatModel::new(key, &config.model_name) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    log::warn!("model client unavailable: {}", e);
                    Arc::new(UnconfiguredModel)
                }
            },
            None => {
                log::warn!("MODEL_API_KEY not set; generation runs will fail");
                Arc::new(UnconfiguredModel)
            }
        };

        let video: Option<Arc<dyn VideoSearch>> = config
            .youtube_api_key
            .as_deref()
            .and_then(|key| YouTubeSearchClient::new(key).ok())
            .map(|c| Arc::new(c) as Arc<dyn VideoSearch>);
        let images: Option<Arc<dyn ImageSearch>> = config
            .pexels_api_key
            .as_deref()
            .and_then(|key| PexelsImageClient::new(key).ok())
            .map(|c| Arc::new(c) as Arc<dyn ImageSearch>);

        let orchestrator = Arc::new(GenerationOrchestrator::new(
            store.clone(),
            model,
            ResourceEnricher::new(video, images),
            Arc::new(LogNotifier),
        ));

        Ok(Self {
            store,
            orchestrator,
        })
    }
}

// ============================================================
// API REQUEST/RESPONSE TYPES
// ============================================================

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

// ============================================================
// API HANDLERS
// ============================================================

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "Learning Path Agent API",
        "version": "0.1.0"
    }))
}

/// Trigger path generation (fire-and-forget)
async fn trigger_generation(
    data: web::Data<Arc<AppState>>,
    req: web::Json<GenerateRequest>,
) -> impl Responder {
    // Policy check for a friendly 409; the orchestrator's conditional
    // status swap is the actual guard.
    if let Ok(Some(path)) = data.store.latest_path(req.user_id) {
        if path.status == PathStatus::Generating {
            return HttpResponse::Conflict()
                .json(ApiResponse::<()>::error("Generation already in progress"));
        }
    }

    match data.orchestrator.generate(req.user_id).await {
        Ok(Some(path_id)) => HttpResponse::Accepted().json(ApiResponse::success(
            serde_json::json!({
                "learningPathId": path_id,
                "status": "generating",
            }),
        )),
        Ok(None) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "message": "Learning paths are not available for this account type",
        }))),
        Err(GenerationError::UserNotFound(_)) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("User not found"))
        }
        Err(GenerationError::PreferencesMissing(_)) => HttpResponse::BadRequest().json(
            ApiResponse::<()>::error("Complete onboarding before generating a path"),
        ),
        Err(GenerationError::GenerationInProgress(_)) => HttpResponse::Conflict()
            .json(ApiResponse::<()>::error("Generation already in progress")),
        Err(e) => {
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(&e.to_string()))
        }
    }
}

/// Latest path with its ordered modules
async fn get_path(data: web::Data<Arc<AppState>>, path: web::Path<i64>) -> impl Responder {
    let user_id = path.into_inner();
    match data.orchestrator.get_path(user_id) {
        Ok(Some((path, modules))) => HttpResponse::Ok().json(ApiResponse::success(
            serde_json::json!({"path": path, "modules": modules}),
        )),
        Ok(None) => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("No learning path. Generate one first.")),
        Err(e) => {
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(&e.to_string()))
        }
    }
}

/// Generation status snapshot
async fn get_status(data: web::Data<Arc<AppState>>, path: web::Path<i64>) -> impl Responder {
    let user_id = path.into_inner();
    match data.orchestrator.get_status(user_id) {
        Ok(report) => HttpResponse::Ok().json(ApiResponse::success(report)),
        Err(e) => {
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(&e.to_string()))
        }
    }
}

// ============================================================
// SERVER CONFIGURATION
// ============================================================

/// Configure and run the API server
pub async fn run_server(config: AgentConfig) -> std::io::Result<()> {
    let state = Arc::new(
        AppState::from_config(&config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?,
    );

    println!(
        "🚀 Learning Path Agent API starting at http://{}:{}",
        config.host, config.port
    );
    println!("📚 API Endpoints:");
    println!("   POST /api/paths/generate        - Trigger generation");
    println!("   GET  /api/paths/:user_id        - Get latest path + modules");
    println!("   GET  /api/paths/:user_id/status - Get generation status");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .route("/health", web::get().to(health_check))
            .route("/api/paths/generate", web::post().to(trigger_generation))
            .route("/api/paths/{user_id}", web::get().to(get_path))
            .route("/api/paths/{user_id}/status", web::get().to(get_status))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
