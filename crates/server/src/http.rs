//! HTTP Endpoints
//!
//! OpenAI-compatible speech API plus health, listing and metrics routes.

use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use speech_core::{AudioFormat, SynthesisRequest, DEFAULT_SPEED};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::{ui, ServerError};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let mut router = Router::new()
        // Speech API
        .route("/v1/audio/speech", post(create_speech))
        .route("/v1/audio/voices", get(list_voices))
        .route("/v1/models", get(list_models))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler));

    if server.ui_enabled {
        router = router.merge(ui::routes());
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(server.timeout_seconds)))
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Speech request body
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    /// Accepted for API compatibility; there is one model family
    #[serde(default)]
    pub model: Option<String>,
    pub input: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub response_format: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
}

/// Synthesize a whole file
async fn create_speech(
    State(state): State<AppState>,
    Json(request): Json<SpeechRequest>,
) -> Result<Response, ServerError> {
    let parsed_format = request
        .response_format
        .as_deref()
        .unwrap_or("wav")
        .parse::<AudioFormat>();
    let voice = request
        .voice
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| state.synthesizer.default_voice().to_string());

    let synthesis = SynthesisRequest::new(request.input, voice)
        .with_speed(request.speed.unwrap_or(DEFAULT_SPEED));

    // Request and voice errors are reported ahead of an unknown format
    let format = match parsed_format {
        Ok(format) => format,
        Err(e) => {
            synthesis.validate()?;
            state.synthesizer.resolve_voice(&synthesis.voice)?;
            return Err(e.into());
        }
    };
    let synthesis = synthesis.with_format(format);

    let request_id = Uuid::new_v4();
    tracing::debug!(
        %request_id,
        model = request.model.as_deref().unwrap_or_default(),
        voice = %synthesis.voice,
        format = %format,
        "Speech requested"
    );

    let synthesizer = state.synthesizer.clone();
    let audio = tokio::task::spawn_blocking(move || synthesizer.synthesize_batch(&synthesis)).await??;

    Ok(([(header::CONTENT_TYPE, format.content_type())], audio).into_response())
}

/// Registered voice keys
async fn list_voices(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "voices": state.synthesizer.voices(),
    }))
}

/// Model listing
async fn list_models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let server = &state.config.server;
    Json(serde_json::json!({
        "object": "list",
        "data": [{
            "id": server.model_id,
            "object": "model",
            "owned_by": server.model_owner,
        }],
    }))
}

/// Health check
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
