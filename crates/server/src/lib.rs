//! Speech Server
//!
//! Exposes the synthesis engine over gRPC (sentence streaming), an
//! OpenAI-style HTTP API (whole files) and a small browser UI.

pub mod grpc;
pub mod http;
pub mod metrics;
pub mod state;
pub mod ui;

pub use grpc::{proto, TtsService};
pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Synthesis(#[from] speech_core::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Synthesis(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Synthesis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("synthesis task failed: {}", err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = match &self {
            ServerError::Synthesis(speech_core::Error::UnknownVoice { available, .. }) => {
                serde_json::json!({ "error": self.to_string(), "available": available })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServerError> for tonic::Status {
    fn from(err: ServerError) -> Self {
        match err.status_code() {
            StatusCode::BAD_REQUEST => tonic::Status::invalid_argument(err.to_string()),
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}
