//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use huddle_types::error::{LobbyError, RepositoryError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session coordination failed.
    Lobby(LobbyError),
    /// The guest or its session no longer exists.
    Gone(String),
    /// Malformed or rejected request input.
    Validation(String),
}

impl From<LobbyError> for AppError {
    fn from(e: LobbyError) -> Self {
        AppError::Lobby(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Lobby(LobbyError::Repository(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Lobby(LobbyError::Repository(RepositoryError::NotFound(msg))) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone())
            }
            AppError::Lobby(LobbyError::Repository(e)) => {
                tracing::error!("store failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", e.to_string())
            }
            AppError::Lobby(LobbyError::Notify(e)) => {
                (StatusCode::BAD_GATEWAY, "NOTIFY_ERROR", e.to_string())
            }
            AppError::Lobby(e @ LobbyError::NoLocations) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED", e.to_string())
            }
            AppError::Gone(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
