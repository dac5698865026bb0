//! Errors returned by the browser-facing handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("turn {turn} is unknown to session {session}")]
    UnknownTurn { session: String, turn: u64 },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::debug!(name: "http.not_found", error = %self, "Request for unknown resource");
        (StatusCode::NOT_FOUND, self.to_string()).into_response()
    }
}
