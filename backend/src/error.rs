use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::ErrorResponse;
use thiserror::Error;
use tracing::error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Error kinds surfaced by the domain layer. Every variant carries the
/// user-safe message; store errors are wrapped and never shown to clients.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Unknown resource, or a resource owned by someone else. The two cases
    /// are deliberately indistinguishable to callers.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl DomainError {
    /// Machine-checkable error class included in every error response.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Database(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) | DomainError::InvalidState(_) => StatusCode::CONFLICT,
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let message = match &self {
            DomainError::Database(err) => {
                error!("Database error: {:?}", err);
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            ok: false,
            error: message,
            kind: self.kind().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
