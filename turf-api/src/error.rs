use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use turf_core::ReservationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication failed: {0}")]
    AuthenticationError(String),
    #[error("not allowed: {0}")]
    AuthorizationError(String),
    #[error("invalid request: {0}")]
    ValidationError(String),
    #[error("not found: {0}")]
    NotFoundError(String),
    /// A business conflict; `code` becomes the `error` field and `details`
    /// is rendered under `field`.
    #[error("{code}")]
    ConflictError {
        code: &'static str,
        field: &'static str,
        details: Value,
    },
    #[error("internal error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn conflict(code: &'static str, field: &'static str, details: impl serde::Serialize) -> Self {
        let details = serde_json::to_value(details).unwrap_or(Value::Null);
        AppError::ConflictError { code, field, details }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ConflictError { code, field, details } => {
                (StatusCode::CONFLICT, json!({ "error": code, field: details }))
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(msg) => AppError::ValidationError(msg),
            ReservationError::NotFound(msg) => AppError::NotFoundError(msg),
            ReservationError::Storage(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

/// Malformed bodies are the caller's fault: 400, not axum's 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
