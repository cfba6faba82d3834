// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::store::StoreError;

/// API error taxonomy with appropriate status codes and client-friendly messages.
///
/// Internal store or serialization detail is never surfaced to callers; it is
/// logged via `tracing` and only the taxonomy code goes over the wire.
#[derive(Debug)]
pub enum ApiError {
    // 401 Unauthorized
    Authentication(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found (route or resource; also used where existence must not leak)
    NotFound(String),

    // 400 Bad Request
    Validation {
        message: String,
        field: Option<String>,
    },

    // 409 Conflict
    Conflict(String),

    // 503 Service Unavailable (transient backing-store failure)
    StoreUnavailable(String),

    // 500 Internal Server Error (detail stays internal)
    Unexpected(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Authentication(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Validation { .. } => 400,
            ApiError::Conflict(_) => 409,
            ApiError::StoreUnavailable(_) => 503,
            ApiError::Unexpected(_) => 500,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Authentication(_) => "AUTHENTICATION_ERROR",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ApiError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Authentication(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Validation { message, .. } => message,
            ApiError::Conflict(msg) => msg,
            // Transient and unexpected failures carry internal detail; mask it.
            ApiError::StoreUnavailable(_) => "Backing store temporarily unavailable",
            ApiError::Unexpected(_) => "An unexpected error occurred",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code(),
        });

        if let ApiError::Validation { field: Some(field), .. } = self {
            body["field"] = json!(field);
        }

        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn authentication(message: impl Into<String>) -> Self {
        ApiError::Authentication(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn store_unavailable(detail: impl Into<String>) -> Self {
        ApiError::StoreUnavailable(detail.into())
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        tracing::error!("Unexpected error: {}", detail);
        ApiError::Unexpected(detail)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("Item not found"),
            StoreError::Unavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                ApiError::StoreUnavailable(detail)
            }
            StoreError::Conflict(detail) => ApiError::conflict(detail),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::unexpected(format!("JSON serialization failed: {}", err))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
