//! HTTP error mapping for the core error taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::CoreError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured details (per-field validation errors, query
    /// issues)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request before it reached the core (bad header, bad
    /// path/query parameter).
    BadRequest(String),
    /// Error surfaced by the core engines.
    Core(CoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("BAD_REQUEST", message),
            ),
            AppError::Core(core) => map_core_error(core),
        };

        (status, Json(error)).into_response()
    }
}

fn map_core_error(err: CoreError) -> (StatusCode, ApiError) {
    let message = err.to_string();
    match err {
        CoreError::UnknownEntity(_) => {
            (StatusCode::NOT_FOUND, ApiError::new("UNKNOWN_ENTITY", message))
        }
        CoreError::InvalidQuery { issues } => (
            StatusCode::BAD_REQUEST,
            ApiError::new("INVALID_QUERY", message).with_details(json!(issues)),
        ),
        CoreError::ValidationError { fields } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::new("VALIDATION_ERROR", message).with_details(json!(fields)),
        ),
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message)),
        CoreError::InvalidTransition { .. } => (
            StatusCode::CONFLICT,
            ApiError::new("INVALID_TRANSITION", message),
        ),
        CoreError::SlotConflict => {
            (StatusCode::CONFLICT, ApiError::new("SLOT_CONFLICT", message))
        }
        CoreError::OutsideWorkingHours => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::new("OUTSIDE_WORKING_HOURS", message),
        ),
        CoreError::DependencyTimeout { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            ApiError::new("DEPENDENCY_TIMEOUT", message),
        ),
        CoreError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("STORE_ERROR", message),
        ),
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    #[test]
    fn test_validation_error_maps_to_422_with_field_list() {
        let err = CoreError::validation(vec![FieldError::new("name", "required field is missing")]);
        let (status, body) = map_core_error(err);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "VALIDATION_ERROR");
        let details = body.details.unwrap();
        assert_eq!(details[0]["field"], "name");
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let (status, body) = map_core_error(CoreError::SlotConflict);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "SLOT_CONFLICT");
    }
}
