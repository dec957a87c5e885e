//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API errors
#[derive(Debug)]
pub enum ApiError {
    InvalidParameter { name: &'static str, value: String },
    /// Snapshot rebuild failed; the previous snapshot is still served
    Reload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidParameter { name, value } => (
                StatusCode::BAD_REQUEST,
                format!("Invalid {}: {}", name, value),
            ),
            ApiError::Reload(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Reload failed: {}", msg),
            ),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
