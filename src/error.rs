//! Application error type and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::BackendError;
use crate::routes::ErrorResponse;

/// Every failure a handler or manager can surface. The `Display` form is the
/// message admins see in the error banner.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required field was empty; raised before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The backend connection settings are missing.
    #[error("Backend is not configured: {0}")]
    Misconfigured(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Misconfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Backend(BackendError::Config(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Backend(BackendError::Auth(_)) => StatusCode::UNAUTHORIZED,
            AppError::Backend(BackendError::Api { status, .. }) if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                message: None,
            }),
        )
            .into_response()
    }
}

/// Failures that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid HOST/PORT configuration: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("Title is required!".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Misconfigured("SUPABASE_URL".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(BackendError::api(409, "duplicate")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(BackendError::api(500, "boom")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(BackendError::Auth("Invalid login credentials".into())).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_backend_message_is_passed_through() {
        let err = AppError::from(BackendError::api(400, "invalid input syntax"));
        assert_eq!(err.to_string(), "invalid input syntax");
    }

    #[tokio::test]
    async fn test_into_response_renders_error_body() {
        let response = AppError::NotFound("Theme not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Theme not found");
    }
}
