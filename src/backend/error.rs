//! Error type for calls into the backend-as-a-service.

/// Every failure the BaaS wrapper can report.
///
/// The `Display` form is the human-readable message shown to admins, so
/// `Api` and `Auth` render the upstream message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Required connection settings are missing.
    #[error("backend is not configured: {0}")]
    Config(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// Credentials were rejected by the auth service.
    #[error("{0}")]
    Auth(String),

    /// Transport failure (connection refused, timeout, TLS...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A row or response body could not be (de)serialized.
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}
