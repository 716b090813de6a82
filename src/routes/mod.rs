/**
 * Routes Module
 * API route handlers
 */
use serde::{Deserialize, Serialize};

pub mod admin;
pub mod auth;
pub mod health;
pub mod site;
pub mod upload;

/// Error body shared by every handler.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
