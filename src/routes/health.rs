/**
 * Health Routes
 * Liveness, readiness and backend-as-a-service reachability
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::state::{AppState, BackendHandle};

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCheck {
    fn healthy(response_time: Option<u64>) -> Self {
        Self {
            status: "healthy".to_string(),
            response_time,
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some(error.into()),
        }
    }

    fn misconfigured(reason: &str) -> Self {
        Self {
            status: "misconfigured".to_string(),
            response_time: None,
            error: Some(reason.to_string()),
        }
    }
}

/// Detailed health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    pub checks: HealthChecks,
}

/// Health checks for all services
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub backend: ServiceCheck,
    pub database: ServiceCheck,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

async fn check_backend(handle: &BackendHandle) -> ServiceCheck {
    match handle {
        BackendHandle::Misconfigured(reason) => ServiceCheck::misconfigured(reason),
        BackendHandle::Ready(backend) => match backend.ping().await {
            Ok(duration) => ServiceCheck::healthy(Some(duration.as_millis() as u64)),
            Err(e) => ServiceCheck::unhealthy(e.to_string()),
        },
    }
}

/// The migration database is optional; without a pool it is reported as
/// not configured.
async fn check_database() -> ServiceCheck {
    match crate::db::health_check().await {
        Ok(duration) => ServiceCheck::healthy(Some(duration.as_millis() as u64)),
        Err(e) => ServiceCheck::unhealthy(e.to_string()),
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed - Detailed health with all checks
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let (backend, database) = tokio::join!(check_backend(&state.backend), check_database());

    // The process is up even when a dependency is not
    let response = DetailedHealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: Some(uptime),
        checks: HealthChecks { backend, database },
    };

    (StatusCode::OK, Json(response))
}

/// GET /health/backend - Backend-as-a-service reachability
pub async fn health_backend(State(state): State<AppState>) -> impl IntoResponse {
    let check = check_backend(&state.backend).await;
    let status = match check.status.as_str() {
        "healthy" => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(check))
}

/// GET /health/ready - Readiness check
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();

    let (status, label, reason) = match &state.backend {
        BackendHandle::Ready(_) => (StatusCode::OK, "ready", None),
        BackendHandle::Misconfigured(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready",
            Some(format!("Backend is not configured: {}", reason)),
        ),
    };

    (
        status,
        Json(ReadyResponse {
            status: label.to_string(),
            timestamp: Utc::now(),
            uptime: Some(uptime),
            reason,
        }),
    )
}

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_ping))
        .route("/health/detailed", get(health_detailed))
        .route("/health/backend", get(health_backend))
        .route("/health/ready", get(health_ready))
}
