//! Landing CMS - library for app logic and testing

pub mod backend;
pub mod cms;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod site;
pub mod state;
pub mod theme;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use config::{AppConfig, BackendConfig};
use error::StartupError;
use state::{AppState, BackendHandle};

/// Request body cap; leaves room for a 5 MB image plus multipart framing.
const BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Configure CORS from the configured origin list. Origins that are not
/// valid header values are skipped with a warning.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let cors = configure_cors(config);
    tracing::info!(origins = ?config.allowed_origins, "CORS configured");

    Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/auth/logout", post(routes::auth::logout))
        .merge(routes::admin::admin_router(state.clone()))
        .merge(routes::site::site_router())
        .merge(routes::health::health_router())
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(cors)
}

/// Provision the schema when a direct database URL is configured.
async fn provision_database() {
    let Some(config) = db::DbConfig::from_env() else {
        tracing::info!("DATABASE_URL not set. Assuming the schema is already provisioned.");
        return;
    };

    match db::init_pool(Some(config)).await {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Continuing without migrations.",
                e
            );
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    // Held for the process lifetime so buffered log lines are flushed.
    let _log_guards = logging::init(&logging::LogConfig::from_env());

    routes::health::init_start_time();

    let app_config = AppConfig::default();
    let backend_config = BackendConfig::from_env();
    if app_config.is_production() && backend_config.jwt_secret.is_none() {
        tracing::warn!(
            "SUPABASE_JWT_SECRET is not set; every admin request is verified through the auth service."
        );
    }

    provision_database().await;

    let backend = BackendHandle::connect(&backend_config);
    let state = AppState::new(backend, &backend_config);
    state.theme.init().await;

    let app = create_app(state, &app_config);

    let addr: SocketAddr = format!("{}:{}", app_config.host, app_config.port).parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig::from_lookup(|_| None)
    }

    #[test]
    fn test_configure_cors_skips_invalid_origins() {
        let config = AppConfig {
            allowed_origins: vec!["http://ok.example".to_string(), "bad\norigin".to_string()],
            ..test_config()
        };
        let _cors = configure_cors(&config);
    }

    #[tokio::test]
    async fn test_create_app_serves_health_and_guards_admin() {
        let state = AppState::with_backend(Arc::new(MemoryBackend::new()));
        let app = create_app(state, &test_config());

        let res = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));

        let res = app
            .oneshot(Request::get("/api/admin/panel").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
