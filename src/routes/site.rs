/**
 * Site Routes
 * Public, unauthenticated payloads for the landing pages
 */
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::site::metadata::page_metadata;
use crate::site::{contact_page, gallery, home_page};
use crate::state::AppState;
use crate::theme::{AppliedTheme, ResolvedTheme};

#[derive(Debug, Deserialize, Default)]
pub struct MetadataQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeResponse {
    pub theme: ResolvedTheme,
    pub applied: AppliedTheme,
}

/// GET /api/site/home
pub async fn get_home(State(state): State<AppState>) -> Response {
    match state.backend.get() {
        Ok(backend) => Json(home_page(backend).await).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/site/gallery
pub async fn get_gallery(State(state): State<AppState>) -> Response {
    let backend = match state.backend.get() {
        Ok(backend) => backend,
        Err(e) => return e.into_response(),
    };
    match gallery(backend).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/site/contact
pub async fn get_contact(State(state): State<AppState>) -> Response {
    let backend = match state.backend.get() {
        Ok(backend) => backend,
        Err(e) => return e.into_response(),
    };
    match contact_page(backend).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/site/metadata?path=/gallery
pub async fn get_metadata(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> impl IntoResponse {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    let backend = state.backend.get().ok();
    Json(page_metadata(backend.as_deref(), &path).await)
}

/// GET /api/site/theme
pub async fn get_theme(State(state): State<AppState>) -> impl IntoResponse {
    Json(ThemeResponse {
        theme: state.theme.resolved().await,
        applied: state.theme.applied().await,
    })
}

/// GET /theme.css
pub async fn get_theme_css(State(state): State<AppState>) -> impl IntoResponse {
    let css = state.theme.applied().await.to_css();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        css,
    )
}

pub fn site_router() -> Router<AppState> {
    Router::new()
        .route("/api/site/home", get(get_home))
        .route("/api/site/gallery", get(get_gallery))
        .route("/api/site/contact", get(get_contact))
        .route("/api/site/metadata", get(get_metadata))
        .route("/api/site/theme", get(get_theme))
        .route("/theme.css", get(get_theme_css))
}
