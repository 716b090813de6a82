/**
 * Admin Routes
 * One generic list/create/update/delete handler set mounted per managed
 * table, plus theme activation and the panel tab list
 */
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::Backend;
use crate::cms::panel::TabInfo;
use crate::cms::{AdminTab, Entity, ManagerView, TableManager};
use crate::db::models::{
    Contact, Content, FaqItem, Feature, GalleryItem, LinkItem, Partner, Statistic, Testimonial,
    Theme,
};
use crate::error::AppError;
use crate::routes::auth::{require_session, AdminSession};
use crate::routes::upload::{upload_image, UPLOAD_BODY_LIMIT};
use crate::state::AppState;
use crate::theme;

#[derive(Debug, Deserialize, Default)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// Backend acting with the admin's own access token.
fn scoped_backend(state: &AppState, session: &AdminSession) -> Result<Arc<dyn Backend>, AppError> {
    Ok(state.backend.get()?.with_access_token(&session.access_token))
}

fn view_for<E: Entity>(
    state: &AppState,
    session: &AdminSession,
) -> Result<ManagerView<E>, AppError> {
    let backend = scoped_backend(state, session)?;
    Ok(ManagerView::new(TableManager::new(backend)))
}

fn snapshot_response<E: Entity>(
    view: &ManagerView<E>,
    result: Result<(), AppError>,
    success: StatusCode,
) -> Response {
    let status = match &result {
        Ok(()) => success,
        Err(e) => {
            tracing::warn!(table = E::TABLE, "Admin action failed: {}", e);
            e.status()
        }
    };
    (status, Json(view.snapshot())).into_response()
}

async fn refresh_theme<E: Entity>(state: &AppState, result: &Result<(), AppError>) {
    if E::REFRESHES_THEME && result.is_ok() {
        if let Err(e) = state.theme.refresh().await {
            tracing::warn!("Theme refresh after save failed: {}", e);
        }
    }
}

/// GET /api/admin/{key}
pub async fn list_rows<E: Entity>(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> Response {
    let mut view = match view_for::<E>(&state, &session) {
        Ok(view) => view,
        Err(e) => return e.into_response(),
    };
    let result = view.list().await;
    snapshot_response(&view, result, StatusCode::OK)
}

/// POST /api/admin/{key}
pub async fn create_row<E: Entity>(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Json(form): Json<E::Form>,
) -> Response {
    let mut view = match view_for::<E>(&state, &session) {
        Ok(view) => view,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = view.list().await {
        tracing::debug!(table = E::TABLE, "Listing before create failed: {}", e);
    }

    let result = view.create(form).await;
    refresh_theme::<E>(&state, &result).await;
    snapshot_response(&view, result, StatusCode::CREATED)
}

/// PUT /api/admin/{key}/{id}
pub async fn update_row<E: Entity>(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Json(form): Json<E::Form>,
) -> Response {
    let mut view = match view_for::<E>(&state, &session) {
        Ok(view) => view,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = view.list().await {
        tracing::debug!(table = E::TABLE, "Listing before update failed: {}", e);
    }

    let result = view.update(id, form).await;
    refresh_theme::<E>(&state, &result).await;
    snapshot_response(&view, result, StatusCode::OK)
}

/// DELETE /api/admin/{key}/{id}?confirm=true
///
/// Without confirmation nothing is deleted and the current list is returned.
pub async fn delete_row<E: Entity>(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Response {
    let mut view = match view_for::<E>(&state, &session) {
        Ok(view) => view,
        Err(e) => return e.into_response(),
    };

    let result = if query.confirm {
        view.delete(id, true).await
    } else {
        view.list().await
    };
    if query.confirm {
        refresh_theme::<E>(&state, &result).await;
    }
    snapshot_response(&view, result, StatusCode::OK)
}

/// POST /api/admin/themes/{id}/activate
pub async fn activate_theme(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
) -> Response {
    let backend = match scoped_backend(&state, &session) {
        Ok(backend) => backend,
        Err(e) => return e.into_response(),
    };

    let mut view = ManagerView::<Theme>::new(TableManager::new(Arc::clone(&backend)));
    let result = match theme::activate(backend.as_ref(), id).await {
        Ok(()) => view.list().await,
        Err(e) => {
            if let Err(list_err) = view.list().await {
                tracing::debug!("Listing after failed activation failed: {}", list_err);
            }
            Err(e)
        }
    };
    refresh_theme::<Theme>(&state, &result).await;
    snapshot_response(&view, result, StatusCode::OK)
}

/// GET /api/admin/panel
pub async fn panel_tabs() -> impl IntoResponse {
    let tabs: Vec<TabInfo> = AdminTab::ALL.iter().copied().map(TabInfo::from).collect();
    Json(tabs)
}

fn manager_routes<E: Entity>() -> Router<AppState> {
    Router::new()
        .route(
            &format!("/api/admin/{}", E::KEY),
            get(list_rows::<E>).post(create_row::<E>),
        )
        .route(
            &format!("/api/admin/{}/{{id}}", E::KEY),
            put(update_row::<E>).delete(delete_row::<E>),
        )
}

fn tab_routes(tab: AdminTab) -> Router<AppState> {
    match tab {
        AdminTab::Content => manager_routes::<Content>(),
        AdminTab::Gallery => manager_routes::<GalleryItem>(),
        AdminTab::Theme => manager_routes::<Theme>(),
        AdminTab::Contact => manager_routes::<Contact>(),
        AdminTab::Features => manager_routes::<Feature>(),
        AdminTab::Statistics => manager_routes::<Statistic>(),
        AdminTab::Faqs => manager_routes::<FaqItem>(),
        AdminTab::Testimonials => manager_routes::<Testimonial>(),
        AdminTab::Links => manager_routes::<LinkItem>(),
        AdminTab::Partners => manager_routes::<Partner>(),
    }
}

/// Every admin endpoint, guarded by `require_session`.
pub fn admin_router(state: AppState) -> Router<AppState> {
    AdminTab::ALL
        .iter()
        .copied()
        .fold(Router::new(), |router, tab| router.merge(tab_routes(tab)))
        .route("/api/admin/panel", get(panel_tabs))
        .route("/api/admin/themes/{id}/activate", post(activate_theme))
        .route(
            "/api/admin/upload",
            post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Harness {
        backend: MemoryBackend,
        state: AppState,
        token: String,
    }

    async fn harness() -> Harness {
        let backend = MemoryBackend::new();
        backend.add_user("admin@example.com", "secret", true).await;
        let token = backend
            .sign_in_with_password("admin@example.com", "secret")
            .await
            .unwrap()
            .session
            .unwrap()
            .access_token;
        let state = AppState::with_backend(Arc::new(backend.clone()));
        Harness {
            backend,
            state,
            token,
        }
    }

    impl Harness {
        fn app(&self) -> Router {
            admin_router(self.state.clone()).with_state(self.state.clone())
        }

        async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {}", self.token));
            let req = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let res = self.app().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    #[tokio::test]
    async fn test_admin_requires_session() {
        let h = harness().await;
        let req = Request::get("/api/admin/features")
            .body(Body::empty())
            .unwrap();
        let res = h.app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["redirect"], "/admin/login");
    }

    #[tokio::test]
    async fn test_create_assigns_next_order_index() {
        let h = harness().await;
        for title in ["First", "Second"] {
            let (status, _) = h
                .call(
                    "POST",
                    "/api/admin/features",
                    Some(json!({ "title": title, "icon": "fa-solid fa-star" })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = h.call("GET", "/api/admin/features", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["formOpen"], false);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["order_index"], 1);
        assert_eq!(items[1]["order_index"], 2);
    }

    #[tokio::test]
    async fn test_invalid_create_keeps_form_open() {
        let h = harness().await;
        let (status, body) = h
            .call("POST", "/api/admin/faqs", Some(json!({ "question": "" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["formOpen"], true);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let h = harness().await;
        let (_, body) = h
            .call(
                "POST",
                "/api/admin/partners",
                Some(json!({ "name": "Acme", "logo_url": "https://cdn/acme.png" })),
            )
            .await;
        let id = body["items"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = h
            .call("DELETE", &format!("/api/admin/partners/{}", id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, body) = h
            .call(
                "DELETE",
                &format!("/api/admin/partners/{}?confirm=true", id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_in_banner() {
        let h = harness().await;
        h.backend
            .inject_failure("links", "permission denied for table links")
            .await;
        let (status, body) = h.call("GET", "/api/admin/links", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("permission denied for table links"));
    }

    #[tokio::test]
    async fn test_activate_theme_refreshes_context() {
        let h = harness().await;
        let mut ids = Vec::new();
        for name in ["Light", "Dark"] {
            let (_, body) = h
                .call(
                    "POST",
                    "/api/admin/theme",
                    Some(json!({ "description": name, "company_name": name, "is_active": true })),
                )
                .await;
            let created = body["items"]
                .as_array()
                .unwrap()
                .iter()
                .find(|item| item["description"] == name)
                .unwrap();
            ids.push(created["id"].as_str().unwrap().to_string());
        }

        let (status, body) = h
            .call(
                "POST",
                &format!("/api/admin/themes/{}/activate", ids[0]),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let active: Vec<&Value> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|item| item["is_active"] == true)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["id"].as_str().unwrap(), ids[0]);

        let resolved = h.state.theme.resolved().await;
        assert_eq!(resolved.company_name, "Light");
    }

    #[tokio::test]
    async fn test_panel_lists_all_tabs() {
        let h = harness().await;
        let (status, body) = h.call("GET", "/api/admin/panel", None).await;
        assert_eq!(status, StatusCode::OK);
        let tabs = body.as_array().unwrap();
        assert_eq!(tabs.len(), AdminTab::ALL.len());
        assert_eq!(tabs[0]["key"], "content");
    }
}
