/**
 * Authentication Routes
 * Admin sign-in against the backend auth service, session lookup, logout
 * and the guard protecting every admin endpoint
 */
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::backend::AuthUser;
use crate::error::AppError;
use crate::state::{AppState, BackendHandle};

// ============================================================================
// Configuration
// ============================================================================

pub const LOGIN_PATH: &str = "/admin/login";
pub const ADMIN_PATH: &str = "/admin";

/// Audience the auth service stamps on user access tokens.
const TOKEN_AUDIENCE: &str = "authenticated";

pub const SESSION_NOT_ESTABLISHED: &str = "Session could not be established, please try again.";

// ============================================================================
// Types
// ============================================================================

/// Claims of a backend-issued access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub role: Option<String>,
}

/// The authenticated admin behind a request, inserted by `require_session`.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
}

/// User info returned to frontend
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub email: Option<String>,
}

impl From<AuthUser> for UserInfo {
    fn from(user: AuthUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
        }
    }
}

/// Checks access tokens, locally when the signing secret is known and
/// through the auth service otherwise.
#[derive(Debug, Clone, Default)]
pub struct SessionVerifier {
    jwt_secret: Option<String>,
}

impl SessionVerifier {
    pub fn new(jwt_secret: Option<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.filter(|secret| !secret.is_empty()),
        }
    }

    pub fn verifies_locally(&self) -> bool {
        self.jwt_secret.is_some()
    }

    pub async fn verify(&self, backend: &BackendHandle, token: &str) -> Result<AuthUser, AppError> {
        if let Some(secret) = &self.jwt_secret {
            let claims = verify_access_token(token, secret)
                .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
            return Ok(AuthUser {
                id: claims.sub,
                email: claims.email,
            });
        }

        backend
            .get()?
            .get_user(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub redirect: String,
}

/// Body of a 401 from the guard.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnauthorizedResponse {
    pub error: String,
    pub redirect: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Verify and decode a backend access token with the shared signing secret.
pub fn verify_access_token(
    token: &str,
    secret: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[TOKEN_AUDIENCE]);
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(UnauthorizedResponse {
            error: message.to_string(),
            redirect: LOGIN_PATH.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects requests without a valid admin session and exposes the session
/// to downstream handlers as an `AdminSession` extension.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(request.headers()) else {
        return unauthorized("Authorization required");
    };

    match state.verifier.verify(&state.backend, &token).await {
        Ok(user) => {
            request.extensions_mut().insert(AdminSession {
                user_id: user.id,
                email: user.email,
                access_token: token,
            });
            next.run(request).await
        }
        Err(AppError::Unauthorized(message)) => {
            tracing::warn!("Rejected admin request: {}", message);
            unauthorized(&message)
        }
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse::failure("Email and password are required")),
        );
    }

    let backend = match state.backend.get() {
        Ok(backend) => backend,
        Err(e) => return (e.status(), Json(LoginResponse::failure(e.to_string()))),
    };

    let response = match backend.sign_in_with_password(email, &payload.password).await {
        Ok(response) => response,
        Err(e) => {
            let err = AppError::from(e);
            tracing::warn!("Login failed for {}: {}", email, err);
            return (err.status(), Json(LoginResponse::failure(err.to_string())));
        }
    };

    let Some(session) = response.session else {
        tracing::warn!("Login for {} returned no session", email);
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse::failure(SESSION_NOT_ESTABLISHED)),
        );
    };

    tracing::info!("Admin logged in: {}", email);
    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            user: response.user.map(UserInfo::from),
            access_token: Some(session.access_token),
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            redirect: Some(ADMIN_PATH.to_string()),
            error: None,
        }),
    )
}

/// GET /api/auth/session
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let user = match extract_bearer_token(&headers) {
        Some(token) => match state.verifier.verify(&state.backend, &token).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!("Session lookup failed: {}", e);
                None
            }
        },
        None => None,
    };

    let authenticated = user.is_some();
    Json(SessionResponse {
        authenticated,
        user: user.map(UserInfo::from),
        redirect: (!authenticated).then(|| LOGIN_PATH.to_string()),
    })
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let (Some(token), Ok(backend)) = (extract_bearer_token(&headers), state.backend.get()) {
        if let Err(e) = backend.sign_out(&token).await {
            tracing::warn!("Sign-out at the auth service failed: {}", e);
        }
    }

    (
        StatusCode::OK,
        Json(LogoutResponse {
            success: true,
            redirect: LOGIN_PATH.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn auth_router(state: AppState) -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/session", get(session))
            .route("/api/auth/logout", post(logout))
            .with_state(state)
    }

    async fn memory_state() -> (MemoryBackend, AppState) {
        let backend = MemoryBackend::new();
        backend.add_user("admin@example.com", "secret", true).await;
        backend.add_user("pending@example.com", "secret", false).await;
        let state = AppState::with_backend(Arc::new(backend.clone()));
        (backend, state)
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, axum::body::Bytes) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    fn credentials(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_empty_email_returns_bad_request() {
        let (_, state) = memory_state().await;
        let (status, _) = post_json(
            auth_router(state),
            "/api/auth/login",
            &credentials("", "secret"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_credentials_returns_unauthorized() {
        let (_, state) = memory_state().await;
        let (status, bytes) = post_json(
            auth_router(state),
            "/api/auth/login",
            &credentials("admin@example.com", "wrong"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: LoginResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.as_deref(), Some("Invalid login credentials"));
        assert!(body.redirect.is_none());
    }

    #[tokio::test]
    async fn test_login_without_session_is_a_failure() {
        let (_, state) = memory_state().await;
        let (status, bytes) = post_json(
            auth_router(state),
            "/api/auth/login",
            &credentials("pending@example.com", "secret"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: LoginResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.success);
        assert!(body.redirect.is_none());
        assert_eq!(body.error.as_deref(), Some(SESSION_NOT_ESTABLISHED));
    }

    #[tokio::test]
    async fn test_login_success_redirects_to_admin() {
        let (_, state) = memory_state().await;
        let (status, bytes) = post_json(
            auth_router(state),
            "/api/auth/login",
            &credentials("admin@example.com", "secret"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: LoginResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
        assert!(body.access_token.is_some());
        assert_eq!(body.redirect.as_deref(), Some("/admin"));
    }

    #[tokio::test]
    async fn test_login_with_misconfigured_backend_is_unavailable() {
        let state = AppState::new(
            BackendHandle::Misconfigured("SUPABASE_URL not set".into()),
            &Default::default(),
        );
        let (status, bytes) = post_json(
            auth_router(state),
            "/api/auth/login",
            &credentials("admin@example.com", "secret"),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let body: LoginResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.error.unwrap().contains("SUPABASE_URL"));
    }

    #[tokio::test]
    async fn test_session_and_logout_round() {
        let (backend, state) = memory_state().await;
        let token = backend
            .sign_in_with_password("admin@example.com", "secret")
            .await
            .unwrap()
            .session
            .unwrap()
            .access_token;
        let app = auth_router(state);

        let req = Request::get("/api/auth/session")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (_, bytes) = send(app.clone(), req).await;
        let body: SessionResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.authenticated);
        assert!(body.redirect.is_none());

        for _ in 0..2 {
            let req = Request::post("/api/auth/logout")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap();
            let (status, bytes) = send(app.clone(), req).await;
            assert_eq!(status, StatusCode::OK);
            let body: LogoutResponse = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body.redirect, "/admin/login");
        }

        let req = Request::get("/api/auth/session")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (_, bytes) = send(app, req).await;
        let body: SessionResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.authenticated);
        assert_eq!(body.redirect.as_deref(), Some("/admin/login"));
    }

    #[tokio::test]
    async fn test_local_verification_checks_audience() {
        let secret = "super-secret-jwt-token-with-at-least-32-characters";
        let verifier = SessionVerifier::new(Some(secret.to_string()));
        let handle = BackendHandle::Misconfigured("unused".into());
        let exp = chrono::Utc::now().timestamp() + 600;

        let good = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "u1", "email": "a@b.c", "aud": "authenticated", "exp": exp }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        let user = verifier.verify(&handle, &good).await.unwrap();
        assert_eq!(user.id, "u1");

        let anon = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "u1", "aud": "anon", "exp": exp }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            verifier.verify(&handle, &anon).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
