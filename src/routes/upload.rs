use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::cms::{AdminTab, ImageUploader};
use crate::routes::auth::AdminSession;
use crate::routes::ErrorResponse;
use crate::state::AppState;

const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "svg", "ico"];
const DEFAULT_FOLDER: &str = "uploads";
/// Multipart body cap for the upload route; axum's default is 2MB.
pub const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
pub struct UploadQuery {
    pub folder: Option<String>,
    /// Admin tab key; selects that table's upload folder.
    pub tab: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            message: None,
        }),
    )
        .into_response()
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        // ICO: 00 00 01 00
        [0x00, 0x00, 0x01, 0x00, ..] => Some("image/x-icon"),
        _ if looks_like_svg(bytes) => Some("image/svg+xml"),
        _ => None,
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    String::from_utf8_lossy(head).contains("<svg")
}

fn sanitize_filename(filename: &str) -> bool {
    // Reject path traversal and special characters
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

/// Folder names become object-path prefixes; keep them to one plain segment.
fn sanitize_folder(folder: Option<&str>) -> Option<String> {
    let folder = folder.map(str::trim).unwrap_or_default();
    if folder.is_empty() {
        return Some(DEFAULT_FOLDER.to_string());
    }
    folder
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .then(|| folder.to_string())
}

/// POST /api/admin/upload?folder=themes or ?tab=theme
///
/// Stores the image in the configured bucket and returns its public URL.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let folder = match query.tab.as_deref() {
        Some(key) => match AdminTab::from_key(key).and_then(AdminTab::upload_folder) {
            Some(folder) => folder.to_string(),
            None => return bad_request("This section does not accept images"),
        },
        None => match sanitize_folder(query.folder.as_deref()) {
            Some(folder) => folder,
            None => return bad_request("Invalid folder name"),
        },
    };

    let backend = match state.backend.get() {
        Ok(backend) => backend.with_access_token(&session.access_token),
        Err(e) => return e.into_response(),
    };

    // Extract file from multipart
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return bad_request("No file provided"),
        Err(e) => {
            tracing::error!("Multipart error: {}", e);
            return bad_request("Invalid multipart data");
        }
    };

    let original_name = field.file_name().unwrap_or_default().to_string();
    if !sanitize_filename(&original_name) {
        return bad_request("Invalid filename");
    }

    let original_ext = original_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&original_ext.as_str()) {
        return bad_request("Unsupported file type. Only images can be uploaded.");
    }

    let bytes = match field.bytes().await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to read upload bytes: {}", e);
            return bad_request("Failed to read file data");
        }
    };

    if bytes.len() > MAX_FILE_SIZE {
        return bad_request("File too large. Maximum size is 5MB.");
    }

    if bytes.is_empty() {
        return bad_request("Empty file");
    }

    let Some(mime_type) = validate_image_magic_bytes(&bytes) else {
        return bad_request("File content does not match an allowed image type.");
    };

    let size = bytes.len();
    let uploader = ImageUploader::new(backend, state.bucket.clone());
    match uploader
        .upload(&folder, &original_name, bytes.to_vec(), mime_type)
        .await
    {
        Ok(url) => (
            StatusCode::CREATED,
            Json(UploadResponse {
                url,
                filename: original_name,
                size,
                mime_type: mime_type.to_string(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
    const BOUNDARY: &str = "landing-cms-boundary";

    fn upload_router(backend: &MemoryBackend) -> Router {
        let state = AppState::with_backend(Arc::new(backend.clone()));
        Router::new()
            .route("/api/admin/upload", post(upload_image))
            .layer(Extension(AdminSession {
                user_id: "admin".to_string(),
                email: None,
                access_token: "mem-token".to_string(),
            }))
            .with_state(state)
    }

    fn multipart_body(file_name: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            f = file_name
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn post_file(app: Router, uri: &str, file_name: &str, content: &[u8]) -> (StatusCode, axum::body::Bytes) {
        let req = Request::post(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(file_name, content)))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    #[test]
    fn test_magic_bytes_detection() {
        assert_eq!(validate_image_magic_bytes(PNG), Some("image/png"));
        assert_eq!(
            validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(
            validate_image_magic_bytes(b"<?xml version=\"1.0\"?><svg xmlns=\"\"></svg>"),
            Some("image/svg+xml")
        );
        assert_eq!(validate_image_magic_bytes(b"%PDF-1.7"), None);
        assert_eq!(validate_image_magic_bytes(&[0xFF]), None);
    }

    #[test]
    fn test_filename_and_folder_sanitizing() {
        assert!(sanitize_filename("logo.png"));
        assert!(!sanitize_filename("../logo.png"));
        assert!(!sanitize_filename("a/b.png"));
        assert_eq!(sanitize_folder(None).as_deref(), Some("uploads"));
        assert_eq!(sanitize_folder(Some("themes")).as_deref(), Some("themes"));
        assert_eq!(sanitize_folder(Some("../etc")), None);
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_returns_public_url() {
        let backend = MemoryBackend::new();
        let (status, bytes) = post_file(
            upload_router(&backend),
            "/api/admin/upload?folder=themes",
            "logo.png",
            PNG,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let body: UploadResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.mime_type, "image/png");
        assert!(body.url.contains("/storage/v1/object/public/uploads/themes/"));
        assert!(body.url.ends_with("_logo.png"));

        let path = body
            .url
            .split("/public/uploads/")
            .nth(1)
            .unwrap()
            .to_string();
        assert_eq!(backend.object("uploads", &path).await.as_deref(), Some(PNG));
    }

    #[tokio::test]
    async fn test_upload_by_tab_uses_table_folder() {
        let backend = MemoryBackend::new();
        let (status, bytes) = post_file(
            upload_router(&backend),
            "/api/admin/upload?tab=partners",
            "acme.png",
            PNG,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let body: UploadResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.url.contains("/public/uploads/partners/"));

        let (status, _) = post_file(
            upload_router(&backend),
            "/api/admin/upload?tab=faqs",
            "acme.png",
            PNG,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_and_non_images() {
        let backend = MemoryBackend::new();
        let (status, _) = post_file(upload_router(&backend), "/api/admin/upload", "logo.png", b"").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_file(
            upload_router(&backend),
            "/api/admin/upload",
            "logo.png",
            b"not an image at all",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_file(upload_router(&backend), "/api/admin/upload", "notes.txt", PNG).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let backend = MemoryBackend::new();
        backend.inject_failure("uploads", "Bucket not found").await;
        let (status, bytes) = post_file(upload_router(&backend), "/api/admin/upload", "logo.png", PNG).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Bucket not found");
    }
}
