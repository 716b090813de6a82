//! Image upload helper shared by every image-bearing manager.

use std::sync::Arc;

use crate::backend::Backend;
use crate::error::AppError;

/// Object path for an upload: `{folder}/{timestamp}_{file_name}`, without
/// the folder prefix when the folder is empty or just repeats the bucket.
pub fn storage_path(bucket: &str, folder: &str, file_name: &str, timestamp_ms: i64) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() || folder == bucket {
        format!("{}_{}", timestamp_ms, file_name)
    } else {
        format!("{}/{}_{}", folder, timestamp_ms, file_name)
    }
}

pub struct ImageUploader {
    backend: Arc<dyn Backend>,
    bucket: String,
}

impl ImageUploader {
    pub fn new(backend: Arc<dyn Backend>, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
        }
    }

    /// Store `bytes` (overwriting any object at the same path) and return
    /// the public URL.
    pub async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let path = storage_path(
            &self.bucket,
            folder,
            file_name,
            chrono::Utc::now().timestamp_millis(),
        );
        let size = bytes.len();
        self.backend
            .upload(&self.bucket, &path, bytes, content_type, true)
            .await?;

        let url = self.backend.public_url(&self.bucket, &path);
        tracing::info!(bucket = %self.bucket, path = %path, size, "Image uploaded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn test_storage_path_prefixes_folder() {
        assert_eq!(
            storage_path("uploads", "themes", "logo.png", 1_700_000_000_000),
            "themes/1700000000000_logo.png"
        );
    }

    #[test]
    fn test_storage_path_skips_bucket_named_folder() {
        assert_eq!(
            storage_path("uploads", "uploads", "a.jpg", 5),
            "5_a.jpg"
        );
        assert_eq!(storage_path("uploads", "", "a.jpg", 5), "5_a.jpg");
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let backend = MemoryBackend::new();
        let uploader = ImageUploader::new(Arc::new(backend.clone()), "uploads");

        let url = uploader
            .upload("themes", "logo.png", vec![0x89, 0x50, 0x4E, 0x47], "image/png")
            .await
            .unwrap();

        assert!(url.starts_with("http://127.0.0.1:54321/storage/v1/object/public/uploads/themes/"));
        assert!(url.ends_with("_logo.png"));

        let path = url
            .split("/public/uploads/")
            .nth(1)
            .unwrap()
            .to_string();
        assert_eq!(
            backend.object("uploads", &path).await,
            Some(vec![0x89, 0x50, 0x4E, 0x47])
        );
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let backend = MemoryBackend::new();
        backend.inject_failure("uploads", "Bucket not found").await;
        let uploader = ImageUploader::new(Arc::new(backend), "uploads");
        let err = uploader
            .upload("gallery", "a.png", vec![1, 2, 3, 4], "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Bucket not found");
    }
}
