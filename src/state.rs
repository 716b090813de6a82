//! Shared application state handed to every router.

use std::sync::Arc;

use crate::backend::{Backend, MemoryBackend, SupabaseClient};
use crate::config::{BackendConfig, BackendMode};
use crate::error::AppError;
use crate::routes::auth::SessionVerifier;
use crate::theme::ThemeContext;

/// The backend connection, or the reason there is none.
#[derive(Clone)]
pub enum BackendHandle {
    Ready(Arc<dyn Backend>),
    Misconfigured(String),
}

impl BackendHandle {
    /// Build the configured backend. Missing settings produce a
    /// `Misconfigured` handle rather than an error so the server can still
    /// start and report the problem.
    pub fn connect(config: &BackendConfig) -> Self {
        match config.mode {
            BackendMode::Memory => {
                tracing::warn!("Using in-memory backend; data is lost on restart");
                BackendHandle::Ready(Arc::new(MemoryBackend::new()))
            }
            BackendMode::Supabase => {
                let missing = config.missing();
                if !missing.is_empty() {
                    let reason = format!("{} not set", missing.join(", "));
                    tracing::error!("Backend misconfigured: {}", reason);
                    return BackendHandle::Misconfigured(reason);
                }
                match SupabaseClient::new(config) {
                    Ok(client) => BackendHandle::Ready(Arc::new(client)),
                    Err(e) => {
                        tracing::error!("Backend misconfigured: {}", e);
                        BackendHandle::Misconfigured(e.to_string())
                    }
                }
            }
        }
    }

    pub fn get(&self) -> Result<Arc<dyn Backend>, AppError> {
        match self {
            BackendHandle::Ready(backend) => Ok(Arc::clone(backend)),
            BackendHandle::Misconfigured(reason) => Err(AppError::Misconfigured(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BackendHandle::Ready(_))
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendHandle::Ready(_) => f.write_str("BackendHandle::Ready"),
            BackendHandle::Misconfigured(reason) => {
                write!(f, "BackendHandle::Misconfigured({})", reason)
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub backend: BackendHandle,
    pub theme: Arc<ThemeContext>,
    pub verifier: SessionVerifier,
    /// Storage bucket uploads go into.
    pub bucket: String,
}

impl AppState {
    pub fn new(backend: BackendHandle, config: &BackendConfig) -> Self {
        Self {
            theme: Arc::new(ThemeContext::new(backend.clone())),
            verifier: SessionVerifier::new(config.jwt_secret.clone()),
            bucket: config.bucket.clone(),
            backend,
        }
    }

    /// State over an arbitrary backend with default settings.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self::new(BackendHandle::Ready(backend), &BackendConfig::default())
    }
}
