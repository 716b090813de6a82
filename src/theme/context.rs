//! Process-wide view of the active theme.
//!
//! Fetched once on start and again whenever an admin changes a theme; there
//! is no polling.

use tokio::sync::RwLock;

use super::{active_theme, AppliedTheme, ResolvedTheme, ThemeApplier};
use crate::error::AppError;
use crate::state::BackendHandle;

#[derive(Debug)]
struct Snapshot {
    theme: Option<ResolvedTheme>,
    applier: ThemeApplier,
    applied: AppliedTheme,
}

#[derive(Debug)]
pub struct ThemeContext {
    backend: BackendHandle,
    snapshot: RwLock<Snapshot>,
}

impl ThemeContext {
    pub fn new(backend: BackendHandle) -> Self {
        let mut applier = ThemeApplier::new();
        let applied = applier.apply(&ResolvedTheme::fallback());
        Self {
            backend,
            snapshot: RwLock::new(Snapshot {
                theme: None,
                applier,
                applied,
            }),
        }
    }

    /// Initial fetch; failures are logged and the defaults stay in place.
    pub async fn init(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("Could not load active theme, using defaults: {}", e);
        }
    }

    /// Re-read the active theme and re-apply it. On failure the previous
    /// theme is kept.
    pub async fn refresh(&self) -> Result<Option<ResolvedTheme>, AppError> {
        let backend = self.backend.get()?;
        let theme = active_theme(backend.as_ref())
            .await?
            .map(|theme| ResolvedTheme::from(&theme));

        let mut snapshot = self.snapshot.write().await;
        let resolved = theme.clone().unwrap_or_else(ResolvedTheme::fallback);
        snapshot.applied = snapshot.applier.apply(&resolved);
        snapshot.theme = theme.clone();

        match &theme {
            Some(t) => tracing::debug!(theme = %t.description, "Theme context refreshed"),
            None => tracing::debug!("Theme context refreshed, no active theme"),
        }
        Ok(theme)
    }

    /// The active theme as of the last refresh; `None` when there is none.
    pub async fn current(&self) -> Option<ResolvedTheme> {
        self.snapshot.read().await.theme.clone()
    }

    /// Active theme, or the defaults.
    pub async fn resolved(&self) -> ResolvedTheme {
        self.current()
            .await
            .unwrap_or_else(ResolvedTheme::fallback)
    }

    pub async fn applied(&self) -> AppliedTheme {
        self.snapshot.read().await.applied.clone()
    }
}
