/*!
 * Theme Module
 * Active-theme lookup, atomic activation and the public theme shape
 */
pub mod context;
pub mod style;

pub use context::ThemeContext;
pub use style::{AppliedTheme, ThemeApplier};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::backend::{Backend, OrderBy, Query};
use crate::cms::manager::decode;
use crate::db::models::Theme;
use crate::error::AppError;

/// Stored procedure that makes one theme the only active one.
pub const ACTIVATE_THEME_FN: &str = "activate_theme";

/// Bootstrap defaults for every named colour.
pub const DEFAULT_COLORS: [(&str, &str); 9] = [
    ("primary", "#0d6efd"),
    ("secondary", "#6c757d"),
    ("success", "#198754"),
    ("danger", "#dc3545"),
    ("warning", "#ffc107"),
    ("info", "#0dcaf0"),
    ("light", "#f8f9fa"),
    ("dark", "#212529"),
    ("muted", "#6c757d"),
];

pub const DEFAULT_FONT_STACK: &str = r#"system-ui, -apple-system, "Segoe UI", Roboto, "Helvetica Neue", Arial, "Noto Sans", "Liberation Sans", sans-serif"#;

/// Make `id` the single active theme in one backend round-trip.
pub async fn activate(backend: &dyn Backend, id: Uuid) -> Result<(), AppError> {
    backend
        .rpc(ACTIVATE_THEME_FN, json!({ "theme_id": id }))
        .await?;
    tracing::info!(theme_id = %id, "Theme activated");
    Ok(())
}

/// The active theme, newest first should the single-active rule ever be
/// violated by hand-edited data.
pub async fn active_theme(backend: &dyn Backend) -> Result<Option<Theme>, AppError> {
    let query = Query::new()
        .eq("is_active", true)
        .order(OrderBy::desc("created_at"))
        .limit(1);
    let rows = backend.select("themes", &query).await?;
    rows.into_iter().next().map(decode::<Theme>).transpose()
}

/// A theme with every default applied, as served to the public site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTheme {
    pub id: Option<Uuid>,
    pub description: String,
    pub colors: BTreeMap<String, String>,
    pub font: String,
    pub logo_url: String,
    pub company_name: String,
}

impl ResolvedTheme {
    /// Used when no theme is active.
    pub fn fallback() -> Self {
        Self {
            id: None,
            description: String::new(),
            colors: DEFAULT_COLORS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            font: DEFAULT_FONT_STACK.to_string(),
            logo_url: String::new(),
            company_name: String::new(),
        }
    }
}

impl From<&Theme> for ResolvedTheme {
    fn from(theme: &Theme) -> Self {
        let colors = theme.colors.clone().with_defaults();
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            id: Some(theme.id),
            description: theme.description.clone(),
            colors: DEFAULT_COLORS
                .iter()
                .map(|(name, default)| {
                    let value = colors.get(name).unwrap_or(*default);
                    (name.to_string(), value.to_string())
                })
                .collect(),
            font: non_blank(&theme.font).unwrap_or_else(|| DEFAULT_FONT_STACK.to_string()),
            logo_url: non_blank(&theme.logo_url).unwrap_or_default(),
            company_name: non_blank(&theme.company_name).unwrap_or_default(),
        }
    }
}
