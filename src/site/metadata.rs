//! Page title and favicon derived from the active theme.

use serde::Serialize;

use crate::backend::Backend;
use crate::theme::active_theme;

pub const FALLBACK_COMPANY: &str = "Landing Page";
pub const FALLBACK_ICON: &str = "/favicon.ico";

/// Human label of a public route.
pub fn page_label(path: &str) -> &'static str {
    match path {
        "/" | "" => "Home",
        "/gallery" => "Gallery",
        "/contact" => "Contact",
        "/admin" => "Admin Panel",
        _ => "Page",
    }
}

/// MIME type of a favicon, judged by its extension.
pub fn icon_mime(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".ico") {
        "image/x-icon"
    } else if lower.ends_with(".svg") {
        "image/svg+xml"
    } else {
        "image/png"
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IconLink {
    pub url: String,
    #[serde(rename = "type")]
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub icon: IconLink,
}

impl PageMetadata {
    pub fn build(company: Option<&str>, logo_url: Option<&str>, path: &str) -> Self {
        fn non_blank(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }
        let company = non_blank(company).unwrap_or(FALLBACK_COMPANY);
        let icon = non_blank(logo_url).unwrap_or(FALLBACK_ICON);
        Self {
            title: format!("{} | {}", company, page_label(path)),
            icon: IconLink {
                url: icon.to_string(),
                mime_type: icon_mime(icon),
            },
        }
    }

    pub fn fallback(path: &str) -> Self {
        Self::build(None, None, path)
    }
}

/// Metadata for `path`, read live from the active theme. Any lookup
/// failure degrades to the fallback title and icon.
pub async fn page_metadata(backend: Option<&dyn Backend>, path: &str) -> PageMetadata {
    let Some(backend) = backend else {
        return PageMetadata::fallback(path);
    };
    match active_theme(backend).await {
        Ok(Some(theme)) => PageMetadata::build(
            theme.company_name.as_deref(),
            theme.logo_url.as_deref(),
            path,
        ),
        Ok(None) => PageMetadata::fallback(path),
        Err(e) => {
            tracing::warn!("Metadata lookup failed, using fallback: {}", e);
            PageMetadata::fallback(path)
        }
    }
}
