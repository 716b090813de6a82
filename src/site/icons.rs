//! Font Awesome icon-name normalisation.
//!
//! Admins paste icon names in whatever shape they copied them in
//! (`fa-solid fa-star`, `fas star`, `fa-brands fa-github`...). These helpers
//! reduce them to a bare name plus a style prefix.

use regex::Regex;
use serde::Serialize;

lazy_static::lazy_static! {
    static ref STYLE_WORD_REGEX: Regex = Regex::new(r"^(fa[srb]?) ").unwrap();
    static ref FA_DASH_REGEX: Regex = Regex::new(r"^fa-").unwrap();
    static ref FAMILY_WORD_REGEX: Regex = Regex::new(r"^(solid|regular|brands) ").unwrap();
    static ref STYLE_DASH_REGEX: Regex = Regex::new(r"^fa[srb]?-").unwrap();
}

/// Bare icon name, e.g. `fa-solid fa-star` becomes `star`.
pub fn normalize_icon_name(icon: &str) -> String {
    if icon.is_empty() {
        return String::new();
    }
    let name = STYLE_WORD_REGEX.replace(icon, "");
    let name = FA_DASH_REGEX.replace(&name, "");
    let name = FAMILY_WORD_REGEX.replace(&name, "");
    let name = STYLE_DASH_REGEX.replace(&name, "");
    name.replace(' ', "-").trim().to_string()
}

/// Style prefix implied by the raw icon value: `fab`, `far` or `fas`.
pub fn icon_prefix(icon: &str) -> &'static str {
    let lower = icon.to_lowercase();
    if lower.contains("brands") || lower.contains("fab") {
        "fab"
    } else if lower.contains("regular") || lower.contains("far") {
        "far"
    } else {
        "fas"
    }
}

/// What the public site renders in place of an icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IconRef {
    Glyph { prefix: &'static str, name: String },
    /// No usable icon was configured.
    Placeholder,
}

impl IconRef {
    pub fn resolve(icon: Option<&str>) -> Self {
        let raw = icon.map(str::trim).unwrap_or_default();
        let name = normalize_icon_name(raw);
        if name.is_empty() {
            IconRef::Placeholder
        } else {
            IconRef::Glyph {
                prefix: icon_prefix(raw),
                name,
            }
        }
    }
}
