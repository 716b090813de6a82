//! Turns a resolved theme into CSS variables, font rules and a web-font link.

use regex::Regex;
use serde::Serialize;

use super::ResolvedTheme;

lazy_static::lazy_static! {
    static ref FONT_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9\s]+$").unwrap();
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

/// Elements that get the theme font applied directly.
pub const FONT_SELECTORS: [&str; 8] = [
    ".container",
    ".navbar",
    ".footer",
    ".btn",
    ".card",
    ".form-control",
    ".nav",
    ".dropdown-menu",
];

/// Web-font stylesheet for the first family in `font`, when that family
/// name is plain letters, digits and spaces.
pub fn font_stylesheet_url(font: &str) -> Option<String> {
    let family = font.split(',').next()?.replace(['\'', '"'], "");
    let family = family.trim();
    if !FONT_NAME_REGEX.is_match(family) {
        return None;
    }
    Some(format!(
        "https://fonts.googleapis.com/css2?family={}:wght@400;700&display=swap",
        WHITESPACE_REGEX.replace_all(family, "+")
    ))
}

/// Keep a value from breaking out of its declaration.
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '<' | '>' | ';'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Result of applying a theme.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedTheme {
    /// `--bs-*` custom properties in declaration order.
    pub variables: Vec<(String, String)>,
    pub font_family: String,
    pub selectors: Vec<&'static str>,
    pub font_link: Option<String>,
}

impl AppliedTheme {
    pub fn to_css(&self) -> String {
        let mut css = String::new();
        if let Some(link) = &self.font_link {
            css.push_str(&format!("@import url(\"{}\");\n\n", link));
        }

        css.push_str(":root {\n");
        for (name, value) in &self.variables {
            css.push_str(&format!("  {}: {};\n", name, value));
        }
        css.push_str("}\n\n");

        css.push_str(&format!(
            "body,\n{} {{\n  font-family: {};\n}}\n",
            self.selectors.join(",\n"),
            self.font_family
        ));
        css
    }
}

/// Stateful applier: the font link is a single managed element that is only
/// re-pointed when the font changes between applications.
#[derive(Debug, Clone, Default)]
pub struct ThemeApplier {
    prev_font: Option<String>,
    font_link: Option<String>,
}

impl ThemeApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, theme: &ResolvedTheme) -> AppliedTheme {
        let font = css_value(&theme.font);

        let mut variables: Vec<(String, String)> = theme
            .colors
            .iter()
            .map(|(name, value)| (format!("--bs-{}", name), css_value(value)))
            .collect();
        variables.push(("--bs-font-sans-serif".to_string(), font.clone()));

        if !font.is_empty() && self.prev_font.as_deref() != Some(font.as_str()) {
            if let Some(url) = font_stylesheet_url(&font) {
                self.font_link = Some(url);
            }
            self.prev_font = Some(font.clone());
        }

        AppliedTheme {
            variables,
            font_family: font,
            selectors: FONT_SELECTORS.to_vec(),
            font_link: self.font_link.clone(),
        }
    }

    pub fn font_link(&self) -> Option<&str> {
        self.font_link.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme_with_font(font: &str) -> ResolvedTheme {
        ResolvedTheme {
            font: font.to_string(),
            ..ResolvedTheme::fallback()
        }
    }

    #[test]
    fn test_font_stylesheet_url_uses_first_family() {
        assert_eq!(
            font_stylesheet_url("'Open   Sans', sans-serif").as_deref(),
            Some("https://fonts.googleapis.com/css2?family=Open+Sans:wght@400;700&display=swap")
        );
        assert_eq!(font_stylesheet_url("system-ui, sans-serif"), None);
        assert_eq!(font_stylesheet_url("Font<script>"), None);
    }

    #[test]
    fn test_apply_sets_variables_and_font() {
        let mut applier = ThemeApplier::new();
        let applied = applier.apply(&theme_with_font("Roboto, sans-serif"));

        assert!(applied
            .variables
            .contains(&("--bs-primary".to_string(), "#0d6efd".to_string())));
        assert!(applied.variables.contains(&(
            "--bs-font-sans-serif".to_string(),
            "Roboto, sans-serif".to_string()
        )));
        assert_eq!(applied.selectors.len(), 8);
        assert!(applied.font_link.unwrap().contains("family=Roboto:"));
    }

    #[test]
    fn test_link_persists_when_font_is_not_loadable() {
        let mut applier = ThemeApplier::new();
        applier.apply(&theme_with_font("Lato"));
        let applied = applier.apply(&theme_with_font("system-ui, sans-serif"));
        assert!(applied.font_link.unwrap().contains("family=Lato:"));
    }

    #[test]
    fn test_link_rederived_only_on_font_change() {
        let mut applier = ThemeApplier::new();
        applier.apply(&theme_with_font("Lato"));
        applier.apply(&theme_with_font("Lato"));
        assert!(applier.font_link().unwrap().contains("Lato"));
        applier.apply(&theme_with_font("Fira Sans"));
        assert!(applier.font_link().unwrap().contains("family=Fira+Sans:"));
    }

    #[test]
    fn test_css_strips_declaration_breakers() {
        let mut theme = ResolvedTheme::fallback();
        theme
            .colors
            .insert("primary".to_string(), "red;} body{display:none".to_string());
        let css = ThemeApplier::new().apply(&theme).to_css();
        assert!(!css.contains("{display"));
        assert!(css.contains("--bs-primary: red bodydisplay:none;"));
        assert!(css.starts_with(":root {"));
    }

    #[test]
    fn test_css_imports_font_first() {
        let css = ThemeApplier::new()
            .apply(&theme_with_font("Inter"))
            .to_css();
        assert!(css.starts_with("@import url(\"https://fonts.googleapis.com/css2?family=Inter"));
        assert!(css.contains(".dropdown-menu {\n  font-family: Inter;"));
    }
}
