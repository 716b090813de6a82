/**
 * Configuration
 * Typed settings resolved from the environment (after `.env` is loaded)
 */
use std::time::Duration;

/// Which `Backend` implementation the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendMode {
    #[default]
    Supabase,
    Memory,
}

impl BackendMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" | "local" => BackendMode::Memory,
            _ => BackendMode::Supabase,
        }
    }
}

/// Connection settings for the backend-as-a-service.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub mode: BackendMode,
    pub url: String,
    pub anon_key: String,
    /// Secret the auth service signs access tokens with. When present,
    /// admin sessions are verified locally instead of round-tripping.
    pub jwt_secret: Option<String>,
    pub bucket: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Supabase,
            url: String::new(),
            anon_key: String::new(),
            jwt_secret: None,
            bucket: "uploads".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// First non-empty value among `keys`.
fn first_non_empty<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl BackendConfig {
    /// Resolve settings through an arbitrary lookup (the process environment
    /// in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            mode: first_non_empty(&lookup, &["BACKEND_MODE"])
                .map(|mode| BackendMode::parse(&mode))
                .unwrap_or_default(),
            url: first_non_empty(&lookup, &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])
                .unwrap_or_default(),
            anon_key: first_non_empty(
                &lookup,
                &["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"],
            )
            .unwrap_or_default(),
            jwt_secret: first_non_empty(&lookup, &["SUPABASE_JWT_SECRET"]),
            bucket: first_non_empty(&lookup, &["STORAGE_BUCKET"]).unwrap_or(defaults.bucket),
            timeout: first_non_empty(&lookup, &["BACKEND_TIMEOUT_SECS"])
                .and_then(|secs| secs.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Names of the settings a hosted backend still needs.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.mode == BackendMode::Supabase {
            if self.url.is_empty() {
                missing.push("SUPABASE_URL");
            }
            if self.anon_key.is_empty() {
                missing.push("SUPABASE_ANON_KEY");
            }
        }
        missing
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl AppConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let allowed_origins = first_non_empty(&lookup, &["ALLOWED_ORIGINS"])
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| first_non_empty(&lookup, &["FRONTEND_ORIGIN"]).map(|o| vec![o]))
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            host: first_non_empty(&lookup, &["HOST"]).unwrap_or_else(|| "127.0.0.1".to_string()),
            port: first_non_empty(&lookup, &["PORT"])
                .and_then(|port| port.parse().ok())
                .unwrap_or(3001),
            environment: first_non_empty(&lookup, &["ENVIRONMENT"])
                .unwrap_or_else(|| "development".to_string()),
            allowed_origins,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_backend_config_falls_back_to_public_names() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("SUPABASE_URL", ""),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://x.supabase.co"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "anon"),
        ]));
        assert_eq!(config.url, "https://x.supabase.co");
        assert_eq!(config.anon_key, "anon");
        assert!(config.missing().is_empty());
    }

    #[test]
    fn test_backend_config_defaults() {
        let config = BackendConfig::from_lookup(lookup(&[]));
        assert_eq!(config.mode, BackendMode::Supabase);
        assert_eq!(config.bucket, "uploads");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.missing(), vec!["SUPABASE_URL", "SUPABASE_ANON_KEY"]);
    }

    #[test]
    fn test_memory_mode_needs_nothing() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("BACKEND_MODE", "memory"),
            ("BACKEND_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.mode, BackendMode::Memory);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.missing().is_empty());
    }

    #[test]
    fn test_app_config_origins() {
        let config = AppConfig::from_lookup(lookup(&[(
            "ALLOWED_ORIGINS",
            "https://a.example, https://b.example,",
        )]));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );

        let config = AppConfig::from_lookup(lookup(&[("FRONTEND_ORIGIN", "https://site.example")]));
        assert_eq!(config.allowed_origins, vec!["https://site.example"]);
        assert_eq!(config.port, 3001);
        assert!(!config.is_production());
    }
}
