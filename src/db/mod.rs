pub mod models;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tokio::sync::OnceCell;

static DB_POOL: OnceCell<Arc<PgPool>> = OnceCell::const_new();

/// Direct Postgres connection, used only to provision the schema the REST
/// API serves. Optional: without `DATABASE_URL` the schema is expected to
/// exist already.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/postgres".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl DbConfig {
    /// `Some` only when `DATABASE_URL` is set.
    pub fn from_env() -> Option<Self> {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|_| Self::default())
    }
}

pub async fn init_pool(config: Option<DbConfig>) -> Result<Arc<PgPool>, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    let pool = Arc::new(pool);
    let _ = DB_POOL.set(pool.clone());

    Ok(pool)
}

pub fn get_pool() -> Option<Arc<PgPool>> {
    DB_POOL.get().cloned()
}

pub async fn health_check() -> Result<std::time::Duration, sqlx::Error> {
    let pool = get_pool()
        .ok_or_else(|| sqlx::Error::Configuration("Database pool not initialized".into()))?;

    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool.as_ref()).await?;

    Ok(start.elapsed())
}

/// Schema statements, one command each, applied in order. Every statement
/// is idempotent.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS contents (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        description TEXT,
        image_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE OR REPLACE FUNCTION set_updated_at() RETURNS trigger AS $$
    BEGIN
        NEW.updated_at = now();
        RETURN NEW;
    END;
    $$ LANGUAGE plpgsql
    "#,
    r#"DROP TRIGGER IF EXISTS contents_set_updated_at ON contents"#,
    r#"
    CREATE TRIGGER contents_set_updated_at
        BEFORE UPDATE ON contents
        FOR EACH ROW EXECUTE FUNCTION set_updated_at()
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS gallery (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        image_url TEXT NOT NULL,
        description TEXT,
        date DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contacts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        address TEXT,
        phone TEXT,
        email TEXT NOT NULL,
        map_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS features (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        description TEXT,
        icon TEXT,
        order_index INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS statistics (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        label TEXT NOT NULL,
        value DOUBLE PRECISION NOT NULL DEFAULT 0,
        icon TEXT,
        order_index INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS faqs (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        order_index INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS testimonials (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        company TEXT,
        content TEXT NOT NULL,
        avatar_url TEXT,
        order_index INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS links (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        label TEXT NOT NULL,
        url TEXT NOT NULL,
        icon TEXT,
        order_index INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS partners (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        logo_url TEXT,
        website_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS themes (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        description TEXT NOT NULL,
        company_name TEXT,
        font TEXT,
        logo_url TEXT,
        primary_color TEXT,
        secondary_color TEXT,
        success_color TEXT,
        danger_color TEXT,
        warning_color TEXT,
        info_color TEXT,
        light_color TEXT,
        dark_color TEXT,
        muted_color TEXT,
        is_active BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS themes_single_active
        ON themes(is_active) WHERE is_active
    "#,
    r#"
    CREATE OR REPLACE FUNCTION activate_theme(theme_id UUID) RETURNS void AS $$
    BEGIN
        PERFORM pg_advisory_xact_lock(hashtext('activate_theme'));
        IF NOT EXISTS (SELECT 1 FROM themes WHERE id = theme_id) THEN
            RAISE EXCEPTION 'Theme not found' USING ERRCODE = 'P0002';
        END IF;
        UPDATE themes SET is_active = false WHERE is_active AND id <> theme_id;
        UPDATE themes SET is_active = true WHERE id = theme_id;
    END;
    $$ LANGUAGE plpgsql
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_features_order ON features(order_index)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_statistics_order ON statistics(order_index)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_faqs_order ON faqs(order_index)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_testimonials_order ON testimonials(order_index)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_links_order ON links(order_index)"#,
];

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    for statement in MIGRATIONS {
        sqlx::query(*statement).execute(pool).await?;
    }

    tracing::info!(
        statements = MIGRATIONS.len(),
        "Database migrations completed successfully"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::Entity;
    use crate::db::models::{
        Contact, Content, FaqItem, Feature, GalleryItem, LinkItem, Partner, Statistic,
        Testimonial, Theme,
    };

    #[test]
    fn test_db_config_default_uses_env_or_fallback() {
        let config = DbConfig::default();
        assert!(config.max_connections >= 1);
        assert!(config.connect_timeout_secs >= 1);
        assert!(config.idle_timeout_secs >= 1);
        assert!(!config.url.is_empty());
    }

    #[test]
    fn test_get_pool_none_before_init() {
        let pool = get_pool();
        assert!(pool.is_none());
    }

    #[tokio::test]
    async fn test_health_check_fails_without_pool() {
        let result = health_check().await;
        assert!(result.is_err());
    }

    #[test]
    fn test_every_managed_table_is_created() {
        let tables = [
            Content::TABLE,
            GalleryItem::TABLE,
            Contact::TABLE,
            Feature::TABLE,
            Statistic::TABLE,
            FaqItem::TABLE,
            Testimonial::TABLE,
            LinkItem::TABLE,
            Partner::TABLE,
            Theme::TABLE,
        ];
        for table in tables {
            let create = format!("CREATE TABLE IF NOT EXISTS {} (", table);
            assert!(
                MIGRATIONS.iter().any(|sql| sql.contains(&create)),
                "missing table {}",
                table
            );
        }
    }

    #[test]
    fn test_activation_procedure_and_single_active_index() {
        assert!(MIGRATIONS
            .iter()
            .any(|sql| sql.contains("FUNCTION activate_theme(theme_id UUID)")));
        assert!(MIGRATIONS
            .iter()
            .any(|sql| sql.contains("themes_single_active") && sql.contains("WHERE is_active")));
    }
}
