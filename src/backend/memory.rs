//! In-process backend used for local development and tests.
//!
//! Mirrors the constraints the hosted database enforces for this schema:
//! generated ids and timestamps, at most one active theme, and the
//! `activate_theme` stored procedure.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthResponse, AuthUser, Backend, BackendError, Filter, Query, Row, Session};

const PUBLIC_BASE: &str = "http://127.0.0.1:54321";
const ACTIVATE_THEME: &str = "activate_theme";

#[derive(Debug, Clone)]
struct MemoryUser {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    users: HashMap<String, MemoryUser>,
    sessions: HashMap<String, AuthUser>,
    objects: HashMap<String, (Vec<u8>, String)>,
    failures: HashMap<String, String>,
    last_created: Option<DateTime<Utc>>,
}

impl MemoryState {
    fn check_failure(&self, target: &str) -> Result<(), BackendError> {
        match self.failures.get(target) {
            Some(message) => Err(BackendError::api(500, message.clone())),
            None => Ok(()),
        }
    }

    /// Strictly increasing creation timestamps so "newest first" is stable.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut now = DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now);
        if let Some(last) = self.last_created {
            if now <= last {
                now = last + ChronoDuration::microseconds(1);
            }
        }
        self.last_created = Some(now);
        now
    }

    fn active_theme_count(&self, except: Option<&Value>) -> usize {
        self.tables
            .get("themes")
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get("is_active") == Some(&Value::Bool(true)))
                    .filter(|row| except.map_or(true, |id| row.get("id") != Some(id)))
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Backend that keeps every table, user and stored object in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. Unconfirmed accounts can sign in but receive no
    /// session, like a hosted project with e-mail confirmation enabled.
    pub async fn add_user(&self, email: &str, password: &str, confirmed: bool) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
        };
        self.state.write().await.users.insert(
            email.to_lowercase(),
            MemoryUser {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );
        user
    }

    /// Make every call against `target` (a table name, function name,
    /// storage bucket or `"auth"`) fail with `message`.
    pub async fn inject_failure(&self, target: &str, message: &str) {
        self.state
            .write()
            .await
            .failures
            .insert(target.to_string(), message.to_string());
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    /// Raw bytes of a stored object, if any.
    pub async fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .await
            .objects
            .get(&format!("{}/{}", bucket, path))
            .map(|(bytes, _)| bytes.clone())
    }

    fn open_session(state: &mut MemoryState, user: &AuthUser) -> Session {
        let access_token = format!("mem-{}", Uuid::new_v4());
        state.sessions.insert(access_token.clone(), user.clone());
        Session {
            access_token,
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_in: Some(3600),
        }
    }
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(column, value) => row.get(column).unwrap_or(&Value::Null) == value,
        Filter::Neq(column, value) => row.get(column).unwrap_or(&Value::Null) != value,
    })
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// PostgreSQL ordering: nulls last ascending, first descending.
fn compare_rows(a: &Row, b: &Row, column: &str, ascending: bool) -> Ordering {
    let left = a.get(column).filter(|v| !v.is_null());
    let right = b.get(column).filter(|v| !v.is_null());
    let ordering = match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_values(x, y),
    };
    if ascending {
        ordering
    } else {
        ordering.reverse()
    }
}

fn single_active_violation() -> BackendError {
    BackendError::api(
        409,
        "duplicate key value violates unique constraint \"themes_single_active\"",
    )
}

#[async_trait]
impl Backend for MemoryBackend {
    /// No row-level security here, so every caller shares the same view.
    fn with_access_token(&self, _access_token: &str) -> Arc<dyn Backend> {
        Arc::new(self.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, BackendError> {
        let mut state = self.state.write().await;
        state.check_failure("auth")?;

        let account = match state.users.get(&email.to_lowercase()) {
            Some(account) if account.password == password => account.clone(),
            _ => return Err(BackendError::Auth("Invalid login credentials".to_string())),
        };

        let session = account
            .confirmed
            .then(|| Self::open_session(&mut state, &account.user));
        Ok(AuthResponse {
            user: Some(account.user),
            session,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        {
            let state = self.state.read().await;
            state.check_failure("auth")?;
            if state.users.contains_key(&email.to_lowercase()) {
                return Err(BackendError::api(422, "User already registered"));
            }
        }
        let user = self.add_user(email, password, true).await;
        let mut state = self.state.write().await;
        let session = Self::open_session(&mut state, &user);
        Ok(AuthResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, BackendError> {
        let state = self.state.read().await;
        state.check_failure("auth")?;
        Ok(state.sessions.get(access_token).cloned())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.check_failure("auth")?;
        state.sessions.remove(access_token);
        Ok(())
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        let state = self.state.read().await;
        state.check_failure(table)?;

        let mut rows: Vec<Row> = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = query.order {
            rows.sort_by(|a, b| compare_rows(a, b, order.column, order.ascending));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, BackendError> {
        let mut state = self.state.write().await;
        state.check_failure(table)?;

        if table == "themes"
            && row.get("is_active") == Some(&Value::Bool(true))
            && state.active_theme_count(None) > 0
        {
            return Err(single_active_violation());
        }

        if row.get("id").map_or(true, Value::is_null) {
            row.insert("id".to_string(), json!(Uuid::new_v4()));
        }
        if row.get("created_at").map_or(true, Value::is_null) {
            // Fixed precision keeps string order chronological.
            let created_at = state
                .next_created_at()
                .to_rfc3339_opts(SecondsFormat::Micros, true);
            row.insert("created_at".to_string(), json!(created_at));
        }

        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, BackendError> {
        let mut state = self.state.write().await;
        state.check_failure(table)?;

        if table == "themes" && patch.get("is_active") == Some(&Value::Bool(true)) {
            let targets: Vec<Value> = state
                .tables
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| matches(row, filters))
                        .filter_map(|row| row.get("id").cloned())
                        .collect()
                })
                .unwrap_or_default();
            let others_active = targets
                .first()
                .map(|id| state.active_theme_count(Some(id)))
                .unwrap_or(0);
            if targets.len() > 1 || others_active > 0 {
                return Err(single_active_violation());
            }
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches(row, filters)) {
            for (key, value) in &patch {
                row.insert(key.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.check_failure(table)?;
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !matches(row, filters));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, BackendError> {
        let mut state = self.state.write().await;
        state.check_failure(function)?;

        if function != ACTIVATE_THEME {
            return Err(BackendError::api(
                404,
                format!("Could not find the function public.{}", function),
            ));
        }

        let target = args.get("theme_id").cloned().unwrap_or(Value::Null);
        let rows = state.tables.entry("themes".to_string()).or_default();
        if !rows.iter().any(|row| row.get("id") == Some(&target)) {
            return Err(BackendError::api(404, "Theme not found"));
        }
        for row in rows.iter_mut() {
            let active = row.get("id") == Some(&target);
            row.insert("is_active".to_string(), Value::Bool(active));
        }
        Ok(Value::Null)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state.check_failure(bucket)?;

        let key = format!("{}/{}", bucket, path);
        if !upsert && state.objects.contains_key(&key) {
            return Err(BackendError::api(409, "The resource already exists"));
        }
        state
            .objects
            .insert(key, (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            PUBLIC_BASE,
            bucket,
            super::encode_object_path(path)
        )
    }

    async fn ping(&self) -> Result<Duration, BackendError> {
        self.state.read().await.check_failure("health")?;
        Ok(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OrderBy;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_created_at() {
        let backend = MemoryBackend::new();
        let stored = backend
            .insert("contents", row(json!({ "title": "Hello" })))
            .await
            .unwrap();
        assert!(stored.get("id").and_then(Value::as_str).is_some());
        assert!(stored.get("created_at").is_some());
    }

    #[tokio::test]
    async fn test_select_orders_and_limits() {
        let backend = MemoryBackend::new();
        for index in [3, 1, 2] {
            backend
                .insert("features", row(json!({ "order_index": index })))
                .await
                .unwrap();
        }

        let rows = backend
            .select("features", &Query::new().order(OrderBy::asc("order_index")))
            .await
            .unwrap();
        let order: Vec<i64> = rows
            .iter()
            .filter_map(|r| r.get("order_index").and_then(Value::as_i64))
            .collect();
        assert_eq!(order, vec![1, 2, 3]);

        let newest = backend
            .select(
                "features",
                &Query::new().order(OrderBy::desc("created_at")).limit(1),
            )
            .await
            .unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].get("order_index"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_second_active_theme_is_rejected() {
        let backend = MemoryBackend::new();
        backend
            .insert("themes", row(json!({ "is_active": true })))
            .await
            .unwrap();
        let err = backend
            .insert("themes", row(json!({ "is_active": true })))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_activate_theme_switches_single_row() {
        let backend = MemoryBackend::new();
        let first = backend
            .insert("themes", row(json!({ "is_active": true })))
            .await
            .unwrap();
        let second = backend
            .insert("themes", row(json!({ "is_active": false })))
            .await
            .unwrap();

        backend
            .rpc(ACTIVATE_THEME, json!({ "theme_id": second["id"] }))
            .await
            .unwrap();

        let active = backend
            .select("themes", &Query::new().eq("is_active", true))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["id"], second["id"]);
        assert_ne!(active[0]["id"], first["id"]);
    }

    #[tokio::test]
    async fn test_activate_unknown_theme_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend
            .rpc(ACTIVATE_THEME, json!({ "theme_id": Uuid::new_v4() }))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_unconfirmed_user_gets_no_session() {
        let backend = MemoryBackend::new();
        backend.add_user("admin@example.com", "secret", false).await;
        let response = backend
            .sign_in_with_password("admin@example.com", "secret")
            .await
            .unwrap();
        assert!(response.user.is_some());
        assert!(response.session.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let backend = MemoryBackend::new();
        backend.add_user("admin@example.com", "secret", true).await;

        let wrong = backend
            .sign_in_with_password("admin@example.com", "nope")
            .await;
        assert!(matches!(wrong, Err(BackendError::Auth(_))));

        let session = backend
            .sign_in_with_password("admin@example.com", "secret")
            .await
            .unwrap()
            .session
            .unwrap();
        assert!(backend
            .get_user(&session.access_token)
            .await
            .unwrap()
            .is_some());

        backend.sign_out(&session.access_token).await.unwrap();
        assert!(backend
            .get_user(&session.access_token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upload_without_upsert_rejects_existing_object() {
        let backend = MemoryBackend::new();
        backend
            .upload("uploads", "a.png", vec![1], "image/png", false)
            .await
            .unwrap();
        let err = backend
            .upload("uploads", "a.png", vec![2], "image/png", false)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 409, .. }));
        backend
            .upload("uploads", "a.png", vec![3], "image/png", true)
            .await
            .unwrap();
        assert_eq!(backend.object("uploads", "a.png").await, Some(vec![3]));
    }

    #[tokio::test]
    async fn test_injected_failure_surfaces_message() {
        let backend = MemoryBackend::new();
        backend.inject_failure("faqs", "relation is gone").await;
        let err = backend.select("faqs", &Query::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "relation is gone");

        backend.clear_failures().await;
        assert!(backend.select("faqs", &Query::new()).await.is_ok());
    }
}
