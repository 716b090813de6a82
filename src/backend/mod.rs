/*!
 * Backend Module
 * Thin wrapper over the hosted backend-as-a-service: auth, tables, storage
 */
pub mod error;
pub mod memory;
pub mod rest;

pub use error::BackendError;
pub use memory::MemoryBackend;
pub use rest::SupabaseClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A table row as exchanged with the relational API.
pub type Row = serde_json::Map<String, Value>;

// ============================================================================
// Query types
// ============================================================================

/// Row filter understood by both the REST and in-memory backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn neq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Neq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::Neq(column, _) => column,
        }
    }
}

/// Sort order of a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub ascending: bool,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// Select parameters: filters, one ordering column and an optional limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ============================================================================
// Auth types
// ============================================================================

/// User record returned by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An established session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Outcome of a sign-in or sign-up call.
///
/// Either half may be absent even when the call itself succeeded, e.g. a
/// sign-up awaiting e-mail confirmation carries a user but no session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthResponse {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
}

// ============================================================================
// Backend trait
// ============================================================================

/// Operations the CMS needs from the backend-as-a-service.
///
/// Implementations issue exactly one upstream request per call; there is no
/// retry, caching or pagination layered on top.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Same backend, acting on behalf of the holder of `access_token`.
    fn with_access_token(&self, access_token: &str) -> Arc<dyn Backend>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, BackendError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError>;

    /// Resolve the user behind an access token; `None` when it is not valid.
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError>;

    /// Apply `patch` to every row matching `filters`; returns the updated rows.
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, BackendError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;

    /// Call a stored procedure.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, BackendError>;

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError>;

    /// Publicly reachable URL of a stored object.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Round-trip time of a cheap health request.
    async fn ping(&self) -> Result<Duration, BackendError>;
}

/// Percent-encode each segment of a storage path, keeping the separators.
pub(crate) fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_collects_parts() {
        let query = Query::new()
            .eq("is_active", true)
            .order(OrderBy::desc("created_at"))
            .limit(1);
        assert_eq!(query.filters, vec![Filter::eq("is_active", true)]);
        assert_eq!(query.order, Some(OrderBy::desc("created_at")));
        assert_eq!(query.limit, Some(1));
    }

    #[test]
    fn test_encode_object_path_keeps_slashes() {
        assert_eq!(
            encode_object_path("themes/1700000000000_my logo.png"),
            "themes/1700000000000_my%20logo.png"
        );
    }
}
