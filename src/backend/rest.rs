//! HTTP client for a Supabase-style backend (PostgREST, GoTrue and Storage
//! REST conventions).

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{
    encode_object_path, AuthResponse, AuthUser, Backend, BackendError, Filter, Query, Row, Session,
};
use crate::config::BackendConfig;

/// Client for the hosted backend.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    http: reqwest::Client,
}

/// Token endpoint payload. Every field is optional because sign-up answers
/// with either a session or a bare user depending on confirmation settings.
#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<TokenPayload> for AuthResponse {
    fn from(payload: TokenPayload) -> Self {
        let user = payload.user.or_else(|| {
            payload.id.map(|id| AuthUser {
                id,
                email: payload.email.clone(),
            })
        });
        let session = payload
            .access_token
            .filter(|token| !token.is_empty())
            .map(|access_token| Session {
                access_token,
                refresh_token: payload.refresh_token,
                expires_in: payload.expires_in,
            });
        AuthResponse { user, session }
    }
}

impl SupabaseClient {
    /// Build a client from resolved settings.
    ///
    /// # Errors
    ///
    /// `BackendError::Config` when the URL or anon key is empty.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        if config.url.is_empty() {
            return Err(BackendError::Config("SUPABASE_URL is not set".to_string()));
        }
        if config.anon_key.is_empty() {
            return Err(BackendError::Config(
                "SUPABASE_ANON_KEY is not set".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("landing-cms/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: None,
            http,
        })
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path)
    }
}

/// PostgREST operator parameters for a filter list.
fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, Value::Null) => (column.clone(), "is.null".to_string()),
            Filter::Neq(column, Value::Null) => (column.clone(), "not.is.null".to_string()),
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", scalar(value))),
            Filter::Neq(column, value) => (column.clone(), format!("neq.{}", scalar(value))),
        })
        .collect()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));
    if let Some(order) = query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Pull a readable message out of whatever error shape the service used.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        })
}

async fn read_json(response: Response) -> Result<Value, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(BackendError::api(status.as_u16(), error_message(status, &body)));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

fn into_rows(value: Value) -> Result<Vec<Row>, BackendError> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => Ok(serde_json::from_value(other)?),
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    fn with_access_token(&self, access_token: &str) -> Arc<dyn Backend> {
        let mut scoped = self.clone();
        scoped.access_token = Some(access_token.to_string());
        Arc::new(scoped)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, BackendError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = response.text().await?;
            return Err(BackendError::Auth(error_message(status, &body)));
        }

        let payload: TokenPayload = serde_json::from_value(read_json(response).await?)?;
        Ok(payload.into())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let payload: TokenPayload = serde_json::from_value(read_json(response).await?)?;
        Ok(payload.into())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, BackendError> {
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Ok(Some(serde_json::from_value(read_json(response).await?)?)),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-invalid token means there is nothing left to revoke.
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(()),
            _ => read_json(response).await.map(|_| ()),
        }
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        let response = self
            .request(Method::GET, self.rest_url(table))
            .query(&query_params(query))
            .send()
            .await?;
        into_rows(read_json(response).await?)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        let response = self
            .request(Method::POST, self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&vec![Value::Object(row)])
            .send()
            .await?;

        into_rows(read_json(response).await?)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::api(500, "Insert returned no row"))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, BackendError> {
        let response = self
            .request(Method::PATCH, self.rest_url(table))
            .query(&filter_params(filters))
            .header("Prefer", "return=representation")
            .json(&Value::Object(patch))
            .send()
            .await?;
        into_rows(read_json(response).await?)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        let response = self
            .request(Method::DELETE, self.rest_url(table))
            .query(&filter_params(filters))
            .send()
            .await?;
        read_json(response).await.map(|_| ())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, BackendError> {
        let response = self
            .request(Method::POST, self.rest_url(&format!("rpc/{}", function)))
            .json(&args)
            .send()
            .await?;
        read_json(response).await
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let url = self.storage_url(&format!(
            "object/{}/{}",
            urlencoding::encode(bucket),
            encode_object_path(path)
        ));
        let response = self
            .request(Method::POST, url)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        read_json(response).await.map(|_| ())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage_url(&format!(
            "object/public/{}/{}",
            urlencoding::encode(bucket),
            encode_object_path(path)
        ))
    }

    async fn ping(&self) -> Result<Duration, BackendError> {
        let start = Instant::now();
        let response = self
            .http
            .get(self.auth_url("health"))
            .header("apikey", &self.anon_key)
            .send()
            .await?;
        read_json(response).await?;
        Ok(start.elapsed())
    }
}
