//! List / create / update / delete written once for every content table.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::entity::{Entity, FollowUp};
use crate::backend::{Backend, BackendError, Filter, OrderBy, Query, Row};
use crate::error::AppError;

/// Serialize a form into a row.
pub fn encode<T: Serialize>(value: &T) -> Result<Row, AppError> {
    match serde_json::to_value(value).map_err(BackendError::from)? {
        Value::Object(row) => Ok(row),
        _ => Err(AppError::BadRequest("Form must be an object".to_string())),
    }
}

/// Deserialize a stored row.
pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T, AppError> {
    Ok(serde_json::from_value(Value::Object(row)).map_err(BackendError::from)?)
}

/// Stateless manager for one entity table.
pub struct TableManager<E: Entity> {
    backend: Arc<dyn Backend>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for TableManager<E> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.backend))
    }
}

impl<E: Entity> TableManager<E> {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            _entity: PhantomData,
        }
    }

    fn by_id(id: Uuid) -> [Filter; 1] {
        [Filter::eq("id", id.to_string())]
    }

    /// Every row in the entity's display order.
    pub async fn list(&self) -> Result<Vec<E>, AppError> {
        let rows = self
            .backend
            .select(E::TABLE, &Query::new().order(E::ORDER))
            .await?;
        rows.into_iter().map(decode).collect()
    }

    /// Most recently created row.
    pub async fn latest(&self) -> Result<Option<E>, AppError> {
        let query = Query::new().order(OrderBy::desc("created_at")).limit(1);
        let rows = self.backend.select(E::TABLE, &query).await?;
        rows.into_iter().next().map(decode).transpose()
    }

    pub async fn get(&self, id: Uuid) -> Result<E, AppError> {
        let query = Query::new().eq("id", id.to_string()).limit(1);
        let rows = self.backend.select(E::TABLE, &query).await?;
        rows.into_iter()
            .next()
            .map(decode)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("No {} row with id {}", E::TABLE, id)))
    }

    /// One past the current maximum `order_index`, or 1 for an empty table.
    pub async fn next_order_index(&self) -> Result<i64, AppError> {
        let query = Query::new().order(OrderBy::desc("order_index")).limit(1);
        let rows = self.backend.select(E::TABLE, &query).await?;
        let max = rows
            .first()
            .and_then(|row| row.get("order_index"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(max + 1)
    }

    pub async fn create(&self, mut form: E::Form) -> Result<E, AppError> {
        E::validate(&form)?;
        E::prepare(&mut form);

        let mut row = encode(&form)?;
        if E::ORDER_INDEXED {
            let index = self.next_order_index().await?;
            row.insert("order_index".to_string(), json!(index));
        }

        let saved: E = decode(self.backend.insert(E::TABLE, row).await?)?;
        tracing::info!(table = E::TABLE, id = %saved.id(), "Row created");
        self.run_follow_up(saved, &form).await
    }

    /// Partial update keyed by id.
    pub async fn update(&self, id: Uuid, mut form: E::Form) -> Result<E, AppError> {
        E::validate(&form)?;
        E::prepare(&mut form);

        let row = encode(&form)?;
        let saved: E = self
            .backend
            .update(E::TABLE, &Self::by_id(id), row)
            .await?
            .into_iter()
            .next()
            .map(decode)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("No {} row with id {}", E::TABLE, id)))?;
        tracing::info!(table = E::TABLE, id = %id, "Row updated");
        self.run_follow_up(saved, &form).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.backend.delete(E::TABLE, &Self::by_id(id)).await?;
        tracing::info!(table = E::TABLE, id = %id, "Row deleted");
        Ok(())
    }

    async fn run_follow_up(&self, saved: E, form: &E::Form) -> Result<E, AppError> {
        let Some(follow_up) = E::follow_up(&saved, form) else {
            return Ok(saved);
        };
        let id = saved.id();
        match follow_up {
            FollowUp::Rpc { function, args } => {
                self.backend.rpc(function, args).await?;
            }
            FollowUp::Patch(patch) => {
                self.backend
                    .update(E::TABLE, &Self::by_id(id), patch)
                    .await?;
            }
        }
        self.get(id).await
    }
}
