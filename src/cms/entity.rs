//! Per-table configuration consumed by the generic manager.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{OrderBy, Row};
use crate::error::AppError;

/// Extra backend call issued after a successful create or update.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Call a stored procedure with the given arguments.
    Rpc { function: &'static str, args: Value },
    /// Patch the saved row again.
    Patch(Row),
}

/// A content table managed from the admin panel.
///
/// `Self` is the stored row, `Form` the editable subset an admin submits.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Form: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static;

    /// Table name on the backend.
    const TABLE: &'static str;
    /// Route and tab key, e.g. `faqs` in `/api/admin/faqs`.
    const KEY: &'static str;
    /// Admin list ordering.
    const ORDER: OrderBy;
    /// New rows are appended after the current maximum `order_index`.
    const ORDER_INDEXED: bool = false;
    /// Storage folder images for this table are uploaded into.
    const UPLOAD_FOLDER: Option<&'static str> = None;
    /// Mutations change what the public theme looks like.
    const REFRESHES_THEME: bool = false;

    fn id(&self) -> Uuid;

    /// Required-field check; runs before any backend call.
    fn validate(form: &Self::Form) -> Result<(), AppError>;

    /// Prefill an edit form from a stored row.
    fn to_form(&self) -> Self::Form;

    /// Normalise a form before it is written.
    fn prepare(_form: &mut Self::Form) {}

    fn follow_up(_saved: &Self, _form: &Self::Form) -> Option<FollowUp> {
        None
    }
}

/// Fails with `message` unless every value has non-whitespace content.
pub fn require(values: &[&str], message: &str) -> Result<(), AppError> {
    if values.iter().all(|value| !value.trim().is_empty()) {
        Ok(())
    } else {
        Err(AppError::Validation(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank_values() {
        assert!(require(&["a", "b"], "x").is_ok());
        let err = require(&["a", "   "], "Question and answer are required!").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "Question and answer are required!");
    }
}
