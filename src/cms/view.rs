//! Admin manager view-model: list state, error banner and edit form.

use serde::Serialize;
use uuid::Uuid;

use super::entity::Entity;
use super::manager::TableManager;
use crate::error::AppError;

/// The open create/edit form.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormState<F> {
    /// Row being edited; `None` for a new row.
    pub editing: Option<Uuid>,
    pub values: F,
}

/// What the admin UI renders for one manager.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSnapshot<E: Entity> {
    pub items: Vec<E>,
    pub error: Option<String>,
    pub form_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormState<E::Form>>,
}

pub struct ManagerView<E: Entity> {
    manager: TableManager<E>,
    items: Vec<E>,
    error: Option<String>,
    form: Option<FormState<E::Form>>,
}

impl<E: Entity> ManagerView<E> {
    pub fn new(manager: TableManager<E>) -> Self {
        Self {
            manager,
            items: Vec::new(),
            error: None,
            form: None,
        }
    }

    fn fail(&mut self, err: AppError) -> AppError {
        self.error = Some(err.to_string());
        err
    }

    /// Reload the list. A failure keeps the previous items and shows the
    /// message.
    pub async fn list(&mut self) -> Result<(), AppError> {
        match self.manager.list().await {
            Ok(items) => {
                self.items = items;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn new_form(&mut self) {
        self.form = Some(FormState {
            editing: None,
            values: E::Form::default(),
        });
        self.error = None;
    }

    /// Open the edit form prefilled from a listed row.
    pub fn edit(&mut self, id: Uuid) -> Result<(), AppError> {
        match self.items.iter().find(|item| item.id() == id) {
            Some(item) => {
                self.form = Some(FormState {
                    editing: Some(id),
                    values: item.to_form(),
                });
                self.error = None;
                Ok(())
            }
            None => Err(self.fail(AppError::NotFound(format!(
                "No {} row with id {}",
                E::TABLE,
                id
            )))),
        }
    }

    pub fn close_form(&mut self) {
        self.form = None;
        self.error = None;
    }

    /// Submit the open form as a create or an update.
    pub async fn save(&mut self) -> Result<(), AppError> {
        let Some(form) = self.form.clone() else {
            return Err(self.fail(AppError::BadRequest("No form is open".to_string())));
        };
        self.error = None;

        let result = match form.editing {
            Some(id) => self.manager.update(id, form.values).await.map(|_| ()),
            None => self.manager.create(form.values).await.map(|_| ()),
        };

        match result {
            Ok(()) => {
                self.close_form();
                self.list().await
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn create(&mut self, values: E::Form) -> Result<(), AppError> {
        self.form = Some(FormState {
            editing: None,
            values,
        });
        self.save().await
    }

    pub async fn update(&mut self, id: Uuid, values: E::Form) -> Result<(), AppError> {
        self.form = Some(FormState {
            editing: Some(id),
            values,
        });
        self.save().await
    }

    /// Delete after confirmation; the list is reloaded whatever the outcome.
    pub async fn delete(&mut self, id: Uuid, confirmed: bool) -> Result<(), AppError> {
        if !confirmed {
            return Ok(());
        }
        let result = self.manager.delete(id).await;
        let relisted = self.list().await;
        match result {
            Ok(()) => relisted,
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn form(&self) -> Option<&FormState<E::Form>> {
        self.form.as_ref()
    }

    pub fn snapshot(&self) -> ManagerSnapshot<E> {
        ManagerSnapshot {
            items: self.items.clone(),
            error: self.error.clone(),
            form_open: self.form.is_some(),
            form: self.form.clone(),
        }
    }
}
