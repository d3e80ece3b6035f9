use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("No fields to update")]
    NoFields,
}

impl Todo {
    /// Trims a candidate title and rejects it when nothing is left.
    pub fn normalize_title(title: Option<&str>) -> Result<String, TodoValidationError> {
        let title = title.ok_or(TodoValidationError::MissingTitle)?.trim();
        if title.is_empty() {
            return Err(TodoValidationError::EmptyTitle);
        }
        Ok(title.to_string())
    }
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    title: Option<String>,
    completed: Option<bool>,
}

impl TodoPatch {
    pub fn new(title: Option<String>, completed: Option<bool>) -> Result<Self, TodoValidationError> {
        if title.is_none() && completed.is_none() {
            return Err(TodoValidationError::NoFields);
        }

        let title = match title {
            Some(t) => Some(Todo::normalize_title(Some(&t))?),
            None => None,
        };

        Ok(Self { title, completed })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn completed(&self) -> Option<bool> {
        self.completed
    }

    pub fn apply(&self, todo: &mut Todo, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        todo.updated_at = now;
    }
}
