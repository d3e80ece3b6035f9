use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{NewUser, Todo, TodoPatch, User};
use crate::filter::TodoFilter;
use crate::policy::TodoQuota;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created(User),
    AlreadyExists(User),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTodoOutcome {
    Created(Todo),
    UserMissing,
    QuotaExceeded { limit: u32 },
}

/// Record store consumed by the handlers.
///
/// Every todo operation is scoped by `user_id`; a todo owned by someone else
/// is indistinguishable from one that does not exist.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Insert the user unless a row with the same id already exists.
    async fn provision_user(&self, new_user: NewUser) -> Result<ProvisionOutcome, StoreError>;

    async fn activate_subscription(
        &self,
        user_id: &str,
        ends: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Mark the subscription as ended if `subscription_ends` is before `now`.
    /// Returns `None` when the user is missing or no longer lapsed.
    async fn lapse_subscription(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    async fn list_todos(&self, user_id: &str, filter: &TodoFilter) -> Result<Vec<Todo>, StoreError>;

    async fn count_todos(&self, user_id: &str, filter: &TodoFilter) -> Result<i64, StoreError>;

    /// Count-and-insert as one atomic unit under `quota`.
    async fn create_todo(
        &self,
        user_id: &str,
        title: &str,
        quota: &TodoQuota,
        now: DateTime<Utc>,
    ) -> Result<CreateTodoOutcome, StoreError>;

    async fn find_todo(&self, id: Uuid, user_id: &str) -> Result<Option<Todo>, StoreError>;

    async fn update_todo(
        &self,
        id: Uuid,
        user_id: &str,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError>;

    /// Returns `false` when nothing owned by `user_id` matched.
    async fn delete_todo(&self, id: Uuid, user_id: &str) -> Result<bool, StoreError>;
}
