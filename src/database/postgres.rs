use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::models::{NewUser, Todo, TodoPatch, User};
use crate::database::store::{CreateTodoOutcome, ProvisionOutcome, StoreError, TodoStore};
use crate::filter::TodoFilter;
use crate::policy::TodoQuota;

const USER_COLUMNS: &str = "id, email, is_subscribed, subscription_ends, created_at, updated_at";
const TODO_COLUMNS: &str = "id, title, completed, user_id, created_at, updated_at";

/// Owner + search predicate shared by the listing and the count.
/// `$1` is the owner id, `$2` the escaped `ILIKE` pattern or NULL.
const TODO_FILTER_WHERE: &str =
    r"user_id = $1 AND ($2::text IS NULL OR title ILIKE $2 ESCAPE '\')";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgTodoStore {
    pool: PgPool,
}

impl PgTodoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(format!("{} already in use", what));
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn provision_user(&self, new_user: NewUser) -> Result<ProvisionOutcome, StoreError> {
        let sql = format!(
            "INSERT INTO users (id, email) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING RETURNING {}",
            USER_COLUMNS
        );

        let inserted = sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.id)
            .bind(&new_user.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "email"))?;

        if let Some(user) = inserted {
            info!("Provisioned user {}", user.id);
            return Ok(ProvisionOutcome::Created(user));
        }

        match self.find_user(&new_user.id).await? {
            Some(existing) => Ok(ProvisionOutcome::AlreadyExists(existing)),
            None => Err(StoreError::Corrupt(format!(
                "insert of user {} conflicted but no row is visible",
                new_user.id
            ))),
        }
    }

    async fn activate_subscription(
        &self,
        user_id: &str,
        ends: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users SET is_subscribed = TRUE, subscription_ends = $2, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(ends)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn lapse_subscription(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users SET is_subscribed = FALSE, subscription_ends = NULL, updated_at = now() \
             WHERE id = $1 AND subscription_ends < $2 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_todos(&self, user_id: &str, filter: &TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let sql = format!(
            "SELECT {} FROM todos WHERE {} ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            TODO_COLUMNS, TODO_FILTER_WHERE
        );
        let todos = sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .bind(filter.like_pattern())
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(todos)
    }

    async fn count_todos(&self, user_id: &str, filter: &TodoFilter) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM todos WHERE {}", TODO_FILTER_WHERE);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(filter.like_pattern())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_todo(
        &self,
        user_id: &str,
        title: &str,
        quota: &TodoQuota,
        now: DateTime<Utc>,
    ) -> Result<CreateTodoOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the owner serializes concurrent creates for one user.
        let lock_sql = format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS);
        let user = match sqlx::query_as::<_, User>(&lock_sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(user) => user,
            None => return Ok(CreateTodoOutcome::UserMissing),
        };

        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM todos WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        if let Err(exceeded) = quota.check(&user, owned, now) {
            debug!("Quota reached for {} ({} owned)", user_id, owned);
            return Ok(CreateTodoOutcome::QuotaExceeded { limit: exceeded.limit });
        }

        let insert_sql = format!(
            "INSERT INTO todos (title, user_id) VALUES ($1, $2) RETURNING {}",
            TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&insert_sql)
            .bind(title)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CreateTodoOutcome::Created(todo))
    }

    async fn find_todo(&self, id: Uuid, user_id: &str) -> Result<Option<Todo>, StoreError> {
        let sql = format!("SELECT {} FROM todos WHERE id = $1 AND user_id = $2", TODO_COLUMNS);
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn update_todo(
        &self,
        id: Uuid,
        user_id: &str,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let sql = format!(
            "UPDATE todos SET title = COALESCE($3, title), completed = COALESCE($4, completed), \
             updated_at = now() WHERE id = $1 AND user_id = $2 RETURNING {}",
            TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(patch.title())
            .bind(patch.completed())
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn delete_todo(&self, id: Uuid, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
