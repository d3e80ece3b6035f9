use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{NewUser, Todo, TodoPatch, User};
use crate::database::store::{CreateTodoOutcome, ProvisionOutcome, StoreError, TodoStore};
use crate::filter::TodoFilter;
use crate::policy::TodoQuota;

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    // Insertion order; listing sorts newest first.
    todos: Vec<Todo>,
}

/// Process-local store for tests and `STORE_BACKEND=memory` runs.
///
/// Each operation takes the lock once, so a quota check and its insert are
/// atomic exactly like the transactional PostgreSQL path.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owned_matching<'a>(
    todos: &'a [Todo],
    user_id: &'a str,
    filter: &'a TodoFilter,
) -> impl Iterator<Item = &'a Todo> + 'a {
    todos
        .iter()
        .filter(move |t| t.user_id == user_id && filter.matches(&t.title))
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn provision_user(&self, new_user: NewUser) -> Result<ProvisionOutcome, StoreError> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.users.get(&new_user.id) {
            return Ok(ProvisionOutcome::AlreadyExists(existing.clone()));
        }

        if state.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: new_user.id,
            email: new_user.email,
            is_subscribed: false,
            subscription_ends: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok(ProvisionOutcome::Created(user))
    }

    async fn activate_subscription(
        &self,
        user_id: &str,
        ends: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(user_id).map(|user| {
            user.is_subscribed = true;
            user.subscription_ends = Some(ends);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn lapse_subscription(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        let user = match state.users.get_mut(user_id) {
            Some(user) => user,
            None => return Ok(None),
        };

        match user.subscription_ends {
            Some(ends) if ends < now => {
                user.is_subscribed = false;
                user.subscription_ends = None;
                user.updated_at = now;
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_todos(&self, user_id: &str, filter: &TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let state = self.state.read().await;

        let mut todos: Vec<Todo> = owned_matching(&state.todos, user_id, filter).cloned().collect();
        // Reverse first so the stable sort keeps later inserts ahead on timestamp ties.
        todos.reverse();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit()).unwrap_or(usize::MAX);
        Ok(todos.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_todos(&self, user_id: &str, filter: &TodoFilter) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        let count = owned_matching(&state.todos, user_id, filter).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn create_todo(
        &self,
        user_id: &str,
        title: &str,
        quota: &TodoQuota,
        now: DateTime<Utc>,
    ) -> Result<CreateTodoOutcome, StoreError> {
        let mut state = self.state.write().await;

        let user = match state.users.get(user_id) {
            Some(user) => user,
            None => return Ok(CreateTodoOutcome::UserMissing),
        };

        let owned = state.todos.iter().filter(|t| t.user_id == user_id).count();
        let owned = i64::try_from(owned).unwrap_or(i64::MAX);
        if let Err(exceeded) = quota.check(user, owned, now) {
            return Ok(CreateTodoOutcome::QuotaExceeded { limit: exceeded.limit });
        }

        let todo = Todo {
            id: Uuid::new_v4(),
            title: title.to_string(),
            completed: false,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.todos.push(todo.clone());
        Ok(CreateTodoOutcome::Created(todo))
    }

    async fn find_todo(&self, id: Uuid, user_id: &str) -> Result<Option<Todo>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .todos
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn update_todo(
        &self,
        id: Uuid,
        user_id: &str,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state
            .todos
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
            .map(|todo| {
                patch.apply(todo, Utc::now());
                todo.clone()
            }))
    }

    async fn delete_todo(&self, id: Uuid, user_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.todos.len();
        state.todos.retain(|t| !(t.id == id && t.user_id == user_id));
        Ok(state.todos.len() < before)
    }
}
