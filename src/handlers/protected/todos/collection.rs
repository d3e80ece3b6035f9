use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::Principal;
use crate::database::{models::Todo, CreateTodoOutcome};
use crate::error::ApiError;
use crate::filter::{ListQuery, TodoFilter};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPage {
    pub todos: Vec<Todo>,
    pub current_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
}

/// GET /api/todos?search=&page= - The caller's todos, newest first
pub async fn get(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> ApiResult<TodoPage> {
    let filter = TodoFilter::from_query(&query);

    let todos = state.store.list_todos(&principal.user_id, &filter).await?;
    let total = state.store.count_todos(&principal.user_id, &filter).await?;

    debug!(
        "Listed {} of {} todos for {} (page {})",
        todos.len(),
        total,
        principal.user_id,
        filter.page()
    );

    Ok(ApiResponse::success(TodoPage {
        todos,
        current_page: filter.page(),
        total_pages: TodoFilter::total_pages(total),
    }))
}

/// POST /api/todos - Create a todo, subject to the free-plan quota
pub async fn post(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> ApiResult<Todo> {
    let Json(request) = payload?;
    let title = Todo::normalize_title(request.title.as_deref())?;

    match state
        .store
        .create_todo(&principal.user_id, &title, &state.quota, Utc::now())
        .await?
    {
        CreateTodoOutcome::Created(todo) => Ok(ApiResponse::created(todo)),
        CreateTodoOutcome::UserMissing => Err(ApiError::not_found("User not found")),
        CreateTodoOutcome::QuotaExceeded { limit } => {
            warn!("Quota denied create for {}", principal.user_id);
            Err(ApiError::forbidden(format!(
                "Free users can only create up to {} todos. Please subscribe to a paid plan to write more todos.",
                limit
            )))
        }
    }
}
