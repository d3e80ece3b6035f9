use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Principal;
use crate::database::models::{Todo, TodoPatch};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

/// Ids are UUIDs; anything else can't name a todo.
pub fn parse_todo_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid todo id"))
}

fn not_found() -> ApiError {
    ApiError::not_found("Todo not found")
}

/// GET /api/todos/:id
pub async fn get(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Todo> {
    let id = parse_todo_id(&id)?;

    let todo = state
        .store
        .find_todo(id, &principal.user_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success(todo))
}

/// PUT /api/todos/:id - Update title and/or completed
pub async fn put(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> ApiResult<Todo> {
    let id = parse_todo_id(&id)?;
    let Json(request) = payload?;
    let patch = TodoPatch::new(request.title, request.completed)?;

    let todo = state
        .store
        .update_todo(id, &principal.user_id, &patch)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success(todo))
}

/// DELETE /api/todos/:id
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_todo_id(&id)?;

    if !state.store.delete_todo(id, &principal.user_id).await? {
        return Err(not_found());
    }

    Ok(ApiResponse::success(json!({ "message": "Todo deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn malformed_id_is_bad_request() {
        let err = parse_todo_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(parse_todo_id("6f1c2a52-8a7e-4c5b-9d1e-1f0c2b3a4d5e").is_ok());
    }
}
