use axum::extract::State;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /health - Liveness plus a round trip to the store
pub async fn get(State(state): State<AppState>) -> ApiResult<Value> {
    if let Err(e) = state.store.ping().await {
        warn!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("Database temporarily unavailable"));
    }

    Ok(ApiResponse::success(json!({ "status": "ok" })))
}
