use axum::response::Json;
use serde_json::{json, Value};

use crate::auth::Principal;

/// GET /dashboard
pub async fn dashboard(principal: Principal) -> Json<Value> {
    Json(json!({ "page": "dashboard", "userId": principal.user_id }))
}

/// GET /admin/dashboard - only admins get past the gate
pub async fn admin_dashboard(principal: Principal) -> Json<Value> {
    Json(json!({ "page": "admin-dashboard", "userId": principal.user_id }))
}
