// handlers/public/pages.rs - Placeholder pages that gate redirects land on

use axum::response::Json;
use serde_json::{json, Value};

/// GET /
pub async fn home() -> Json<Value> {
    Json(json!({
        "name": "todo-api-rust",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "todos": "/api/todos",
            "subscription": "/api/subscription",
            "health": "/health",
        }
    }))
}

/// GET /sign-in
///
/// Signing in happens at the identity provider; the `redirect_url` query
/// parameter set by the gate is the page to return to afterwards.
pub async fn sign_in() -> Json<Value> {
    Json(json!({ "page": "sign-in" }))
}

/// GET /sign-up
pub async fn sign_up() -> Json<Value> {
    Json(json!({ "page": "sign-up" }))
}

/// GET /error
pub async fn error_page() -> Json<Value> {
    Json(json!({
        "page": "error",
        "message": "Your session could not be authorized. Please sign in again.",
    }))
}
