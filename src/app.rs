use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::handlers::{protected, public};
use crate::middleware::{access_gate_middleware, identity_middleware};
use crate::state::AppState;

/// The full application router.
///
/// Every request passes identity resolution and then the access gate before
/// routing, so unknown paths are gated too.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(page_routes())
        .merge(todo_routes())
        .merge(subscription_routes())
        .merge(webhook_routes())
        .route("/health", get(public::health_get))
        // Layers run bottom-up: identity, then the gate.
        .layer(middleware::from_fn(access_gate_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), identity_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::home))
        .route("/sign-in", get(public::sign_in))
        .route("/sign-up", get(public::sign_up))
        .route("/error", get(public::error_page))
        .route("/dashboard", get(protected::dashboard))
        .route("/admin/dashboard", get(protected::admin_dashboard))
}

fn todo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/todos",
            get(protected::todos_get).post(protected::todos_post),
        )
        .route(
            "/api/todos/:id",
            get(protected::todo_get)
                .put(protected::todo_put)
                .delete(protected::todo_delete),
        )
}

fn subscription_routes() -> Router<AppState> {
    Router::new().route(
        "/api/subscription",
        get(protected::subscription_get).post(protected::subscription_post),
    )
}

fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhooks/register", post(public::webhook_register))
}

/// CORS for the configured origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
