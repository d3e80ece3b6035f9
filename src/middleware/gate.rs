use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::policy::{evaluate, GateDecision};

/// Route-level authorization. Runs after `identity_middleware`.
pub async fn access_gate_middleware(request: Request, next: Next) -> Response {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or(Identity::Anonymous);

    let path = request.uri().path().to_string();
    let original = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    match evaluate(&path, &original, &identity) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Unauthorized => {
            debug!("Gate: anonymous request to {} rejected", path);
            ApiError::unauthorized("Unauthorized").into_response()
        }
        GateDecision::Redirect(location) => {
            debug!("Gate: redirecting {} -> {}", path, location);
            Redirect::to(&location).into_response()
        }
    }
}
