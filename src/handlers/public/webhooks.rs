// handlers/public/webhooks.rs - POST /api/webhooks/register
//
// Provisioning listener: the identity provider announces new accounts here
// and a local user row is created for each one.

use axum::{body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::database::{models::NewUser, ProvisionOutcome};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::webhooks::{ProvisioningEvent, WebhookError, WebhookHeaders};

fn message(text: &str) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "message": text }))
}

fn rejected(err: WebhookError) -> ApiError {
    warn!("Rejected webhook: {}", err);
    match err {
        WebhookError::MissingHeader(_) => ApiError::bad_request("Missing svix headers"),
        WebhookError::InvalidPayload(_) => ApiError::bad_request("Invalid webhook payload"),
        WebhookError::InvalidKey(_) => ApiError::internal_server_error("Internal Server error"),
        _ => ApiError::bad_request("Invalid webhook signature"),
    }
}

/// POST /api/webhooks/register
///
/// The body is taken as raw bytes: the signature covers the exact payload,
/// so it must be verified before anything parses it.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let signed = WebhookHeaders::from_headers(&headers).map_err(rejected)?;
    state
        .webhooks
        .verify(&signed, &body, Utc::now().timestamp())
        .map_err(rejected)?;

    let data = match ProvisioningEvent::parse(&body).map_err(rejected)? {
        ProvisioningEvent::UserCreated(data) => data,
        ProvisioningEvent::Other { event_type } => {
            info!("Ignoring webhook event {} ({})", event_type, signed.id);
            return Ok(message("Webhook received successfully"));
        }
    };

    if data.email_addresses().is_empty() {
        info!("Webhook {} for {} carries no email addresses", signed.id, data.id);
        return Ok(message("Test webhook received successfully"));
    }

    let email = data
        .primary_email()
        .ok_or_else(|| ApiError::bad_request("Primary email not found"))?;

    let new_user = NewUser {
        id: data.id.clone(),
        email: email.to_string(),
    };

    match state.store.provision_user(new_user).await? {
        ProvisionOutcome::Created(user) => {
            info!("Provisioned user {} from webhook {}", user.id, signed.id);
            Ok(message("User created successfully"))
        }
        ProvisionOutcome::AlreadyExists(user) => {
            info!("User {} already provisioned, webhook {} ignored", user.id, signed.id);
            Ok(message("User already exists"))
        }
    }
}
