use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::auth::Principal;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{subscription::activation_ends, SubscriptionState};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationResponse {
    pub message: &'static str,
    pub updated_user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_subscribed: bool,
    pub subscription_ends: Option<DateTime<Utc>>,
}

impl From<&User> for SubscriptionStatus {
    fn from(user: &User) -> Self {
        Self {
            is_subscribed: user.is_subscribed,
            subscription_ends: user.subscription_ends,
        }
    }
}

/// POST /api/subscription - Start (or restart) a one-month subscription
pub async fn post(State(state): State<AppState>, principal: Principal) -> ApiResult<ActivationResponse> {
    let ends = activation_ends(Utc::now());

    let user = state
        .store
        .activate_subscription(&principal.user_id, ends)
        .await?
        .ok_or_else(|| ApiError::bad_request("User not found"))?;

    info!("Subscription for {} active until {}", user.id, ends);

    Ok(ApiResponse::success(ActivationResponse {
        message: "Subscription successful",
        updated_user: user,
    }))
}

/// GET /api/subscription - Current standing; an expired window is written back as lapsed
pub async fn get(State(state): State<AppState>, principal: Principal) -> ApiResult<SubscriptionStatus> {
    let now = Utc::now();
    let user = state
        .store
        .find_user(&principal.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if let SubscriptionState::Lapsed { ended } = SubscriptionState::of(&user, now) {
        info!("Subscription for {} lapsed at {}", user.id, ended);
        if state.store.lapse_subscription(&user.id, now).await?.is_none() {
            // Reactivated concurrently; report what is stored now.
            let current = state
                .store
                .find_user(&user.id)
                .await?
                .ok_or_else(|| ApiError::unauthorized("User not found"))?;
            return Ok(ApiResponse::success(SubscriptionStatus::from(&current)));
        }
        return Ok(ApiResponse::success(SubscriptionStatus {
            is_subscribed: false,
            subscription_ends: None,
        }));
    }

    Ok(ApiResponse::success(SubscriptionStatus::from(&user)))
}
