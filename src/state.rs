use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;

use crate::auth::{SessionError, SessionKeys};
use crate::config::{AppConfig, ConfigError};
use crate::database::TodoStore;
use crate::policy::TodoQuota;
use crate::webhooks::WebhookVerifier;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Shared, immutable per-process dependencies handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TodoStore>,
    pub sessions: Arc<SessionKeys>,
    pub webhooks: Arc<WebhookVerifier>,
    pub quota: TodoQuota,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TodoStore>,
        sessions: SessionKeys,
        webhooks: WebhookVerifier,
        quota: TodoQuota,
    ) -> Self {
        Self {
            store,
            sessions: Arc::new(sessions),
            webhooks: Arc::new(webhooks),
            quota,
        }
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn TodoStore>) -> Result<Self, StateError> {
        let sessions = SessionKeys::new(
            config.session.secret.expose_secret().as_bytes(),
            config.session.leeway_secs,
        )?;
        let webhooks = WebhookVerifier::new(&config.webhook.secret, config.webhook.tolerance_secs)?;

        Ok(Self::new(store, sessions, webhooks, TodoQuota::new(config.quota.free_todos)))
    }
}
