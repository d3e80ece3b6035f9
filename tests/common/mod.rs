#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use todo_api_rust::auth::{Claims, SessionKeys};
use todo_api_rust::config::{DatabaseConfig, StoreBackend};
use todo_api_rust::database::{models::NewUser, DatabaseManager, MemoryStore, PgTodoStore, TodoStore};
use todo_api_rust::policy::TodoQuota;
use todo_api_rust::webhooks::{WebhookVerifier, HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use todo_api_rust::{app, AppState};

pub const SESSION_SECRET: &str = "integration-session-secret";
pub const WEBHOOK_SECRET: &str = "whsec_aW50ZWdyYXRpb24td2ViaG9vay1rZXk=";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }
}

/// Router wired to a store backend.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn TodoStore>,
    pub sessions: SessionKeys,
    signer: WebhookVerifier,
}

impl TestApp {
    /// Fresh in-memory store.
    pub fn new() -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Migrated PostgreSQL store at `DATABASE_URL`, or `None` when it is unset.
    ///
    /// The database is shared between tests, so callers use unique ids.
    pub async fn postgres() -> Result<Option<Self>> {
        let _ = dotenvy::dotenv();
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                eprintln!("DATABASE_URL not set; skipping PostgreSQL test");
                return Ok(None);
            }
        };

        let config = DatabaseConfig {
            backend: StoreBackend::Postgres,
            url: Some(SecretString::from(url)),
            max_connections: 10,
            connection_timeout: 10,
            run_migrations: true,
        };
        let manager = DatabaseManager::connect(&config).await?;
        manager.migrate().await?;

        let store = Arc::new(PgTodoStore::new(manager.pool().clone()));
        Ok(Some(Self::with_store(store)?))
    }

    pub fn with_store(store: Arc<dyn TodoStore>) -> Result<Self> {
        let sessions = SessionKeys::new(SESSION_SECRET.as_bytes(), 0)?;
        let secret = SecretString::from(WEBHOOK_SECRET.to_string());

        let state = AppState::new(
            store.clone(),
            sessions.clone(),
            WebhookVerifier::new(&secret, 300)?,
            TodoQuota::default(),
        );

        Ok(Self {
            router: app(state),
            store,
            sessions,
            signer: WebhookVerifier::new(&secret, 300)?,
        })
    }

    pub fn token(&self, user_id: &str, role: Option<&str>) -> Result<String> {
        Ok(self.sessions.issue(&Claims::new(user_id, role, Duration::minutes(10)))?)
    }

    pub async fn provision(&self, user_id: &str) -> Result<()> {
        self.store
            .provision_user(NewUser {
                id: user_id.to_string(),
                email: format!("{}@example.com", user_id),
            })
            .await?;
        Ok(())
    }

    /// Provisioned user plus a member session token for them.
    pub async fn member(&self, user_id: &str) -> Result<String> {
        self.provision(user_id).await?;
        self.token(user_id, None)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::DELETE, path, token, None).await
    }

    /// POST a provisioning event signed with the configured secret.
    pub async fn webhook(&self, payload: &Value) -> Result<TestResponse> {
        let body = serde_json::to_vec(payload)?;
        let timestamp = Utc::now().timestamp();
        let signature = self.signer.sign("msg_test", timestamp, &body)?;
        self.raw_webhook(body, "msg_test", &timestamp.to_string(), &signature).await
    }

    pub async fn raw_webhook(
        &self,
        body: Vec<u8>,
        id: &str,
        timestamp: &str,
        signature: &str,
    ) -> Result<TestResponse> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/webhooks/register")
            .header(header::CONTENT_TYPE, "application/json")
            .header(HEADER_ID, id)
            .header(HEADER_TIMESTAMP, timestamp)
            .header(HEADER_SIGNATURE, signature)
            .body(Body::from(body))?;
        self.send(request).await
    }

    /// Create a todo and return its id.
    pub async fn create_todo(&self, token: &str, title: &str) -> Result<String> {
        let res = self
            .post("/api/todos", Some(token), serde_json::json!({ "title": title }))
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {} {}", res.status, res.body);
        res.body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("created todo has no id: {}", res.body))
    }
}

pub fn user_created(user_id: &str, email: &str) -> Value {
    serde_json::json!({
        "type": "user.created",
        "data": {
            "id": user_id,
            "primary_email_address_id": "idn_primary",
            "email_addresses": [
                { "id": "idn_other", "email_address": "secondary@example.com" },
                { "id": "idn_primary", "email_address": email }
            ],
            "first_name": "Ada"
        }
    })
}
