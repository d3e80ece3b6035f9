//! Signed provisioning events from the identity provider.
//!
//! Events use the svix scheme: the signed content is
//! `"{svix-id}.{svix-timestamp}.{raw body}"`, MAC'd with HMAC-SHA256 under
//! the base64 key from `WEBHOOK_SECRET`, and sent as a space-separated list
//! of `v1,<base64 signature>` entries in `svix-signature`.

pub mod events;

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use crate::config::{decode_webhook_secret, ConfigError};

pub use events::{EmailAddress, ProvisioningEvent, UserCreatedData};

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

const SIGNATURE_VERSION: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    #[error("Invalid timestamp header")]
    InvalidTimestamp,

    #[error("Message timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("No matching signature found")]
    NoMatchingSignature,

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// The three signature headers of one delivery.
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

impl WebhookHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, WebhookError> {
        let get = |name: &'static str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(WebhookError::MissingHeader(name))
        };

        Ok(Self {
            id: get(HEADER_ID)?,
            timestamp: get(HEADER_TIMESTAMP)?,
            signature: get(HEADER_SIGNATURE)?,
        })
    }
}

/// Verifies (and, for local tooling, produces) event signatures.
pub struct WebhookVerifier {
    key: Vec<u8>,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("key", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: &SecretString, tolerance_secs: i64) -> Result<Self, ConfigError> {
        Ok(Self {
            key: decode_webhook_secret(secret)?,
            tolerance_secs,
        })
    }

    fn mac(&self, msg_id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Signature header value for a payload, e.g. for replaying events locally.
    pub fn sign(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
        let tag = self
            .mac(msg_id, &timestamp.to_string(), body)?
            .finalize()
            .into_bytes();
        Ok(format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(tag)))
    }

    /// Check the timestamp window and that at least one `v1` signature matches.
    pub fn verify(&self, headers: &WebhookHeaders, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let timestamp: i64 = headers
            .timestamp
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;

        // abs_diff: extreme timestamps must not overflow.
        if now.abs_diff(timestamp) > self.tolerance_secs.unsigned_abs() {
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let mac = self.mac(&headers.id, &headers.timestamp, body)?;

        for entry in headers.signature.split_whitespace() {
            let Some((version, encoded)) = entry.split_once(',') else {
                continue;
            };
            if version != SIGNATURE_VERSION {
                continue;
            }
            let Ok(candidate) = STANDARD.decode(encoded) else {
                continue;
            };
            // verify_slice compares in constant time
            if mac.clone().verify_slice(&candidate).is_ok() {
                debug!("Webhook {} signature verified", headers.id);
                return Ok(());
            }
        }

        Err(WebhookError::NoMatchingSignature)
    }
}
