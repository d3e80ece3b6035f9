use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Claims carried by a provider-issued session token.
///
/// `metadata` is the provider's public metadata blob; the role lives at
/// `metadata.role`. It is kept as raw JSON so a malformed blob is detected
/// when the role is resolved rather than failing token validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: Option<&str>, ttl: Duration) -> Self {
        let now = Utc::now();
        let metadata = match role {
            Some(role) => serde_json::json!({ "role": role }),
            None => Value::Null,
        };

        Self {
            sub: sub.into(),
            sid: None,
            metadata,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Resolve the caller's role from `metadata.role`.
    ///
    /// Missing metadata or a missing role means an ordinary member; any
    /// string other than `"admin"` is also a member. A role (or metadata)
    /// of the wrong JSON type is an error so the gate can fail closed.
    pub fn role(&self) -> Result<Role, SessionError> {
        let role = match &self.metadata {
            Value::Null => return Ok(Role::Member),
            Value::Object(map) => map.get("role"),
            other => {
                return Err(SessionError::MalformedClaims(format!(
                    "metadata must be an object, got {}",
                    json_type(other)
                )))
            }
        };

        match role {
            None | Some(Value::Null) => Ok(Role::Member),
            Some(Value::String(s)) if s == "admin" => Ok(Role::Admin),
            Some(Value::String(_)) => Ok(Role::Member),
            Some(other) => Err(SessionError::MalformedClaims(format!(
                "metadata.role must be a string, got {}",
                json_type(other)
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session secret not configured")]
    InvalidSecret,

    #[error("Session token generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Malformed session claims: {0}")]
    MalformedClaims(String),
}

/// HS256 keys for issuing and verifying session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn new(secret: &[u8], leeway_secs: u64) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::InvalidSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, SessionError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))
    }
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub session_id: Option<String>,
    claims: Claims,
}

impl Principal {
    pub fn role(&self) -> Result<Role, SessionError> {
        self.claims.role()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            session_id: claims.sid.clone(),
            claims,
        }
    }
}

/// Resolved once per request by the identity middleware and stored as a
/// request extension.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(Principal),
}

impl Identity {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Identity::Authenticated(p) => Some(p),
            Identity::Anonymous => None,
        }
    }
}
