use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use thiserror::Error;

/// Errors raised while loading configuration. All of them are startup-fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub webhook: WebhookConfig,
    pub quota: QuotaConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: SecretString,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub secret: SecretString,
    pub tolerance_secs: i64,
}

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub free_todos: u32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let session_secret = required("SESSION_SECRET")?;
        let webhook_secret = required("WEBHOOK_SECRET")?;

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(session_secret, webhook_secret),
            Environment::Staging => Self::staging(session_secret, webhook_secret),
            Environment::Development => Self::development(session_secret, webhook_secret),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(port) = env::var("TODO_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            self.database.backend = match v.to_ascii_lowercase().as_str() {
                "postgres" | "pg" => StoreBackend::Postgres,
                "memory" | "mem" => StoreBackend::Memory,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "STORE_BACKEND",
                        reason: format!("unknown backend '{}'", other),
                    })
                }
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(SecretString::from(v));
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Session and webhook overrides
        if let Ok(v) = env::var("SESSION_LEEWAY_SECS") {
            self.session.leeway_secs = v.parse().unwrap_or(self.session.leeway_secs);
        }
        if let Ok(v) = env::var("WEBHOOK_TOLERANCE_SECS") {
            self.webhook.tolerance_secs = v.parse().unwrap_or(self.webhook.tolerance_secs);
        }

        if let Ok(v) = env::var("QUOTA_FREE_TODOS") {
            self.quota.free_todos = v.parse().unwrap_or(self.quota.free_todos);
        }

        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(self)
    }

    /// Checks the invariants that cannot be expressed by the presets alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret.expose_secret().is_empty() {
            return Err(ConfigError::Missing("SESSION_SECRET"));
        }

        // The key must decode now rather than on the first provisioning event.
        decode_webhook_secret(&self.webhook.secret)?;

        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(())
    }

    pub fn development(session_secret: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            session: SessionConfig {
                secret: session_secret,
                leeway_secs: 60,
            },
            webhook: WebhookConfig {
                secret: webhook_secret,
                tolerance_secs: 300,
            },
            quota: QuotaConfig { free_todos: 3 },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging(session_secret: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            session: SessionConfig {
                secret: session_secret,
                leeway_secs: 30,
            },
            webhook: WebhookConfig {
                secret: webhook_secret,
                tolerance_secs: 300,
            },
            quota: QuotaConfig { free_todos: 3 },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production(session_secret: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            session: SessionConfig {
                secret: session_secret,
                leeway_secs: 5,
            },
            webhook: WebhookConfig {
                secret: webhook_secret,
                tolerance_secs: 300,
            },
            quota: QuotaConfig { free_todos: 3 },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment, Environment::Development)
    }
}

/// A non-blank secret from the environment.
pub fn required(name: &'static str) -> Result<SecretString, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(SecretString::from(v)),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Decodes a signed-webhook secret. The `whsec_` prefix is optional.
pub fn decode_webhook_secret(secret: &SecretString) -> Result<Vec<u8>, ConfigError> {
    let raw = secret.expose_secret();
    let encoded = raw.strip_prefix("whsec_").unwrap_or(raw);

    let key = STANDARD.decode(encoded.trim()).map_err(|e| ConfigError::Invalid {
        name: "WEBHOOK_SECRET",
        reason: format!("not valid base64: {}", e),
    })?;

    if key.is_empty() {
        return Err(ConfigError::Invalid {
            name: "WEBHOOK_SECRET",
            reason: "decoded key is empty".to_string(),
        });
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> (SecretString, SecretString) {
        (
            SecretString::from("session-secret".to_string()),
            SecretString::from("whsec_dGVzdC13ZWJob29rLWtleQ==".to_string()),
        )
    }

    #[test]
    fn test_default_development_config() {
        let (session, webhook) = secrets();
        let config = AppConfig::development(session, webhook);
        assert_eq!(config.quota.free_todos, 3);
        assert_eq!(config.server.port, 3000);
        assert!(config.database.run_migrations);
    }

    #[test]
    fn test_default_production_config() {
        let (session, webhook) = secrets();
        let config = AppConfig::production(session, webhook);
        assert_eq!(config.database.max_connections, 50);
        assert!(!config.database.run_migrations);
        assert!(!config.is_development());
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let (session, webhook) = secrets();
        let config = AppConfig::development(session, webhook);
        assert!(matches!(config.validate(), Err(ConfigError::Missing("DATABASE_URL"))));

        let mut config = config;
        config.database.backend = StoreBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn webhook_secret_prefix_is_optional() {
        let with_prefix = SecretString::from("whsec_dGVzdA==".to_string());
        let without_prefix = SecretString::from("dGVzdA==".to_string());
        assert_eq!(decode_webhook_secret(&with_prefix).unwrap(), b"test");
        assert_eq!(decode_webhook_secret(&without_prefix).unwrap(), b"test");
    }

    #[test]
    fn undecodable_webhook_secret_is_fatal() {
        let (session, _) = secrets();
        let mut config = AppConfig::development(session, SecretString::from("whsec_***".to_string()));
        config.database.backend = StoreBackend::Memory;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "WEBHOOK_SECRET", .. })
        ));
    }
}
