use anyhow::Context;
use clap::Args;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};

use crate::auth::{Claims, SessionKeys};
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::required;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Principal id to put in the `sub` claim")]
    pub user: String,

    #[arg(long, help = "Role written to metadata.role (e.g. admin)")]
    pub role: Option<String>,

    #[arg(long, default_value_t = 60, help = "Lifetime in minutes")]
    pub ttl_mins: i64,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let secret = required("SESSION_SECRET")?;
    let keys = SessionKeys::new(secret.expose_secret().as_bytes(), 0)?;

    let claims = Claims::new(
        args.user.as_str(),
        args.role.as_deref(),
        chrono::Duration::minutes(args.ttl_mins),
    );
    let token = keys.issue(&claims).context("signing session token")?;

    let mut data = Map::new();
    data.insert("token".to_string(), Value::String(token));
    data.insert("expires_at".to_string(), Value::from(claims.exp));
    output_success(&output_format, &format!("Session token for {}", args.user), Some(data))
}
