use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::required;
use crate::webhooks::{WebhookVerifier, HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};

#[derive(Debug, Args)]
pub struct SignWebhookArgs {
    #[arg(long, help = "JSON payload to sign, byte for byte as it will be sent")]
    pub file: PathBuf,

    #[arg(long, help = "Message id (random msg_<uuid> if omitted)")]
    pub id: Option<String>,
}

pub fn handle(args: SignWebhookArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let secret = required("WEBHOOK_SECRET")?;
    let verifier = WebhookVerifier::new(&secret, 0)?;

    let body = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let msg_id = args
        .id
        .unwrap_or_else(|| format!("msg_{}", Uuid::new_v4().simple()));
    let timestamp = Utc::now().timestamp();
    let signature = verifier.sign(&msg_id, timestamp, &body)?;

    let mut data = Map::new();
    data.insert(HEADER_ID.to_string(), Value::String(msg_id));
    data.insert(HEADER_TIMESTAMP.to_string(), Value::String(timestamp.to_string()));
    data.insert(HEADER_SIGNATURE.to_string(), Value::String(signature));
    output_success(&output_format, &format!("Signed {}", args.file.display()), Some(data))
}
