use anyhow::Context;
use secrecy::SecretString;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::{required, DatabaseConfig, StoreBackend};
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let url: SecretString = required("DATABASE_URL")?;

    let config = DatabaseConfig {
        backend: StoreBackend::Postgres,
        url: Some(url),
        max_connections: 1,
        connection_timeout: 10,
        run_migrations: true,
    };

    let manager = DatabaseManager::connect(&config)
        .await
        .context("connecting to DATABASE_URL")?;
    let result = manager.migrate().await;
    manager.close().await;
    result.context("applying migrations")?;

    output_success(&output_format, "Migrations applied", None)
}
