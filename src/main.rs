use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use todo_api_rust::config::{AppConfig, StoreBackend};
use todo_api_rust::database::{DatabaseManager, MemoryStore, PgTodoStore, TodoStore};
use todo_api_rust::{app, cors_layer, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SESSION_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,todo_api_rust=debug")),
        )
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;
    info!("Starting todo API in {:?} mode", config.environment);

    let (store, manager): (Arc<dyn TodoStore>, Option<DatabaseManager>) = match config.database.backend {
        StoreBackend::Postgres => {
            let manager = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                manager.migrate().await?;
            }
            let store: Arc<dyn TodoStore> = Arc::new(PgTodoStore::new(manager.pool().clone()));
            (store, Some(manager))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on exit");
            let store: Arc<dyn TodoStore> = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    let state = AppState::from_config(&config, store)?;
    let router = app(state).layer(cors_layer(&config.security.cors_origins));

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Todo API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(manager) = manager {
        manager.close().await;
    }
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
