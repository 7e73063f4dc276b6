use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use wallet_ingest::api::{self, AppState};
use wallet_ingest::config::Config;
use wallet_ingest::db::repository::PgWalletStore;
use wallet_ingest::ingest::IngestionService;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for orchestrator detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("Wallet ingest service starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        providers = ?config.ingestion.provider_priority_order,
        timeout_ms = config.ingestion.per_provider_timeout_ms,
        "Configuration loaded from {}",
        config_path
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");

    let store = Arc::new(PgWalletStore::new(pool.clone()));
    let service = IngestionService::from_config(&config, store)?;
    let state = Arc::new(AppState { pool, service });

    let shutdown = CancellationToken::new();
    let mut server = {
        let shutdown = shutdown.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move { api::serve(state, &host, port, shutdown).await })
    };

    let finished_early = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received, draining requests...");
            shutdown.cancel();
            None
        }
        joined = &mut server => Some(joined),
    };

    let joined = match finished_early {
        Some(joined) => joined,
        None => server.await,
    };

    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "API server failed"),
        Err(e) => tracing::error!(error = %e, "API server task panicked"),
    }

    tracing::info!("Wallet ingest service stopped");
    Ok(())
}
