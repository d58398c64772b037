//! Email Routing Manager server
//!
//! ```bash
//! MAX_CONFIGS=4 DATABASE_PATH=email-routing.db email-routing-manager
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use email_routing_manager::config::LogFormat;
use email_routing_manager::{build_router, AppState, CloudflareClient, ServerConfig, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = ServerConfig::parse();
    init_tracing(cfg.log_format)?;

    info!("Starting Email Routing Manager");

    let store = Store::open(&cfg.database_path).with_context(|| {
        format!("Failed to open database at {}", cfg.database_path.display())
    })?;
    info!("Database ready at {}", cfg.database_path.display());

    let cloudflare =
        CloudflareClient::new(&cfg.cloudflare_api_base).context("Failed to create HTTP client")?;

    let state = AppState {
        store,
        cloudflare: Arc::new(cloudflare),
        max_configs: cfg.max_configs,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr))?;
    info!(
        "Listening on {} (max configurations: {})",
        cfg.listen_addr, cfg.max_configs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
