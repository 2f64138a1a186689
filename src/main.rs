//! Rupture Explorer - search NSHM rupture scenarios by fault expression

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rupture_explorer::config::Config;
use rupture_explorer::db::Database;
use rupture_explorer::routes;
use rupture_explorer::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::parse();

    let db = match config.connection_string() {
        Some(url) => Database::new(url, config.max_connections).await,
        None => Database::open(&config.nshmdb_path, config.max_connections).await,
    }
    .with_context(|| format!("Failed to open {}", config.nshmdb_path.display()))?;
    db.ping().await.context("Rupture database is not readable")?;

    let state = AppState::new(db, config.result_limit, config.cache_capacity)
        .context("Failed to load templates")?;
    let app = routes::router(state, &config.static_dir);

    info!(
        "Rupture Explorer v{} starting on {}",
        env!("CARGO_PKG_VERSION"),
        config.listen_addr
    );
    info!("Database: {}", config.nshmdb_path.display());
    info!("Result limit: {}", config.result_limit);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Rupture Explorer stopped");
    Ok(())
}

/// Plain text logs by default, JSON lines when LOG_FORMAT=json
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rupture_explorer=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
