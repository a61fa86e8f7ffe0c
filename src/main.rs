use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stock_service::config::{Config, StoreBackend};
use stock_service::service::InventoryService;
use stock_service::store::{MemoryStore, RedisStore, StockStore};
use stock_service::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,stock_service=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Stock Service  — Rust + Axum        ║");
    info!("║  get · set · conditional decrement   ║");
    info!("╚══════════════════════════════════════╝");

    let store: Arc<dyn StockStore> = match config.backend {
        StoreBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL must be set")?;
            info!("Connecting to Redis...");
            let store = RedisStore::connect(url, config.store_timeout).await?;
            store.ping().await?;
            info!("Redis connection established.");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("Using in-process memory store (single instance only).");
            Arc::new(MemoryStore::new())
        }
    };

    let inventory = InventoryService::new(store, config.key_prefix.clone());
    let state = AppState::new(inventory, config.metrics_capacity);
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!(key_prefix = %config.key_prefix, "Listening on http://{}", addr);
    info!("Quick-start: POST http://{}/api/seed?count=100  →  then POST http://{}/api/stress-test", addr, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped; releasing store connection.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
