//! Per-product stock quantities in a shared key-value store, with read,
//! overwrite, and oversell-safe conditional decrement.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod seed;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::metrics::MetricsStore;
use crate::service::InventoryService;

/// Shared application state — cheap to clone (all heap behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub inventory: InventoryService,
    pub metrics: Arc<MetricsStore>,
}

impl AppState {
    pub fn new(inventory: InventoryService, metrics_capacity: usize) -> Self {
        Self {
            inventory,
            metrics: Arc::new(MetricsStore::new(metrics_capacity)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Inventory ───────────────────────────────────────────────────────
        .route("/inventory", post(handlers::inventory::set_stock))
        .route("/inventory/decrease", post(handlers::inventory::decrease_stock))
        .route("/inventory/:product_id", get(handlers::inventory::get_stock))

        // ── Seed ────────────────────────────────────────────────────────────
        .route("/api/seed", post(handlers::seed::seed_data))

        // ── Stress test ─────────────────────────────────────────────────────
        .route("/api/stress-test", post(handlers::stress::run_stress_test))

        // ── Metrics ─────────────────────────────────────────────────────────
        .route("/api/metrics", axum::routing::delete(handlers::metrics::clear))
        .route("/api/metrics/report", get(handlers::metrics::report))
        .route("/api/metrics/export/csv", get(handlers::metrics::export_csv))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
