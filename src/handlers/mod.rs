pub mod inventory;
pub mod metrics;
pub mod seed;
pub mod stress;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Liveness plus a store round trip; 503 when the store cannot be reached.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let store = state.inventory.store();
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "service": "stock-service", "store": store.backend() })),
        ),
        Err(e) => {
            warn!(error = %e, "Health check: store ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": "stock-service",
                    "store": store.backend(),
                    "error": e.to_string(),
                })),
            )
        }
    }
}
