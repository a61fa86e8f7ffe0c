use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::{error::AppResult, AppState};

// ── GET /api/metrics/report ───────────────────────────────────────────────────

pub async fn report(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let metrics = &state.metrics;

    (
        StatusCode::OK,
        Json(json!({
            "sample_count": metrics.len(),
            "aggregated": metrics.aggregated(),
            "ascii_table": metrics.ascii_table(),
        })),
    )
}

// ── GET /api/metrics/export/csv ───────────────────────────────────────────────

pub async fn export_csv(State(state): State<AppState>) -> AppResult<Response> {
    let csv = state.metrics.to_csv()?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"stock_metrics.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

// ── DELETE /api/metrics ───────────────────────────────────────────────────────

pub async fn clear(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let cleared = state.metrics.clear();

    info!(cleared, "Metrics cleared");

    (StatusCode::OK, Json(json!({ "cleared": cleared })))
}
