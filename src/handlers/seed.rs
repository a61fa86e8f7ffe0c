use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{error::AppResult, seed, AppState};

#[derive(Debug, Deserialize)]
pub struct SeedParams {
    /// Number of records to seed (default: 1000, max: 50 000)
    pub count: Option<usize>,
}

// ── POST /api/seed ────────────────────────────────────────────────────────────

pub async fn seed_data(
    State(state): State<AppState>,
    Query(params): Query<SeedParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let count = params.count.unwrap_or(1_000);

    let start = Instant::now();
    let records = seed::seed_stock(&state.inventory, count).await?;
    let elapsed = start.elapsed();

    let total_units: i64 = records.iter().map(|r| r.quantity).sum();
    let sample: Vec<_> = records.iter().take(5).collect();

    info!(
        seeded = records.len(),
        total_units,
        seed_ms = elapsed.as_millis(),
        "Seeding complete"
    );

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "seeded": records.len(),
            "total_units": total_units,
            "sample": sample,
            "seed_time_ms": elapsed.as_secs_f64() * 1000.0,
        })),
    ))
}
