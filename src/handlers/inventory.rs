use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::{
    error::AppResult,
    models::{DecreaseStock, StockRecord},
    AppState,
};

fn observe<T>(state: &AppState, operation: &'static str, result: &AppResult<T>, elapsed: Duration) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    };
    state
        .metrics
        .record_raw(operation, outcome, elapsed.as_nanos() as u64);
}

// ── GET /inventory/:product_id ────────────────────────────────────────────────

pub async fn get_stock(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let start = Instant::now();
    let result = state.inventory.get_stock(&product_id).await;
    let elapsed = start.elapsed();
    observe(&state, "get_stock", &result, elapsed);

    let record = result?;
    info!(product_id = %record.product_id, quantity = record.quantity, "Fetched stock");

    Ok((
        StatusCode::OK,
        Json(json!({
            "data": record,
            "store_time_ms": elapsed.as_secs_f64() * 1000.0,
        })),
    ))
}

// ── POST /inventory ───────────────────────────────────────────────────────────

pub async fn set_stock(
    State(state): State<AppState>,
    payload: Result<Json<StockRecord>, JsonRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(payload) = payload?;
    let start = Instant::now();
    let result = state.inventory.set_stock(payload).await;
    let elapsed = start.elapsed();
    observe(&state, "set_stock", &result, elapsed);

    let record = result?;
    info!(product_id = %record.product_id, quantity = record.quantity, "Set stock");

    Ok((
        StatusCode::OK,
        Json(json!({
            "data": record,
            "store_time_ms": elapsed.as_secs_f64() * 1000.0,
        })),
    ))
}

// ── POST /inventory/decrease ──────────────────────────────────────────────────

pub async fn decrease_stock(
    State(state): State<AppState>,
    payload: Result<Json<DecreaseStock>, JsonRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(payload) = payload?;
    let start = Instant::now();
    let result = state
        .inventory
        .decrease_stock(&payload.product_id, payload.quantity)
        .await;
    let elapsed = start.elapsed();
    observe(&state, "decrease_stock", &result, elapsed);

    let outcome = result?;
    info!(
        product_id = %outcome.product_id,
        amount = payload.quantity,
        remaining = outcome.remaining,
        "Decreased stock"
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "data": outcome,
            "store_time_ms": elapsed.as_secs_f64() * 1000.0,
        })),
    ))
}
