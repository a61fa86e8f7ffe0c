use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    models::StockRecord,
    service::InventoryService,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct StressParams {
    /// Product to hammer; must start with `stress-` (default: a fresh `stress-<uuid>` id)
    pub product_id: Option<String>,
    /// Stock written before the run (default: 100)
    pub initial_stock: Option<i64>,
    /// Number of concurrent workers (default: 20)
    pub concurrency: Option<usize>,
    /// Decrement attempts per worker (default: 10)
    pub attempts_per_worker: Option<usize>,
    /// Each attempt asks for a random amount in 1..=max_amount (default: 5)
    pub max_amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StressReport {
    pub product_id: String,
    pub initial_stock: i64,
    pub concurrency: usize,
    pub attempts_per_worker: usize,
    pub total_attempts: usize,

    pub ok: u64,
    pub insufficient: u64,
    pub errors: u64,
    pub units_consumed: i64,
    pub final_stock: i64,
    /// `final == initial - consumed` and `final >= 0`. With store errors the
    /// affected decrements have unknown outcome, so only `final <= initial - consumed` is checked.
    pub conservation_holds: bool,

    pub total_elapsed_ms: f64,
    pub ops_per_second: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,

    pub ascii_summary: String,
}

const DRILL_PREFIX: &str = "stress-";

// ── POST /api/stress-test ────────────────────────────────────────────────────

pub async fn run_stress_test(
    State(state): State<AppState>,
    params: Result<Json<StressParams>, JsonRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(params) = params?;
    let report = run_drill(&state.inventory, params).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "report": report,
        })),
    ))
}

/// Races concurrent DecreaseStock calls against one product and checks
/// that the store never oversold.
pub async fn run_drill(service: &InventoryService, params: StressParams) -> AppResult<StressReport> {
    let concurrency = params.concurrency.unwrap_or(20).clamp(1, 200);
    let attempts_per_worker = params.attempts_per_worker.unwrap_or(10).clamp(1, 1_000);
    let max_amount = params.max_amount.unwrap_or(5);
    if max_amount < 1 {
        return Err(AppError::invalid("max_amount must be >= 1"));
    }
    let product_id = params
        .product_id
        .unwrap_or_else(|| format!("{}{}", DRILL_PREFIX, uuid::Uuid::new_v4()));
    // The drill overwrites its product, so it may never touch real stock.
    if !product_id.starts_with(DRILL_PREFIX) {
        return Err(AppError::invalid(format!(
            "product_id must start with \"{}\"",
            DRILL_PREFIX
        )));
    }

    let initial = service
        .set_stock(StockRecord::new(product_id.clone(), params.initial_stock.unwrap_or(100)))
        .await?;

    info!(
        product_id = %product_id,
        initial_stock = initial.quantity,
        concurrency,
        attempts_per_worker,
        "Starting stress test"
    );

    let ok = Arc::new(AtomicU64::new(0));
    let insufficient = Arc::new(AtomicU64::new(0));
    let errors = Arc::new(AtomicU64::new(0));
    let consumed = Arc::new(AtomicI64::new(0));

    let total_start = Instant::now();
    let mut join_set: JoinSet<Vec<f64>> = JoinSet::new();

    for _ in 0..concurrency {
        let service = service.clone();
        let product_id = product_id.clone();
        let ok_c = Arc::clone(&ok);
        let insufficient_c = Arc::clone(&insufficient);
        let errors_c = Arc::clone(&errors);
        let consumed_c = Arc::clone(&consumed);

        join_set.spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut latencies = Vec::with_capacity(attempts_per_worker);

            for _ in 0..attempts_per_worker {
                let amount = rng.gen_range(1..=max_amount);
                let op_start = Instant::now();

                match service.decrease_stock(&product_id, amount).await {
                    Ok(_) => {
                        ok_c.fetch_add(1, Ordering::Relaxed);
                        consumed_c.fetch_add(amount, Ordering::Relaxed);
                    }
                    Err(AppError::InsufficientStock { .. }) => {
                        insufficient_c.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!("Stress op error: {}", e);
                        errors_c.fetch_add(1, Ordering::Relaxed);
                    }
                }

                latencies.push(op_start.elapsed().as_secs_f64() * 1000.0);
            }
            latencies
        });
    }

    let mut all_lats = Vec::with_capacity(concurrency * attempts_per_worker);
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(lats) => all_lats.extend(lats),
            Err(e) => {
                warn!("Stress worker failed: {}", e);
                errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    let total_elapsed = total_start.elapsed();
    let final_stock = service.get_stock(&product_id).await?.quantity;

    let ok = ok.load(Ordering::Relaxed);
    let insufficient = insufficient.load(Ordering::Relaxed);
    let errors = errors.load(Ordering::Relaxed);
    let units_consumed = consumed.load(Ordering::Relaxed);

    let expected = initial.quantity - units_consumed;
    let conservation_holds = final_stock >= 0
        && if errors == 0 {
            final_stock == expected
        } else {
            final_stock <= expected
        };

    let latency = LatencySummary::from_samples(all_lats);
    let total_attempts = concurrency * attempts_per_worker;
    let elapsed_ms = total_elapsed.as_secs_f64() * 1000.0;
    let ops_per_second = total_attempts as f64 / total_elapsed.as_secs_f64().max(f64::EPSILON);

    let mut report = StressReport {
        product_id,
        initial_stock: initial.quantity,
        concurrency,
        attempts_per_worker,
        total_attempts,
        ok,
        insufficient,
        errors,
        units_consumed,
        final_stock,
        conservation_holds,
        total_elapsed_ms: elapsed_ms,
        ops_per_second,
        min_latency_ms: latency.min,
        max_latency_ms: latency.max,
        avg_latency_ms: latency.avg,
        p95_latency_ms: latency.p95,
        p99_latency_ms: latency.p99,
        ascii_summary: String::new(),
    };
    report.ascii_summary = build_stress_ascii(&report);

    if conservation_holds {
        info!(
            total_attempts,
            ok,
            insufficient,
            final_stock,
            ops_per_second = %format!("{:.1}", ops_per_second),
            p95_ms = %format!("{:.2}", latency.p95),
            "Stress test complete"
        );
    } else {
        warn!(
            initial_stock = initial.quantity,
            units_consumed,
            final_stock,
            errors,
            "Stress test finished with a conservation mismatch"
        );
    }

    Ok(report)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct LatencySummary {
    min: f64,
    max: f64,
    avg: f64,
    p95: f64,
    p99: f64,
}

impl LatencySummary {
    fn from_samples(mut samples: Vec<f64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_by(f64::total_cmp);
        let n = samples.len();
        let at = |p: f64| samples[((n as f64 * p) as usize).min(n - 1)];

        Self {
            min: samples[0],
            max: samples[n - 1],
            avg: samples.iter().sum::<f64>() / n as f64,
            p95: at(0.95),
            p99: at(0.99),
        }
    }
}

fn build_stress_ascii(r: &StressReport) -> String {
    let w = 62;
    let divider = "═".repeat(w);
    let thin = "─".repeat(w - 2);
    let mut s = String::new();

    s.push_str(&format!("╔{}╗\n", divider));
    s.push_str(&format!("║{:^width$}║\n", " STOCK CONTENTION REPORT ", width = w));
    s.push_str(&format!("╠{}╣\n", divider));
    s.push_str(&format!(
        "║  Workers : {:<6}  Attempts/worker : {:<6}  Total : {:<7}║\n",
        r.concurrency, r.attempts_per_worker, r.total_attempts
    ));
    s.push_str(&format!(
        "║  Elapsed : {:<10.1} ms    Throughput : {:<10.1} ops/s ║\n",
        r.total_elapsed_ms, r.ops_per_second
    ));
    s.push_str(&format!("╠{}╣\n", divider));
    s.push_str(&format!(
        "║  Ok : {:<8} Insufficient : {:<8} Errors : {:<11}║\n",
        r.ok, r.insufficient, r.errors
    ));
    s.push_str(&format!(
        "║  Initial : {:<8} Consumed : {:<8} Final : {:<12}║\n",
        r.initial_stock, r.units_consumed, r.final_stock
    ));
    s.push_str(&format!(
        "║  Conservation : {:<44}║\n",
        if r.conservation_holds { "holds" } else { "VIOLATED" }
    ));
    s.push_str(&format!("║ {} ║\n", thin));
    s.push_str(&format!("║  {:<20} {:<38}║\n", "Min latency (ms)", format!("{:.3}", r.min_latency_ms)));
    s.push_str(&format!("║  {:<20} {:<38}║\n", "Avg latency (ms)", format!("{:.3}", r.avg_latency_ms)));
    s.push_str(&format!("║  {:<20} {:<38}║\n", "P95 latency (ms)", format!("{:.3}", r.p95_latency_ms)));
    s.push_str(&format!("║  {:<20} {:<38}║\n", "P99 latency (ms)", format!("{:.3}", r.p99_latency_ms)));
    s.push_str(&format!("║  {:<20} {:<38}║\n", "Max latency (ms)", format!("{:.3}", r.max_latency_ms)));
    s.push_str(&format!("╚{}╝\n", divider));
    s
}
