use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};

/// One timed inventory operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String, // "get_stock" | "set_stock" | "decrease_stock"
    pub outcome: String,   // "ok" | AppError::code()
    pub duration_ns: u64,
    pub duration_us: f64,
    pub duration_ms: f64,
}

impl MetricEntry {
    pub fn new(operation: impl Into<String>, outcome: impl Into<String>, duration_ns: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.into(),
            outcome: outcome.into(),
            duration_ns,
            duration_us: duration_ns as f64 / 1_000.0,
            duration_ms: duration_ns as f64 / 1_000_000.0,
        }
    }
}

/// Keeps the newest `capacity` entries; older ones are dropped first.
///
/// Entries live in a ring of `capacity` slots spread over the shards of a
/// [`DashMap`], so concurrent requests only contend when they land on the
/// same shard. A slot only ever moves forward to a newer sequence number.
#[derive(Debug)]
pub struct MetricsStore {
    slots: DashMap<usize, (u64, MetricEntry)>,
    next_seq: AtomicU64,
    capacity: usize,
}

impl MetricsStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: DashMap::new(),
            next_seq: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn record(&self, entry: MetricEntry) {
        if self.capacity == 0 {
            return;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let slot = (seq % self.capacity as u64) as usize;

        match self.slots.entry(slot) {
            Entry::Occupied(mut held) => {
                if held.get().0 < seq {
                    held.insert((seq, entry));
                }
            }
            Entry::Vacant(free) => {
                free.insert((seq, entry));
            }
        }
    }

    pub fn record_raw(
        &self,
        operation: impl Into<String>,
        outcome: impl Into<String>,
        duration_ns: u64,
    ) {
        self.record(MetricEntry::new(operation, outcome, duration_ns));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every entry and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut cleared = 0;
        self.slots.retain(|_, _| {
            cleared += 1;
            false
        });
        cleared
    }

    /// Snapshot of the held entries, oldest first.
    pub fn entries(&self) -> Vec<MetricEntry> {
        let mut held: Vec<(u64, MetricEntry)> =
            self.slots.iter().map(|slot| slot.value().clone()).collect();
        held.sort_unstable_by_key(|(seq, _)| *seq);
        held.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Aggregate stats per (operation, outcome) pair.
    pub fn aggregated(&self) -> Vec<AggregatedMetric> {
        let entries = self.entries();
        let mut map: HashMap<(&str, &str), Vec<u64>> = HashMap::new();

        for e in &entries {
            map.entry((e.operation.as_str(), e.outcome.as_str()))
                .or_default()
                .push(e.duration_ns);
        }

        let mut out: Vec<AggregatedMetric> = map
            .into_iter()
            .map(|((op, outcome), mut durations)| {
                durations.sort_unstable();
                let count = durations.len();
                let total: u64 = durations.iter().sum();
                let avg = total / count as u64;
                let pct = |p: f64| durations[((count as f64 * p) as usize).min(count - 1)];
                let p95 = pct(0.95);

                AggregatedMetric {
                    operation: op.to_string(),
                    outcome: outcome.to_string(),
                    sample_count: count,
                    min_ns: durations[0],
                    max_ns: durations[count - 1],
                    avg_ns: avg,
                    p50_ns: durations[count / 2],
                    p95_ns: p95,
                    p99_ns: pct(0.99),
                    avg_ms: avg as f64 / 1_000_000.0,
                    p95_ms: p95 as f64 / 1_000_000.0,
                }
            })
            .collect();

        out.sort_by(|a, b| a.operation.cmp(&b.operation).then(a.outcome.cmp(&b.outcome)));
        out
    }

    /// Export all entries as a CSV string.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record([
            "timestamp",
            "operation",
            "outcome",
            "duration_ns",
            "duration_us",
            "duration_ms",
        ])?;

        for e in self.entries() {
            wtr.write_record([
                e.timestamp.to_rfc3339(),
                e.operation,
                e.outcome,
                e.duration_ns.to_string(),
                format!("{:.3}", e.duration_us),
                format!("{:.6}", e.duration_ms),
            ])?;
        }

        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }

    pub fn ascii_table(&self) -> String {
        let agg = self.aggregated();
        if agg.is_empty() {
            return "No metrics collected yet.".to_string();
        }

        let mut out = String::new();
        out.push_str(&format!(
            "\n{:<16} {:<20} {:>10} {:>12} {:>12} {:>12} {:>12}\n",
            "Operation", "Outcome", "Samples", "Avg (µs)", "P50 (µs)", "P95 (µs)", "P99 (µs)"
        ));
        out.push_str(&"-".repeat(98));
        out.push('\n');

        for row in &agg {
            out.push_str(&format!(
                "{:<16} {:<20} {:>10} {:>12.2} {:>12.2} {:>12.2} {:>12.2}\n",
                row.operation,
                row.outcome,
                row.sample_count,
                row.avg_ns as f64 / 1_000.0,
                row.p50_ns as f64 / 1_000.0,
                row.p95_ns as f64 / 1_000.0,
                row.p99_ns as f64 / 1_000.0,
            ));
        }

        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub operation: String,
    pub outcome: String,
    pub sample_count: usize,
    pub min_ns: u64,
    pub max_ns: u64,
    pub avg_ns: u64,
    pub p50_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub avg_ms: f64,
    pub p95_ms: f64,
}
