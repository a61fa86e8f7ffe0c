use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Decrement, StockStore, StoreError, StoreResult};

/// In-process backend for local runs and tests.
///
/// `decrement_if_sufficient` holds the shard write guard returned by
/// `get_mut` across the compare and the subtract, which makes it atomic per
/// key. Only meaningful inside one process; multi-instance deployments use
/// [`super::RedisStore`].
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, i64>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while `false`, every call fails with
    /// `StoreError::Connection` and nothing is read or written.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Connection("memory store marked unavailable".to_string()))
        }
    }
}

#[async_trait]
impl StockStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        self.check_available()?;
        Ok(self.entries.get(key).map(|entry| *entry.value()))
    }

    async fn set(&self, key: &str, quantity: i64) -> StoreResult<()> {
        self.check_available()?;
        self.entries.insert(key.to_string(), quantity);
        Ok(())
    }

    async fn decrement_if_sufficient(&self, key: &str, amount: i64) -> StoreResult<Decrement> {
        self.check_available()?;
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(Decrement::Absent);
        };
        let current = *entry;
        if current < amount {
            return Ok(Decrement::Insufficient { available: current });
        }
        *entry = current - amount;
        Ok(Decrement::Applied {
            remaining: *entry,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
