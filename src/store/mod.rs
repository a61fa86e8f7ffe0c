//! Key-value access to stock quantities.
//!
//! The service never reads and then writes a quantity on the decrement path.
//! Backends expose [`StockStore::decrement_if_sufficient`] as one indivisible
//! step on the store side, so concurrent callers (including other service
//! instances sharing the same Redis) are serialized per key by the store.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::MAX_QUANTITY;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure talking to the backing store. The outcome of a mutation that
/// fails this way is unknown to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store command error: {0}")]
    Command(String),

    #[error("store call timed out after {0} ms")]
    Timeout(u64),

    #[error("value stored under {key} is not an integer")]
    Malformed { key: String },
}

/// Result of a conditional decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The amount was subtracted; `remaining` is the stored value afterwards.
    Applied { remaining: i64 },
    /// Stock was below the requested amount. Nothing was written.
    Insufficient { available: i64 },
    /// No value is stored under the key.
    Absent,
}

#[async_trait]
pub trait StockStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<i64>>;

    /// Unconditional overwrite.
    async fn set(&self, key: &str, quantity: i64) -> StoreResult<()>;

    /// Atomically: absent -> `Absent`; `current < amount` -> `Insufficient`
    /// without mutation; otherwise subtract and return the new value.
    async fn decrement_if_sufficient(&self, key: &str, amount: i64) -> StoreResult<Decrement>;

    async fn ping(&self) -> StoreResult<()>;

    fn backend(&self) -> &'static str;
}

/// Accepts exactly what the decrement script accepts: at most 16 ASCII
/// digits, at most `MAX_QUANTITY`. Anything else is `Malformed` on every read path.
pub(crate) fn parse_quantity(key: &str, raw: &str) -> StoreResult<i64> {
    let malformed = || StoreError::Malformed {
        key: key.to_string(),
    };
    if raw.is_empty() || raw.len() > 16 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    match raw.parse::<i64>() {
        Ok(quantity) if quantity <= MAX_QUANTITY => Ok(quantity),
        _ => Err(malformed()),
    }
}
