use std::future::Future;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, RedisError, Script};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::MAX_QUANTITY;

use super::{parse_quantity, Decrement, StockStore, StoreError, StoreResult};

/// GET, compare, DECRBY as one server-side step.
/// Replies `{status, value}`: 0 applied (value = remaining), 1 insufficient
/// (value = current), 2 absent, 3 stored value is not an integer in
/// `0..=2^53-1`. DECRBY gets `ARGV[1]` verbatim, never a Lua number.
const DECREMENT_IF_SUFFICIENT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return {2, 0}
end
if not string.match(raw, '^%d+$') or string.len(raw) > 16 then
  return {3, 0}
end
local current = tonumber(raw)
if current > 9007199254740991 then
  return {3, 0}
end
local amount = tonumber(ARGV[1])
if current < amount then
  return {1, current}
end
return {0, redis.call('DECRBY', KEYS[1], ARGV[1])}
"#;

const STATUS_APPLIED: i64 = 0;
const STATUS_INSUFFICIENT: i64 = 1;
const STATUS_ABSENT: i64 = 2;
const STATUS_MALFORMED: i64 = 3;

/// Redis backend. The `ConnectionManager` multiplexes concurrent calls over a
/// single connection and reconnects on failure; clones share it.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    decrement: Script,
    timeout: Duration,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = ::redis::Client::open(redis_url).map_err(map_redis_error)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(timeout.as_millis() as u64))?
            .map_err(map_redis_error)?;

        info!(timeout_ms = timeout.as_millis() as u64, "Redis connection manager ready");

        Ok(Self {
            conn,
            decrement: Script::new(DECREMENT_IF_SUFFICIENT),
            timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "Redis call failed");
                Err(map_redis_error(e))
            }
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Redis call timed out");
                Err(StoreError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }
}

#[async_trait]
impl StockStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = self.bounded("get", conn.get(key)).await?;
        raw.map(|raw| parse_quantity(key, &raw)).transpose()
    }

    async fn set(&self, key: &str, quantity: i64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        self.bounded("set", conn.set::<_, _, ()>(key, quantity)).await
    }

    async fn decrement_if_sufficient(&self, key: &str, amount: i64) -> StoreResult<Decrement> {
        if !(1..=MAX_QUANTITY).contains(&amount) {
            return Err(StoreError::Command(format!(
                "decrement amount {amount} outside 1..={MAX_QUANTITY}"
            )));
        }
        let mut conn = self.conn.clone();
        let mut invocation = self.decrement.key(key);
        invocation.arg(amount);
        let reply: Vec<i64> = self
            .bounded("decrement_if_sufficient", invocation.invoke_async(&mut conn))
            .await?;

        debug!(key, amount, ?reply, "Decrement script replied");

        match reply.as_slice() {
            [STATUS_APPLIED, remaining] => Ok(Decrement::Applied {
                remaining: *remaining,
            }),
            [STATUS_INSUFFICIENT, available] => Ok(Decrement::Insufficient {
                available: *available,
            }),
            [STATUS_ABSENT, _] => Ok(Decrement::Absent),
            [STATUS_MALFORMED, _] => Err(StoreError::Malformed {
                key: key.to_string(),
            }),
            other => Err(StoreError::Command(format!(
                "unexpected decrement reply {other:?}"
            ))),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let pong: String = self
            .bounded("ping", ::redis::cmd("PING").query_async(&mut conn))
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Command(format!("unexpected PING reply {pong:?}")))
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_timeout() || e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}
