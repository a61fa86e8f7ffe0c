use std::time::Duration;

use anyhow::{bail, Context};

use crate::service::DEFAULT_KEY_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    /// Required when `backend` is `Redis`.
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub key_prefix: String,
    pub store_timeout: Duration,
    pub metrics_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("redis") => StoreBackend::Redis,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be `redis` or `memory`, got `{}`", other),
        };

        let redis_url = lookup("REDIS_URL");
        if backend == StoreBackend::Redis && redis_url.is_none() {
            bail!("REDIS_URL must be set when STORE_BACKEND=redis");
        }

        let store_timeout_ms: u64 = lookup("STORE_TIMEOUT_MS")
            .unwrap_or_else(|| "2000".to_string())
            .parse()
            .context("STORE_TIMEOUT_MS must be a valid number")?;
        if store_timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be > 0");
        }

        Ok(Self {
            backend,
            redis_url,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            key_prefix: lookup("INVENTORY_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            store_timeout: Duration::from_millis(store_timeout_ms),
            metrics_capacity: lookup("METRICS_CAPACITY")
                .unwrap_or_else(|| "10000".to_string())
                .parse()
                .context("METRICS_CAPACITY must be a valid number")?,
        })
    }
}
