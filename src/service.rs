//! Stock operations over a [`StockStore`].
//!
//! Holds no quantities between calls. Every operation goes to the store, and
//! the decrement path is a single conditional store call, so correctness
//! under concurrent callers (in this process or others) rests on the store.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{AppError, AppResult};
use crate::models::{validate_amount, validate_product_id, DecreaseOutcome, StockRecord};
use crate::store::{Decrement, StockStore};

pub const DEFAULT_KEY_PREFIX: &str = "inventory:";

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn StockStore>,
    key_prefix: Arc<str>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn StockStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: Arc::from(key_prefix.into()),
        }
    }

    pub fn store(&self) -> &Arc<dyn StockStore> {
        &self.store
    }

    pub fn key(&self, product_id: &str) -> String {
        format!("{}{}", self.key_prefix, product_id)
    }

    #[instrument(skip(self), fields(backend = self.store.backend()))]
    pub async fn get_stock(&self, product_id: &str) -> AppResult<StockRecord> {
        validate_product_id(product_id)?;

        match self.store.get(&self.key(product_id)).await? {
            Some(quantity) => {
                debug!(quantity, "Read stock");
                Ok(StockRecord::new(product_id, quantity))
            }
            None => Err(not_found(product_id)),
        }
    }

    /// Idempotent overwrite. Validation runs before the store is touched.
    #[instrument(skip(self, record), fields(product_id = %record.product_id, quantity = record.quantity))]
    pub async fn set_stock(&self, record: StockRecord) -> AppResult<StockRecord> {
        record.validate()?;

        self.store
            .set(&self.key(&record.product_id), record.quantity)
            .await?;

        debug!("Stored stock");
        Ok(record)
    }

    #[instrument(skip(self), fields(backend = self.store.backend()))]
    pub async fn decrease_stock(&self, product_id: &str, amount: i64) -> AppResult<DecreaseOutcome> {
        validate_product_id(product_id)?;
        validate_amount(amount)?;

        match self
            .store
            .decrement_if_sufficient(&self.key(product_id), amount)
            .await?
        {
            Decrement::Applied { remaining } => {
                debug!(remaining, "Decreased stock");
                Ok(DecreaseOutcome {
                    product_id: product_id.to_string(),
                    remaining,
                })
            }
            Decrement::Insufficient { available } => {
                info!(available, "Insufficient stock");
                Err(AppError::InsufficientStock {
                    product_id: product_id.to_string(),
                    requested: amount,
                    available,
                })
            }
            Decrement::Absent => Err(not_found(product_id)),
        }
    }
}

fn not_found(product_id: &str) -> AppError {
    AppError::NotFound(format!("Product {} not found in inventory", product_id))
}
