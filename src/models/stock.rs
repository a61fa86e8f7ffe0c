use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Largest quantity or amount accepted (2^53 - 1). Redis scripts see integers
/// as Lua doubles, which are exact only up to this bound.
pub const MAX_QUANTITY: i64 = 9_007_199_254_740_991;

/// Stock held for one product. `quantity` is never negative in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub product_id: String,
    pub quantity: i64,
}

impl StockRecord {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Checks a record before it is written.
    pub fn validate(&self) -> AppResult<()> {
        validate_product_id(&self.product_id)?;
        if self.quantity < 0 {
            return Err(AppError::invalid(format!(
                "quantity must be >= 0, got {}",
                self.quantity
            )));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(AppError::invalid(format!(
                "quantity must be <= {}, got {}",
                MAX_QUANTITY, self.quantity
            )));
        }
        Ok(())
    }
}

pub fn validate_product_id(product_id: &str) -> AppResult<()> {
    if product_id.trim().is_empty() {
        return Err(AppError::invalid("productId must not be empty"));
    }
    Ok(())
}

pub fn validate_amount(amount: i64) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::invalid(format!("quantity must be > 0, got {}", amount)));
    }
    if amount > MAX_QUANTITY {
        return Err(AppError::invalid(format!(
            "quantity must be <= {}, got {}",
            MAX_QUANTITY, amount
        )));
    }
    Ok(())
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// `quantity` is the amount to subtract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecreaseStock {
    pub product_id: String,
    pub quantity: i64,
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecreaseOutcome {
    pub product_id: String,
    pub remaining: i64,
}
