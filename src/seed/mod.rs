use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::AppResult;
use crate::models::StockRecord;
use crate::service::InventoryService;

pub const MAX_SEED_COUNT: usize = 50_000;
const MAX_SEED_QUANTITY: i64 = 500;

fn sku(serial: usize) -> String {
    format!("SKU-{:05}", serial)
}

/// Writes `count` records (`SKU-00000` upwards) with random quantities in
/// `0..=500`. Existing records with the same ids are overwritten.
pub async fn seed_stock(service: &InventoryService, count: usize) -> AppResult<Vec<StockRecord>> {
    let count = count.min(MAX_SEED_COUNT);
    info!("Seeding {} stock records...", count);

    // StdRng is Send, unlike ThreadRng, so it can live across awaits
    let mut rng = StdRng::from_entropy();
    let mut seeded = Vec::with_capacity(count);

    for serial in 0..count {
        let record = StockRecord::new(sku(serial), rng.gen_range(0..=MAX_SEED_QUANTITY));
        seeded.push(service.set_stock(record).await?);

        if (serial + 1) % 1_000 == 0 {
            info!("  Seeded {} records so far", serial + 1);
        }
    }

    info!("Seeding complete. Total: {} records", seeded.len());
    Ok(seeded)
}
