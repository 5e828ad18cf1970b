//! Business logic services for the Woodflow production engine

pub mod allocator;
pub mod bom;
pub mod inventory;
pub mod item;
pub mod ledger;
pub mod lot_store;
pub mod production;
pub mod progress;
pub mod resolver;
pub mod stage;
pub mod warehouse;

pub use allocator::Allocator;
pub use bom::BomService;
pub use inventory::InventoryService;
pub use item::ItemRepository;
pub use ledger::LedgerService;
pub use lot_store::LotStore;
pub use production::ProductionService;
pub use progress::ProgressTracker;
pub use resolver::ResolverService;
pub use stage::StageService;
pub use warehouse::WarehouseDirectory;

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::AppResult;

/// Open a transaction whose lock waits give up after `lock_timeout_ms`
pub(crate) async fn begin_locked(db: &PgPool, lock_timeout_ms: u64) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = db.begin().await?;
    sqlx::query(&format!("SET LOCAL lock_timeout = {}", lock_timeout_ms))
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
