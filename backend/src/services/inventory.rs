//! Inventory queries and manual stock adjustments

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::engine::SourceUsage;
use shared::models::{Direction, LedgerEntry, Lot, LotKey, TransactionType, WarehouseCode};
use shared::types::{PaginatedResponse, Pagination};
use shared::validation::{validate_adjustment, validate_document_number, validate_warehouse_code};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::allocator::Allocator;
use super::item::ItemRepository;
use super::ledger::{LedgerFilter, LedgerService, NewLedgerEntry, Reference};
use super::lot_store::{LotFilter, LotStore};
use super::warehouse::WarehouseDirectory;
use crate::error::{AppError, AppResult};

/// Lot listing query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotQuery {
    pub warehouse_code: Option<String>,
    pub item_id: Option<Uuid>,
    pub production_order_id: Option<Uuid>,
    #[serde(default)]
    pub include_empty: bool,
}

/// Ledger listing query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerQuery {
    pub production_order_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub warehouse_code: Option<String>,
}

/// Signed manual correction of one item in one warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustmentInput {
    pub item_id: Uuid,
    pub warehouse_code: String,
    /// Positive adds stock, negative removes it
    pub quantity: Decimal,
    /// Lot to take a negative adjustment from; untagged lots oldest first
    /// when absent
    pub lot_id: Option<Uuid>,
    pub reference_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Outcome of an adjustment
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentResult {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub sources: Vec<SourceUsage>,
}

/// Inventory service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    warehouses: Arc<WarehouseDirectory>,
    lock_timeout_ms: u64,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool, warehouses: Arc<WarehouseDirectory>, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            warehouses,
            lock_timeout_ms,
        }
    }

    fn warehouse_id(&self, code: Option<&str>) -> AppResult<Option<Uuid>> {
        code.map(|code| {
            let code = Self::parse_code(code)?;
            self.warehouses.id(code)
        })
        .transpose()
    }

    fn parse_code(code: &str) -> AppResult<WarehouseCode> {
        validate_warehouse_code(code)
            .map_err(|msg| AppError::validation("warehouse_code", msg, "Kode gudang tidak dikenal"))
    }

    pub async fn lots(&self, query: LotQuery, pagination: Pagination) -> AppResult<PaginatedResponse<Lot>> {
        let filter = LotFilter {
            warehouse_id: self.warehouse_id(query.warehouse_code.as_deref())?,
            item_id: query.item_id,
            production_order_id: query.production_order_id,
            include_empty: query.include_empty,
        };
        LotStore::new(self.db.clone()).list(&filter, &pagination).await
    }

    pub async fn ledger(
        &self,
        query: LedgerQuery,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<LedgerEntry>> {
        let filter = LedgerFilter {
            production_order_id: query.production_order_id,
            item_id: query.item_id,
            warehouse_id: self.warehouse_id(query.warehouse_code.as_deref())?,
        };
        LedgerService::new(self.db.clone()).list(&filter, &pagination).await
    }

    /// Apply a signed adjustment as `adjustment` ledger rows
    #[tracing::instrument(skip(self, input), fields(item = %input.item_id, quantity = %input.quantity))]
    pub async fn adjust(&self, input: AdjustmentInput, actor: Uuid) -> AppResult<AdjustmentResult> {
        input.validate()?;
        validate_adjustment(input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg, "Jumlah penyesuaian tidak valid"))?;
        if let Some(number) = &input.reference_number {
            validate_document_number(number)
                .map_err(|msg| AppError::validation("reference_number", msg, "Nomor dokumen tidak valid"))?;
        }
        let code = Self::parse_code(&input.warehouse_code)?;
        let warehouse_id = self.warehouses.id(code)?;

        let reference = Reference {
            reference_type: "adjustment".to_string(),
            reference_id: None,
            reference_number: input.reference_number.clone(),
            production_order_id: None,
            product_id: None,
            actor: Some(actor),
            notes: input.notes.clone(),
        };

        let mut tx = super::begin_locked(&self.db, self.lock_timeout_ms).await?;
        let item = ItemRepository::get(&mut tx, input.item_id).await?;

        let sources = if input.quantity > Decimal::ZERO {
            let lot = LotStore::find_or_create(
                &mut tx,
                LotKey {
                    warehouse_id,
                    item_id: item.id,
                    production_order_id: None,
                    product_id: None,
                },
            )
            .await?;
            LotStore::increment(&mut tx, lot.id, input.quantity).await?;
            LedgerService::append(
                &mut tx,
                NewLedgerEntry {
                    item_id: item.id,
                    warehouse_id,
                    lot_id: Some(lot.id),
                    quantity: input.quantity,
                    direction: Direction::In,
                    transaction_type: TransactionType::Adjustment,
                    reference: &reference,
                },
            )
            .await?;
            Vec::new()
        } else {
            let quantity = input.quantity.abs();
            match input.lot_id {
                Some(lot_id) => {
                    Self::take_from_lot(&mut tx, lot_id, warehouse_id, item.id, quantity, &reference).await?;
                    vec![SourceUsage {
                        warehouse_id,
                        warehouse_code: code,
                        quantity,
                    }]
                }
                None => {
                    Allocator::consume(
                        &mut tx,
                        &self.warehouses,
                        &item,
                        quantity,
                        &[code],
                        &reference,
                        TransactionType::Adjustment,
                    )
                    .await?
                }
            }
        };

        tx.commit().await?;

        tracing::info!(item = %item.code, warehouse = %code, quantity = %input.quantity, "Stock adjusted");

        Ok(AdjustmentResult {
            item_id: item.id,
            warehouse_id,
            quantity: input.quantity,
            sources,
        })
    }

    async fn take_from_lot(
        conn: &mut PgConnection,
        lot_id: Uuid,
        warehouse_id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
        reference: &Reference,
    ) -> AppResult<()> {
        let owned = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM lots WHERE id = $1 AND warehouse_id = $2 AND item_id = $3 FOR UPDATE",
        )
        .bind(lot_id)
        .bind(warehouse_id)
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
        if owned.is_none() {
            return Err(AppError::NotFound("Lot".to_string()));
        }

        LotStore::decrement(&mut *conn, lot_id, item_id, quantity).await?;
        LedgerService::append(
            conn,
            NewLedgerEntry {
                item_id,
                warehouse_id,
                lot_id: Some(lot_id),
                quantity,
                direction: Direction::Out,
                transaction_type: TransactionType::Adjustment,
                reference,
            },
        )
        .await?;
        Ok(())
    }
}
