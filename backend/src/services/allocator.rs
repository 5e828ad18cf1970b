//! FIFO allocator: drains lots across prioritized source warehouses
//!
//! Planning is the pure `shared::plan_fifo`; this module locks the lots,
//! executes the plan and writes both ledger legs inside the caller's
//! transaction.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::engine::{plan_fifo, AllocationPlan, CandidateLot, SourceUsage};
use shared::models::{Direction, Item, LotKey, TransactionType, WarehouseCode};
use sqlx::PgConnection;
use uuid::Uuid;

use super::ledger::{LedgerService, NewLedgerEntry, Reference};
use super::lot_store::LotStore;
use super::warehouse::WarehouseDirectory;
use crate::error::AppResult;

/// Outcome of a transfer between warehouses
#[derive(Debug, Clone, Serialize)]
pub struct AllocationResult {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub sources: Vec<SourceUsage>,
    pub destination_warehouse_id: Uuid,
    #[serde(skip)]
    pub destination_lot_id: Uuid,
}

/// Transactional FIFO allocation
pub struct Allocator;

impl Allocator {
    /// Lock and collect every lot the order may draw from, warehouses in
    /// priority order and lots oldest first within each
    pub async fn candidate_pool(
        conn: &mut PgConnection,
        warehouses: &WarehouseDirectory,
        item_id: Uuid,
        sources: &[WarehouseCode],
        production_order_id: Option<Uuid>,
    ) -> AppResult<Vec<CandidateLot>> {
        let mut pool = Vec::new();
        for code in sources {
            let warehouse_id = warehouses.id(*code)?;
            let lots = LotStore::list_available(&mut *conn, warehouse_id, item_id, production_order_id).await?;
            pool.extend(lots.into_iter().map(|lot| CandidateLot {
                lot_id: lot.id,
                warehouse_id,
                warehouse_code: *code,
                seq: lot.seq,
                quantity: lot.qty,
            }));
        }
        Ok(pool)
    }

    /// Plan a drain over the locked pool; nothing is mutated on shortfall
    async fn plan(
        conn: &mut PgConnection,
        warehouses: &WarehouseDirectory,
        item: &Item,
        required: Decimal,
        sources: &[WarehouseCode],
        production_order_id: Option<Uuid>,
    ) -> AppResult<AllocationPlan> {
        let pool = Self::candidate_pool(conn, warehouses, item.id, sources, production_order_id).await?;
        let plan = plan_fifo(required, &pool).map_err(|shortfall| {
            tracing::info!(
                item = %item.name,
                required = %shortfall.required,
                available = %shortfall.available,
                "Allocation short"
            );
            shortfall.into_error(item.id, item.name.clone())
        })?;
        Ok(plan)
    }

    /// Execute the draws of a plan, one `out` ledger row per drained lot
    async fn drain(
        conn: &mut PgConnection,
        item: &Item,
        plan: &AllocationPlan,
        transaction_type: TransactionType,
        reference: &Reference,
    ) -> AppResult<()> {
        for draw in &plan.draws {
            LotStore::decrement(&mut *conn, draw.lot_id, item.id, draw.quantity).await?;
            LedgerService::append(
                &mut *conn,
                NewLedgerEntry {
                    item_id: item.id,
                    warehouse_id: draw.warehouse_id,
                    lot_id: Some(draw.lot_id),
                    quantity: draw.quantity,
                    direction: Direction::Out,
                    transaction_type,
                    reference,
                },
            )
            .await?;
        }
        Ok(())
    }

    /// Move `required` of an item from the sources into the destination,
    /// tagging the destination lot with the order and product
    #[tracing::instrument(skip(conn, warehouses, item, reference), fields(item = %item.code))]
    pub async fn allocate(
        conn: &mut PgConnection,
        warehouses: &WarehouseDirectory,
        item: &Item,
        required: Decimal,
        sources: &[WarehouseCode],
        destination: WarehouseCode,
        reference: &Reference,
    ) -> AppResult<AllocationResult> {
        let destination_id = warehouses.id(destination)?;
        let plan =
            Self::plan(conn, warehouses, item, required, sources, reference.production_order_id).await?;
        Self::drain(conn, item, &plan, TransactionType::TransferOut, reference).await?;

        let lot_id = Self::credit(
            conn,
            item.id,
            required,
            destination_id,
            TransactionType::TransferIn,
            reference,
        )
        .await?;

        tracing::debug!(%destination, quantity = %required, "Allocated");

        Ok(AllocationResult {
            item_id: item.id,
            quantity: required,
            sources: plan.usage_by_warehouse(),
            destination_warehouse_id: destination_id,
            destination_lot_id: lot_id,
        })
    }

    /// Drain `required` of an item from the sources without a destination
    #[tracing::instrument(skip(conn, warehouses, item, reference), fields(item = %item.code))]
    pub async fn consume(
        conn: &mut PgConnection,
        warehouses: &WarehouseDirectory,
        item: &Item,
        required: Decimal,
        sources: &[WarehouseCode],
        reference: &Reference,
        transaction_type: TransactionType,
    ) -> AppResult<Vec<SourceUsage>> {
        let plan =
            Self::plan(conn, warehouses, item, required, sources, reference.production_order_id).await?;
        Self::drain(conn, item, &plan, transaction_type, reference).await?;
        Ok(plan.usage_by_warehouse())
    }

    /// Produce `quantity` of an item into a destination warehouse
    pub async fn receive(
        conn: &mut PgConnection,
        warehouses: &WarehouseDirectory,
        item_id: Uuid,
        quantity: Decimal,
        destination: WarehouseCode,
        reference: &Reference,
        transaction_type: TransactionType,
    ) -> AppResult<AllocationResult> {
        let destination_id = warehouses.id(destination)?;
        let lot_id = Self::credit(conn, item_id, quantity, destination_id, transaction_type, reference).await?;
        Ok(AllocationResult {
            item_id,
            quantity,
            sources: Vec::new(),
            destination_warehouse_id: destination_id,
            destination_lot_id: lot_id,
        })
    }

    async fn credit(
        conn: &mut PgConnection,
        item_id: Uuid,
        quantity: Decimal,
        warehouse_id: Uuid,
        transaction_type: TransactionType,
        reference: &Reference,
    ) -> AppResult<Uuid> {
        let lot = LotStore::find_or_create(
            &mut *conn,
            LotKey {
                warehouse_id,
                item_id,
                production_order_id: reference.production_order_id,
                product_id: reference.product_id,
            },
        )
        .await?;
        LotStore::increment(&mut *conn, lot.id, quantity).await?;
        LedgerService::append(
            &mut *conn,
            NewLedgerEntry {
                item_id,
                warehouse_id,
                lot_id: Some(lot.id),
                quantity,
                direction: Direction::In,
                transaction_type,
                reference,
            },
        )
        .await?;
        Ok(lot.id)
    }
}
