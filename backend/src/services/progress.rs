//! Production order progress: stage counters, status and completion
//!
//! Everything here runs inside the stage processor's transaction, after the
//! order row has been locked.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::engine::{
    advance_status, is_stage_complete, mark_on_progress, record_production, DetailAggregate, SourceUsage,
};
use shared::models::{
    Direction, ProductionLog, ProductionLogKind, ProductionOrder, ProductionOrderDetail,
    ProductionOrderStatus, Stage, StageProgress, TransactionType,
};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::ledger::LedgerService;
use super::lot_store::LotStore;
use super::warehouse::WarehouseDirectory;
use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
    id: Uuid,
    number: String,
    sales_order_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for ProductionOrder {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(ProductionOrder {
            id: row.id,
            number: row.number,
            sales_order_id: row.sales_order_id,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DetailRow {
    id: Uuid,
    production_order_id: Uuid,
    item_id: Uuid,
    quantity_planned: Decimal,
    quantity_produced: Decimal,
}

impl From<DetailRow> for ProductionOrderDetail {
    fn from(row: DetailRow) -> Self {
        ProductionOrderDetail {
            id: row.id,
            production_order_id: row.production_order_id,
            item_id: row.item_id,
            quantity_planned: row.quantity_planned,
            quantity_produced: row.quantity_produced,
        }
    }
}

#[derive(Debug, FromRow)]
struct StageProgressRow {
    detail_id: Uuid,
    stage: String,
    item_id: Uuid,
    quantity_planned: Decimal,
    quantity_produced: Decimal,
}

impl TryFrom<StageProgressRow> for StageProgress {
    type Error = AppError;

    fn try_from(row: StageProgressRow) -> Result<Self, Self::Error> {
        Ok(StageProgress {
            detail_id: row.detail_id,
            stage: row.stage.parse().map_err(AppError::Internal)?,
            item_id: row.item_id,
            quantity_planned: row.quantity_planned,
            quantity_produced: row.quantity_produced,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductionLogRow {
    id: Uuid,
    production_order_id: Uuid,
    detail_id: Uuid,
    stage: String,
    kind: String,
    input_item_id: Option<Uuid>,
    input_quantity: Option<Decimal>,
    output_item_id: Option<Uuid>,
    output_quantity: Decimal,
    sources: sqlx::types::Json<Vec<SourceUsage>>,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductionLogRow> for ProductionLog {
    type Error = AppError;

    fn try_from(row: ProductionLogRow) -> Result<Self, Self::Error> {
        Ok(ProductionLog {
            id: row.id,
            production_order_id: row.production_order_id,
            detail_id: row.detail_id,
            stage: row.stage.parse().map_err(AppError::Internal)?,
            kind: row.kind.parse().map_err(AppError::Internal)?,
            input_item_id: row.input_item_id,
            input_quantity: row.input_quantity,
            output_item_id: row.output_item_id,
            output_quantity: row.output_quantity,
            sources: row.sources.0,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// A production log record about to be written
#[derive(Debug, Clone)]
pub struct NewProductionLog {
    pub production_order_id: Uuid,
    pub detail_id: Uuid,
    pub stage: Stage,
    pub kind: ProductionLogKind,
    pub input_item_id: Option<Uuid>,
    pub input_quantity: Option<Decimal>,
    pub output_item_id: Option<Uuid>,
    pub output_quantity: Decimal,
    pub sources: Vec<SourceUsage>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Progress tracker
pub struct ProgressTracker;

impl ProgressTracker {
    pub async fn find_order(conn: &mut PgConnection, id: Uuid) -> AppResult<ProductionOrder> {
        sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, number, sales_order_id, status, created_at, updated_at
            FROM production_orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Production order".to_string()))?
        .try_into()
    }

    /// Load and lock the order row; serializes progress updates per order
    pub async fn lock_order(conn: &mut PgConnection, id: Uuid) -> AppResult<ProductionOrder> {
        sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, number, sales_order_id, status, created_at, updated_at
            FROM production_orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Production order".to_string()))?
        .try_into()
    }

    /// Lock the order owning a detail, then read the detail under that lock
    pub async fn lock_detail(
        conn: &mut PgConnection,
        detail_id: Uuid,
    ) -> AppResult<(ProductionOrder, ProductionOrderDetail)> {
        let order_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT production_order_id FROM production_order_details WHERE id = $1",
        )
        .bind(detail_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Production order detail".to_string()))?;

        let order = Self::lock_order(&mut *conn, order_id).await?;
        let detail = Self::detail(conn, detail_id).await?;
        Ok((order, detail))
    }

    pub async fn detail(conn: &mut PgConnection, detail_id: Uuid) -> AppResult<ProductionOrderDetail> {
        let row = sqlx::query_as::<_, DetailRow>(
            r#"
            SELECT id, production_order_id, item_id, quantity_planned, quantity_produced
            FROM production_order_details
            WHERE id = $1
            "#,
        )
        .bind(detail_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Production order detail".to_string()))?;

        Ok(row.into())
    }

    pub async fn details(conn: &mut PgConnection, production_order_id: Uuid) -> AppResult<Vec<ProductionOrderDetail>> {
        let rows = sqlx::query_as::<_, DetailRow>(
            r#"
            SELECT id, production_order_id, item_id, quantity_planned, quantity_produced
            FROM production_order_details
            WHERE production_order_id = $1
            ORDER BY id
            "#,
        )
        .bind(production_order_id)
        .fetch_all(conn)
        .await?;

        Ok(rows.into_iter().map(ProductionOrderDetail::from).collect())
    }

    async fn set_status(conn: &mut PgConnection, id: Uuid, status: ProductionOrderStatus) -> AppResult<()> {
        sqlx::query("UPDATE production_orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_string())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// `draft → on_progress`; any other status is returned unchanged
    pub async fn mark_on_progress(conn: &mut PgConnection, order: &ProductionOrder) -> AppResult<ProductionOrderStatus> {
        match mark_on_progress(order.status) {
            Some(next) => {
                Self::set_status(conn, order.id, next).await?;
                tracing::info!(order = %order.number, "Production order started");
                Ok(next)
            }
            None => Ok(order.status),
        }
    }

    /// Add to a stage counter, bounded by `planned`
    pub async fn record_stage(
        conn: &mut PgConnection,
        detail_id: Uuid,
        stage: Stage,
        item_id: Uuid,
        planned: Decimal,
        quantity: Decimal,
    ) -> AppResult<StageProgress> {
        sqlx::query(
            r#"
            INSERT INTO production_stage_progress (detail_id, stage, item_id, quantity_planned)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT production_stage_progress_key DO NOTHING
            "#,
        )
        .bind(detail_id)
        .bind(stage.as_str())
        .bind(item_id)
        .bind(planned)
        .execute(&mut *conn)
        .await?;

        let produced = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT quantity_produced
            FROM production_stage_progress
            WHERE detail_id = $1 AND stage = $2 AND item_id = $3
            FOR UPDATE
            "#,
        )
        .bind(detail_id)
        .bind(stage.as_str())
        .bind(item_id)
        .fetch_one(&mut *conn)
        .await?;

        let next = record_production(planned, produced, quantity)?;

        let row = sqlx::query_as::<_, StageProgressRow>(
            r#"
            UPDATE production_stage_progress
            SET quantity_planned = $4, quantity_produced = $5, updated_at = NOW()
            WHERE detail_id = $1 AND stage = $2 AND item_id = $3
            RETURNING detail_id, stage, item_id, quantity_planned, quantity_produced
            "#,
        )
        .bind(detail_id)
        .bind(stage.as_str())
        .bind(item_id)
        .bind(planned)
        .bind(next)
        .fetch_one(&mut *conn)
        .await?;

        row.try_into()
    }

    /// Add assembled finished units to the detail, bounded by its plan
    pub async fn record_finished(conn: &mut PgConnection, detail_id: Uuid, quantity: Decimal) -> AppResult<Decimal> {
        let (planned, produced) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT quantity_planned, quantity_produced
            FROM production_order_details
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(detail_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Production order detail".to_string()))?;

        let next = record_production(planned, produced, quantity)?;
        sqlx::query("UPDATE production_order_details SET quantity_produced = $2 WHERE id = $1")
            .bind(detail_id)
            .bind(next)
            .execute(conn)
            .await?;
        Ok(next)
    }

    /// Produced counters of one stage, keyed by item
    pub async fn stage_counters(
        conn: &mut PgConnection,
        detail_id: Uuid,
        stage: Stage,
    ) -> AppResult<Vec<StageProgress>> {
        sqlx::query_as::<_, StageProgressRow>(
            r#"
            SELECT detail_id, stage, item_id, quantity_planned, quantity_produced
            FROM production_stage_progress
            WHERE detail_id = $1 AND stage = $2
            "#,
        )
        .bind(detail_id)
        .bind(stage.as_str())
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(StageProgress::try_from)
        .collect()
    }

    /// Every stage counter of an order
    pub async fn order_progress(conn: &mut PgConnection, production_order_id: Uuid) -> AppResult<Vec<StageProgress>> {
        sqlx::query_as::<_, StageProgressRow>(
            r#"
            SELECT p.detail_id, p.stage, p.item_id, p.quantity_planned, p.quantity_produced
            FROM production_stage_progress p
            JOIN production_order_details d ON d.id = p.detail_id
            WHERE d.production_order_id = $1
            ORDER BY p.detail_id, p.stage, p.item_id
            "#,
        )
        .bind(production_order_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(StageProgress::try_from)
        .collect()
    }

    /// Quantity of a detail's item that has reached a stage.
    ///
    /// Packing holds finished goods, so its lots are counted directly.
    /// Earlier stages are drained by the next one, so the cumulative
    /// inbound ledger at the stage warehouse is used instead.
    async fn reached(
        conn: &mut PgConnection,
        warehouses: &WarehouseDirectory,
        order_id: Uuid,
        detail: &ProductionOrderDetail,
        stage: Stage,
    ) -> AppResult<Decimal> {
        let destination = warehouses.id(stage.route().destination)?;
        if stage.is_terminal() {
            LotStore::sum_at(conn, destination, detail.item_id, order_id).await
        } else {
            LedgerService::total(
                conn,
                order_id,
                detail.item_id,
                destination,
                Direction::In,
                &[TransactionType::TransferIn, TransactionType::Production],
            )
            .await
        }
    }

    /// Re-aggregate every detail of the order at `stage` and advance the
    /// status when all have reached their plan. Returns the resulting status.
    pub async fn check_completion(
        conn: &mut PgConnection,
        warehouses: &WarehouseDirectory,
        order: &ProductionOrder,
        current: ProductionOrderStatus,
        stage: Stage,
    ) -> AppResult<ProductionOrderStatus> {
        let details = Self::details(&mut *conn, order.id).await?;
        let mut aggregates = Vec::with_capacity(details.len());
        for detail in &details {
            let reached = Self::reached(&mut *conn, warehouses, order.id, detail, stage).await?;
            aggregates.push(DetailAggregate {
                planned: detail.quantity_planned,
                reached,
            });
        }

        if !is_stage_complete(&aggregates) {
            return Ok(current);
        }

        match advance_status(current, stage) {
            Some(next) => {
                Self::set_status(conn, order.id, next).await?;
                tracing::info!(order = %order.number, status = %next, "Production order advanced");
                Ok(next)
            }
            None => Ok(current),
        }
    }

    pub async fn append_log(conn: &mut PgConnection, log: NewProductionLog) -> AppResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO production_logs (
                production_order_id, detail_id, stage, kind, input_item_id, input_quantity,
                output_item_id, output_quantity, sources, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(log.production_order_id)
        .bind(log.detail_id)
        .bind(log.stage.as_str())
        .bind(log.kind.as_str())
        .bind(log.input_item_id)
        .bind(log.input_quantity)
        .bind(log.output_item_id)
        .bind(log.output_quantity)
        .bind(sqlx::types::Json(&log.sources))
        .bind(&log.notes)
        .bind(log.created_by)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    pub async fn logs(conn: &mut PgConnection, production_order_id: Uuid) -> AppResult<Vec<ProductionLog>> {
        sqlx::query_as::<_, ProductionLogRow>(
            r#"
            SELECT id, production_order_id, detail_id, stage, kind, input_item_id, input_quantity,
                   output_item_id, output_quantity, sources, notes, created_by, created_at
            FROM production_logs
            WHERE production_order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(production_order_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(ProductionLog::try_from)
        .collect()
    }
}
