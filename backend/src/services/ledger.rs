//! Append-only stock ledger

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{Direction, LedgerEntry, TransactionType};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Business document a movement belongs to, copied onto every ledger row
/// and used to tag destination lots
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub reference_type: String,
    pub reference_id: Option<Uuid>,
    pub reference_number: Option<String>,
    pub production_order_id: Option<Uuid>,
    /// Finished item the work in process belongs to
    pub product_id: Option<Uuid>,
    pub actor: Option<Uuid>,
    pub notes: Option<String>,
}

/// A movement about to be recorded
#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub direction: Direction,
    pub transaction_type: TransactionType,
    pub reference: &'a Reference,
}

/// Query filter for ledger listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerFilter {
    pub production_order_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct LedgerRow {
    id: Uuid,
    entry_date: NaiveDate,
    entry_time: NaiveTime,
    item_id: Uuid,
    warehouse_id: Uuid,
    lot_id: Option<Uuid>,
    quantity: Decimal,
    direction: String,
    transaction_type: String,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    reference_number: Option<String>,
    production_order_id: Option<Uuid>,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: row.id,
            entry_date: row.entry_date,
            entry_time: row.entry_time,
            item_id: row.item_id,
            warehouse_id: row.warehouse_id,
            lot_id: row.lot_id,
            quantity: row.quantity,
            direction: row.direction.parse().map_err(AppError::Internal)?,
            transaction_type: row.transaction_type.parse().map_err(AppError::Internal)?,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            reference_number: row.reference_number,
            production_order_id: row.production_order_id,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Stock ledger service
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record one movement. Rows are never updated or deleted afterwards.
    pub async fn append(conn: &mut PgConnection, entry: NewLedgerEntry<'_>) -> AppResult<Uuid> {
        if entry.quantity <= Decimal::ZERO {
            return Err(AppError::Internal(format!(
                "ledger quantity must be positive, got {}",
                entry.quantity
            )));
        }

        let reference = entry.reference;
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO inventory_logs (
                item_id, warehouse_id, lot_id, quantity, direction, transaction_type,
                reference_type, reference_id, reference_number, production_order_id,
                notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(entry.item_id)
        .bind(entry.warehouse_id)
        .bind(entry.lot_id)
        .bind(entry.quantity)
        .bind(entry.direction.as_str())
        .bind(entry.transaction_type.as_str())
        .bind(&reference.reference_type)
        .bind(reference.reference_id)
        .bind(&reference.reference_number)
        .bind(reference.production_order_id)
        .bind(&reference.notes)
        .bind(reference.actor)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Sum of one direction for an order's item in a warehouse, restricted
    /// to the given transaction types
    pub async fn total(
        conn: &mut PgConnection,
        production_order_id: Uuid,
        item_id: Uuid,
        warehouse_id: Uuid,
        direction: Direction,
        types: &[TransactionType],
    ) -> AppResult<Decimal> {
        let types: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM inventory_logs
            WHERE production_order_id = $1
              AND item_id = $2
              AND warehouse_id = $3
              AND direction = $4
              AND transaction_type = ANY($5)
            "#,
        )
        .bind(production_order_id)
        .bind(item_id)
        .bind(warehouse_id)
        .bind(direction.as_str())
        .bind(&types)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }

    /// List ledger entries, newest first
    pub async fn list(
        &self,
        filter: &LedgerFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<LedgerEntry>> {
        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM inventory_logs
            WHERE ($1::uuid IS NULL OR production_order_id = $1)
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR warehouse_id = $3)
            "#,
        )
        .bind(filter.production_order_id)
        .bind(filter.item_id)
        .bind(filter.warehouse_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT id, entry_date, entry_time, item_id, warehouse_id, lot_id, quantity,
                   direction, transaction_type, reference_type, reference_id,
                   reference_number, production_order_id, notes, created_by, created_at
            FROM inventory_logs
            WHERE ($1::uuid IS NULL OR production_order_id = $1)
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR warehouse_id = $3)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.production_order_id)
        .bind(filter.item_id)
        .bind(filter.warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total_items.max(0) as u64),
        })
    }
}
