//! Lot store: current quantities per (warehouse, item, order, product)
//!
//! Every read that precedes a mutation takes a row lock held until the
//! enclosing transaction ends.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{Lot, LotKey};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct LotRow {
    id: Uuid,
    seq: i64,
    warehouse_id: Uuid,
    item_id: Uuid,
    production_order_id: Option<Uuid>,
    product_id: Option<Uuid>,
    qty: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Self {
        Lot {
            id: row.id,
            seq: row.seq,
            warehouse_id: row.warehouse_id,
            item_id: row.item_id,
            production_order_id: row.production_order_id,
            product_id: row.product_id,
            qty: row.qty,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Query filter for lot listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotFilter {
    pub warehouse_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub production_order_id: Option<Uuid>,
    #[serde(default)]
    pub include_empty: bool,
}

/// Lot store service
#[derive(Clone)]
pub struct LotStore {
    db: PgPool,
}

impl LotStore {
    /// Create a new LotStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Return the lot for `key`, creating an empty one if none exists, and
    /// lock it for the rest of the transaction
    pub async fn find_or_create(conn: &mut PgConnection, key: LotKey) -> AppResult<Lot> {
        sqlx::query(
            r#"
            INSERT INTO lots (warehouse_id, item_id, production_order_id, product_id, qty)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT ON CONSTRAINT lots_tuple_key DO NOTHING
            "#,
        )
        .bind(key.warehouse_id)
        .bind(key.item_id)
        .bind(key.production_order_id)
        .bind(key.product_id)
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, seq, warehouse_id, item_id, production_order_id, product_id,
                   qty, created_at, updated_at
            FROM lots
            WHERE warehouse_id = $1
              AND item_id = $2
              AND production_order_id IS NOT DISTINCT FROM $3::uuid
              AND product_id IS NOT DISTINCT FROM $4::uuid
            FOR UPDATE
            "#,
        )
        .bind(key.warehouse_id)
        .bind(key.item_id)
        .bind(key.production_order_id)
        .bind(key.product_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.into())
    }

    /// Add to a lot, returning its new quantity
    pub async fn increment(conn: &mut PgConnection, lot_id: Uuid, qty: Decimal) -> AppResult<Decimal> {
        let new_qty = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE lots SET qty = qty + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING qty
            "#,
        )
        .bind(lot_id)
        .bind(qty)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        Ok(new_qty)
    }

    /// Take from a lot, returning its new quantity.
    ///
    /// The update only matches while the lot still holds `qty`, so a lot
    /// never goes negative even if a caller skipped the lock.
    pub async fn decrement(
        conn: &mut PgConnection,
        lot_id: Uuid,
        item_id: Uuid,
        qty: Decimal,
    ) -> AppResult<Decimal> {
        let updated = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE lots SET qty = qty - $2, updated_at = NOW()
            WHERE id = $1 AND qty >= $2
            RETURNING qty
            "#,
        )
        .bind(lot_id)
        .bind(qty)
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some(new_qty) => Ok(new_qty),
            None => {
                let (available, item_name) = sqlx::query_as::<_, (Decimal, String)>(
                    r#"
                    SELECT l.qty, i.name
                    FROM lots l JOIN items i ON i.id = l.item_id
                    WHERE l.id = $1
                    "#,
                )
                .bind(lot_id)
                .fetch_one(&mut *conn)
                .await?;

                Err(AppError::InsufficientStock {
                    item_id,
                    item_name,
                    required: qty,
                    available,
                })
            }
        }
    }

    /// Non-empty lots an order may draw from in one warehouse, oldest first,
    /// locked in that order
    pub async fn list_available(
        conn: &mut PgConnection,
        warehouse_id: Uuid,
        item_id: Uuid,
        production_order_id: Option<Uuid>,
    ) -> AppResult<Vec<Lot>> {
        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, seq, warehouse_id, item_id, production_order_id, product_id,
                   qty, created_at, updated_at
            FROM lots
            WHERE warehouse_id = $1
              AND item_id = $2
              AND qty > 0
              AND (production_order_id IS NULL OR production_order_id = $3::uuid)
            ORDER BY created_at, seq
            FOR UPDATE
            "#,
        )
        .bind(warehouse_id)
        .bind(item_id)
        .bind(production_order_id)
        .fetch_all(conn)
        .await?;

        Ok(rows.into_iter().map(Lot::from).collect())
    }

    /// Quantity an order could draw from one warehouse, without locking
    pub async fn sum_available(
        conn: &mut PgConnection,
        warehouse_id: Uuid,
        item_id: Uuid,
        production_order_id: Option<Uuid>,
    ) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(qty), 0)
            FROM lots
            WHERE warehouse_id = $1
              AND item_id = $2
              AND (production_order_id IS NULL OR production_order_id = $3::uuid)
            "#,
        )
        .bind(warehouse_id)
        .bind(item_id)
        .bind(production_order_id)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }

    /// Quantity held for an order's product in one warehouse
    pub async fn sum_at(
        conn: &mut PgConnection,
        warehouse_id: Uuid,
        item_id: Uuid,
        production_order_id: Uuid,
    ) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(qty), 0)
            FROM lots
            WHERE warehouse_id = $1 AND item_id = $2 AND production_order_id = $3
            "#,
        )
        .bind(warehouse_id)
        .bind(item_id)
        .bind(production_order_id)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }

    /// List lots, oldest first
    pub async fn list(
        &self,
        filter: &LotFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Lot>> {
        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM lots
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR production_order_id = $3)
              AND ($4 OR qty > 0)
            "#,
        )
        .bind(filter.warehouse_id)
        .bind(filter.item_id)
        .bind(filter.production_order_id)
        .bind(filter.include_empty)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, seq, warehouse_id, item_id, production_order_id, product_id,
                   qty, created_at, updated_at
            FROM lots
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR production_order_id = $3)
              AND ($4 OR qty > 0)
            ORDER BY created_at, seq
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.warehouse_id)
        .bind(filter.item_id)
        .bind(filter.production_order_id)
        .bind(filter.include_empty)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Lot::from).collect(),
            pagination: PaginationMeta::new(pagination, total_items.max(0) as u64),
        })
    }
}
