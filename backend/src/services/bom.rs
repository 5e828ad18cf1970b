//! BOM line management with wood volume upkeep

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::engine::wood_volume;
use shared::models::{Bom, Geometry, ItemKind, WoodLine};
use shared::validation::validate_ratio;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct BomRow {
    id: Uuid,
    item_id: Uuid,
    is_active: bool,
    total_wood_volume: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BomRow> for Bom {
    fn from(row: BomRow) -> Self {
        Bom {
            id: row.id,
            item_id: row.item_id,
            is_active: row.is_active,
            total_wood_volume: row.total_wood_volume,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A BOM line joined with its component
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BomLineView {
    pub component_item_id: Uuid,
    pub component_code: String,
    pub component_name: String,
    pub component_kind: String,
    pub quantity: Decimal,
}

#[derive(Debug, FromRow)]
struct WoodLineRow {
    kind: String,
    length_mm: Option<Decimal>,
    width_mm: Option<Decimal>,
    thickness_mm: Option<Decimal>,
    quantity: Decimal,
}

/// BOM with its lines
#[derive(Debug, Clone, Serialize)]
pub struct BomView {
    #[serde(flatten)]
    pub bom: Bom,
    pub lines: Vec<BomLineView>,
}

/// Input for a single BOM line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLineInput {
    pub component_item_id: Uuid,
    pub quantity: Decimal,
}

/// Input replacing all lines of an item's BOM
#[derive(Debug, Deserialize, Validate)]
pub struct SetBomLinesInput {
    #[validate(length(min = 1, message = "A BOM needs at least one line"))]
    pub lines: Vec<BomLineInput>,
}

/// BOM service
#[derive(Clone)]
pub struct BomService {
    db: PgPool,
}

impl BomService {
    /// Create a new BomService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active BOM of an item with its lines
    pub async fn get(&self, item_id: Uuid) -> AppResult<BomView> {
        let mut conn = self.db.acquire().await?;
        let bom = Self::active(&mut conn, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("BOM".to_string()))?;
        Self::view(&mut conn, bom).await
    }

    /// Replace the item's BOM with a new active version holding `lines`.
    /// The previous version is kept inactive.
    #[tracing::instrument(skip(self, input))]
    pub async fn set_lines(&self, item_id: Uuid, input: SetBomLinesInput) -> AppResult<BomView> {
        input.validate()?;
        for line in &input.lines {
            Self::check_line(item_id, line)?;
        }

        let mut tx = self.db.begin().await?;
        Self::lock_item(&mut tx, item_id).await?;

        sqlx::query("UPDATE boms SET is_active = FALSE, updated_at = NOW() WHERE item_id = $1 AND is_active")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        let bom_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO boms (item_id, is_active) VALUES ($1, TRUE) RETURNING id",
        )
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            Self::upsert_line(&mut tx, bom_id, line).await?;
        }

        let bom = Self::recompute_volume(&mut tx, bom_id).await?;
        let view = Self::view(&mut tx, bom).await?;
        tx.commit().await?;

        tracing::info!(%bom_id, lines = view.lines.len(), "BOM replaced");
        Ok(view)
    }

    /// Add a line to the active BOM, or change its quantity if present
    pub async fn add_line(&self, item_id: Uuid, line: BomLineInput) -> AppResult<BomView> {
        Self::check_line(item_id, &line)?;

        let mut tx = self.db.begin().await?;
        let bom = Self::active_for_update(&mut tx, item_id).await?;
        Self::upsert_line(&mut tx, bom.id, &line).await?;
        let bom = Self::recompute_volume(&mut tx, bom.id).await?;
        let view = Self::view(&mut tx, bom).await?;
        tx.commit().await?;

        Ok(view)
    }

    /// Remove a component from the active BOM
    pub async fn remove_line(&self, item_id: Uuid, component_item_id: Uuid) -> AppResult<BomView> {
        let mut tx = self.db.begin().await?;
        let bom = Self::active_for_update(&mut tx, item_id).await?;

        let removed = sqlx::query("DELETE FROM bom_lines WHERE bom_id = $1 AND component_item_id = $2")
            .bind(bom.id)
            .bind(component_item_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(AppError::NotFound("BOM line".to_string()));
        }

        let bom = Self::recompute_volume(&mut tx, bom.id).await?;
        let view = Self::view(&mut tx, bom).await?;
        tx.commit().await?;

        Ok(view)
    }

    /// Make a stored BOM version the active one for its item
    pub async fn activate(&self, bom_id: Uuid) -> AppResult<BomView> {
        let mut tx = self.db.begin().await?;

        let item_id = sqlx::query_scalar::<_, Uuid>("SELECT item_id FROM boms WHERE id = $1")
            .bind(bom_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("BOM".to_string()))?;
        Self::lock_item(&mut tx, item_id).await?;

        sqlx::query(
            "UPDATE boms SET is_active = FALSE, updated_at = NOW() WHERE item_id = $1 AND is_active AND id <> $2",
        )
        .bind(item_id)
        .bind(bom_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE boms SET is_active = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(bom_id)
            .execute(&mut *tx)
            .await?;

        let bom = Self::recompute_volume(&mut tx, bom_id).await?;
        let view = Self::view(&mut tx, bom).await?;
        tx.commit().await?;

        Ok(view)
    }

    fn check_line(item_id: Uuid, line: &BomLineInput) -> AppResult<()> {
        if line.component_item_id == item_id {
            return Err(AppError::validation(
                "component_item_id",
                "An item cannot be a component of itself",
                "Barang tidak boleh menjadi komponen dirinya sendiri",
            ));
        }
        validate_ratio(line.quantity)
            .map_err(|msg| AppError::validation("quantity", msg, "Jumlah komponen tidak valid"))
    }

    /// Serializes version changes of one item's BOM, including its first
    async fn lock_item(conn: &mut PgConnection, item_id: Uuid) -> AppResult<()> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM items WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))?;
        Ok(())
    }

    async fn active(conn: &mut PgConnection, item_id: Uuid) -> AppResult<Option<Bom>> {
        let row = sqlx::query_as::<_, BomRow>(
            r#"
            SELECT id, item_id, is_active, total_wood_volume, created_at, updated_at
            FROM boms
            WHERE item_id = $1 AND is_active
            "#,
        )
        .bind(item_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(Bom::from))
    }

    async fn active_for_update(conn: &mut PgConnection, item_id: Uuid) -> AppResult<Bom> {
        let row = sqlx::query_as::<_, BomRow>(
            r#"
            SELECT id, item_id, is_active, total_wood_volume, created_at, updated_at
            FROM boms
            WHERE item_id = $1 AND is_active
            FOR UPDATE
            "#,
        )
        .bind(item_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("BOM".to_string()))?;

        Ok(row.into())
    }

    async fn upsert_line(conn: &mut PgConnection, bom_id: Uuid, line: &BomLineInput) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bom_lines (bom_id, component_item_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (bom_id, component_item_id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(bom_id)
        .bind(line.component_item_id)
        .bind(line.quantity)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Recompute `total_wood_volume` from the current lines
    pub async fn recompute_volume(conn: &mut PgConnection, bom_id: Uuid) -> AppResult<Bom> {
        let rows = sqlx::query_as::<_, WoodLineRow>(
            r#"
            SELECT i.kind, i.length_mm, i.width_mm, i.thickness_mm, bl.quantity
            FROM bom_lines bl
            JOIN items i ON i.id = bl.component_item_id
            WHERE bl.bom_id = $1
            "#,
        )
        .bind(bom_id)
        .fetch_all(&mut *conn)
        .await?;

        let lines = rows
            .into_iter()
            .map(|row| {
                Ok(WoodLine {
                    kind: row.kind.parse::<ItemKind>().map_err(AppError::Internal)?,
                    geometry: Geometry {
                        length_mm: row.length_mm,
                        width_mm: row.width_mm,
                        thickness_mm: row.thickness_mm,
                        diameter_mm: None,
                    },
                    quantity: row.quantity,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        let volume = wood_volume(&lines);

        let row = sqlx::query_as::<_, BomRow>(
            r#"
            UPDATE boms SET total_wood_volume = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, item_id, is_active, total_wood_volume, created_at, updated_at
            "#,
        )
        .bind(bom_id)
        .bind(volume)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(%bom_id, %volume, "Wood volume recomputed");
        Ok(row.into())
    }

    async fn view(conn: &mut PgConnection, bom: Bom) -> AppResult<BomView> {
        let lines = sqlx::query_as::<_, BomLineView>(
            r#"
            SELECT bl.component_item_id, i.code AS component_code, i.name AS component_name,
                   i.kind AS component_kind, bl.quantity
            FROM bom_lines bl
            JOIN items i ON i.id = bl.component_item_id
            WHERE bl.bom_id = $1
            ORDER BY i.code
            "#,
        )
        .bind(bom.id)
        .fetch_all(conn)
        .await?;

        Ok(BomView { bom, lines })
    }
}
