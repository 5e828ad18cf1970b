//! Read access to item master data

use rust_decimal::Decimal;
use shared::models::{Geometry, Item};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    code: String,
    name: String,
    kind: String,
    unit: String,
    length_mm: Option<Decimal>,
    width_mm: Option<Decimal>,
    thickness_mm: Option<Decimal>,
    diameter_mm: Option<Decimal>,
    volume_m3: Option<Decimal>,
    stock: Decimal,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            code: row.code,
            name: row.name,
            kind: row.kind.parse().map_err(AppError::Internal)?,
            unit: row.unit,
            geometry: Geometry {
                length_mm: row.length_mm,
                width_mm: row.width_mm,
                thickness_mm: row.thickness_mm,
                diameter_mm: row.diameter_mm,
            },
            volume_m3: row.volume_m3,
            stock: row.stock,
        })
    }
}

/// Item lookups used inside engine transactions
pub struct ItemRepository;

impl ItemRepository {
    pub async fn get(conn: &mut PgConnection, id: Uuid) -> AppResult<Item> {
        Self::find(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {}", id)))
    }

    pub async fn find(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Item>> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, code, name, kind, unit, length_mm, width_mm, thickness_mm,
                   diameter_mm, volume_m3, stock
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(Item::try_from)
        .transpose()
    }

    pub async fn get_many(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<Vec<Item>> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, code, name, kind, unit, length_mm, width_mm, thickness_mm,
                   diameter_mm, volume_m3, stock
            FROM items
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Item::try_from)
        .collect()
    }
}
