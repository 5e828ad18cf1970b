//! BOM, product-BOM and recipe lookups feeding the pure resolver

use rust_decimal::Decimal;
use serde::Serialize;
use shared::engine::{
    explode, explode_product_bom, material_need, material_plan, net_need, ComponentNeed, MaterialTotal,
};
use shared::error::EngineError;
use shared::models::{BomLine, ComponentRecipe, ProductBom, Stage};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::item::ItemRepository;
use super::lot_store::LotStore;
use super::warehouse::WarehouseDirectory;
use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct BomLineRow {
    component_item_id: Uuid,
    quantity: Decimal,
}

#[derive(Debug, FromRow)]
struct ProductBomRow {
    parent_item_id: Uuid,
    child_item_id: Uuid,
    quantity: Decimal,
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    component_item_id: Uuid,
    material_item_id: Uuid,
    quantity_per_unit: Decimal,
}

/// Raw material needed by one component
#[derive(Debug, Clone, Serialize)]
pub struct MaterialNeed {
    pub component_item_id: Uuid,
    pub material_item_id: Uuid,
    pub quantity: Decimal,
}

/// Gross, stock and net need of one component for a production order
#[derive(Debug, Clone, Serialize)]
pub struct RequirementLine {
    pub detail_id: Uuid,
    pub component_item_id: Uuid,
    pub component_name: String,
    pub quantity_per_unit: Decimal,
    pub gross_need: Decimal,
    pub stock: Decimal,
    pub net_need: Decimal,
}

/// Reads BOM structure inside the caller's transaction. Rows are read
/// without locks.
#[derive(Clone)]
pub struct ResolverService {
    db: PgPool,
}

impl ResolverService {
    /// Create a new ResolverService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Lines of the item's active BOM, `None` when it has no active BOM
    pub async fn active_bom_lines(conn: &mut PgConnection, item_id: Uuid) -> AppResult<Option<Vec<BomLine>>> {
        let bom_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM boms WHERE item_id = $1 AND is_active",
        )
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(bom_id) = bom_id else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, BomLineRow>(
            r#"
            SELECT component_item_id, quantity
            FROM bom_lines
            WHERE bom_id = $1
            ORDER BY component_item_id
            "#,
        )
        .bind(bom_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(
            rows.into_iter()
                .map(|r| BomLine {
                    component_item_id: r.component_item_id,
                    quantity: r.quantity,
                })
                .collect(),
        ))
    }

    pub async fn product_bom(conn: &mut PgConnection, parent_item_id: Uuid) -> AppResult<Vec<ProductBom>> {
        let rows = sqlx::query_as::<_, ProductBomRow>(
            r#"
            SELECT parent_item_id, child_item_id, quantity
            FROM product_boms
            WHERE parent_item_id = $1
            ORDER BY child_item_id
            "#,
        )
        .bind(parent_item_id)
        .fetch_all(conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProductBom {
                parent_item_id: r.parent_item_id,
                child_item_id: r.child_item_id,
                quantity: r.quantity,
            })
            .collect())
    }

    /// Components needed for `quantity` units of an item: the active BOM,
    /// falling back to the product BOM
    pub async fn requirements(conn: &mut PgConnection, item_id: Uuid, quantity: Decimal) -> AppResult<Vec<ComponentNeed>> {
        if let Some(lines) = Self::active_bom_lines(&mut *conn, item_id).await? {
            if !lines.is_empty() {
                return Ok(explode(&lines, quantity));
            }
        }

        let rows = Self::product_bom(&mut *conn, item_id).await?;
        if rows.is_empty() {
            return Err(AppError::validation(
                "item_id",
                "Item has no bill of materials",
                "Barang belum memiliki BOM",
            ));
        }
        Ok(explode_product_bom(&rows, item_id, quantity))
    }

    pub async fn recipe(conn: &mut PgConnection, component_item_id: Uuid) -> AppResult<Option<ComponentRecipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT component_item_id, material_item_id, quantity_per_unit
            FROM component_recipes
            WHERE component_item_id = $1
            "#,
        )
        .bind(component_item_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|r| ComponentRecipe {
            component_item_id: r.component_item_id,
            material_item_id: r.material_item_id,
            quantity_per_unit: r.quantity_per_unit,
        }))
    }

    /// Raw material behind `quantity` units of an item, per material.
    /// Components without a recipe are left out.
    pub async fn material_plan(conn: &mut PgConnection, item_id: Uuid, quantity: Decimal) -> AppResult<Vec<MaterialTotal>> {
        let needs = Self::requirements(&mut *conn, item_id, quantity).await?;
        let mut recipes = Vec::with_capacity(needs.len());
        for need in &needs {
            if let Some(recipe) = Self::recipe(&mut *conn, need.component_item_id).await? {
                recipes.push(recipe);
            }
        }
        Ok(material_plan(&needs, &recipes))
    }

    /// Material consumed for `target` units of a component; a component
    /// without a recipe is an error
    pub async fn material_for(conn: &mut PgConnection, component_item_id: Uuid, target: Decimal) -> AppResult<MaterialNeed> {
        let component = ItemRepository::get(&mut *conn, component_item_id).await?;
        let Some(recipe) = Self::recipe(&mut *conn, component_item_id).await? else {
            return Err(EngineError::RecipeMissing {
                component_item_id,
                component_name: component.name,
            }
            .into());
        };
        let quantity = material_need(Some(&recipe), component.id, &component.name, target)?;
        let material_item_id = recipe.material_item_id;

        Ok(MaterialNeed {
            component_item_id,
            material_item_id,
            quantity,
        })
    }

    /// Gross, stock and net component needs of a production order, stock
    /// counted at the Assembling source warehouses
    pub async fn production_requirements(
        &self,
        warehouses: &WarehouseDirectory,
        production_order_id: Uuid,
    ) -> AppResult<Vec<RequirementLine>> {
        let mut conn = self.db.acquire().await?;

        let details = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            r#"
            SELECT id, item_id, quantity_planned
            FROM production_order_details
            WHERE production_order_id = $1
            ORDER BY id
            "#,
        )
        .bind(production_order_id)
        .fetch_all(&mut *conn)
        .await?;

        if details.is_empty() {
            return Err(AppError::NotFound("Production order".to_string()));
        }

        let mut lines = Vec::new();
        for (detail_id, item_id, planned) in details {
            let needs = Self::requirements(&mut conn, item_id, planned).await?;
            for need in needs {
                let component = ItemRepository::get(&mut conn, need.component_item_id).await?;
                let mut stock = Decimal::ZERO;
                for code in Stage::Assembling.route().sources {
                    stock += LotStore::sum_available(
                        &mut conn,
                        warehouses.id(*code)?,
                        need.component_item_id,
                        Some(production_order_id),
                    )
                    .await?;
                }
                lines.push(RequirementLine {
                    detail_id,
                    component_item_id: need.component_item_id,
                    component_name: component.name,
                    quantity_per_unit: need.quantity_per_unit,
                    gross_need: need.gross_need,
                    stock,
                    net_need: net_need(need.gross_need, stock),
                });
            }
        }

        Ok(lines)
    }
}
