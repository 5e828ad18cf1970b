//! Warehouse directory resolved once at startup

use std::collections::HashMap;

use shared::models::{Warehouse, WarehouseCode};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    code: String,
    name: String,
}

/// Maps stage warehouse codes to their database ids and back
#[derive(Debug, Clone, Default)]
pub struct WarehouseDirectory {
    by_code: HashMap<WarehouseCode, Warehouse>,
    by_id: HashMap<Uuid, WarehouseCode>,
}

impl WarehouseDirectory {
    pub fn new(warehouses: Vec<Warehouse>) -> Self {
        let mut directory = Self::default();
        for warehouse in warehouses {
            directory.by_id.insert(warehouse.id, warehouse.code);
            directory.by_code.insert(warehouse.code, warehouse);
        }
        directory
    }

    /// Load every warehouse with a known stage code.
    ///
    /// Rows with unknown codes are ignored; codes without a row are reported
    /// at startup and fail the request that needs them.
    pub async fn load(db: &PgPool) -> AppResult<Self> {
        let rows = sqlx::query_as::<_, WarehouseRow>("SELECT id, code, name FROM warehouses")
            .fetch_all(db)
            .await?;

        let warehouses = rows
            .into_iter()
            .filter_map(|row| match row.code.parse::<WarehouseCode>() {
                Ok(code) => Some(Warehouse {
                    id: row.id,
                    code,
                    name: row.name,
                }),
                Err(_) => {
                    tracing::debug!(code = %row.code, "Skipping warehouse outside the production pipeline");
                    None
                }
            })
            .collect();

        let directory = Self::new(warehouses);
        for code in directory.missing() {
            tracing::warn!(%code, "Stage warehouse is not configured");
        }
        Ok(directory)
    }

    pub fn get(&self, code: WarehouseCode) -> AppResult<&Warehouse> {
        self.by_code
            .get(&code)
            .ok_or_else(|| AppError::ConfigurationMissing(code.to_string()))
    }

    pub fn id(&self, code: WarehouseCode) -> AppResult<Uuid> {
        self.get(code).map(|w| w.id)
    }

    pub fn code_of(&self, id: Uuid) -> Option<WarehouseCode> {
        self.by_id.get(&id).copied()
    }

    /// Codes from the routing table with no warehouse row
    pub fn missing(&self) -> Vec<WarehouseCode> {
        WarehouseCode::ALL
            .into_iter()
            .filter(|code| !self.by_code.contains_key(code))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}
