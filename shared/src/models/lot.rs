//! Lots: the current quantity of one item in one warehouse

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quantity of one item sitting in one warehouse.
///
/// Lots tagged with a production order hold that order's work in process;
/// untagged lots are a shared buffer. A lot is never deleted, even at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    /// Creation sequence, breaks ties between lots created in the same instant
    pub seq: i64,
    pub warehouse_id: Uuid,
    pub item_id: Uuid,
    pub production_order_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub qty: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity tuple of a lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LotKey {
    pub warehouse_id: Uuid,
    pub item_id: Uuid,
    pub production_order_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

impl Lot {
    pub fn key(&self) -> LotKey {
        LotKey {
            warehouse_id: self.warehouse_id,
            item_id: self.item_id,
            production_order_id: self.production_order_id,
            product_id: self.product_id,
        }
    }

    /// Whether an allocation for `production_order_id` may draw from this lot
    pub fn is_visible_to(&self, production_order_id: Option<Uuid>) -> bool {
        match self.production_order_id {
            None => true,
            Some(owner) => Some(owner) == production_order_id,
        }
    }
}

/// Stock of one item in one warehouse, summed over lots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseStock {
    pub warehouse_id: Uuid,
    pub warehouse_code: super::WarehouseCode,
    pub quantity: Decimal,
}
