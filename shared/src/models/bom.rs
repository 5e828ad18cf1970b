//! Bill of materials, product BOM and component recipes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Geometry, ItemKind};

/// BOM header; an item has at most one active BOM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bom {
    pub id: Uuid,
    pub item_id: Uuid,
    pub is_active: bool,
    /// Wood volume in m³ for one unit of the owning item
    pub total_wood_volume: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One component line of a BOM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomLine {
    pub component_item_id: Uuid,
    /// Quantity of the component per one unit of the owning item
    pub quantity: Decimal,
}

/// Parent/child requirement independent of the wood-volume BOM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductBom {
    pub parent_item_id: Uuid,
    pub child_item_id: Uuid,
    pub quantity: Decimal,
}

/// Maps a component to the single raw material it is cut from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentRecipe {
    pub component_item_id: Uuid,
    pub material_item_id: Uuid,
    pub quantity_per_unit: Decimal,
}

/// A BOM line joined with its component's category and dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WoodLine {
    pub kind: ItemKind,
    pub geometry: Geometry,
    pub quantity: Decimal,
}
