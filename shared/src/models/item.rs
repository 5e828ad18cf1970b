//! Item master data as seen by the production engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{cubic_mm_per_cubic_m, round_volume};

/// A tradeable good, from raw log to packed product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: ItemKind,
    pub unit: String,
    pub geometry: Geometry,
    pub volume_m3: Option<Decimal>,
    /// Legacy aggregate counter; lots are authoritative
    pub stock: Decimal,
}

/// Category of an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    RawLog,
    /// Rough sawn timber (RST)
    SawnTimber,
    /// Surfaced four sides board
    S4sBoard,
    WoodComponent,
    Hardware,
    WhiteBody,
    FinishedGood,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::RawLog => "raw_log",
            ItemKind::SawnTimber => "sawn_timber",
            ItemKind::S4sBoard => "s4s_board",
            ItemKind::WoodComponent => "wood_component",
            ItemKind::Hardware => "hardware",
            ItemKind::WhiteBody => "white_body",
            ItemKind::FinishedGood => "finished_good",
        }
    }

    /// Whether the category counts toward a BOM's wood volume
    pub fn is_raw_wood(&self) -> bool {
        matches!(
            self,
            ItemKind::RawLog | ItemKind::SawnTimber | ItemKind::S4sBoard | ItemKind::WoodComponent
        )
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw_log" => Ok(ItemKind::RawLog),
            "sawn_timber" => Ok(ItemKind::SawnTimber),
            "s4s_board" => Ok(ItemKind::S4sBoard),
            "wood_component" => Ok(ItemKind::WoodComponent),
            "hardware" => Ok(ItemKind::Hardware),
            "white_body" => Ok(ItemKind::WhiteBody),
            "finished_good" => Ok(ItemKind::FinishedGood),
            other => Err(format!("unknown item kind: {}", other)),
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical dimensions in millimetres
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    pub length_mm: Option<Decimal>,
    pub width_mm: Option<Decimal>,
    pub thickness_mm: Option<Decimal>,
    pub diameter_mm: Option<Decimal>,
}

impl Geometry {
    pub fn board(length_mm: Decimal, width_mm: Decimal, thickness_mm: Decimal) -> Self {
        Self {
            length_mm: Some(length_mm),
            width_mm: Some(width_mm),
            thickness_mm: Some(thickness_mm),
            diameter_mm: None,
        }
    }

    /// Volume of one piece in m³, `(L × W × T) / 1e9`
    ///
    /// Returns `None` unless all three board dimensions are known.
    pub fn board_volume_m3(&self) -> Option<Decimal> {
        let (l, w, t) = (self.length_mm?, self.width_mm?, self.thickness_mm?);
        Some(round_volume(l * w * t / cubic_mm_per_cubic_m()))
    }
}
