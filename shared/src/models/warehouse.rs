//! Warehouses and their stable short codes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable short code identifying a warehouse or production stage buffer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarehouseCode {
    /// Rough sawn timber, wet
    Rst,
    /// Kiln dried timber
    Kd,
    S4s,
    Moulding,
    Mesin,
    Assembling,
    Sanding,
    Rustik,
    Finishing,
    Packing,
}

impl WarehouseCode {
    pub const ALL: [WarehouseCode; 10] = [
        WarehouseCode::Rst,
        WarehouseCode::Kd,
        WarehouseCode::S4s,
        WarehouseCode::Moulding,
        WarehouseCode::Mesin,
        WarehouseCode::Assembling,
        WarehouseCode::Sanding,
        WarehouseCode::Rustik,
        WarehouseCode::Finishing,
        WarehouseCode::Packing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseCode::Rst => "RST",
            WarehouseCode::Kd => "KD",
            WarehouseCode::S4s => "S4S",
            WarehouseCode::Moulding => "MOULDING",
            WarehouseCode::Mesin => "MESIN",
            WarehouseCode::Assembling => "ASSEMBLING",
            WarehouseCode::Sanding => "SANDING",
            WarehouseCode::Rustik => "RUSTIK",
            WarehouseCode::Finishing => "FINISHING",
            WarehouseCode::Packing => "PACKING",
        }
    }
}

impl std::str::FromStr for WarehouseCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        WarehouseCode::ALL
            .into_iter()
            .find(|code| code.as_str() == upper)
            .ok_or_else(|| format!("unknown warehouse code: {}", s))
    }
}

impl std::fmt::Display for WarehouseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warehouse row from reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: WarehouseCode,
    pub name: String,
}
