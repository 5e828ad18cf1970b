//! Production stages and their routing table
//!
//! Every stage draws from a fixed, ordered list of source warehouses and
//! pushes into exactly one destination. The table below is the single place
//! that knows which codes a stage may touch.

use serde::{Deserialize, Serialize};

use super::WarehouseCode;

/// A step of the production pipeline, in pipeline order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Kiln drying of sawn timber
    Candy = 0,
    /// Rough cutting and planing into S4S stock
    Pembahanan = 1,
    Moulding = 2,
    /// Component fabrication on the machine floor
    OperatorMesin = 3,
    Assembling = 4,
    Sanding = 5,
    Rustik = 6,
    Finishing = 7,
    Packing = 8,
}

/// How a stage transforms its input
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Same item moves from a source buffer to the destination
    Transfer,
    /// Components are consumed per bill of materials, the finished item is produced
    Bom,
    /// Raw material is consumed per component recipe, the component is produced
    Recipe,
}

/// Which item a stage run is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemScope {
    /// The production order detail's own item
    Finished,
    /// A component from the detail's bill of materials
    Component,
    /// A raw material reached through component recipes
    Material,
}

/// Static routing entry for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRoute {
    pub stage: Stage,
    pub kind: StageKind,
    pub scope: ItemScope,
    /// Source warehouses, highest priority first
    pub sources: &'static [WarehouseCode],
    pub destination: WarehouseCode,
}

impl StageRoute {
    pub fn permits_source(&self, code: WarehouseCode) -> bool {
        self.sources.contains(&code)
    }
}

static ROUTES: [StageRoute; 9] = [
    StageRoute {
        stage: Stage::Candy,
        kind: StageKind::Transfer,
        scope: ItemScope::Material,
        sources: &[WarehouseCode::Rst],
        destination: WarehouseCode::Kd,
    },
    StageRoute {
        stage: Stage::Pembahanan,
        kind: StageKind::Transfer,
        scope: ItemScope::Material,
        sources: &[WarehouseCode::Kd],
        destination: WarehouseCode::S4s,
    },
    StageRoute {
        stage: Stage::Moulding,
        kind: StageKind::Recipe,
        scope: ItemScope::Component,
        sources: &[WarehouseCode::S4s],
        destination: WarehouseCode::Moulding,
    },
    StageRoute {
        stage: Stage::OperatorMesin,
        kind: StageKind::Recipe,
        scope: ItemScope::Component,
        sources: &[WarehouseCode::S4s],
        destination: WarehouseCode::Mesin,
    },
    StageRoute {
        stage: Stage::Assembling,
        kind: StageKind::Bom,
        scope: ItemScope::Finished,
        sources: &[WarehouseCode::Mesin, WarehouseCode::Moulding],
        destination: WarehouseCode::Assembling,
    },
    StageRoute {
        stage: Stage::Sanding,
        kind: StageKind::Transfer,
        scope: ItemScope::Finished,
        sources: &[WarehouseCode::Assembling],
        destination: WarehouseCode::Sanding,
    },
    StageRoute {
        stage: Stage::Rustik,
        kind: StageKind::Transfer,
        scope: ItemScope::Finished,
        sources: &[WarehouseCode::Sanding, WarehouseCode::Assembling],
        destination: WarehouseCode::Rustik,
    },
    StageRoute {
        stage: Stage::Finishing,
        kind: StageKind::Transfer,
        scope: ItemScope::Finished,
        sources: &[
            WarehouseCode::Assembling,
            WarehouseCode::Sanding,
            WarehouseCode::Rustik,
        ],
        destination: WarehouseCode::Finishing,
    },
    StageRoute {
        stage: Stage::Packing,
        kind: StageKind::Transfer,
        scope: ItemScope::Finished,
        sources: &[WarehouseCode::Finishing],
        destination: WarehouseCode::Packing,
    },
];

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Candy,
        Stage::Pembahanan,
        Stage::Moulding,
        Stage::OperatorMesin,
        Stage::Assembling,
        Stage::Sanding,
        Stage::Rustik,
        Stage::Finishing,
        Stage::Packing,
    ];

    pub fn route(self) -> &'static StageRoute {
        &ROUTES[self as usize]
    }

    /// Position in the pipeline, used to keep status moving forward only
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Packing
    }

    /// The stage that first turns components into the finished item
    pub fn creates_finished_item(self) -> bool {
        self.route().kind == StageKind::Bom
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Candy => "candy",
            Stage::Pembahanan => "pembahanan",
            Stage::Moulding => "moulding",
            Stage::OperatorMesin => "operator_mesin",
            Stage::Assembling => "assembling",
            Stage::Sanding => "sanding",
            Stage::Rustik => "rustik",
            Stage::Finishing => "finishing",
            Stage::Packing => "packing",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "candy" | "kd" => Ok(Stage::Candy),
            "pembahanan" => Ok(Stage::Pembahanan),
            "moulding" => Ok(Stage::Moulding),
            "operator_mesin" | "mesin" => Ok(Stage::OperatorMesin),
            "assembling" => Ok(Stage::Assembling),
            "sanding" => Ok(Stage::Sanding),
            "rustik" => Ok(Stage::Rustik),
            "finishing" => Ok(Stage::Finishing),
            "packing" => Ok(Stage::Packing),
            other => Err(format!("unknown stage: {}", other)),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
