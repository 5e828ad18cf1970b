//! Production orders, their details and stage progress

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Stage;

/// Lifecycle of a production order.
///
/// Serialized as `draft`, `on_progress`, `completed_<stage>` or `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ProductionOrderStatus {
    Draft,
    OnProgress,
    CompletedStage(Stage),
    Completed,
}

impl ProductionOrderStatus {
    pub fn as_string(&self) -> String {
        match self {
            ProductionOrderStatus::Draft => "draft".to_string(),
            ProductionOrderStatus::OnProgress => "on_progress".to_string(),
            ProductionOrderStatus::CompletedStage(stage) => format!("completed_{}", stage.as_str()),
            ProductionOrderStatus::Completed => "completed".to_string(),
        }
    }

    /// Ordering key; a status may only be replaced by one with a higher rank
    pub fn rank(&self) -> u16 {
        match self {
            ProductionOrderStatus::Draft => 0,
            ProductionOrderStatus::OnProgress => 1,
            ProductionOrderStatus::CompletedStage(stage) => 2 + u16::from(stage.rank()),
            ProductionOrderStatus::Completed => u16::MAX,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ProductionOrderStatus::Completed)
    }
}

impl std::str::FromStr for ProductionOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProductionOrderStatus::Draft),
            "on_progress" => Ok(ProductionOrderStatus::OnProgress),
            "completed" => Ok(ProductionOrderStatus::Completed),
            other => other
                .strip_prefix("completed_")
                .and_then(|stage| stage.parse::<Stage>().ok())
                .map(ProductionOrderStatus::CompletedStage)
                .ok_or_else(|| format!("unknown production order status: {}", other)),
        }
    }
}

impl std::fmt::Display for ProductionOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<ProductionOrderStatus> for String {
    fn from(status: ProductionOrderStatus) -> Self {
        status.as_string()
    }
}

impl TryFrom<String> for ProductionOrderStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Production order header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: Uuid,
    /// Document number, opaque to the engine
    pub number: String,
    pub sales_order_id: Option<Uuid>,
    pub status: ProductionOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Planned and produced quantity of one item within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrderDetail {
    pub id: Uuid,
    pub production_order_id: Uuid,
    pub item_id: Uuid,
    pub quantity_planned: Decimal,
    /// Finished units assembled so far
    pub quantity_produced: Decimal,
}

impl ProductionOrderDetail {
    pub fn remaining(&self) -> Decimal {
        (self.quantity_planned - self.quantity_produced).max(Decimal::ZERO)
    }
}

/// Produced counter of one stage for one item of a detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgress {
    pub detail_id: Uuid,
    pub stage: Stage,
    pub item_id: Uuid,
    pub quantity_planned: Decimal,
    pub quantity_produced: Decimal,
}

/// What a production log record describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductionLogKind {
    Process,
    Reject,
}

impl ProductionLogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionLogKind::Process => "process",
            ProductionLogKind::Reject => "reject",
        }
    }
}

impl std::str::FromStr for ProductionLogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(ProductionLogKind::Process),
            "reject" => Ok(ProductionLogKind::Reject),
            other => Err(format!("unknown production log kind: {}", other)),
        }
    }
}

/// Traceability record of one stage run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionLog {
    pub id: Uuid,
    pub production_order_id: Uuid,
    pub detail_id: Uuid,
    pub stage: Stage,
    pub kind: ProductionLogKind,
    /// Single consumed item; empty for assembling runs, which consume
    /// several components
    pub input_item_id: Option<Uuid>,
    pub input_quantity: Option<Decimal>,
    pub output_item_id: Option<Uuid>,
    pub output_quantity: Decimal,
    pub sources: Vec<crate::engine::SourceUsage>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(ProductionOrderStatus::OnProgress.as_string(), "on_progress");
        assert_eq!(
            ProductionOrderStatus::CompletedStage(Stage::Assembling).as_string(),
            "completed_assembling"
        );
        assert_eq!(
            "completed_finishing".parse::<ProductionOrderStatus>(),
            Ok(ProductionOrderStatus::CompletedStage(Stage::Finishing))
        );
        assert!("completed_varnish".parse::<ProductionOrderStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        let json = serde_json::to_string(&ProductionOrderStatus::CompletedStage(Stage::Sanding)).unwrap();
        assert_eq!(json, "\"completed_sanding\"");
        let back: ProductionOrderStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(back, ProductionOrderStatus::Draft);
    }

    #[test]
    fn test_status_ranks_follow_pipeline() {
        let draft = ProductionOrderStatus::Draft.rank();
        let running = ProductionOrderStatus::OnProgress.rank();
        let assembled = ProductionOrderStatus::CompletedStage(Stage::Assembling).rank();
        let finished = ProductionOrderStatus::CompletedStage(Stage::Finishing).rank();
        let done = ProductionOrderStatus::Completed.rank();
        assert!(draft < running && running < assembled && assembled < finished && finished < done);
    }
}
