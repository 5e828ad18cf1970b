//! Produced-quantity bounds and order status transitions

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{ProductionOrderStatus, Stage};

/// New produced counter after adding `add`, bounded by `planned`
pub fn record_production(planned: Decimal, produced: Decimal, add: Decimal) -> Result<Decimal, EngineError> {
    if add <= Decimal::ZERO {
        return Err(EngineError::InvalidQuantity {
            field: "quantity".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let next = produced + add;
    if next > planned {
        return Err(EngineError::OverProduction {
            planned,
            produced,
            attempted: add,
        });
    }
    Ok(next)
}

/// A draft order flips to `on_progress` on its first stage run; any other
/// status is left alone.
pub fn mark_on_progress(status: ProductionOrderStatus) -> Option<ProductionOrderStatus> {
    match status {
        ProductionOrderStatus::Draft => Some(ProductionOrderStatus::OnProgress),
        _ => None,
    }
}

/// Status reached once every detail of an order has completed `stage`.
///
/// Packing completes the whole order. Returns `None` when the order is
/// already at or past that point.
pub fn advance_status(current: ProductionOrderStatus, stage: Stage) -> Option<ProductionOrderStatus> {
    let next = if stage.is_terminal() {
        ProductionOrderStatus::Completed
    } else {
        ProductionOrderStatus::CompletedStage(stage)
    };
    (next.rank() > current.rank()).then_some(next)
}

/// Planned quantity of a detail and what has reached a stage for it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetailAggregate {
    pub planned: Decimal,
    pub reached: Decimal,
}

impl DetailAggregate {
    pub fn is_complete(&self) -> bool {
        self.reached >= self.planned
    }
}

/// A stage is complete for an order when every one of its details has
/// reached the planned quantity. An order without details never completes.
pub fn is_stage_complete(details: &[DetailAggregate]) -> bool {
    !details.is_empty() && details.iter().all(DetailAggregate::is_complete)
}
