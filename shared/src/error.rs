//! Errors raised by the pure engine

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Failures detected while planning a stock movement
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Insufficient stock for {item_name}: required {required}, available {available}")]
    InsufficientStock {
        item_id: Uuid,
        item_name: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("No material recipe configured for component {component_name}")]
    RecipeMissing {
        component_item_id: Uuid,
        component_name: String,
    },

    #[error("Producing {attempted} more would exceed the planned {planned} (already produced {produced})")]
    OverProduction {
        planned: Decimal,
        produced: Decimal,
        attempted: Decimal,
    },

    #[error("Invalid quantity for {field}: {reason}")]
    InvalidQuantity { field: String, reason: String },
}

impl EngineError {
    /// Quantity still missing for an `InsufficientStock` failure
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            EngineError::InsufficientStock {
                required,
                available,
                ..
            } => Some((*required - *available).max(Decimal::ZERO)),
            _ => None,
        }
    }
}

/// Result of a pure FIFO plan that could not be covered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub required: Decimal,
    pub available: Decimal,
}

impl Shortfall {
    pub fn missing(&self) -> Decimal {
        self.required - self.available
    }

    /// Attach the item identity for a user-facing error
    pub fn into_error(self, item_id: Uuid, item_name: impl Into<String>) -> EngineError {
        EngineError::InsufficientStock {
            item_id,
            item_name: item_name.into(),
            required: self.required,
            available: self.available,
        }
    }
}
