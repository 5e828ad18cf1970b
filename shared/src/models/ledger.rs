//! Stock ledger models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Why stock moved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TransferIn,
    TransferOut,
    /// Consumed as input of a BOM or recipe
    Usage,
    /// Output of a transforming stage
    Production,
    /// Rejected or damaged material
    Waste,
    Adjustment,
    Purchase,
    Sale,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::Usage => "usage",
            TransactionType::Production => "production",
            TransactionType::Waste => "waste",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Purchase => "purchase",
            TransactionType::Sale => "sale",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_in" => Ok(TransactionType::TransferIn),
            "transfer_out" => Ok(TransactionType::TransferOut),
            "usage" => Ok(TransactionType::Usage),
            "production" => Ok(TransactionType::Production),
            "waste" => Ok(TransactionType::Waste),
            "adjustment" => Ok(TransactionType::Adjustment),
            "purchase" => Ok(TransactionType::Purchase),
            "sale" => Ok(TransactionType::Sale),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// An immutable stock ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub entry_time: NaiveTime,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub direction: Direction,
    pub transaction_type: TransactionType,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    /// Opaque document number of the originating business document
    pub reference_number: Option<String>,
    pub production_order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Net quantity of a set of ledger rows, `Σ in − Σ out`
pub fn ledger_balance(entries: &[LedgerEntry]) -> Decimal {
    entries.iter().fold(Decimal::ZERO, |acc, e| match e.direction {
        Direction::In => acc + e.quantity,
        Direction::Out => acc - e.quantity,
    })
}
