//! Common types used across the engine

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for piece counts
pub const QUANTITY_SCALE: u32 = 4;

/// Decimal places kept for volumetric quantities (m³) and ratios
pub const VOLUME_SCALE: u32 = 6;

/// Cubic millimetres in one cubic metre
pub fn cubic_mm_per_cubic_m() -> Decimal {
    Decimal::from(1_000_000_000u64)
}

/// Round a derived volume to the stored precision
pub fn round_volume(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(VOLUME_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a derived consumption up to the stored precision.
///
/// Used where a ratio multiplies a quantity and the product carries more
/// places than the ledger stores; rounding up never under-consumes.
pub fn round_consumption(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(VOLUME_SCALE, RoundingStrategy::AwayFromZero)
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    50
}

impl Pagination {
    pub const MAX_PER_PAGE: u32 = 500;

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, Self::MAX_PER_PAGE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u64) -> Self {
        let per_page = pagination.limit() as u32;
        let total_pages = ((total_items + u64::from(per_page) - 1) / u64::from(per_page)) as u32;
        Self {
            page: pagination.page.max(1),
            per_page,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_pagination_offsets() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);

        let clamped = Pagination { page: 0, per_page: 10_000 };
        assert_eq!(clamped.limit(), 500);
        assert_eq!(clamped.offset(), 0);
    }

    #[test]
    fn test_pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(&Pagination { page: 1, per_page: 20 }, 41);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn test_round_consumption_never_rounds_down() {
        let raw = Decimal::from_str("0.0000001").unwrap();
        assert_eq!(round_consumption(raw), Decimal::from_str("0.000001").unwrap());
        let exact = Decimal::from_str("1.25").unwrap();
        assert_eq!(round_consumption(exact), exact);
    }
}
