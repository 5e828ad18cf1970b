//! Input validation for the production engine
//!
//! Quantities are rejected, never silently rounded: a caller that sends more
//! decimal places than the ledger stores gets an error back.

use rust_decimal::Decimal;

use crate::models::{ItemScope, WarehouseCode};
use crate::types::{QUANTITY_SCALE, VOLUME_SCALE};

// ============================================================================
// Quantity Validations
// ============================================================================

fn check_positive(value: Decimal, max_scale: u32) -> Result<(), &'static str> {
    if value <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    if value.normalize().scale() > max_scale {
        return Err("Quantity has more decimal places than allowed");
    }
    Ok(())
}

/// Validate a piece count (at most 4 decimal places)
pub fn validate_quantity(value: Decimal) -> Result<(), &'static str> {
    check_positive(value, QUANTITY_SCALE)
}

/// Validate a volumetric quantity in m³ (at most 6 decimal places)
pub fn validate_volume(value: Decimal) -> Result<(), &'static str> {
    check_positive(value, VOLUME_SCALE)
}

/// Validate the quantity a stage moves. Material stages carry volumes,
/// every other scope carries pieces.
pub fn validate_stage_quantity(scope: ItemScope, value: Decimal) -> Result<(), &'static str> {
    match scope {
        ItemScope::Material => validate_volume(value),
        ItemScope::Finished | ItemScope::Component => validate_quantity(value),
    }
}

/// Validate a BOM or recipe ratio (at most 6 decimal places)
pub fn validate_ratio(value: Decimal) -> Result<(), &'static str> {
    check_positive(value, VOLUME_SCALE)
}

/// Validate a signed manual adjustment
pub fn validate_adjustment(value: Decimal) -> Result<(), &'static str> {
    if value.is_zero() {
        return Err("Adjustment cannot be zero");
    }
    if value.normalize().scale() > VOLUME_SCALE {
        return Err("Quantity has more decimal places than allowed");
    }
    Ok(())
}

// ============================================================================
// Reference Validations
// ============================================================================

/// Validate and parse a warehouse code
pub fn validate_warehouse_code(code: &str) -> Result<WarehouseCode, &'static str> {
    code.parse::<WarehouseCode>()
        .map_err(|_| "Unknown warehouse code")
}

/// Validate an opaque document number (production order, sales order)
pub fn validate_document_number(number: &str) -> Result<(), &'static str> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return Err("Document number is required");
    }
    if trimmed.len() > 50 {
        return Err("Document number must be at most 50 characters");
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Document number contains control characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Quantity Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_quantity_valid() {
        assert!(validate_quantity(dec("1")).is_ok());
        assert!(validate_quantity(dec("12.5")).is_ok());
        assert!(validate_quantity(dec("0.0001")).is_ok());
    }

    #[test]
    fn test_validate_quantity_rejects_non_positive() {
        assert!(validate_quantity(Decimal::ZERO).is_err());
        assert!(validate_quantity(dec("-3")).is_err());
    }

    #[test]
    fn test_validate_quantity_rejects_extra_precision() {
        assert!(validate_quantity(dec("0.00001")).is_err());
        // trailing zeros do not count
        assert!(validate_quantity(dec("2.500000")).is_ok());
    }

    #[test]
    fn test_validate_volume_allows_six_places() {
        assert!(validate_volume(dec("0.000125")).is_ok());
        assert!(validate_volume(dec("0.0000001")).is_err());
    }

    #[test]
    fn test_stage_quantity_precision_follows_scope() {
        assert!(validate_stage_quantity(ItemScope::Material, dec("0.000125")).is_ok());
        assert!(validate_stage_quantity(ItemScope::Finished, dec("0.000125")).is_err());
        assert!(validate_stage_quantity(ItemScope::Component, dec("0.000125")).is_err());
        assert!(validate_stage_quantity(ItemScope::Component, dec("2.5")).is_ok());
        assert!(validate_stage_quantity(ItemScope::Material, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_validate_ratio() {
        assert!(validate_ratio(dec("0.0125")).is_ok());
        assert!(validate_ratio(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_validate_adjustment_signed() {
        assert!(validate_adjustment(dec("-4")).is_ok());
        assert!(validate_adjustment(dec("4")).is_ok());
        assert!(validate_adjustment(Decimal::ZERO).is_err());
    }

    // ========================================================================
    // Reference Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_warehouse_code() {
        assert_eq!(validate_warehouse_code("packing"), Ok(WarehouseCode::Packing));
        assert!(validate_warehouse_code("GUDANG-1").is_err());
    }

    #[test]
    fn test_validate_document_number() {
        assert!(validate_document_number("PO/2024/0001").is_ok());
        assert!(validate_document_number("   ").is_err());
        assert!(validate_document_number(&"X".repeat(51)).is_err());
        assert!(validate_document_number("PO\n1").is_err());
    }
}
