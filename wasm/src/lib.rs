//! WebAssembly module for the Woodflow production engine
//!
//! Runs the same planning rules as the server so the planning screens can
//! preview a stage run before submitting it:
//! - Assembling bottleneck per component
//! - FIFO draws over a candidate pool
//! - BOM wood volume
//! - Quantity input checks

use std::str::FromStr;

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::engine::{bottleneck, plan_fifo, wood_volume, CandidateLot, ComponentStock};
use shared::models::{Geometry, Stage, WoodLine};
use shared::validation::validate_quantity;

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn bottleneck_json(stock_json: &str, requested: Option<&str>) -> Result<String, String> {
    let stock: Vec<ComponentStock> =
        serde_json::from_str(stock_json).map_err(|e| format!("Invalid stock JSON: {}", e))?;
    let requested = requested.map(|q| parse_decimal("quantity", q)).transpose()?;
    let report = bottleneck(&stock, requested);
    serde_json::to_string(&report).map_err(|e| e.to_string())
}

fn fifo_json(required: &str, pool_json: &str) -> Result<String, String> {
    let required = parse_decimal("quantity", required)?;
    validate_quantity(required).map_err(str::to_string)?;
    let pool: Vec<CandidateLot> =
        serde_json::from_str(pool_json).map_err(|e| format!("Invalid pool JSON: {}", e))?;
    let plan = plan_fifo(required, &pool).map_err(|shortfall| {
        format!(
            "Insufficient stock: required {}, available {}",
            shortfall.required, shortfall.available
        )
    })?;
    serde_json::to_string(&plan).map_err(|e| e.to_string())
}

fn wood_volume_of(lines_json: &str) -> Result<String, String> {
    let lines: Vec<WoodLine> =
        serde_json::from_str(lines_json).map_err(|e| format!("Invalid BOM lines JSON: {}", e))?;
    Ok(wood_volume(&lines).to_string())
}

fn board_volume_of(length_mm: &str, width_mm: &str, thickness_mm: &str) -> Result<Option<String>, String> {
    let geometry = Geometry::board(
        parse_decimal("length", length_mm)?,
        parse_decimal("width", width_mm)?,
        parse_decimal("thickness", thickness_mm)?,
    );
    Ok(geometry.board_volume_m3().map(|v| v.to_string()))
}

fn source_codes(stage: &str) -> Result<Vec<&'static str>, String> {
    let stage = Stage::from_str(stage)?;
    Ok(stage.route().sources.iter().map(|c| c.as_str()).collect())
}

/// Bottleneck report as JSON; `requested` is an optional decimal string
#[wasm_bindgen]
pub fn assembling_bottleneck(stock_json: &str, requested: Option<String>) -> Result<String, JsValue> {
    bottleneck_json(stock_json, requested.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// FIFO draws for `required` over a pool already in priority order
#[wasm_bindgen]
pub fn preview_fifo(required: &str, pool_json: &str) -> Result<String, JsValue> {
    fifo_json(required, pool_json).map_err(|e| {
        web_sys::console::warn_1(&JsValue::from_str(&e));
        JsValue::from_str(&e)
    })
}

/// Wood volume in m³ of one unit built from the given BOM lines
#[wasm_bindgen]
pub fn bom_wood_volume(lines_json: &str) -> Result<String, JsValue> {
    wood_volume_of(lines_json).map_err(|e| JsValue::from_str(&e))
}

/// Volume in m³ of one board, undefined when a dimension is missing
#[wasm_bindgen]
pub fn board_volume(length_mm: &str, width_mm: &str, thickness_mm: &str) -> Result<Option<String>, JsValue> {
    board_volume_of(length_mm, width_mm, thickness_mm).map_err(|e| JsValue::from_str(&e))
}

/// Error message for a piece quantity, or undefined when valid
#[wasm_bindgen]
pub fn check_quantity(value: &str) -> Option<String> {
    match parse_decimal("quantity", value) {
        Ok(quantity) => validate_quantity(quantity).err().map(str::to_string),
        Err(e) => Some(e),
    }
}

/// Source warehouse codes of a stage, highest priority first
#[wasm_bindgen]
pub fn stage_sources(stage: &str) -> Result<js_sys::Array, JsValue> {
    let codes = source_codes(stage).map_err(|e| JsValue::from_str(&e))?;
    Ok(codes.into_iter().map(JsValue::from_str).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn dec(value: &Value) -> Decimal {
        Decimal::from_str(value.as_str().unwrap()).unwrap()
    }

    #[test]
    fn test_bottleneck_json() {
        let stock = r#"[
            {"component_item_id":"7d1f3f5e-8a5c-4a43-9f0b-1c1e2b3d4a01","quantity_per_unit":"2","available":"10"},
            {"component_item_id":"7d1f3f5e-8a5c-4a43-9f0b-1c1e2b3d4a02","quantity_per_unit":"3","available":"9"}
        ]"#;
        let report: Value = serde_json::from_str(&bottleneck_json(stock, None).unwrap()).unwrap();
        assert_eq!(dec(&report["producible"]), Decimal::from(3));

        let report: Value = serde_json::from_str(&bottleneck_json(stock, Some("4")).unwrap()).unwrap();
        assert_eq!(report["sufficient"], false);
    }

    #[test]
    fn test_fifo_preview_reports_shortfall() {
        let pool = r#"[
            {"lot_id":"7d1f3f5e-8a5c-4a43-9f0b-1c1e2b3d4a11","warehouse_id":"7d1f3f5e-8a5c-4a43-9f0b-1c1e2b3d4a21","warehouse_code":"MESIN","seq":1,"quantity":"5"},
            {"lot_id":"7d1f3f5e-8a5c-4a43-9f0b-1c1e2b3d4a12","warehouse_id":"7d1f3f5e-8a5c-4a43-9f0b-1c1e2b3d4a21","warehouse_code":"MESIN","seq":2,"quantity":"5"}
        ]"#;
        let plan: Value = serde_json::from_str(&fifo_json("7", pool).unwrap()).unwrap();
        let draws = plan["draws"].as_array().unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(dec(&draws[0]["quantity"]), Decimal::from(5));
        assert_eq!(dec(&draws[1]["quantity"]), Decimal::from(2));

        let err = fifo_json("11", pool).unwrap_err();
        assert!(err.contains("available 10"));
    }

    #[test]
    fn test_fifo_preview_rejects_bad_quantity() {
        assert!(fifo_json("0", "[]").is_err());
        assert!(fifo_json("abc", "[]").is_err());
    }

    #[test]
    fn test_check_quantity() {
        assert_eq!(check_quantity("12.5"), None);
        assert!(check_quantity("0").is_some());
        assert!(check_quantity("1.23456").is_some());
        assert!(check_quantity("twelve").is_some());
    }

    #[test]
    fn test_board_volume() {
        let volume = board_volume_of("2000", "100", "50").unwrap().unwrap();
        assert_eq!(Decimal::from_str(&volume).unwrap(), Decimal::new(1, 2));
    }

    #[test]
    fn test_stage_sources() {
        assert_eq!(
            source_codes("finishing").unwrap(),
            vec!["ASSEMBLING", "SANDING", "RUSTIK"]
        );
        assert!(source_codes("varnish").is_err());
    }
}
