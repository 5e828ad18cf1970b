//! Property tests for the warehouse directory and error responses

use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::{Warehouse, WarehouseCode};
use shared::EngineError;
use uuid::Uuid;
use woodflow_backend::error::AppError;
use woodflow_backend::WarehouseDirectory;

fn quantity() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..=4).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Directory holding the codes selected by the low ten bits of `mask`
fn directory(mask: u16) -> (WarehouseDirectory, Vec<Warehouse>) {
    let warehouses: Vec<Warehouse> = WarehouseCode::ALL
        .into_iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, code)| Warehouse {
            id: Uuid::new_v4(),
            code,
            name: code.to_string(),
        })
        .collect();
    (WarehouseDirectory::new(warehouses.clone()), warehouses)
}

fn body_of(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let bytes = runtime
        .block_on(to_bytes(response.into_body(), 64 * 1024))
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_directory_reports_exactly_the_absent_codes(mask in 0u16..1024) {
        let (directory, present) = directory(mask);

        let missing = directory.missing();
        prop_assert_eq!(missing.len() + present.len(), WarehouseCode::ALL.len());
        prop_assert_eq!(directory.is_complete(), present.len() == WarehouseCode::ALL.len());

        for warehouse in &present {
            prop_assert_eq!(directory.id(warehouse.code).unwrap(), warehouse.id);
            prop_assert_eq!(directory.code_of(warehouse.id), Some(warehouse.code));
        }
        for code in missing {
            prop_assert!(matches!(directory.id(code), Err(AppError::ConfigurationMissing(_))));
        }
    }

    #[test]
    fn prop_shortfall_is_never_negative(required in quantity(), available in quantity()) {
        let err: AppError = EngineError::InsufficientStock {
            item_id: Uuid::new_v4(),
            item_name: "Dudukan".to_string(),
            required,
            available,
        }
        .into();
        let (status, body) = body_of(err);

        prop_assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        prop_assert_eq!(&body["error"]["code"], "INSUFFICIENT_STOCK");
        let raw = &body["error"]["details"]["shortfall"];
        let shortfall: Decimal = raw
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string())
            .parse()
            .unwrap();
        prop_assert_eq!(shortfall, (required - available).max(Decimal::ZERO));
    }

    #[test]
    fn prop_over_production_is_rejected_on_quantity(
        planned in quantity(),
        produced in quantity(),
        attempted in quantity(),
    ) {
        let err: AppError = EngineError::OverProduction { planned, produced, attempted }.into();
        let (status, body) = body_of(err);

        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(&body["error"]["field"], "quantity");
        prop_assert!(body["error"].get("retryable").is_none());
    }
}
