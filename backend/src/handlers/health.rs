//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use shared::models::WarehouseCode;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub warehouses: WarehouseStatus,
}

#[derive(Serialize)]
pub struct WarehouseStatus {
    pub complete: bool,
    pub missing: Vec<WarehouseCode>,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    let missing = state.warehouses.missing();

    let complete = state.warehouses.is_complete();

    let status = if connected && complete {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        warehouses: WarehouseStatus {
            complete,
            missing,
        },
    })
}
