//! HTTP handlers for lots, the stock ledger and adjustments

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::types::Pagination;

use crate::{
    error::AppResult,
    middleware::{check_permission, CurrentUser},
    services::inventory::{AdjustmentInput, InventoryService, LedgerQuery, LotQuery},
    AppState,
};

fn service(state: AppState) -> InventoryService {
    InventoryService::new(state.db, state.warehouses, state.config.engine.lock_timeout_ms)
}

/// List lots
pub async fn list_lots(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<LotQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "inventory", "read")?;
    let lots = service(state).lots(query, pagination).await?;
    Ok(Json(lots))
}

/// List ledger entries
pub async fn list_ledger(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<LedgerQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "inventory", "read")?;
    let entries = service(state).ledger(query, pagination).await?;
    Ok(Json(entries))
}

/// Record a manual stock adjustment
pub async fn create_adjustment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "inventory", "adjust")?;
    let result = service(state).adjust(input, user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}
