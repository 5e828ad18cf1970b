//! HTTP handlers for production orders

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::{check_permission, CurrentUser},
    services::ProductionService,
    AppState,
};

/// Get a production order with details and stage progress
pub async fn get_production_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "read")?;
    let view = ProductionService::new(state.db).get(id).await?;
    Ok(Json(view))
}

/// Mark a production order as in progress
pub async fn start_production_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "write")?;
    let order = ProductionService::new(state.db).start(id).await?;
    Ok(Json(order))
}

/// Gross and net component needs
pub async fn get_requirements(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "read")?;
    let lines = ProductionService::new(state.db)
        .requirements(&state.warehouses, id)
        .await?;
    Ok(Json(lines))
}

/// Production log records
pub async fn get_production_logs(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "read")?;
    let logs = ProductionService::new(state.db).logs(id).await?;
    Ok(Json(logs))
}
