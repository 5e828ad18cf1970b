//! HTTP handlers for BOM line management

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::{check_permission, CurrentUser},
    services::bom::{BomLineInput, BomService, SetBomLinesInput},
    AppState,
};

/// Active BOM of an item
pub async fn get_bom(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "bom", "read")?;
    let bom = BomService::new(state.db).get(item_id).await?;
    Ok(Json(bom))
}

/// Replace the BOM of an item
pub async fn set_bom_lines(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<SetBomLinesInput>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "bom", "write")?;
    let bom = BomService::new(state.db).set_lines(item_id, input).await?;
    Ok(Json(bom))
}

/// Add or update one BOM line
pub async fn add_bom_line(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<BomLineInput>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "bom", "write")?;
    let bom = BomService::new(state.db).add_line(item_id, input).await?;
    Ok(Json(bom))
}

/// Remove one BOM line
pub async fn remove_bom_line(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((item_id, component_item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "bom", "write")?;
    let bom = BomService::new(state.db)
        .remove_line(item_id, component_item_id)
        .await?;
    Ok(Json(bom))
}

/// Switch an item to a stored BOM version
pub async fn activate_bom(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(bom_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "bom", "write")?;
    let bom = BomService::new(state.db).activate(bom_id).await?;
    Ok(Json(bom))
}
