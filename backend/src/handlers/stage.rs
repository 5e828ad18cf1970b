//! HTTP handlers for stage processing

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::Stage;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::{check_permission, CurrentUser},
    services::stage::{ProcessStageInput, RejectInput, StageService},
    AppState,
};

fn service(state: AppState) -> StageService {
    StageService::new(state.db, state.warehouses, state.config.engine.lock_timeout_ms)
}

fn parse_stage(stage: &str) -> AppResult<Stage> {
    stage
        .parse()
        .map_err(|msg: String| AppError::validation("stage", msg, "Tahap produksi tidak dikenal"))
}

/// Process a quantity through a stage
pub async fn process_stage(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(stage): Path<String>,
    Json(input): Json<ProcessStageInput>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "write")?;
    let stage = parse_stage(&stage)?;
    let result = service(state).process(stage, input, user.0.user_id).await?;
    Ok(Json(result))
}

/// Write off damaged assembling components
pub async fn reject_components(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<RejectInput>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "write")?;
    let result = service(state).reject(input, user.0.user_id).await?;
    Ok(Json(result))
}

/// Stock available to a stage for every detail of an order
pub async fn get_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((stage, production_order_id)): Path<(String, Uuid)>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "read")?;
    let stage = parse_stage(&stage)?;
    let lines = service(state).availability(stage, production_order_id).await?;
    Ok(Json(lines))
}

#[derive(Debug, Deserialize)]
pub struct BottleneckQuery {
    pub quantity: Option<Decimal>,
}

/// Component sufficiency for assembling a detail
pub async fn get_bottleneck(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(detail_id): Path<Uuid>,
    Query(query): Query<BottleneckQuery>,
) -> AppResult<impl IntoResponse> {
    check_permission(&user.0, "production", "read")?;
    let view = service(state).bottleneck(detail_id, query.quantity).await?;
    Ok(Json(view))
}
