//! Route definitions for the Woodflow production engine

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stage processing
        .nest("/stages", stage_routes(state.clone()))
        // Protected routes - production orders
        .nest("/production-orders", production_routes(state.clone()))
        // Protected routes - lots, ledger and adjustments
        .nest("/inventory", inventory_routes(state.clone()))
        // Protected routes - bill of materials
        .nest("/boms", bom_routes(state))
}

/// Stage processing routes (protected)
fn stage_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/assembling/reject", post(handlers::reject_components))
        .route("/assembling/bottleneck/:detail_id", get(handlers::get_bottleneck))
        .route("/:stage/process", post(handlers::process_stage))
        .route(
            "/:stage/availability/:production_order_id",
            get(handlers::get_availability),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Production order routes (protected)
fn production_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:id", get(handlers::get_production_order))
        .route("/:id/start", post(handlers::start_production_order))
        .route("/:id/requirements", get(handlers::get_requirements))
        .route("/:id/logs", get(handlers::get_production_logs))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/lots", get(handlers::list_lots))
        .route("/ledger", get(handlers::list_ledger))
        .route("/adjustments", post(handlers::create_adjustment))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// BOM management routes (protected)
fn bom_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/:item_id",
            get(handlers::get_bom).put(handlers::set_bom_lines),
        )
        .route("/:item_id/lines", post(handlers::add_bom_line))
        .route(
            "/:item_id/lines/:component_item_id",
            delete(handlers::remove_bom_line),
        )
        .route("/versions/:bom_id/activate", post(handlers::activate_bom))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
