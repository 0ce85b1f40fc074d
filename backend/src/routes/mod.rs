//! Route definitions for the stock ledger API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Largest accepted stock export upload
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Protected routes - stock import, reconciliation and ledger
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - warehouse directory
        .nest("/warehouses", warehouse_routes(state.clone()))
        // Protected routes - team directory
        .nest("/teams", team_routes(state))
}

/// Stock routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/import",
            post(handlers::import_stock).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/reconcile", post(handlers::reconcile))
        .route("/errors", get(handlers::list_stock_errors))
        .route(
            "/errors/:error_id",
            get(handlers::get_stock_error).put(handlers::resolve_stock_error),
        )
        .route(
            "/products",
            get(handlers::list_stock_products).post(handlers::create_stock_product),
        )
        .route(
            "/products/:product_id",
            get(handlers::get_stock_product).delete(handlers::delete_stock_product),
        )
        .route("/products/:product_id/increment", post(handlers::increment_stock))
        .route("/products/:product_id/correction", put(handlers::correct_stock))
        .route("/history", get(handlers::list_stock_history))
        .route("/export", get(handlers::export_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Warehouse routes (protected)
fn warehouse_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse).delete(handlers::delete_warehouse),
        )
        .route("/:warehouse_id/products", get(handlers::list_warehouse_products))
        .route(
            "/:warehouse_id/teams/:team_id",
            put(handlers::assign_team).delete(handlers::unassign_team),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Team routes (protected)
fn team_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_teams).post(handlers::create_team))
        .route(
            "/:team_id",
            get(handlers::get_team).delete(handlers::delete_team),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
