//! HTTP handlers for reconciliation and stock errors

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{ReconcileSummary, StockError, StockErrorFilter, PIPELINE_ROLES};

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::reconciliation::StockErrorDetail;
use crate::services::ReconciliationService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveErrorInput {
    pub status: bool,
}

fn service(state: AppState) -> ReconciliationService {
    ReconciliationService::new(state.repo, state.pipeline, state.config.reconcile.timeout())
}

/// Run a reconciliation
pub async fn reconcile(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ReconcileSummary>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let summary = service(state).reconcile().await?;
    Ok(Json(summary))
}

/// List stock errors
pub async fn list_stock_errors(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StockErrorFilter>,
) -> AppResult<Json<Vec<StockError>>> {
    let errors = service(state).list_errors(&filter).await?;
    Ok(Json(errors))
}

/// Get a stock error with its products
pub async fn get_stock_error(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(error_id): Path<Uuid>,
) -> AppResult<Json<StockErrorDetail>> {
    let detail = service(state).get_error(error_id).await?;
    Ok(Json(detail))
}

/// Resolve or reopen a stock error
pub async fn resolve_stock_error(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(error_id): Path<Uuid>,
    Json(input): Json<ResolveErrorInput>,
) -> AppResult<Json<StockError>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let error = service(state).resolve_error(error_id, input.status).await?;
    Ok(Json(error))
}
