//! Reporting handlers for stock export

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use shared::PIPELINE_ROLES;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::ReportingService;
use crate::AppState;

/// Export consolidated stock as CSV
pub async fn export_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = ReportingService::new(state.repo);
    let csv = service.export_stock().await?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv"), (header::CONTENT_DISPOSITION, "attachment; filename=\"stock.csv\"")],
        csv,
    ))
}
