//! HTTP handlers for the stock import and stock product endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use uuid::Uuid;

use shared::{ImportSummary, StockHistory, StockHistoryFilter, StockProduct, StockProductFilter, PIPELINE_ROLES};

use crate::error::{AppError, AppResult};
use crate::middleware::{require_role, CurrentUser};
use crate::services::stock::{CorrectStockInput, CreateStockProductInput, IncrementStockInput, StockService};
use crate::services::{StagedUpload, StockImportService};
use crate::AppState;

/// Multipart field carrying the export
const UPLOAD_FIELD: &str = "file";

/// Import a stock export uploaded as multipart form data
pub async fn import_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ImportSummary>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Io(format!("Unreadable upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("stock.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Io(format!("Unreadable upload: {}", e)))?;

        let upload = StagedUpload::stage(&state.config.import.upload_dir, &filename, &bytes).await?;
        let service = StockImportService::new(state.repo.clone(), &state.config.import, state.pipeline.clone());
        let summary = service.import_upload(upload).await?;
        return Ok(Json(summary));
    }

    Err(AppError::invalid_field(UPLOAD_FIELD, "No stock export uploaded"))
}

/// Create a stock product
pub async fn create_stock_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockProductInput>,
) -> AppResult<Json<StockProduct>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = StockService::new(state.repo);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// List stock products
pub async fn list_stock_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StockProductFilter>,
) -> AppResult<Json<Vec<StockProduct>>> {
    let service = StockService::new(state.repo);
    let products = service.list_products(&filter).await?;
    Ok(Json(products))
}

/// Get a stock product by ID
pub async fn get_stock_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<StockProduct>> {
    let service = StockService::new(state.repo);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Delete a stock product
pub async fn delete_stock_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<StockProduct>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = StockService::new(state.repo);
    let product = service.delete_product(product_id).await?;
    Ok(Json(product))
}

/// Apply a signed quantity change
pub async fn increment_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<IncrementStockInput>,
) -> AppResult<Json<StockProduct>> {
    let service = StockService::new(state.repo);
    let product = service.increment(product_id, input).await?;
    Ok(Json(product))
}

/// Overwrite a quantity
pub async fn correct_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<CorrectStockInput>,
) -> AppResult<Json<StockProduct>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = StockService::new(state.repo);
    let product = service.correct(product_id, input).await?;
    Ok(Json(product))
}

/// List stock history, newest first
pub async fn list_stock_history(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StockHistoryFilter>,
) -> AppResult<Json<Vec<StockHistory>>> {
    let service = StockService::new(state.repo);
    let history = service.list_history(&filter).await?;
    Ok(Json(history))
}
