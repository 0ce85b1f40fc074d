//! HTTP handlers for warehouses and teams

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::{StockProduct, Team, Warehouse, PIPELINE_ROLES};

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::directory::{CreateTeamInput, CreateWarehouseInput, DirectoryService};
use crate::AppState;

// ============================================================================
// Warehouses
// ============================================================================

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = DirectoryService::new(state.repo);
    let warehouse = service.create_warehouse(input).await?;
    Ok(Json(warehouse))
}

/// List warehouses
pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Warehouse>>> {
    let service = DirectoryService::new(state.repo);
    let warehouses = service.list_warehouses().await?;
    Ok(Json(warehouses))
}

/// Get a warehouse by ID
pub async fn get_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let service = DirectoryService::new(state.repo);
    let warehouse = service.get_warehouse(warehouse_id).await?;
    Ok(Json(warehouse))
}

/// List the products held by a warehouse
pub async fn list_warehouse_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockProduct>>> {
    let service = DirectoryService::new(state.repo);
    let products = service.list_warehouse_products(warehouse_id).await?;
    Ok(Json(products))
}

/// Delete a warehouse
pub async fn delete_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = DirectoryService::new(state.repo);
    service.delete_warehouse(warehouse_id).await?;
    Ok(Json(()))
}

/// Assign a team to a warehouse
pub async fn assign_team(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((warehouse_id, team_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Warehouse>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = DirectoryService::new(state.repo);
    let warehouse = service.assign_team(warehouse_id, team_id).await?;
    Ok(Json(warehouse))
}

/// Remove a team from a warehouse
pub async fn unassign_team(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((warehouse_id, team_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Warehouse>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = DirectoryService::new(state.repo);
    let warehouse = service.unassign_team(warehouse_id, team_id).await?;
    Ok(Json(warehouse))
}

// ============================================================================
// Teams
// ============================================================================

/// Create a team
pub async fn create_team(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTeamInput>,
) -> AppResult<Json<Team>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = DirectoryService::new(state.repo);
    let team = service.create_team(input).await?;
    Ok(Json(team))
}

/// List teams
pub async fn list_teams(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Team>>> {
    let service = DirectoryService::new(state.repo);
    let teams = service.list_teams().await?;
    Ok(Json(teams))
}

/// Get a team by ID
pub async fn get_team(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<Team>> {
    let service = DirectoryService::new(state.repo);
    let team = service.get_team(team_id).await?;
    Ok(Json(team))
}

/// Delete a team
pub async fn delete_team(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_role(&current_user.0, PIPELINE_ROLES)?;
    let service = DirectoryService::new(state.repo);
    service.delete_team(team_id).await?;
    Ok(Json(()))
}
