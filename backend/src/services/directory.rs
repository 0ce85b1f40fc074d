//! Warehouse and team directory

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use shared::{validate_directory_name, StockProduct, Team, Warehouse};

use crate::error::{AppError, AppResult};
use crate::repository::StockRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    #[serde(default)]
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamInput {
    pub name: String,
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

/// Directory service
///
/// Deleting a warehouse or a team never deletes stock products.
#[derive(Clone)]
pub struct DirectoryService {
    repo: Arc<dyn StockRepository>,
}

impl DirectoryService {
    /// Create a new DirectoryService instance
    pub fn new(repo: Arc<dyn StockRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_warehouse(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        let name = input.name.trim();
        validate_directory_name(name).map_err(|msg| AppError::invalid_field("name", msg))?;

        for team_id in &input.team_ids {
            self.require_team(*team_id).await?;
        }

        let warehouse = self.repo.create_warehouse(name, &input.team_ids).await?;
        tracing::info!(warehouse = %warehouse.id, name = %warehouse.name, "Warehouse created");
        Ok(warehouse)
    }

    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        self.repo.list_warehouses().await
    }

    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        self.repo
            .get_warehouse(warehouse_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Products listed by a warehouse, in listing order
    pub async fn list_warehouse_products(&self, warehouse_id: Uuid) -> AppResult<Vec<StockProduct>> {
        let warehouse = self.get_warehouse(warehouse_id).await?;

        let mut products = Vec::with_capacity(warehouse.list_product.len());
        for product_id in &warehouse.list_product {
            match self.repo.get_stock_product(*product_id).await? {
                Some(product) => products.push(product),
                None => tracing::warn!(warehouse = %warehouse_id, product = %product_id, "Warehouse lists a missing product"),
            }
        }
        Ok(products)
    }

    pub async fn delete_warehouse(&self, warehouse_id: Uuid) -> AppResult<()> {
        if !self.repo.delete_warehouse(warehouse_id).await? {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }
        tracing::info!(warehouse = %warehouse_id, "Warehouse deleted");
        Ok(())
    }

    /// Assign a team to a warehouse; assigning twice changes nothing
    pub async fn assign_team(&self, warehouse_id: Uuid, team_id: Uuid) -> AppResult<Warehouse> {
        self.require_team(team_id).await?;
        self.repo
            .assign_team(warehouse_id, team_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    pub async fn unassign_team(&self, warehouse_id: Uuid, team_id: Uuid) -> AppResult<Warehouse> {
        self.repo
            .unassign_team(warehouse_id, team_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    pub async fn create_team(&self, input: CreateTeamInput) -> AppResult<Team> {
        let name = input.name.trim();
        validate_directory_name(name).map_err(|msg| AppError::invalid_field("name", msg))?;

        let team = self.repo.create_team(name, &input.user_ids).await?;
        tracing::info!(team = %team.id, name = %team.name, "Team created");
        Ok(team)
    }

    pub async fn list_teams(&self) -> AppResult<Vec<Team>> {
        self.repo.list_teams().await
    }

    pub async fn get_team(&self, team_id: Uuid) -> AppResult<Team> {
        self.require_team(team_id).await
    }

    pub async fn delete_team(&self, team_id: Uuid) -> AppResult<()> {
        if !self.repo.delete_team(team_id).await? {
            return Err(AppError::NotFound("Team".to_string()));
        }
        tracing::info!(team = %team_id, "Team deleted");
        Ok(())
    }

    async fn require_team(&self, team_id: Uuid) -> AppResult<Team> {
        self.repo
            .get_team(team_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Team".to_string()))
    }
}
