//! In-process stock repository
//!
//! Keeps records in insertion order so listings follow storage order the way
//! the Postgres tables do.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::{
    NewStockError, NewStockProduct, StockError, StockErrorFilter, StockHistory,
    StockHistoryFilter, StockKey, StockProduct, StockProductFilter, Team, Warehouse,
};

use super::StockRepository;
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct MemoryState {
    teams: Vec<Team>,
    warehouses: Vec<Warehouse>,
    products: Vec<StockProduct>,
    histories: Vec<StockHistory>,
    errors: Vec<StockError>,
}

impl MemoryState {
    fn product_mut(&mut self, product_id: Uuid) -> Option<&mut StockProduct> {
        self.products.iter_mut().find(|p| p.id == product_id)
    }

    fn keyed_product_mut(&mut self, key: &StockKey) -> Option<&mut StockProduct> {
        self.products.iter_mut().find(|p| key.matches(p))
    }

    fn warehouse_mut(&mut self, warehouse_id: Uuid) -> Option<&mut Warehouse> {
        self.warehouses.iter_mut().find(|w| w.id == warehouse_id)
    }
}

/// Stock repository holding everything in memory
#[derive(Debug, Default)]
pub struct MemoryStockRepository {
    state: RwLock<MemoryState>,
}

impl MemoryStockRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_product(product: &StockProduct, filter: &StockProductFilter) -> bool {
    filter.warehouse_id.map_or(true, |id| product.warehouse_id == id)
        && filter.team_id.map_or(true, |id| product.team_id == id)
        && filter
            .reference
            .as_deref()
            .map_or(true, |r| product.reference == r)
}

fn matches_history(entry: &StockHistory, filter: &StockHistoryFilter) -> bool {
    filter.product_id.map_or(true, |id| entry.product_id == id)
        && filter.warehouse_id.map_or(true, |id| entry.warehouse_id == id)
        && filter.team_id.map_or(true, |id| entry.team_id == id)
}

#[async_trait]
impl StockRepository for MemoryStockRepository {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_teams(&self) -> AppResult<Vec<Team>> {
        Ok(self.state.read().await.teams.clone())
    }

    async fn get_team(&self, team_id: Uuid) -> AppResult<Option<Team>> {
        let state = self.state.read().await;
        Ok(state.teams.iter().find(|t| t.id == team_id).cloned())
    }

    async fn find_team_by_name(&self, name: &str) -> AppResult<Option<Team>> {
        let state = self.state.read().await;
        Ok(state.teams.iter().find(|t| t.name == name).cloned())
    }

    async fn create_team(&self, name: &str, members: &[Uuid]) -> AppResult<Team> {
        let mut list_user: Vec<Uuid> = Vec::with_capacity(members.len());
        for member in members {
            if !list_user.contains(member) {
                list_user.push(*member);
            }
        }

        let team = Team {
            id: Uuid::new_v4(),
            name: name.to_string(),
            list_user,
            created_at: Utc::now(),
        };
        self.state.write().await.teams.push(team.clone());
        Ok(team)
    }

    async fn delete_team(&self, team_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.teams.len();
        state.teams.retain(|t| t.id != team_id);
        if state.teams.len() == before {
            return Ok(false);
        }
        for warehouse in &mut state.warehouses {
            warehouse.list_assigned_team.retain(|id| *id != team_id);
        }
        Ok(true)
    }

    async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        Ok(self.state.read().await.warehouses.clone())
    }

    async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>> {
        let state = self.state.read().await;
        Ok(state.warehouses.iter().find(|w| w.id == warehouse_id).cloned())
    }

    async fn find_warehouse_by_name(&self, name: &str) -> AppResult<Option<Warehouse>> {
        let state = self.state.read().await;
        Ok(state.warehouses.iter().find(|w| w.name == name).cloned())
    }

    async fn create_warehouse(&self, name: &str, teams: &[Uuid]) -> AppResult<Warehouse> {
        let mut list_assigned_team: Vec<Uuid> = Vec::with_capacity(teams.len());
        for team in teams {
            if !list_assigned_team.contains(team) {
                list_assigned_team.push(*team);
            }
        }

        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            name: name.to_string(),
            list_product: Vec::new(),
            list_assigned_team,
            created_at: Utc::now(),
        };
        self.state.write().await.warehouses.push(warehouse.clone());
        Ok(warehouse)
    }

    async fn delete_warehouse(&self, warehouse_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.warehouses.len();
        state.warehouses.retain(|w| w.id != warehouse_id);
        Ok(state.warehouses.len() != before)
    }

    async fn assign_team(&self, warehouse_id: Uuid, team_id: Uuid) -> AppResult<Option<Warehouse>> {
        let mut state = self.state.write().await;
        Ok(state.warehouse_mut(warehouse_id).map(|warehouse| {
            if !warehouse.list_assigned_team.contains(&team_id) {
                warehouse.list_assigned_team.push(team_id);
            }
            warehouse.clone()
        }))
    }

    async fn unassign_team(
        &self,
        warehouse_id: Uuid,
        team_id: Uuid,
    ) -> AppResult<Option<Warehouse>> {
        let mut state = self.state.write().await;
        Ok(state.warehouse_mut(warehouse_id).map(|warehouse| {
            warehouse.list_assigned_team.retain(|id| *id != team_id);
            warehouse.clone()
        }))
    }

    async fn append_warehouse_products(
        &self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let warehouse = state
            .warehouse_mut(warehouse_id)
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
        for product_id in product_ids {
            if !warehouse.list_product.contains(product_id) {
                warehouse.list_product.push(*product_id);
            }
        }
        Ok(())
    }

    async fn reset_stock(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.histories.clear();
        state.products.clear();
        for warehouse in &mut state.warehouses {
            warehouse.list_product.clear();
        }
        Ok(())
    }

    async fn insert_stock_product(&self, product: NewStockProduct) -> AppResult<StockProduct> {
        let product = StockProduct {
            id: Uuid::new_v4(),
            reference: product.reference,
            denomination: product.denomination,
            ean: product.ean,
            quantity: product.quantity,
            warehouse_id: product.warehouse_id,
            team_id: product.team_id,
            created_at: Utc::now(),
        };
        self.state.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn get_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>> {
        let state = self.state.read().await;
        Ok(state.products.iter().find(|p| p.id == product_id).cloned())
    }

    async fn find_stock_product(
        &self,
        warehouse_id: Uuid,
        team_id: Uuid,
        reference: &str,
    ) -> AppResult<Option<StockProduct>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .find(|p| p.warehouse_id == warehouse_id && p.team_id == team_id && p.reference == reference)
            .cloned())
    }

    async fn list_stock_products(&self, filter: &StockProductFilter) -> AppResult<Vec<StockProduct>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .filter(|p| matches_product(p, filter))
            .cloned()
            .collect())
    }

    async fn increase_quantity(
        &self,
        product_id: Uuid,
        amount: i64,
    ) -> AppResult<Option<StockProduct>> {
        let mut state = self.state.write().await;
        let Some(product) = state.product_mut(product_id) else {
            return Ok(None);
        };
        let quantity = product.quantity.checked_add(amount).ok_or_else(|| {
            AppError::ValidationError(format!(
                "{} holds {}, adding {} overflows the quantity",
                product.reference, product.quantity, amount
            ))
        })?;
        product.quantity = quantity;
        Ok(Some(product.clone()))
    }

    async fn increment_stock(&self, key: StockKey, delta: i64) -> AppResult<Option<StockProduct>> {
        let mut state = self.state.write().await;
        let Some(product) = state.keyed_product_mut(&key) else {
            return Ok(None);
        };

        let quantity = product.quantity.checked_add(delta).ok_or_else(|| {
            AppError::ValidationError(format!(
                "{} holds {}, adding {} overflows the quantity",
                product.reference, product.quantity, delta
            ))
        })?;
        if quantity < 0 {
            return Err(AppError::InsufficientStock(format!(
                "{} holds {}, cannot apply {}",
                product.reference, product.quantity, delta
            )));
        }
        product.quantity = quantity;
        let updated = product.clone();

        state.histories.push(StockHistory {
            id: Uuid::new_v4(),
            quantity: delta,
            date: Utc::now(),
            product_id: key.product_id,
            warehouse_id: key.warehouse_id,
            team_id: key.team_id,
        });
        Ok(Some(updated))
    }

    async fn correct_stock(&self, key: StockKey, quantity: i64) -> AppResult<Option<StockProduct>> {
        let mut state = self.state.write().await;
        Ok(state.keyed_product_mut(&key).map(|product| {
            product.quantity = quantity;
            product.clone()
        }))
    }

    async fn delete_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>> {
        let mut state = self.state.write().await;
        let Some(position) = state.products.iter().position(|p| p.id == product_id) else {
            return Ok(None);
        };
        let removed = state.products.remove(position);
        if let Some(warehouse) = state.warehouse_mut(removed.warehouse_id) {
            warehouse.list_product.retain(|id| *id != product_id);
        }
        Ok(Some(removed))
    }

    async fn list_stock_history(&self, filter: &StockHistoryFilter) -> AppResult<Vec<StockHistory>> {
        let state = self.state.read().await;
        Ok(state
            .histories
            .iter()
            .rev()
            .filter(|h| matches_history(h, filter))
            .cloned()
            .collect())
    }

    async fn replace_stock_errors(&self, errors: Vec<NewStockError>) -> AppResult<Vec<StockError>> {
        let now = Utc::now();
        let stored: Vec<StockError> = errors
            .into_iter()
            .map(|error| StockError {
                id: Uuid::new_v4(),
                status: false,
                origin: error.origin,
                product_ids: error.product_ids,
                created_at: now,
            })
            .collect();

        self.state.write().await.errors = stored.clone();
        Ok(stored)
    }

    async fn list_stock_errors(&self, filter: &StockErrorFilter) -> AppResult<Vec<StockError>> {
        let state = self.state.read().await;
        Ok(state
            .errors
            .iter()
            .filter(|e| filter.status.map_or(true, |s| e.status == s))
            .cloned()
            .collect())
    }

    async fn get_stock_error(&self, error_id: Uuid) -> AppResult<Option<StockError>> {
        let state = self.state.read().await;
        Ok(state.errors.iter().find(|e| e.id == error_id).cloned())
    }

    async fn set_stock_error_status(
        &self,
        error_id: Uuid,
        status: bool,
    ) -> AppResult<Option<StockError>> {
        let mut state = self.state.write().await;
        Ok(state.errors.iter_mut().find(|e| e.id == error_id).map(|error| {
            error.status = status;
            error.clone()
        }))
    }

    async fn count_unresolved_errors(&self) -> AppResult<u64> {
        let state = self.state.read().await;
        Ok(state.errors.iter().filter(|e| !e.status).count() as u64)
    }
}
