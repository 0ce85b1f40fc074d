//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use shared::{
    NewStockError, NewStockProduct, StockError, StockErrorFilter, StockHistory, StockHistoryFilter,
    StockKey, StockProduct, StockProductFilter, Team, Warehouse, CANONICAL_WAREHOUSE,
};
use stock_ledger_backend::config::ImportConfig;
use stock_ledger_backend::error::{AppError, AppResult};
use stock_ledger_backend::repository::{MemoryStockRepository, StockRepository};
use stock_ledger_backend::services::{PipelineLock, StockImportService};

pub const HEADER: &str = "Dépôt;Référence;Désignation;Stock réel";

pub fn memory_repo() -> Arc<dyn StockRepository> {
    Arc::new(MemoryStockRepository::new())
}

/// Encode export rows the way the ERP writes them (Windows-1252)
pub fn export_bytes(rows: &[(&str, &str, &str, i64)]) -> Vec<u8> {
    let mut text = String::from(HEADER);
    for (depot, reference, denomination, quantity) in rows {
        text.push_str(&format!("\n{};{};{};{}", depot, reference, denomination, quantity));
    }
    encode(&text)
}

pub fn encode(text: &str) -> Vec<u8> {
    let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(text);
    assert!(!unmappable, "test export must be Windows-1252 encodable");
    bytes.into_owned()
}

pub fn import_service(repo: &Arc<dyn StockRepository>) -> StockImportService {
    StockImportService::new(repo.clone(), &ImportConfig::default(), PipelineLock::new())
}

pub fn import_service_with(
    repo: &Arc<dyn StockRepository>,
    settings: ImportConfig,
    pipeline: PipelineLock,
) -> StockImportService {
    StockImportService::new(repo.clone(), &settings, pipeline)
}

/// Create a warehouse with `team_count` freshly created teams
pub async fn warehouse_with_teams(
    repo: &Arc<dyn StockRepository>,
    name: &str,
    team_count: usize,
) -> (Warehouse, Vec<Team>) {
    let mut teams = Vec::with_capacity(team_count);
    for i in 0..team_count {
        teams.push(repo.create_team(&format!("{} team {}", name, i + 1), &[]).await.unwrap());
    }
    let team_ids: Vec<Uuid> = teams.iter().map(|t| t.id).collect();
    let warehouse = repo.create_warehouse(name, &team_ids).await.unwrap();
    (warehouse, teams)
}

/// Insert a stock product and list it in its warehouse
pub async fn stock(
    repo: &Arc<dyn StockRepository>,
    warehouse_id: Uuid,
    team_id: Uuid,
    reference: &str,
    quantity: i64,
) -> StockProduct {
    let product = repo
        .insert_stock_product(NewStockProduct {
            reference: reference.to_string(),
            denomination: format!("{} item", reference),
            ean: None,
            quantity,
            warehouse_id,
            team_id,
        })
        .await
        .unwrap();
    repo.append_warehouse_products(warehouse_id, &[product.id]).await.unwrap();
    product
}

pub async fn open_si(repo: &Arc<dyn StockRepository>) -> Warehouse {
    repo.find_warehouse_by_name(CANONICAL_WAREHOUSE)
        .await
        .unwrap()
        .expect("canonical warehouse exists")
}

pub async fn products_in(repo: &Arc<dyn StockRepository>, warehouse_id: Uuid) -> Vec<StockProduct> {
    repo.list_stock_products(&StockProductFilter {
        warehouse_id: Some(warehouse_id),
        ..Default::default()
    })
    .await
    .unwrap()
}

// ============================================================================
// Fault injection
// ============================================================================

/// Failure a [`FaultyRepository`] injects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Zero-quantity inserts (pass 2 placeholders) fail
    PlaceholderInsert,
    /// Product listings (the reconciliation scan) fail
    ProductListing,
    /// Product listings stall long enough to blow any test budget
    SlowProductListing,
}

/// Memory repository that fails on demand
pub struct FaultyRepository {
    inner: MemoryStockRepository,
    fault: Mutex<Fault>,
}

impl FaultyRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStockRepository::new(),
            fault: Mutex::new(Fault::None),
        })
    }

    pub fn inject(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    fn fault(&self) -> Fault {
        *self.fault.lock().unwrap()
    }
}

#[async_trait]
impl StockRepository for FaultyRepository {
    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }

    async fn list_teams(&self) -> AppResult<Vec<Team>> {
        self.inner.list_teams().await
    }

    async fn get_team(&self, team_id: Uuid) -> AppResult<Option<Team>> {
        self.inner.get_team(team_id).await
    }

    async fn find_team_by_name(&self, name: &str) -> AppResult<Option<Team>> {
        self.inner.find_team_by_name(name).await
    }

    async fn create_team(&self, name: &str, members: &[Uuid]) -> AppResult<Team> {
        self.inner.create_team(name, members).await
    }

    async fn delete_team(&self, team_id: Uuid) -> AppResult<bool> {
        self.inner.delete_team(team_id).await
    }

    async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        self.inner.list_warehouses().await
    }

    async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>> {
        self.inner.get_warehouse(warehouse_id).await
    }

    async fn find_warehouse_by_name(&self, name: &str) -> AppResult<Option<Warehouse>> {
        self.inner.find_warehouse_by_name(name).await
    }

    async fn create_warehouse(&self, name: &str, teams: &[Uuid]) -> AppResult<Warehouse> {
        self.inner.create_warehouse(name, teams).await
    }

    async fn delete_warehouse(&self, warehouse_id: Uuid) -> AppResult<bool> {
        self.inner.delete_warehouse(warehouse_id).await
    }

    async fn assign_team(&self, warehouse_id: Uuid, team_id: Uuid) -> AppResult<Option<Warehouse>> {
        self.inner.assign_team(warehouse_id, team_id).await
    }

    async fn unassign_team(&self, warehouse_id: Uuid, team_id: Uuid) -> AppResult<Option<Warehouse>> {
        self.inner.unassign_team(warehouse_id, team_id).await
    }

    async fn append_warehouse_products(&self, warehouse_id: Uuid, product_ids: &[Uuid]) -> AppResult<()> {
        self.inner.append_warehouse_products(warehouse_id, product_ids).await
    }

    async fn reset_stock(&self) -> AppResult<()> {
        self.inner.reset_stock().await
    }

    async fn insert_stock_product(&self, product: NewStockProduct) -> AppResult<StockProduct> {
        if self.fault() == Fault::PlaceholderInsert && product.quantity == 0 {
            return Err(AppError::Internal("placeholder insert failed".to_string()));
        }
        self.inner.insert_stock_product(product).await
    }

    async fn get_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>> {
        self.inner.get_stock_product(product_id).await
    }

    async fn find_stock_product(
        &self,
        warehouse_id: Uuid,
        team_id: Uuid,
        reference: &str,
    ) -> AppResult<Option<StockProduct>> {
        self.inner.find_stock_product(warehouse_id, team_id, reference).await
    }

    async fn list_stock_products(&self, filter: &StockProductFilter) -> AppResult<Vec<StockProduct>> {
        match self.fault() {
            Fault::ProductListing => Err(AppError::Internal("product listing failed".to_string())),
            Fault::SlowProductListing => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                self.inner.list_stock_products(filter).await
            }
            _ => self.inner.list_stock_products(filter).await,
        }
    }

    async fn increase_quantity(&self, product_id: Uuid, amount: i64) -> AppResult<Option<StockProduct>> {
        self.inner.increase_quantity(product_id, amount).await
    }

    async fn increment_stock(&self, key: StockKey, delta: i64) -> AppResult<Option<StockProduct>> {
        self.inner.increment_stock(key, delta).await
    }

    async fn correct_stock(&self, key: StockKey, quantity: i64) -> AppResult<Option<StockProduct>> {
        self.inner.correct_stock(key, quantity).await
    }

    async fn delete_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>> {
        self.inner.delete_stock_product(product_id).await
    }

    async fn list_stock_history(&self, filter: &StockHistoryFilter) -> AppResult<Vec<StockHistory>> {
        self.inner.list_stock_history(filter).await
    }

    async fn replace_stock_errors(&self, errors: Vec<NewStockError>) -> AppResult<Vec<StockError>> {
        self.inner.replace_stock_errors(errors).await
    }

    async fn list_stock_errors(&self, filter: &StockErrorFilter) -> AppResult<Vec<StockError>> {
        self.inner.list_stock_errors(filter).await
    }

    async fn get_stock_error(&self, error_id: Uuid) -> AppResult<Option<StockError>> {
        self.inner.get_stock_error(error_id).await
    }

    async fn set_stock_error_status(&self, error_id: Uuid, status: bool) -> AppResult<Option<StockError>> {
        self.inner.set_stock_error_status(error_id, status).await
    }

    async fn count_unresolved_errors(&self) -> AppResult<u64> {
        self.inner.count_unresolved_errors().await
    }
}
