//! Persistence for the stock ledger and the warehouse/team directory
//!
//! Services only talk to [`StockRepository`]; the Postgres implementation
//! backs production and the in-memory one backs demos and the test-suite.

use async_trait::async_trait;
use uuid::Uuid;

use shared::{
    NewStockError, NewStockProduct, StockError, StockErrorFilter, StockHistory,
    StockHistoryFilter, StockKey, StockProduct, StockProductFilter, Team, Warehouse,
};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStockRepository;
pub use postgres::PgStockRepository;

/// Storage operations used by the stock services
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> AppResult<()>;

    // ------------------------------------------------------------------
    // Directory
    // ------------------------------------------------------------------

    async fn list_teams(&self) -> AppResult<Vec<Team>>;

    async fn get_team(&self, team_id: Uuid) -> AppResult<Option<Team>>;

    /// First team with this name, in storage order
    async fn find_team_by_name(&self, name: &str) -> AppResult<Option<Team>>;

    async fn create_team(&self, name: &str, members: &[Uuid]) -> AppResult<Team>;

    /// Delete a team and its warehouse assignments. Stock products keep
    /// pointing at the deleted team.
    async fn delete_team(&self, team_id: Uuid) -> AppResult<bool>;

    async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>>;

    async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>>;

    /// First warehouse with this name, in storage order
    async fn find_warehouse_by_name(&self, name: &str) -> AppResult<Option<Warehouse>>;

    async fn create_warehouse(&self, name: &str, teams: &[Uuid]) -> AppResult<Warehouse>;

    /// Delete a warehouse and its memberships. Stock products keep pointing
    /// at the deleted warehouse.
    async fn delete_warehouse(&self, warehouse_id: Uuid) -> AppResult<bool>;

    /// Assign a team; assigning twice is a no-op
    async fn assign_team(&self, warehouse_id: Uuid, team_id: Uuid) -> AppResult<Option<Warehouse>>;

    async fn unassign_team(&self, warehouse_id: Uuid, team_id: Uuid)
        -> AppResult<Option<Warehouse>>;

    /// Append products to a warehouse's member list in one update
    async fn append_warehouse_products(&self, warehouse_id: Uuid, product_ids: &[Uuid])
        -> AppResult<()>;

    // ------------------------------------------------------------------
    // Stock ledger
    // ------------------------------------------------------------------

    /// Delete every stock history and stock product and empty every
    /// warehouse member list
    async fn reset_stock(&self) -> AppResult<()>;

    async fn insert_stock_product(&self, product: NewStockProduct) -> AppResult<StockProduct>;

    async fn get_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>>;

    /// Stock product for a (reference, warehouse, team) triple
    async fn find_stock_product(
        &self,
        warehouse_id: Uuid,
        team_id: Uuid,
        reference: &str,
    ) -> AppResult<Option<StockProduct>>;

    async fn list_stock_products(&self, filter: &StockProductFilter) -> AppResult<Vec<StockProduct>>;

    /// Add to a quantity without recording history
    async fn increase_quantity(&self, product_id: Uuid, amount: i64)
        -> AppResult<Option<StockProduct>>;

    /// Apply a signed delta and append the matching history entry atomically.
    ///
    /// Fails with `InsufficientStock` when the quantity would drop below zero.
    async fn increment_stock(&self, key: StockKey, delta: i64) -> AppResult<Option<StockProduct>>;

    /// Overwrite a quantity without recording history
    async fn correct_stock(&self, key: StockKey, quantity: i64) -> AppResult<Option<StockProduct>>;

    /// Delete a stock product and remove it from its warehouse's member list
    async fn delete_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>>;

    /// Newest entries first
    async fn list_stock_history(&self, filter: &StockHistoryFilter) -> AppResult<Vec<StockHistory>>;

    // ------------------------------------------------------------------
    // Stock errors
    // ------------------------------------------------------------------

    /// Replace every stored stock error with `errors` in one write
    async fn replace_stock_errors(&self, errors: Vec<NewStockError>) -> AppResult<Vec<StockError>>;

    async fn list_stock_errors(&self, filter: &StockErrorFilter) -> AppResult<Vec<StockError>>;

    async fn get_stock_error(&self, error_id: Uuid) -> AppResult<Option<StockError>>;

    async fn set_stock_error_status(&self, error_id: Uuid, status: bool)
        -> AppResult<Option<StockError>>;

    async fn count_unresolved_errors(&self) -> AppResult<u64>;
}
