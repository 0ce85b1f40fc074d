//! Common types used across the ledger

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a stock import
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    /// Stock products inserted by both passes
    pub created_count: usize,
    /// Canonical stock products whose quantity was incremented
    pub updated_count: usize,
    /// Distinct references aggregated into the canonical warehouse
    pub reference_count: usize,
    /// Zero-quantity records created in team warehouses
    pub placeholder_count: usize,
    /// Rows dropped for missing fields, bad quantities or unknown depots
    pub skipped_rows: usize,
}

/// Outcome of a reconciliation run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub errors_found: usize,
    pub team_errors: usize,
    pub opensi_errors: usize,
    pub products_checked: usize,
}

/// Filter for stock product listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockProductFilter {
    pub warehouse_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub reference: Option<String>,
}

/// Filter for stock history listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockHistoryFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// Filter for stock error listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockErrorFilter {
    pub status: Option<bool>,
}
