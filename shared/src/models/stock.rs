//! Stock ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quantity of one product reference held by one team in one warehouse.
///
/// Several records share a `reference`: one per (warehouse, team) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockProduct {
    pub id: Uuid,
    pub reference: String,
    pub denomination: String,
    pub ean: Option<String>,
    pub quantity: i64,
    pub warehouse_id: Uuid,
    pub team_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of a quantity delta applied to a [`StockProduct`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockHistory {
    pub id: Uuid,
    /// Signed delta, not the resulting quantity
    pub quantity: i64,
    pub date: DateTime<Utc>,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub team_id: Uuid,
}

/// Where a reconciliation divergence was detected
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    /// Team-level copies of a reference inside one warehouse disagree
    Team,
    /// Distributed total differs from the canonical warehouse
    Opensi,
}

impl ErrorOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorOrigin::Team => "team",
            ErrorOrigin::Opensi => "opensi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "team" => Some(ErrorOrigin::Team),
            "opensi" => Some(ErrorOrigin::Opensi),
            _ => None,
        }
    }
}

/// A reconciliation divergence.
///
/// `status` is `false` while unresolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockError {
    pub id: Uuid,
    pub status: bool,
    pub origin: ErrorOrigin,
    pub product_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A stock error produced by a reconciliation scan, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockError {
    pub origin: ErrorOrigin,
    pub product_ids: Vec<Uuid>,
}

/// A stock product about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockProduct {
    pub reference: String,
    pub denomination: String,
    pub ean: Option<String>,
    pub quantity: i64,
    pub warehouse_id: Uuid,
    pub team_id: Uuid,
}

/// Identifies a stock product through its owning warehouse and team.
///
/// Mutations must present the full triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StockKey {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub team_id: Uuid,
}

impl StockKey {
    pub fn matches(&self, product: &StockProduct) -> bool {
        product.id == self.product_id
            && product.warehouse_id == self.warehouse_id
            && product.team_id == self.team_id
    }
}
