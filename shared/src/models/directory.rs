//! Warehouse and team directory models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the warehouse holding the stock of record
pub const CANONICAL_WAREHOUSE: &str = "OPEN SI";

/// Name of the team owning the canonical warehouse's stock
pub const CANONICAL_TEAM: &str = "Admin";

/// A stock location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    /// Member stock products, in insertion order
    pub list_product: Vec<Uuid>,
    /// Assigned teams, in assignment order
    pub list_assigned_team: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Warehouse {
    pub fn is_canonical(&self) -> bool {
        self.name == CANONICAL_WAREHOUSE
    }

    /// Team that owns records created in this warehouse by default
    pub fn first_team(&self) -> Option<Uuid> {
        self.list_assigned_team.first().copied()
    }
}

/// A group of users doing stock-taking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub list_user: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}
