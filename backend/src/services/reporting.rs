//! Consolidated stock export
//!
//! Stock is only exported once reconciliation reports no unresolved error.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::StockRepository;

/// One exported stock line
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StockExportLine {
    pub warehouse: String,
    pub reference: String,
    pub denomination: String,
    pub team: String,
    pub quantity: i64,
}

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    repo: Arc<dyn StockRepository>,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(repo: Arc<dyn StockRepository>) -> Self {
        Self { repo }
    }

    /// Stock lines for every warehouse, in warehouse listing order
    pub async fn stock_lines(&self) -> AppResult<Vec<StockExportLine>> {
        let unresolved = self.repo.count_unresolved_errors().await?;
        if unresolved > 0 {
            return Err(AppError::Conflict {
                resource: "stock_errors".to_string(),
                message: format!("{} unresolved stock errors block the export", unresolved),
                message_fr: format!("{} erreurs de stock non résolues bloquent l'export", unresolved),
            });
        }

        let teams: HashMap<Uuid, String> = self
            .repo
            .list_teams()
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let mut lines = Vec::new();
        for warehouse in self.repo.list_warehouses().await? {
            for product_id in &warehouse.list_product {
                let Some(product) = self.repo.get_stock_product(*product_id).await? else {
                    continue;
                };
                lines.push(StockExportLine {
                    warehouse: warehouse.name.clone(),
                    team: teams.get(&product.team_id).cloned().unwrap_or_default(),
                    reference: product.reference,
                    denomination: product.denomination,
                    quantity: product.quantity,
                });
            }
        }
        Ok(lines)
    }

    /// Semicolon-separated export of all stock lines
    pub async fn export_stock(&self) -> AppResult<String> {
        let lines = self.stock_lines().await?;
        tracing::info!(lines = lines.len(), "Stock exported");
        Self::export_to_csv(&lines)
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}
