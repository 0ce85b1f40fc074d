//! Reconciliation of team warehouses against the canonical warehouse

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use shared::{
    ErrorOrigin, NewStockError, ReconcileSummary, StockError, StockErrorFilter, StockProduct,
    StockProductFilter, Warehouse, CANONICAL_WAREHOUSE,
};

use crate::error::{AppError, AppResult};
use crate::repository::StockRepository;
use crate::services::pipeline::{within_budget, PipelineLock};

const OPERATION: &str = "reconciliation";

/// Stock error with the products it lists
#[derive(Debug, Clone, Serialize)]
pub struct StockErrorDetail {
    #[serde(flatten)]
    pub error: StockError,
    /// Listed products that still exist, in listing order
    pub products: Vec<StockProduct>,
}

/// Reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    repo: Arc<dyn StockRepository>,
    pipeline: PipelineLock,
    budget: Duration,
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(repo: Arc<dyn StockRepository>, pipeline: PipelineLock, budget: Duration) -> Self {
        Self {
            repo,
            pipeline,
            budget,
        }
    }

    /// Recompute every stock error.
    ///
    /// The stored set is only replaced once the scan has completed; a failed
    /// or timed out run leaves the previous errors untouched.
    pub async fn reconcile(&self) -> AppResult<ReconcileSummary> {
        let _guard = self.pipeline.try_acquire(OPERATION)?;
        within_budget(OPERATION, self.budget, async {
            let (errors, products_checked) = self.scan().await?;

            let summary = ReconcileSummary {
                errors_found: errors.len(),
                team_errors: errors.iter().filter(|e| e.origin == ErrorOrigin::Team).count(),
                opensi_errors: errors.iter().filter(|e| e.origin == ErrorOrigin::Opensi).count(),
                products_checked,
            };

            self.repo.replace_stock_errors(errors).await?;

            tracing::info!(
                checked = summary.products_checked,
                team = summary.team_errors,
                opensi = summary.opensi_errors,
                "Reconciliation completed"
            );
            Ok(summary)
        })
        .await
    }

    async fn scan(&self) -> AppResult<(Vec<NewStockError>, usize)> {
        let open_si = self
            .repo
            .find_warehouse_by_name(CANONICAL_WAREHOUSE)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Warehouse {}", CANONICAL_WAREHOUSE)))?;

        let others: Vec<Warehouse> = self
            .repo
            .list_warehouses()
            .await?
            .into_iter()
            .filter(|w| w.id != open_si.id)
            .collect();

        let mut errors = Vec::new();
        let mut checked = 0;

        for product_id in &open_si.list_product {
            let Some(canonical) = self.repo.get_stock_product(*product_id).await? else {
                tracing::warn!(product = %product_id, "Canonical warehouse lists a missing product");
                continue;
            };
            checked += 1;

            if let Some(error) = self.check_product(&canonical, &others).await? {
                tracing::debug!(reference = %canonical.reference, origin = error.origin.as_str(), "Stock divergence");
                errors.push(error);
            }
        }

        Ok((errors, checked))
    }

    /// Compare one canonical product with its copies in the team warehouses
    async fn check_product(
        &self,
        canonical: &StockProduct,
        others: &[Warehouse],
    ) -> AppResult<Option<NewStockError>> {
        let mut total: i64 = 0;
        let mut copies: Vec<Uuid> = Vec::new();

        for warehouse in others {
            let filter = StockProductFilter {
                warehouse_id: Some(warehouse.id),
                reference: Some(canonical.reference.clone()),
                ..Default::default()
            };
            let records = self.repo.list_stock_products(&filter).await?;

            // Team copies inside one warehouse must agree
            if let Some(first) = records.first() {
                if records.iter().any(|r| r.quantity != first.quantity) {
                    return Ok(Some(NewStockError {
                        origin: ErrorOrigin::Team,
                        product_ids: records.iter().map(|r| r.id).collect(),
                    }));
                }
            }

            total += records.iter().map(|r| r.quantity).sum::<i64>();
            copies.extend(records.iter().map(|r| r.id));
        }

        if total == canonical.quantity {
            return Ok(None);
        }

        let mut product_ids = Vec::with_capacity(copies.len() + 1);
        product_ids.push(canonical.id);
        product_ids.extend(copies.into_iter().filter(|id| *id != canonical.id));

        Ok(Some(NewStockError {
            origin: ErrorOrigin::Opensi,
            product_ids,
        }))
    }

    /// List stored stock errors
    pub async fn list_errors(&self, filter: &StockErrorFilter) -> AppResult<Vec<StockError>> {
        self.repo.list_stock_errors(filter).await
    }

    /// Get a stock error with its products
    pub async fn get_error(&self, error_id: Uuid) -> AppResult<StockErrorDetail> {
        let error = self
            .repo
            .get_stock_error(error_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock error".to_string()))?;

        let mut products = Vec::with_capacity(error.product_ids.len());
        for product_id in &error.product_ids {
            if let Some(product) = self.repo.get_stock_product(*product_id).await? {
                products.push(product);
            }
        }

        Ok(StockErrorDetail { error, products })
    }

    /// Mark a stock error resolved or unresolved
    pub async fn resolve_error(&self, error_id: Uuid, status: bool) -> AppResult<StockError> {
        let error = self
            .repo
            .set_stock_error_status(error_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock error".to_string()))?;

        tracing::info!(error = %error_id, status, "Stock error status changed");
        Ok(error)
    }
}
