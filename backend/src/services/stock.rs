//! Stock product records and the day-to-day mutation API

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use shared::{
    validate_denomination, validate_quantity, validate_reference, NewStockProduct, StockHistory,
    StockHistoryFilter, StockKey, StockProduct, StockProductFilter,
};

use crate::error::{AppError, AppResult};
use crate::repository::StockRepository;

/// Input for creating a stock product by hand
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStockProductInput {
    pub reference: String,
    pub denomination: String,
    pub ean: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    pub warehouse_id: Uuid,
    pub team_id: Uuid,
}

/// Signed quantity change for one (product, warehouse, team) record
#[derive(Debug, Clone, Deserialize)]
pub struct IncrementStockInput {
    pub warehouse_id: Uuid,
    pub team_id: Uuid,
    pub delta: i64,
}

/// Absolute quantity override
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectStockInput {
    pub warehouse_id: Uuid,
    pub team_id: Uuid,
    pub quantity: i64,
}

/// Stock service
#[derive(Clone)]
pub struct StockService {
    repo: Arc<dyn StockRepository>,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(repo: Arc<dyn StockRepository>) -> Self {
        Self { repo }
    }

    /// Create a stock product and add it to its warehouse.
    ///
    /// At most one record may exist per (reference, warehouse, team).
    pub async fn create_product(&self, input: CreateStockProductInput) -> AppResult<StockProduct> {
        let reference = input.reference.trim().to_string();
        let denomination = input.denomination.trim().to_string();
        validate_reference(&reference).map_err(|msg| AppError::invalid_field("reference", msg))?;
        validate_denomination(&denomination)
            .map_err(|msg| AppError::invalid_field("denomination", msg))?;
        validate_quantity(input.quantity).map_err(|msg| AppError::invalid_field("quantity", msg))?;

        self.repo
            .get_warehouse(input.warehouse_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
        self.repo
            .get_team(input.team_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Team".to_string()))?;

        if self
            .repo
            .find_stock_product(input.warehouse_id, input.team_id, &reference)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict {
                resource: "stock_product".to_string(),
                message: format!("{} already exists for this warehouse and team", reference),
                message_fr: format!("{} existe déjà pour cet entrepôt et cette équipe", reference),
            });
        }

        let product = self
            .repo
            .insert_stock_product(NewStockProduct {
                reference,
                denomination,
                ean: input.ean.filter(|e| !e.trim().is_empty()),
                quantity: input.quantity,
                warehouse_id: input.warehouse_id,
                team_id: input.team_id,
            })
            .await?;
        self.repo
            .append_warehouse_products(product.warehouse_id, &[product.id])
            .await?;

        tracing::info!(product = %product.id, reference = %product.reference, "Stock product created");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<StockProduct> {
        self.repo
            .get_stock_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock product".to_string()))
    }

    pub async fn list_products(&self, filter: &StockProductFilter) -> AppResult<Vec<StockProduct>> {
        self.repo.list_stock_products(filter).await
    }

    /// Delete a stock product; its warehouse stops listing it
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<StockProduct> {
        let removed = self
            .repo
            .delete_stock_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock product".to_string()))?;

        tracing::info!(product = %product_id, reference = %removed.reference, "Stock product deleted");
        Ok(removed)
    }

    /// Apply a signed delta and record it in the stock history
    pub async fn increment(&self, product_id: Uuid, input: IncrementStockInput) -> AppResult<StockProduct> {
        let key = StockKey {
            product_id,
            warehouse_id: input.warehouse_id,
            team_id: input.team_id,
        };

        let product = self
            .repo
            .increment_stock(key, input.delta)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock product".to_string()))?;

        tracing::debug!(product = %product_id, delta = input.delta, quantity = product.quantity, "Stock incremented");
        Ok(product)
    }

    /// Overwrite a quantity; no history entry is written
    pub async fn correct(&self, product_id: Uuid, input: CorrectStockInput) -> AppResult<StockProduct> {
        validate_quantity(input.quantity).map_err(|msg| AppError::invalid_field("quantity", msg))?;

        let key = StockKey {
            product_id,
            warehouse_id: input.warehouse_id,
            team_id: input.team_id,
        };

        let product = self
            .repo
            .correct_stock(key, input.quantity)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock product".to_string()))?;

        tracing::info!(product = %product_id, quantity = input.quantity, "Stock corrected");
        Ok(product)
    }

    pub async fn list_history(&self, filter: &StockHistoryFilter) -> AppResult<Vec<StockHistory>> {
        self.repo.list_stock_history(filter).await
    }
}
