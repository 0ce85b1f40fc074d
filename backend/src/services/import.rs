//! Stock export import
//!
//! Replaces the whole stock ledger with the contents of an uploaded export:
//!
//! - pass 0 wipes stock products, histories and warehouse member lists, then
//!   makes sure the canonical warehouse and team exist;
//! - pass 1 sums each reference across the export into the canonical
//!   warehouse;
//! - pass 2 creates a zero-quantity placeholder for every row in every team
//!   of the row's (non-canonical) warehouse.
//!
//! Writes are not wrapped in one transaction: a failure during pass 2 leaves
//! the canonical warehouse populated and team warehouses partially populated.
//! Rerunning the import from pass 0 repairs that state.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use shared::{
    aggregate_by_reference, parse_stock_export, ExportFormatError, ImportSummary,
    NewStockProduct, ParsedExport, ReferenceTotal, StockRow, Warehouse, CANONICAL_TEAM,
    CANONICAL_WAREHOUSE,
};

use crate::config::ImportConfig;
use crate::error::{AppError, AppResult};
use crate::repository::StockRepository;
use crate::services::pipeline::{within_budget, PipelineLock};

const OPERATION: &str = "stock import";

/// An upload written to temporary storage, removed once the import ends.
///
/// Dropping an upload that was never discarded (a cancelled import) removes
/// the file synchronously.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    original_filename: String,
    removed: bool,
}

impl StagedUpload {
    /// Write uploaded bytes under `dir`
    pub async fn stage(dir: &Path, original_filename: &str, bytes: &[u8]) -> AppResult<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.csv", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(
            file = %original_filename,
            path = %path.display(),
            size = bytes.len(),
            "Staged stock export"
        );

        Ok(Self {
            path,
            original_filename: original_filename.to_string(),
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    async fn discard(mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged export");
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged export of a cancelled import"),
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged export"),
        }
    }
}

/// Decode a stock export.
///
/// Exports are Windows-1252; a UTF-8 byte order mark switches to UTF-8.
pub fn decode_export(bytes: &[u8]) -> String {
    let (text, encoding, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    if encoding != encoding_rs::WINDOWS_1252 {
        tracing::debug!(encoding = encoding.name(), "Byte order mark overrides export encoding");
    }
    text.into_owned()
}

impl From<ExportFormatError> for AppError {
    fn from(err: ExportFormatError) -> Self {
        match err {
            ExportFormatError::MissingColumn(column) => AppError::Validation {
                field: "file".to_string(),
                message: format!("Missing column in export header: {}", column),
                message_fr: format!("Colonne absente de l'en-tête : {}", column),
            },
            ExportFormatError::Header(e) => AppError::ValidationError(format!("Unreadable export header: {}", e)),
        }
    }
}

/// What pass 1 did for one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CanonicalUpsert {
    Created(Uuid),
    Updated(Uuid),
}

/// Stock import engine
#[derive(Clone)]
pub struct StockImportService {
    repo: Arc<dyn StockRepository>,
    settings: ImportConfig,
    pipeline: PipelineLock,
}

impl StockImportService {
    /// Create a new StockImportService instance
    pub fn new(repo: Arc<dyn StockRepository>, settings: &ImportConfig, pipeline: PipelineLock) -> Self {
        Self {
            repo,
            settings: settings.clone(),
            pipeline,
        }
    }

    /// Import a staged upload; the staged file is removed whatever the outcome
    pub async fn import_upload(&self, upload: StagedUpload) -> AppResult<ImportSummary> {
        tracing::info!(file = %upload.original_filename(), "Starting stock import");
        let result = match tokio::fs::read(upload.path()).await {
            Ok(bytes) => self.import_bytes(&bytes).await,
            Err(e) => Err(e.into()),
        };
        upload.discard().await;
        result
    }

    /// Import raw export bytes
    pub async fn import_bytes(&self, bytes: &[u8]) -> AppResult<ImportSummary> {
        let _guard = self.pipeline.try_acquire(OPERATION)?;
        let text = decode_export(bytes);
        within_budget(OPERATION, self.settings.timeout(), self.run(&text)).await
    }

    async fn run(&self, text: &str) -> AppResult<ImportSummary> {
        // Unreadable exports must fail before pass 0 wipes anything
        let first_pass = parse_stock_export(text, &self.settings.columns)?;

        self.repo.reset_stock().await?;
        let (open_si, owner_team) = self.ensure_canonical().await?;
        tracing::info!(warehouse = %open_si.id, "Stock ledger reset");

        let directory = self.warehouses_by_name().await?;

        let mut summary = ImportSummary {
            skipped_rows: first_pass.skipped.len(),
            ..Default::default()
        };
        for skipped in &first_pass.skipped {
            tracing::debug!(line = skipped.line, reason = ?skipped.reason, "Skipped export row");
        }

        // Pass 1: canonical aggregation
        let known_rows: Vec<&StockRow> = first_pass
            .rows
            .iter()
            .filter(|row| {
                let known = directory.contains_key(&row.depot);
                if !known {
                    tracing::debug!(line = row.line, depot = %row.depot, "Skipped row for unknown depot");
                }
                known
            })
            .collect();
        summary.skipped_rows += first_pass.rows.len() - known_rows.len();

        let totals = aggregate_by_reference(known_rows);
        summary.reference_count = totals.len();

        let upserts = self
            .upsert_canonical(open_si.id, owner_team, totals.into_values())
            .await?;
        let mut created_in_open_si = Vec::new();
        for upsert in upserts {
            match upsert {
                CanonicalUpsert::Created(id) => created_in_open_si.push(id),
                CanonicalUpsert::Updated(_) => summary.updated_count += 1,
            }
        }
        summary.created_count += created_in_open_si.len();
        self.repo
            .append_warehouse_products(open_si.id, &created_in_open_si)
            .await?;

        tracing::info!(
            references = summary.reference_count,
            created = created_in_open_si.len(),
            updated = summary.updated_count,
            "Canonical warehouse populated"
        );

        // Pass 2: fan-out, reading the export again
        let second_pass = parse_stock_export(text, &self.settings.columns)?;
        let placeholders = self.fan_out(&directory, second_pass).await?;
        summary.placeholder_count = placeholders;
        summary.created_count += placeholders;

        tracing::info!(
            created = summary.created_count,
            updated = summary.updated_count,
            placeholders = summary.placeholder_count,
            skipped = summary.skipped_rows,
            "Stock import completed"
        );

        Ok(summary)
    }

    /// Find or create the canonical team and warehouse.
    ///
    /// Returns the canonical warehouse and the team owning its records.
    async fn ensure_canonical(&self) -> AppResult<(Warehouse, Uuid)> {
        let admin = match self.repo.find_team_by_name(CANONICAL_TEAM).await? {
            Some(team) => team,
            None => {
                tracing::info!("Creating canonical team {}", CANONICAL_TEAM);
                self.repo.create_team(CANONICAL_TEAM, &[]).await?
            }
        };

        let mut open_si = match self.repo.find_warehouse_by_name(CANONICAL_WAREHOUSE).await? {
            Some(warehouse) => warehouse,
            None => {
                tracing::info!("Creating canonical warehouse {}", CANONICAL_WAREHOUSE);
                self.repo
                    .create_warehouse(CANONICAL_WAREHOUSE, &[admin.id])
                    .await?
            }
        };

        if open_si.list_assigned_team.is_empty() {
            open_si = self
                .repo
                .assign_team(open_si.id, admin.id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Warehouse {}", CANONICAL_WAREHOUSE)))?;
        }

        let owner = open_si
            .first_team()
            .ok_or_else(|| AppError::Internal("Canonical warehouse has no team".to_string()))?;
        Ok((open_si, owner))
    }

    /// Warehouses keyed by name; the first one in storage order wins
    async fn warehouses_by_name(&self) -> AppResult<HashMap<String, Warehouse>> {
        let mut directory = HashMap::new();
        for warehouse in self.repo.list_warehouses().await? {
            directory.entry(warehouse.name.clone()).or_insert(warehouse);
        }
        Ok(directory)
    }

    async fn upsert_canonical<I>(
        &self,
        warehouse_id: Uuid,
        team_id: Uuid,
        totals: I,
    ) -> AppResult<Vec<CanonicalUpsert>>
    where
        I: IntoIterator<Item = ReferenceTotal>,
    {
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut units = JoinSet::new();

        for total in totals {
            let repo = Arc::clone(&self.repo);
            let permits = Arc::clone(&permits);
            units.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Internal(format!("Import permits closed: {}", e)))?;

                match repo
                    .find_stock_product(warehouse_id, team_id, &total.reference)
                    .await?
                {
                    Some(existing) => {
                        repo.increase_quantity(existing.id, total.quantity).await?;
                        Ok::<_, AppError>(CanonicalUpsert::Updated(existing.id))
                    }
                    None => {
                        let created = repo
                            .insert_stock_product(NewStockProduct {
                                reference: total.reference,
                                denomination: total.denomination,
                                ean: total.ean,
                                quantity: total.quantity,
                                warehouse_id,
                                team_id,
                            })
                            .await?;
                        Ok(CanonicalUpsert::Created(created.id))
                    }
                }
            });
        }

        join_units(units).await
    }

    /// Create placeholders for pass 2 and append them to their warehouses.
    ///
    /// Returns the number of records created.
    async fn fan_out(
        &self,
        directory: &HashMap<String, Warehouse>,
        export: ParsedExport,
    ) -> AppResult<usize> {
        let mut seen: HashSet<(Uuid, String)> = HashSet::new();
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut units = JoinSet::new();

        for row in export.rows {
            let Some(warehouse) = directory.get(&row.depot) else {
                continue;
            };
            if warehouse.is_canonical() {
                continue;
            }
            if warehouse.list_assigned_team.is_empty() {
                tracing::debug!(warehouse = %warehouse.name, line = row.line, "No team assigned, no placeholder");
                continue;
            }
            if self.settings.dedupe_placeholders && !seen.insert((warehouse.id, row.reference.clone())) {
                continue;
            }

            let repo = Arc::clone(&self.repo);
            let permits = Arc::clone(&permits);
            let warehouse_id = warehouse.id;
            let teams = warehouse.list_assigned_team.clone();
            units.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Internal(format!("Import permits closed: {}", e)))?;

                let mut created = Vec::with_capacity(teams.len());
                for team_id in teams {
                    let product = repo
                        .insert_stock_product(NewStockProduct {
                            reference: row.reference.clone(),
                            denomination: row.denomination.clone(),
                            ean: row.ean.clone(),
                            quantity: 0,
                            warehouse_id,
                            team_id,
                        })
                        .await?;
                    created.push(product.id);
                }
                Ok::<_, AppError>((warehouse_id, created))
            });
        }

        let mut per_warehouse: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (warehouse_id, created) in join_units(units).await? {
            per_warehouse.entry(warehouse_id).or_default().extend(created);
        }

        let mut total = 0;
        for (warehouse_id, product_ids) in per_warehouse {
            tracing::debug!(warehouse = %warehouse_id, count = product_ids.len(), "Appending placeholders");
            total += product_ids.len();
            self.repo
                .append_warehouse_products(warehouse_id, &product_ids)
                .await?;
        }
        Ok(total)
    }
}

/// Join every unit of a pass; the first failure aborts the remaining units
async fn join_units<T: 'static>(mut units: JoinSet<AppResult<T>>) -> AppResult<Vec<T>> {
    let mut results = Vec::with_capacity(units.len());
    while let Some(joined) = units.join_next().await {
        match joined {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(e)) => {
                units.abort_all();
                return Err(e);
            }
            Err(e) => {
                units.abort_all();
                return Err(AppError::Internal(format!("Import unit failed: {}", e)));
            }
        }
    }
    Ok(results)
}
