//! Business logic services for the stock ledger

pub mod directory;
pub mod import;
pub mod pipeline;
pub mod reconciliation;
pub mod reporting;
pub mod stock;

pub use directory::DirectoryService;
pub use import::{StagedUpload, StockImportService};
pub use pipeline::PipelineLock;
pub use reconciliation::ReconciliationService;
pub use reporting::ReportingService;
pub use stock::StockService;
