//! WebAssembly module for the Stock Ledger
//!
//! Lets the browser check a stock export before it is uploaded, with the same
//! parser and aggregation the server import uses.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::{aggregate_by_reference, parse_quantity, parse_stock_export, CsvColumns, SkippedRow};

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

/// Per-reference total shown in the preview
#[derive(Debug, Serialize)]
pub struct ReferencePreview {
    pub reference: String,
    pub denomination: String,
    pub quantity: i64,
    pub row_count: usize,
}

/// What the server would read from an export.
///
/// Depot names are not checked here; rows for unknown depots are only
/// dropped by the server.
#[derive(Debug, Serialize)]
pub struct ExportPreview {
    pub accepted_rows: usize,
    pub skipped_rows: usize,
    pub skipped: Vec<SkippedRow>,
    pub references: Vec<ReferencePreview>,
}

fn preview(csv_text: &str, columns: &CsvColumns) -> Result<ExportPreview, String> {
    let parsed = parse_stock_export(csv_text, columns).map_err(|e| e.to_string())?;
    let references = aggregate_by_reference(&parsed.rows)
        .into_values()
        .map(|total| ReferencePreview {
            reference: total.reference,
            denomination: total.denomination,
            quantity: total.quantity,
            row_count: total.row_count,
        })
        .collect();

    Ok(ExportPreview {
        accepted_rows: parsed.rows.len(),
        skipped_rows: parsed.skipped.len(),
        skipped: parsed.skipped,
        references,
    })
}

fn to_json(preview: &ExportPreview) -> Result<String, JsValue> {
    #[cfg(target_arch = "wasm32")]
    if preview.skipped_rows > 0 {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "{} rows of the stock export will be skipped",
            preview.skipped_rows
        )));
    }

    serde_json::to_string(preview).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Preview a decoded stock export using the default column names
#[wasm_bindgen]
pub fn preview_stock_export(csv_text: &str) -> Result<String, JsValue> {
    let preview = preview(csv_text, &CsvColumns::default()).map_err(|e| JsValue::from_str(&e))?;
    to_json(&preview)
}

/// Preview a decoded stock export with custom column names
#[wasm_bindgen]
pub fn preview_stock_export_with_columns(csv_text: &str, columns_json: &str) -> Result<String, JsValue> {
    let columns: CsvColumns = serde_json::from_str(columns_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid columns JSON: {}", e)))?;
    let preview = preview(csv_text, &columns).map_err(|e| JsValue::from_str(&e))?;
    to_json(&preview)
}

/// Parse a quantity cell the way the import does
#[wasm_bindgen]
pub fn parse_stock_quantity(raw: &str) -> Option<i64> {
    parse_quantity(raw)
}
