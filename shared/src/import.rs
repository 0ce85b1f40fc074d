//! Parsing of semicolon-delimited stock exports
//!
//! The parser works on already-decoded text. Rows that cannot be used are
//! reported as skipped instead of failing the whole export; only a missing
//! header column is fatal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{parse_quantity, validate_denomination, validate_reference};

/// Header names of the columns the import reads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CsvColumns {
    pub depot: String,
    pub reference: String,
    pub denomination: String,
    pub quantity: String,
    /// Optional column; exports without it are accepted
    pub ean: String,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            depot: "Dépôt".to_string(),
            reference: "Référence".to_string(),
            denomination: "Désignation".to_string(),
            quantity: "Stock réel".to_string(),
            ean: "EAN".to_string(),
        }
    }
}

/// A usable row of a stock export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockRow {
    /// 1-based line in the export, header included
    pub line: u64,
    pub depot: String,
    pub reference: String,
    pub denomination: String,
    pub ean: Option<String>,
    pub quantity: i64,
}

/// Why a row was dropped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowRejection {
    Malformed,
    MissingDepot,
    MissingReference,
    MissingDenomination,
    InvalidQuantity,
    NonPositiveQuantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: RowRejection,
}

/// Result of parsing a whole export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedExport {
    pub rows: Vec<StockRow>,
    pub skipped: Vec<SkippedRow>,
}

/// Structural problems that make an export unreadable
#[derive(Debug, Error)]
pub enum ExportFormatError {
    #[error("Missing column in header: {0}")]
    MissingColumn(String),

    #[error("Unreadable export header: {0}")]
    Header(#[from] csv::Error),
}

/// Column positions resolved from the header row
struct ColumnIndex {
    depot: usize,
    reference: usize,
    denomination: usize,
    quantity: usize,
    ean: Option<usize>,
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, columns: &CsvColumns) -> Result<Self, ExportFormatError> {
        let position = |name: &str| {
            let wanted = normalize_header(name);
            headers.iter().position(|h| normalize_header(h) == wanted)
        };
        let required = |name: &str| {
            position(name).ok_or_else(|| ExportFormatError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            depot: required(&columns.depot)?,
            reference: required(&columns.reference)?,
            denomination: required(&columns.denomination)?,
            quantity: required(&columns.quantity)?,
            ean: position(&columns.ean),
        })
    }
}

fn cell(record: &csv::StringRecord, index: usize) -> Option<&str> {
    record.get(index).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_record(
    record: &csv::StringRecord,
    index: &ColumnIndex,
    line: u64,
) -> Result<StockRow, RowRejection> {
    let depot = cell(record, index.depot).ok_or(RowRejection::MissingDepot)?;
    let reference = cell(record, index.reference)
        .filter(|r| validate_reference(r).is_ok())
        .ok_or(RowRejection::MissingReference)?;
    let denomination = cell(record, index.denomination)
        .filter(|d| validate_denomination(d).is_ok())
        .ok_or(RowRejection::MissingDenomination)?;
    let quantity = cell(record, index.quantity)
        .and_then(parse_quantity)
        .ok_or(RowRejection::InvalidQuantity)?;
    if quantity <= 0 {
        return Err(RowRejection::NonPositiveQuantity);
    }

    Ok(StockRow {
        line,
        depot: depot.to_string(),
        reference: reference.to_string(),
        denomination: denomination.to_string(),
        ean: index.ean.and_then(|i| cell(record, i)).map(str::to_string),
        quantity,
    })
}

/// Parse a decoded stock export.
///
/// Short rows and rows with unusable fields are collected in
/// [`ParsedExport::skipped`]; only a missing or unreadable header is an error.
pub fn parse_stock_export(text: &str, columns: &CsvColumns) -> Result<ParsedExport, ExportFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());

    let index = ColumnIndex::resolve(reader.headers()?, columns)?;
    let mut parsed = ParsedExport::default();

    for (offset, record) in reader.records().enumerate() {
        let fallback_line = offset as u64 + 2;
        let outcome = match record {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
                parse_record(&record, &index, line).map_err(|reason| SkippedRow { line, reason })
            }
            Err(_) => Err(SkippedRow {
                line: fallback_line,
                reason: RowRejection::Malformed,
            }),
        };

        match outcome {
            Ok(row) => parsed.rows.push(row),
            Err(skipped) => parsed.skipped.push(skipped),
        }
    }

    Ok(parsed)
}

/// Summed quantity of one reference across the rows of an export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceTotal {
    pub reference: String,
    /// Denomination of the first row seen for the reference
    pub denomination: String,
    pub ean: Option<String>,
    pub quantity: i64,
    pub row_count: usize,
}

/// Group rows by reference and sum their quantities
pub fn aggregate_by_reference<'a, I>(rows: I) -> BTreeMap<String, ReferenceTotal>
where
    I: IntoIterator<Item = &'a StockRow>,
{
    let mut totals: BTreeMap<String, ReferenceTotal> = BTreeMap::new();
    for row in rows {
        let total = totals
            .entry(row.reference.clone())
            .or_insert_with(|| ReferenceTotal {
                reference: row.reference.clone(),
                denomination: row.denomination.clone(),
                ean: None,
                quantity: 0,
                row_count: 0,
            });
        total.quantity = total.quantity.saturating_add(row.quantity);
        total.row_count += 1;
        if total.ean.is_none() {
            total.ean = row.ean.clone();
        }
    }
    totals
}
