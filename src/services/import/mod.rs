// src/services/import/mod.rs
//
// Bulk question import: raw cells are read from a delimited or spreadsheet
// file into a `Table`, then every row goes through the same normalization.

pub mod answer;
pub mod delimited;
pub mod headers;
pub mod rows;
pub mod spreadsheet;

use std::fmt;

use serde::Serialize;

use crate::models::question::QuestionDraft;
use headers::HeaderIndex;
pub use rows::{RowRejection, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Delimited,
    Spreadsheet,
}

/// Cells of an uploaded file, header row split from data rows.
#[derive(Debug, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The file as a whole could not be read. Aborts the import.
#[derive(Debug)]
pub enum ImportError {
    Encoding,
    Delimited(csv::Error),
    Spreadsheet(String),
    NoWorksheet,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Encoding => write!(f, "File is not valid UTF-8 text"),
            ImportError::Delimited(e) => write!(f, "Could not parse CSV: {}", e),
            ImportError::Spreadsheet(e) => write!(f, "Could not read workbook: {}", e),
            ImportError::NoWorksheet => write!(f, "Workbook has no worksheets"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Delimited(err)
    }
}

pub fn read_table(bytes: &[u8], format: ImportFormat) -> Result<Table, ImportError> {
    match format {
        ImportFormat::Delimited => delimited::read(bytes),
        ImportFormat::Spreadsheet => spreadsheet::read(bytes),
    }
}

/// A data row after normalization, tagged with its 1-based file row.
#[derive(Debug)]
pub struct NormalizedRow {
    pub row: usize,
    pub outcome: Result<QuestionDraft, RowRejection>,
}

/// Normalizes every data row. The header is row 1, so data starts at row 2.
pub fn normalize_table(table: &Table) -> Vec<NormalizedRow> {
    let index = HeaderIndex::new(&table.headers);
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, cells)| NormalizedRow {
            row: i + 2,
            outcome: rows::normalize_row(&index, cells),
        })
        .collect()
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// Outcome of one import request.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub ids: Vec<i64>,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn record_imported(&mut self, id: i64) {
        self.imported += 1;
        self.ids.push(id);
    }

    pub fn record_skipped(&mut self, row: usize, rejection: RowRejection) {
        self.skipped += 1;
        self.errors.push(RowError {
            row,
            reason: rejection.reason,
            question: rejection.question,
        });
    }
}
