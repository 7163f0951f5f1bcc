//
// table.rs
// Dicom-Reface-rs
//
// Loads the scan classification CSV into an immutable header + rows table with name-based column lookup.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{RefaceError, Result};

/// Per-scan attribute table exported by the scan classifier.
///
/// The header is kept apart from the data rows, so row indices returned by
/// this module address data rows only (index 0 is the first row after the header).
#[derive(Debug, Clone)]
pub struct ScanTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: HashMap<String, usize>,
}

impl ScanTable {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a CSV source. Every data row must have exactly as many cells as the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|h| h.to_string()).collect(),
            None => return Err(RefaceError::Format("table is empty".into())),
        };

        let mut columns = HashMap::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            if columns.insert(name.clone(), idx).is_some() {
                return Err(RefaceError::Format(format!(
                    "duplicate column {:?} in header",
                    name
                )));
            }
        }

        let mut rows = Vec::new();
        for (offset, record) in records.enumerate() {
            let record = record?;
            if record.len() != header.len() {
                // Line numbers are 1-based and count the header.
                return Err(RefaceError::Format(format!(
                    "line {} has {} cells, header has {}",
                    offset + 2,
                    record.len(),
                    header.len()
                )));
            }
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Self {
            header,
            rows,
            columns,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Index of the first candidate name present in the header.
    pub fn resolve_column(&self, candidates: &[&str]) -> Result<usize> {
        candidates
            .iter()
            .find_map(|name| self.columns.get(*name).copied())
            .ok_or_else(|| RefaceError::ColumnNotFound(candidates.join(" | ")))
    }

    pub fn column_value(&self, column: &str, row: usize) -> Result<&str> {
        let idx = self.resolve_column(&[column])?;
        self.cell(idx, row)
    }

    /// Cell at a resolved column index.
    pub fn cell(&self, column: usize, row: usize) -> Result<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .ok_or(RefaceError::RowOutOfRange {
                row,
                rows: self.rows.len(),
            })
    }
}
