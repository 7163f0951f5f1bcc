use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::table::ScanTable;

/// One acquisition inside one imaging session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRef {
    pub experiment: String,
    pub scan: String,
}

impl ScanRef {
    /// Archive-relative resource path of the scan.
    pub fn uri(&self) -> String {
        format!(
            "/archive/experiments/{}/scans/{}",
            self.experiment, self.scan
        )
    }
}

/// Where the scans of a batch come from.
pub trait ScanSource {
    fn fetch_scan_list(&self) -> Result<Vec<ScanRef>>;
}

/// Scan list read from the `experiment` and `scan` columns of a CSV.
pub struct CsvScanList {
    path: PathBuf,
}

impl CsvScanList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScanSource for CsvScanList {
    fn fetch_scan_list(&self) -> Result<Vec<ScanRef>> {
        let table = ScanTable::load(&self.path)?;
        scan_refs(&table)
    }
}

/// Every row with a non-empty experiment and scan, in table order.
pub fn scan_refs(table: &ScanTable) -> Result<Vec<ScanRef>> {
    let experiment_col = table.resolve_column(&["experiment"])?;
    let scan_col = table.resolve_column(&["scan"])?;

    let mut refs = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let experiment = table.cell(experiment_col, row)?;
        let scan = table.cell(scan_col, row)?;
        if experiment.is_empty() || scan.is_empty() {
            warn!(row, "Skipping row without experiment or scan");
            continue;
        }
        refs.push(ScanRef {
            experiment: experiment.to_string(),
            scan: scan.to_string(),
        });
    }
    Ok(refs)
}
