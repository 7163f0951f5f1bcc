//
// error.rs
// Dicom-Reface-rs
//
// Typed failures raised by the classification table, the tag transforms and the external tool boundary.
//
// Thales Matheus Mendonça Santos - November 2025

use thiserror::Error;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, RefaceError>;

#[derive(Error, Debug)]
pub enum RefaceError {
    /// Malformed classification table (empty source, ragged rows, duplicate headers).
    #[error("Malformed scan table: {0}")]
    Format(String),

    #[error("Column not found in header: {0}")]
    ColumnNotFound(String),

    #[error("Row {row} out of range (table has {rows} data rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Scan {scan} in experiment {experiment} not found in scan table")]
    ScanNotFound { experiment: String, scan: String },

    /// Non-head scans are never de-faced.
    #[error("Body part {0:?} not supported")]
    UnsupportedBodyPart(String),

    #[error("PET radiopharmaceutical {0:?} not supported")]
    UnsupportedRadiopharmaceutical(String),

    #[error("Image type not found for modality {modality:?}")]
    ImageTypeNotFound { modality: String },

    #[error("Unknown image type {0:?} (expected one of CT, PIB, FDG, TAU, FLAIR, T2, T1)")]
    UnknownImageType(String),

    #[error("External de-facing tool failed with exit code {code}")]
    ExternalToolFailure { code: i32 },

    #[error("DICOM error: {0}")]
    Dicom(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<dicom::object::ReadError> for RefaceError {
    fn from(e: dicom::object::ReadError) -> Self {
        RefaceError::Dicom(e.to_string())
    }
}

impl From<dicom::object::WriteError> for RefaceError {
    fn from(e: dicom::object::WriteError) -> Self {
        RefaceError::Dicom(e.to_string())
    }
}
