//
// lib.rs
// Dicom-Reface-rs
//
// Module tree of the de-facing driver: table and classifier, DICOM tag transforms, tool launch and output staging.
//
// Thales Matheus Mendonça Santos - November 2025

pub mod classifier;
pub mod cli;
pub mod dicom_access;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scans;
pub mod scrub;
pub mod staging;
pub mod table;
pub mod tool;
pub mod window;

pub use classifier::ImageType;
pub use cli::{run as run_cli, Cli, Commands};
pub use error::{RefaceError, Result};
