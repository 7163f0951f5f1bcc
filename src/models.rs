//
// models.rs
// Dicom-Reface-rs
//
// Defines serializable summaries for classification, scrubbing, window carry-over, staging and full runs.
//
// Thales Matheus Mendonça Santos - November 2025

use serde::Serialize;

use crate::classifier::{ImageType, RowResolution};
use crate::window::WindowSpec;

/// Outcome of looking up and classifying one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub experiment: String,
    pub scan: String,
    pub resolution: RowResolution,
    pub image_type: ImageType,
}

/// Counters for a protocol scrub over a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrubSummary {
    pub written: usize,
    /// Objects where at least one descriptor field was present and cleared.
    pub cleared: usize,
    pub failed: usize,
    /// Files whose name was already written during the same flattening pass.
    pub collisions: usize,
}

/// Counters for applying a window to an output tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowSummary {
    pub updated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StagingSummary {
    pub refaced: usize,
    pub nifti: usize,
}

/// Everything a pipeline run did, in order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub image_type: ImageType,
    pub scrub: Option<ScrubSummary>,
    pub window: Option<WindowSpec>,
    pub windowed: Option<WindowSummary>,
    pub staging: StagingSummary,
}
