//
// pipeline.rs
// Dicom-Reface-rs
//
// Runs one de-facing job end to end: classify, scrub, capture window, run the tool, re-apply window, stage outputs.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::classifier::{classify_scan, ImageType};
use crate::models::{ClassificationReport, RunSummary};
use crate::scrub::scrub_directory;
use crate::staging::stage_outputs;
use crate::table::ScanTable;
use crate::tool::DefaceTool;
use crate::window::{apply_window, capture_reference_window};

/// Where the image type of the run comes from.
#[derive(Debug, Clone)]
pub enum ImageTypeSource {
    Explicit(ImageType),
    Table {
        csv: PathBuf,
        experiment: String,
        scan: String,
    },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub image_type: ImageTypeSource,
    pub tool_args: Vec<String>,
    /// Staging folder for scrubbed copies; `None` disables scrubbing.
    pub scrub_dir: Option<PathBuf>,
    /// Source of the window calibration; `None` disables the carry-over.
    pub window_reference: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, image_type: ImageTypeSource) -> Self {
        let input = input.into();
        Self {
            window_reference: Some(input.clone()),
            input,
            output: output.into(),
            image_type,
            tool_args: Vec::new(),
            scrub_dir: None,
        }
    }
}

/// Default scrub staging folder: `<input>_scrubbed` next to the input.
pub fn default_scrub_dir(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    input.with_file_name(format!("{}_scrubbed", name))
}

pub fn classify_from_table(csv: &Path, experiment: &str, scan: &str) -> Result<ClassificationReport> {
    let table = ScanTable::load(csv).with_context(|| format!("Failed to load scan table {:?}", csv))?;
    let (resolution, image_type) = classify_scan(&table, experiment, scan).with_context(|| {
        format!(
            "Failed to classify scan {} in experiment {} from {:?}",
            scan, experiment, csv
        )
    })?;
    info!(experiment, scan, %image_type, "Found mri_reface imType");
    Ok(ClassificationReport {
        experiment: experiment.to_string(),
        scan: scan.to_string(),
        resolution,
        image_type,
    })
}

pub fn resolve_image_type(source: &ImageTypeSource) -> Result<ImageType> {
    match source {
        ImageTypeSource::Explicit(image_type) => Ok(*image_type),
        ImageTypeSource::Table {
            csv,
            experiment,
            scan,
        } => Ok(classify_from_table(csv, experiment, scan)?.image_type),
    }
}

/// Execute a full run. Any error aborts the remaining steps; a failing tool
/// leaves the output tree without window or staging changes.
pub fn run_pipeline<T: DefaceTool>(config: &PipelineConfig, tool: &T) -> Result<RunSummary> {
    let image_type = resolve_image_type(&config.image_type)?;

    let (tool_input, scrub) = match &config.scrub_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Scrubbing protocol descriptors");
            let summary = scrub_directory(&config.input, dir)?;
            (dir.clone(), Some(summary))
        }
        None => (config.input.clone(), None),
    };

    let window = match &config.window_reference {
        Some(reference) => Some(
            capture_reference_window(reference)
                .with_context(|| format!("Failed to read window from {:?}", reference))?,
        ),
        None => None,
    };

    info!(%image_type, input = %tool_input.display(), output = %config.output.display(), "Launching mri_reface");
    let exit = tool
        .run(&tool_input, &config.output, image_type, &config.tool_args)
        .context("Failed to launch mri_reface")?;
    exit.check().context("mri_reface did not complete")?;

    let windowed = window
        .as_ref()
        .map(|spec| apply_window(&config.output, spec));

    info!("Staging output files");
    let staging = stage_outputs(&config.output)?;

    Ok(RunSummary {
        image_type,
        scrub,
        window,
        windowed,
        staging,
    })
}
