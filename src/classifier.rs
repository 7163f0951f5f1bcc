//
// classifier.rs
// Dicom-Reface-rs
//
// Resolves the mri_reface image type of one scan from the classification table (body part, modality, tracer, label).
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RefaceError, Result};
use crate::table::ScanTable;

/// Image types understood by the de-facing tool's `-imType` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    #[serde(rename = "CT")]
    Ct,
    #[serde(rename = "PIB")]
    Pib,
    #[serde(rename = "FDG")]
    Fdg,
    #[serde(rename = "TAU")]
    Tau,
    #[serde(rename = "FLAIR")]
    Flair,
    #[serde(rename = "T2")]
    T2,
    #[serde(rename = "T1")]
    T1,
}

impl ImageType {
    pub const ALL: [ImageType; 7] = [
        ImageType::Ct,
        ImageType::Pib,
        ImageType::Fdg,
        ImageType::Tau,
        ImageType::Flair,
        ImageType::T2,
        ImageType::T1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageType::Ct => "CT",
            ImageType::Pib => "PIB",
            ImageType::Fdg => "FDG",
            ImageType::Tau => "TAU",
            ImageType::Flair => "FLAIR",
            ImageType::T2 => "T2",
            ImageType::T1 => "T1",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = RefaceError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        ImageType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RefaceError::UnknownImageType(s.to_string()))
    }
}

/// Prioritized column names for one logical field. Upstream producers fill
/// either the coded DICOM tag column or a readable alias.
#[derive(Debug, Clone, Copy)]
pub struct FieldCandidates {
    pub field: &'static str,
    pub names: &'static [&'static str],
}

pub const BODY_PART: FieldCandidates = FieldCandidates {
    field: "body part",
    names: &["0018_0015", "BodyPartExamined"],
};

pub const MODALITY: FieldCandidates = FieldCandidates {
    field: "modality",
    names: &["0008_0060", "Modality"],
};

pub const RADIOPHARMACEUTICAL: FieldCandidates = FieldCandidates {
    field: "radiopharmaceutical",
    names: &["0054_0016", "Radiopharmaceutical"],
};

pub const LABEL: FieldCandidates = FieldCandidates {
    field: "label",
    names: &["labels1"],
};

const SUPPORTED_BODY_PARTS: [&str; 5] = ["head", "brain", "neuro", "n/a", ""];

// Tracer spellings are matched case-sensitively, except FDG.
const AMYLOID_TRACERS: [&str; 5] = ["Amyloid", "PIB", "AV45", "florbetapir", "AV-45"];
const TAU_TRACERS: [&str; 4] = ["AV1451", "AV-1451", "flortaucipir", "tau"];

/// How a row was selected from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "row", rename_all = "snake_case")]
pub enum RowResolution {
    /// The table holds a single data row, used whatever key was requested.
    SingleRow(usize),
    /// First row whose `experiment` and `scan` cells equal the requested key.
    KeyMatch(usize),
}

impl RowResolution {
    pub fn index(self) -> usize {
        match self {
            RowResolution::SingleRow(idx) | RowResolution::KeyMatch(idx) => idx,
        }
    }
}

/// Locate the row describing `(experiment, scan)`.
///
/// Single-row tables are taken as describing the requested scan without
/// checking the key; callers handing over a one-row export rely on that.
pub fn resolve_row(table: &ScanTable, experiment: &str, scan: &str) -> Result<RowResolution> {
    if table.len() == 1 {
        return Ok(RowResolution::SingleRow(0));
    }

    let experiment_col = table.resolve_column(&["experiment"])?;
    let scan_col = table.resolve_column(&["scan"])?;

    for row in 0..table.len() {
        if table.cell(experiment_col, row)? == experiment && table.cell(scan_col, row)? == scan {
            return Ok(RowResolution::KeyMatch(row));
        }
    }
    Err(RefaceError::ScanNotFound {
        experiment: experiment.to_string(),
        scan: scan.to_string(),
    })
}

/// Raw classification inputs of one scan. Tracer and label are only read for
/// the modalities that need them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFields {
    pub body_part: String,
    pub modality: String,
    pub radiopharmaceutical: Option<String>,
    pub label: Option<String>,
}

fn field_value<'a>(table: &'a ScanTable, field: FieldCandidates, row: usize) -> Result<&'a str> {
    let column = table.resolve_column(field.names)?;
    table.cell(column, row)
}

/// Classify a resolved row of the table.
pub fn classify(table: &ScanTable, row: usize) -> Result<ImageType> {
    let body_part = field_value(table, BODY_PART, row)?;
    check_body_part(body_part)?;

    let modality = field_value(table, MODALITY, row)?;
    let mut fields = ScanFields {
        body_part: body_part.to_string(),
        modality: modality.to_string(),
        ..ScanFields::default()
    };
    match modality {
        "PET" => {
            fields.radiopharmaceutical =
                Some(field_value(table, RADIOPHARMACEUTICAL, row)?.to_string())
        }
        "MRI" | "MR" => fields.label = Some(field_value(table, LABEL, row)?.to_string()),
        _ => {}
    }

    classify_fields(&fields)
}

/// Decision hierarchy over already extracted values: body part, then modality,
/// then tracer (PET) or free-text label (MR).
pub fn classify_fields(fields: &ScanFields) -> Result<ImageType> {
    check_body_part(&fields.body_part)?;

    let image_type = match fields.modality.as_str() {
        "CT" => Some(ImageType::Ct),
        "PET" => Some(classify_pet(
            fields.radiopharmaceutical.as_deref().unwrap_or_default(),
        )?),
        "MRI" | "MR" => Some(classify_mr(fields.label.as_deref().unwrap_or_default())),
        _ => None,
    };

    image_type.ok_or_else(|| RefaceError::ImageTypeNotFound {
        modality: fields.modality.clone(),
    })
}

/// Resolve the row for `(experiment, scan)` and classify it.
pub fn classify_scan(table: &ScanTable, experiment: &str, scan: &str) -> Result<(RowResolution, ImageType)> {
    debug!(experiment, scan, "Finding scan in classification table");
    let resolution = resolve_row(table, experiment, scan)?;
    debug!(?resolution, "Scan row resolved");
    let image_type = classify(table, resolution.index())?;
    Ok((resolution, image_type))
}

fn check_body_part(body_part: &str) -> Result<()> {
    let normalized = body_part.to_lowercase();
    if SUPPORTED_BODY_PARTS.contains(&normalized.as_str()) {
        Ok(())
    } else {
        Err(RefaceError::UnsupportedBodyPart(body_part.to_string()))
    }
}

fn classify_pet(radiopharmaceutical: &str) -> Result<ImageType> {
    if AMYLOID_TRACERS.contains(&radiopharmaceutical) {
        Ok(ImageType::Pib)
    } else if radiopharmaceutical.eq_ignore_ascii_case("fdg") {
        Ok(ImageType::Fdg)
    } else if TAU_TRACERS.contains(&radiopharmaceutical) {
        Ok(ImageType::Tau)
    } else {
        Err(RefaceError::UnsupportedRadiopharmaceutical(
            radiopharmaceutical.to_string(),
        ))
    }
}

fn classify_mr(label: &str) -> ImageType {
    let label = label.to_lowercase();
    // FLAIR is the default; T2 is checked before T1.
    if label.contains("t2") && !label.contains("flair") {
        ImageType::T2
    } else if label.contains("t1") || label.contains("mprage") {
        ImageType::T1
    } else {
        ImageType::Flair
    }
}
