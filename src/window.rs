//
// window.rs
// Dicom-Reface-rs
//
// Captures window center/width from the original series and stamps it back onto the de-faced DICOM output.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::object::open_file;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dicom_access::{
    dicom_files, is_dicom, ElementAccess, WINDOW_CENTER, WINDOW_CENTER_WIDTH_EXPLANATION,
    WINDOW_WIDTH,
};
use crate::error::Result;
use crate::models::WindowSummary;

/// Display calibration carried across the external tool.
///
/// Values are kept as their DICOM string form, so multi-valued windows
/// (`40\400`) survive untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub center: Option<String>,
    pub width: Option<String>,
    pub explanation: Option<String>,
}

impl WindowSpec {
    pub fn from_object<T: ElementAccess>(obj: &T) -> Self {
        Self {
            center: obj.element_str(WINDOW_CENTER),
            width: obj.element_str(WINDOW_WIDTH),
            explanation: obj.element_str(WINDOW_CENTER_WIDTH_EXPLANATION),
        }
    }

    /// Center and width are both known.
    pub fn is_complete(&self) -> bool {
        self.center.is_some() && self.width.is_some()
    }
}

/// Read the window of a reference file, or of the first DICOM file in a
/// directory tree that carries both center and width.
pub fn capture_reference_window(path: &Path) -> Result<WindowSpec> {
    if path.is_dir() {
        for file in dicom_files(path) {
            match open_file(&file) {
                Ok(obj) => {
                    let spec = WindowSpec::from_object(&obj);
                    if spec.is_complete() {
                        info!(reference = %file.display(), ?spec, "Captured reference window");
                        return Ok(spec);
                    }
                }
                Err(e) => warn!(path = %file.display(), error = %e, "Could not read DICOM file"),
            }
        }
        info!(dir = %path.display(), "No DICOM file with window center and width found");
        return Ok(WindowSpec::default());
    }

    if !is_dicom(path) {
        warn!(path = %path.display(), "Window reference is not a DICOM file");
        return Ok(WindowSpec::default());
    }
    match open_file(path) {
        Ok(obj) => {
            let spec = WindowSpec::from_object(&obj);
            debug!(reference = %path.display(), ?spec, "Captured reference window");
            Ok(spec)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read window reference");
            Ok(WindowSpec::default())
        }
    }
}

/// Overwrite window center/width (and explanation, when captured) on every
/// DICOM file under `dir`, in place. Does nothing for an incomplete spec.
pub fn apply_window(dir: &Path, spec: &WindowSpec) -> WindowSummary {
    let mut summary = WindowSummary::default();
    let (Some(center), Some(width)) = (spec.center.as_deref(), spec.width.as_deref()) else {
        debug!("Reference window incomplete, leaving output untouched");
        return summary;
    };

    for file in dicom_files(dir) {
        match apply_to_file(&file, center, width, spec.explanation.as_deref()) {
            Ok(()) => summary.updated += 1,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Failed to apply window");
                summary.failed += 1;
            }
        }
    }

    info!(
        dir = %dir.display(),
        updated = summary.updated,
        failed = summary.failed,
        "Applied reference window"
    );
    summary
}

fn apply_to_file(path: &Path, center: &str, width: &str, explanation: Option<&str>) -> Result<()> {
    let mut obj = open_file(path)?;
    obj.put(DataElement::new(WINDOW_CENTER, VR::DS, PrimitiveValue::from(center)));
    obj.put(DataElement::new(WINDOW_WIDTH, VR::DS, PrimitiveValue::from(width)));
    if let Some(explanation) = explanation {
        obj.put(DataElement::new(
            WINDOW_CENTER_WIDTH_EXPLANATION,
            VR::LO,
            PrimitiveValue::from(explanation),
        ));
    }
    obj.write_to_file(path)?;
    Ok(())
}
