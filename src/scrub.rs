use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dicom::core::{DataElement, PrimitiveValue, Tag};
use dicom::object::{open_file, DefaultDicomObject};
use tracing::{debug, info, warn};

use crate::dicom_access::{dicom_files, PROTOCOL_NAME, SERIES_DESCRIPTION};
use crate::error::RefaceError;
use crate::models::ScrubSummary;

const SCRUBBED_TAGS: [Tag; 2] = [SERIES_DESCRIPTION, PROTOCOL_NAME];

/// Blank the protocol descriptors that exist on `obj`. Absent fields stay
/// absent. Returns whether anything was present.
pub fn scrub_object(obj: &mut DefaultDicomObject) -> bool {
    let mut touched = false;
    for tag in SCRUBBED_TAGS {
        let vr = match obj.element(tag) {
            Ok(elem) => elem.vr(),
            Err(_) => continue,
        };
        obj.put(DataElement::new(tag, vr, PrimitiveValue::from("")));
        touched = true;
    }
    touched
}

/// Copy every DICOM file under `input` into `output` (flat, same file names)
/// with protocol descriptors cleared. Non-DICOM files are skipped.
///
/// Only failing to create `output` aborts; per-file failures are logged.
/// When two source files share a name the later one replaces the earlier
/// copy, and the collision is logged and counted.
pub fn scrub_directory(input: &Path, output: &Path) -> Result<ScrubSummary> {
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create scrub output directory {:?}", output))?;

    let mut summary = ScrubSummary::default();
    let mut seen: HashSet<OsString> = HashSet::new();
    for path in dicom_files(input) {
        if let Some(name) = path.file_name() {
            if !seen.insert(name.to_os_string()) {
                warn!(
                    path = %path.display(),
                    target = %output.join(name).display(),
                    "File name already written by this scrub, overwriting earlier copy"
                );
                summary.collisions += 1;
            }
        }
        match scrub_file(&path, output) {
            Ok(cleared) => {
                summary.written += 1;
                if cleared {
                    summary.cleared += 1;
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to scrub DICOM file");
                summary.failed += 1;
            }
        }
    }

    info!(
        input = %input.display(),
        output = %output.display(),
        written = summary.written,
        cleared = summary.cleared,
        failed = summary.failed,
        collisions = summary.collisions,
        "Scrubbed protocol descriptors"
    );
    Ok(summary)
}

fn scrub_file(path: &Path, output: &Path) -> std::result::Result<bool, RefaceError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| RefaceError::Dicom(format!("{:?} has no file name", path)))?;
    let mut obj = open_file(path)?;
    let cleared = scrub_object(&mut obj);
    let target = output.join(file_name);
    obj.write_to_file(&target)?;
    debug!(source = %path.display(), target = %target.display(), cleared, "Scrubbed file");
    Ok(cleared)
}
