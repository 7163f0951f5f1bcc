use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::models::StagingSummary;

pub const REFACED_NIFTI_DIR: &str = "refaced_nifti";
pub const NIFTI_DIR: &str = "nifti";

/// De-faced volumes and warp fields, in the order they are staged.
pub const REFACED_PATTERNS: [&str; 2] = ["*deFaced.nii", "*Warp.nii"];
pub const NIFTI_PATTERN: &str = "*.nii";

/// Match a file name against a leading-wildcard pattern such as `*Warp.nii`.
fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => name == pattern,
    }
}

/// Move top-level regular files of `source` matching `pattern` into `target`.
pub fn move_matching(source: &Path, target: &Path, pattern: &str) -> Result<usize> {
    let mut matched: Vec<PathBuf> = fs::read_dir(source)
        .with_context(|| format!("Failed to list {:?}", source))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map_or(false, |t| t.is_file()))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(false, |name| matches_pattern(name, pattern))
        })
        .map(|entry| entry.path())
        .collect();
    matched.sort();

    for path in &matched {
        let name = path.file_name().context("Staged file has no name")?;
        let destination = target.join(name);
        fs::rename(path, &destination)
            .with_context(|| format!("Failed to move {:?} to {:?}", path, destination))?;
    }
    Ok(matched.len())
}

/// Split the tool output into `refaced_nifti/` and `nifti/` below `output`.
pub fn stage_outputs(output: &Path) -> Result<StagingSummary> {
    let refaced_dir = output.join(REFACED_NIFTI_DIR);
    fs::create_dir_all(&refaced_dir)
        .with_context(|| format!("Failed to create {:?}", refaced_dir))?;
    info!(dir = %refaced_dir.display(), "Moving refaced nifti files");
    let mut summary = StagingSummary::default();
    for pattern in REFACED_PATTERNS {
        summary.refaced += move_matching(output, &refaced_dir, pattern)?;
    }

    let nifti_dir = output.join(NIFTI_DIR);
    fs::create_dir_all(&nifti_dir).with_context(|| format!("Failed to create {:?}", nifti_dir))?;
    info!(dir = %nifti_dir.display(), "Moving nifti files");
    summary.nifti = move_matching(output, &nifti_dir, NIFTI_PATTERN)?;

    Ok(summary)
}
