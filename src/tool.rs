//
// tool.rs
// Dicom-Reface-rs
//
// Launches the external mri_reface script as a blocking child process and reports its exit status.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::classifier::ImageType;
use crate::error::{RefaceError, Result};

/// Exit status of the de-facing tool. Signal termination maps to -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    pub code: i32,
}

impl ToolExit {
    pub fn success(self) -> bool {
        self.code == 0
    }

    /// Turn a non-zero exit into [`RefaceError::ExternalToolFailure`].
    pub fn check(self) -> Result<()> {
        if self.success() {
            Ok(())
        } else {
            Err(RefaceError::ExternalToolFailure { code: self.code })
        }
    }
}

/// The opaque de-facing step. The pipeline only sees this seam.
pub trait DefaceTool {
    fn run(
        &self,
        input: &Path,
        output: &Path,
        image_type: ImageType,
        extra_args: &[String],
    ) -> Result<ToolExit>;
}

/// `run_mri_reface.sh <input> <output> -imType <TYPE> [opts...]`
#[derive(Debug, Clone)]
pub struct MriRefaceScript {
    pub script: PathBuf,
}

impl MriRefaceScript {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn command(
        &self,
        input: &Path,
        output: &Path,
        image_type: ImageType,
        extra_args: &[String],
    ) -> Command {
        let mut cmd = Command::new(&self.script);
        cmd.arg(input)
            .arg(output)
            .arg("-imType")
            .arg(image_type.as_str())
            .args(extra_args);
        cmd
    }
}

impl DefaceTool for MriRefaceScript {
    fn run(
        &self,
        input: &Path,
        output: &Path,
        image_type: ImageType,
        extra_args: &[String],
    ) -> Result<ToolExit> {
        let mut cmd = self.command(input, output, image_type, extra_args);
        info!(command = ?cmd, "Launching mri_reface");

        // stdio is inherited so the tool's progress streams straight to the container log.
        let status = cmd.status()?;
        let exit = ToolExit {
            code: status.code().unwrap_or(-1),
        };
        info!(code = exit.code, "mri_reface returned");
        Ok(exit)
    }
}

/// Split a free-form option string the way a shell would split unquoted words.
pub fn split_tool_opts(opts: Option<&str>) -> Vec<String> {
    opts.map(|o| o.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
