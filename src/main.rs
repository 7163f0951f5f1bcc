//
// main.rs
// Dicom-Reface-rs
//
// Binary entry point that hands off execution to the CLI layer; any error ends the run with a non-zero status.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_reface::cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
