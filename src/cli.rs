//
// cli.rs
// Dicom-Reface-rs
//
// Subcommands for running the full de-facing job or any of its steps on their own; environment fallbacks for container use.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn, Level};

use crate::classifier::{classify_scan, ImageType};
use crate::pipeline::{self, ImageTypeSource, PipelineConfig};
use crate::scans::{CsvScanList, ScanSource};
use crate::table::ScanTable;
use crate::tool::{split_tool_opts, MriRefaceScript};
use crate::window::{self, WindowSpec};
use crate::scrub;

#[derive(Parser)]
#[command(name = "dicom-reface")]
#[command(about = "Classify DICOM scans and drive mri_reface de-facing", long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full de-facing pipeline on one scan
    Run(RunArgs),
    /// Resolve the mri_reface image type of a scan from a classification CSV
    Classify {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        experiment: String,
        #[arg(long)]
        scan: String,
        #[arg(long)]
        json: bool,
    },
    /// List the scans of a CSV (experiment, scan columns)
    Scans {
        #[arg(long)]
        csv: PathBuf,
        /// Also classify every listed scan
        #[arg(long)]
        classify: bool,
    },
    /// Copy a DICOM series with series description and protocol name cleared
    Scrub {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the window center/width captured from a file or directory
    WindowCapture {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Overwrite window center/width on every DICOM file of a directory
    WindowApply {
        dir: PathBuf,
        #[arg(long)]
        center: String,
        #[arg(long)]
        width: String,
        #[arg(long)]
        explanation: Option<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// mri_reface launcher script
    #[arg(
        long,
        env = "MRI_REFACE_SCRIPT",
        default_value = "/usr/bin/mlrtapp/run_mri_reface.sh"
    )]
    pub mri_reface_script: PathBuf,
    /// Explicit image type (CT, PIB, FDG, TAU, FLAIR, T2, T1)
    #[arg(long, required_unless_present = "csv")]
    pub scan_type: Option<ImageType>,
    /// Classification CSV used when no scan type is given
    #[arg(long, conflicts_with = "scan_type", requires_all = ["experiment", "scan"])]
    pub csv: Option<PathBuf>,
    #[arg(long)]
    pub experiment: Option<String>,
    #[arg(long)]
    pub scan: Option<String>,
    /// Extra mri_reface arguments, whitespace separated
    #[arg(long, allow_hyphen_values = true)]
    pub mri_reface_opts: Option<String>,
    /// DICOM scan input directory
    #[arg(long, default_value = "/input")]
    pub input: PathBuf,
    /// mri_reface output directory
    #[arg(long, default_value = "/output")]
    pub output: PathBuf,
    /// Clear series description and protocol name before de-facing
    #[arg(long)]
    pub scrub_protocol: bool,
    /// Staging folder for scrubbed copies (default: <input>_scrubbed)
    #[arg(long, requires = "scrub_protocol")]
    pub scrub_dir: Option<PathBuf>,
    /// File or directory to take the window calibration from (default: input)
    #[arg(long, conflicts_with = "no_window")]
    pub window_reference: Option<PathBuf>,
    /// Do not carry window center/width over to the output
    #[arg(long)]
    pub no_window: bool,
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<(PipelineConfig, MriRefaceScript, bool)> {
        let image_type = match (self.scan_type, self.csv) {
            (Some(image_type), _) => ImageTypeSource::Explicit(image_type),
            (None, Some(csv)) => ImageTypeSource::Table {
                csv,
                experiment: self
                    .experiment
                    .ok_or_else(|| anyhow!("--experiment is required with --csv"))?,
                scan: self
                    .scan
                    .ok_or_else(|| anyhow!("--scan is required with --csv"))?,
            },
            (None, None) => return Err(anyhow!("Either --scan-type or --csv must be specified")),
        };

        let mut config = PipelineConfig::new(self.input, self.output, image_type);
        config.tool_args = split_tool_opts(self.mri_reface_opts.as_deref());
        if self.scrub_protocol {
            config.scrub_dir = Some(
                self.scrub_dir
                    .unwrap_or_else(|| pipeline::default_scrub_dir(&config.input)),
            );
        }
        if self.no_window {
            config.window_reference = None;
        } else if let Some(reference) = self.window_reference {
            config.window_reference = Some(reference);
        }

        Ok((
            config,
            MriRefaceScript::new(self.mri_reface_script),
            self.json,
        ))
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // A second initialisation (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let args: Vec<String> = std::env::args().collect();
    info!(command = %args.join(" "), "Command line call");
    let start = Instant::now();

    let result = dispatch(cli.command);

    let elapsed = start.elapsed().as_secs();
    info!(
        "Execution time: {}:{:02} (minutes:seconds)",
        elapsed / 60,
        elapsed % 60
    );
    result
}

fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => {
            let (config, script, json) = args.into_config()?;
            let summary = pipeline::run_pipeline(&config, &script)?;
            if json {
                print_json(&summary)?;
            } else {
                println!("Image type: {}", summary.image_type);
                println!(
                    "Staged: {} refaced, {} nifti",
                    summary.staging.refaced, summary.staging.nifti
                );
            }
        }
        Commands::Classify {
            csv,
            experiment,
            scan,
            json,
        } => {
            let report = pipeline::classify_from_table(&csv, &experiment, &scan)?;
            if json {
                print_json(&report)?;
            } else {
                println!("{}", report.image_type);
            }
        }
        Commands::Scans { csv, classify } => {
            let refs = CsvScanList::new(&csv).fetch_scan_list()?;
            let table = if classify {
                Some(ScanTable::load(&csv).with_context(|| format!("Failed to load {:?}", csv))?)
            } else {
                None
            };
            for scan_ref in refs {
                match &table {
                    Some(table) => match classify_scan(table, &scan_ref.experiment, &scan_ref.scan) {
                        Ok((_, image_type)) => println!("{}\t{}", scan_ref.uri(), image_type),
                        Err(e) => {
                            warn!(uri = %scan_ref.uri(), error = %e, "Classification failed");
                            println!("{}\t-", scan_ref.uri());
                        }
                    },
                    None => println!("{}", scan_ref.uri()),
                }
            }
        }
        Commands::Scrub { input, output } => {
            let summary = scrub::scrub_directory(&input, &output)?;
            println!(
                "Scrubbed {} files ({} cleared, {} failed, {} name collisions) into {:?}",
                summary.written, summary.cleared, summary.failed, summary.collisions, output
            );
        }
        Commands::WindowCapture { path, json } => {
            let spec = window::capture_reference_window(&path)
                .with_context(|| format!("Failed to read window from {:?}", path))?;
            if json {
                print_json(&spec)?;
            } else {
                println!("Center:      {}", spec.center.as_deref().unwrap_or("N/A"));
                println!("Width:       {}", spec.width.as_deref().unwrap_or("N/A"));
                println!("Explanation: {}", spec.explanation.as_deref().unwrap_or("N/A"));
            }
        }
        Commands::WindowApply {
            dir,
            center,
            width,
            explanation,
        } => {
            let spec = WindowSpec {
                center: Some(center),
                width: Some(width),
                explanation,
            };
            let summary = window::apply_window(&dir, &spec);
            println!(
                "Window applied to {} files ({} failed)",
                summary.updated, summary.failed
            );
        }
    }

    Ok(())
}
