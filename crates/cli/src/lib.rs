use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use takeoff_core::{load_snapshot, save_snapshot, EstimateStore};

#[derive(Debug, Parser)]
#[command(name = "takeoff-cli")]
#[command(about = "Takeoff CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable project summary for a drawing.
    Info {
        #[arg(value_name = "DRAWING")]
        drawing: PathBuf,
    },
    /// Print the full cost report as JSON.
    Report {
        #[arg(value_name = "DRAWING")]
        drawing: PathBuf,
        /// Override the stored markup percentage.
        #[arg(long)]
        markup: Option<f32>,
    },
    /// Reload the snapshot, rebuild the report, and refresh the cached
    /// cost items on disk.
    Validate {
        #[arg(value_name = "DRAWING")]
        drawing: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    calibrated: bool,
    meters_per_pixel: f32,
    annotation_count: usize,
    label_count: usize,
    grand_total: f32,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    path: String,
    items: usize,
    grand_total: f32,
    cache_was_stale: bool,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { drawing } => run_info(&drawing),
        Commands::Report { drawing, markup } => run_report(&drawing, markup),
        Commands::Validate { drawing } => run_validate(&drawing),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_store(drawing: &Path) -> Result<EstimateStore> {
    let snapshot = load_snapshot(drawing)
        .with_context(|| format!("failed to read snapshot for {}", drawing.display()))?
        .with_context(|| format!("no takeoff snapshot found for {}", drawing.display()))?;
    Ok(EstimateStore::from_snapshot(snapshot))
}

fn run_info(drawing: &Path) -> Result<()> {
    let store = load_store(drawing)?;
    let calibration = store.calibration();

    let payload = InfoOutput {
        path: drawing.display().to_string(),
        calibrated: calibration.is_calibrated,
        meters_per_pixel: calibration.meters_per_pixel,
        annotation_count: store.annotation_count(),
        label_count: store.labels().len(),
        grand_total: store.report().grand_total,
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");
    Ok(())
}

fn run_report(drawing: &Path, markup: Option<f32>) -> Result<()> {
    let mut store = load_store(drawing)?;
    if let Some(markup_percent) = markup {
        store
            .set_markup_percent(markup_percent)
            .context("invalid markup override")?;
    }

    let json = serde_json::to_string_pretty(store.report())?;
    println!("{json}");
    Ok(())
}

fn run_validate(drawing: &Path) -> Result<()> {
    let snapshot = load_snapshot(drawing)
        .with_context(|| format!("failed to read snapshot for {}", drawing.display()))?
        .with_context(|| format!("no takeoff snapshot found for {}", drawing.display()))?;

    let cached_items = snapshot.cost_items.clone();
    let store = EstimateStore::from_snapshot(snapshot);
    let report = store.report();
    let cache_was_stale = cached_items != report.items;

    if cache_was_stale {
        save_snapshot(drawing, &store.snapshot()).context("failed to refresh snapshot cache")?;
    }

    let payload = ValidateOutput {
        path: drawing.display().to_string(),
        items: report.items.len(),
        grand_total: report.grand_total,
        cache_was_stale,
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");
    Ok(())
}
