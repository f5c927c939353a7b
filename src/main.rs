use anyhow::{Context, Result};
use answer_sheet_scanner::config::AppConfig;
use answer_sheet_scanner::errors::error_logging;
use answer_sheet_scanner::observability;
use answer_sheet_scanner::omr::{grade, render_overlay, AnswerKey};
use answer_sheet_scanner::pipeline::{ScanOutcome, ScanPipeline, ScanReport};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "answer-sheet-scanner")]
#[command(about = "Read the marked options of multiple-choice answer sheets from photos")]
#[command(version)]
struct Cli {
    /// Photos of answer sheets (PNG, JPEG, BMP or TIFF).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON file with scan settings; overrides the OMR_* environment variables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Answer key, e.g. "2,0,4,1,3" or "C,A,E,B,D". Adds a grade to every report.
    #[arg(long)]
    key: Option<String>,

    /// Directory to write annotated sheets into.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Directory to write the rectified sheets into.
    #[arg(long)]
    rectified: Option<PathBuf>,

    /// Print reports as indented JSON.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(path) = &cli.config {
        config = config.with_scan_file(path)?;
    }
    config.validate()?;

    observability::init_observability_with_config(&config.observability)?;
    info!("{}", config.summary());

    let key = match &cli.key {
        Some(raw) => {
            let key: AnswerKey = raw.parse().map_err(|e| {
                error_logging::log_validation_error(
                    &e,
                    "parse_answer_key",
                    "answer_key",
                    Some(raw.as_str()),
                );
                e
            })?;
            key.validate(config.scan.grid.options_per_row)?;
            Some(key)
        }
        None => None,
    };

    for dir in [&cli.annotate, &cli.rectified].into_iter().flatten() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    }

    let pipeline = ScanPipeline::new(config.scan)?;

    let mut failures = 0usize;
    for path in &cli.images {
        match process_image(&pipeline, path, key.as_ref(), &cli) {
            Ok(report) => {
                let json = if cli.pretty {
                    serde_json::to_string_pretty(&report)?
                } else {
                    serde_json::to_string(&report)?
                };
                println!("{}", json);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: {:#}", path.display(), e);
            }
        }
    }

    info!(
        images = cli.images.len(),
        failures = failures,
        "Batch finished"
    );

    if failures > 0 {
        anyhow::bail!("{} of {} images could not be scanned", failures, cli.images.len());
    }
    Ok(())
}

fn process_image(
    pipeline: &ScanPipeline,
    path: &Path,
    key: Option<&AnswerKey>,
    cli: &Cli,
) -> Result<ScanReport> {
    let outcome = pipeline.scan_file(path)?;

    let grade_report = key.map(|k| grade(outcome.answers(), k)).transpose()?;

    if let Some(dir) = &cli.rectified {
        let target = output_path(dir, path, "rectified");
        outcome
            .rectified
            .image
            .save(&target)
            .with_context(|| format!("cannot write {}", target.display()))?;
    }
    if let Some(dir) = &cli.annotate {
        write_overlay(dir, path, &outcome, key)?;
    }

    Ok(ScanReport::new(&path.display().to_string(), &outcome, grade_report))
}

fn write_overlay(
    dir: &Path,
    path: &Path,
    outcome: &ScanOutcome,
    key: Option<&AnswerKey>,
) -> Result<()> {
    let overlay = render_overlay(
        &outcome.rectified.image,
        &outcome.reading.rows,
        outcome.answers(),
        key,
    );
    let target = output_path(dir, path, "annotated");
    overlay
        .save(&target)
        .with_context(|| format!("cannot write {}", target.display()))?;
    Ok(())
}

/// `<dir>/<input stem>.<suffix>.png`
fn output_path(dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".to_string());
    dir.join(format!("{}.{}.png", stem, suffix))
}
