//! Command-line entry point: link one or more tracking exports and write
//! the aggregated CSV.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use microtrack::{output, pipeline, Error, PipelineConfig, Result};

#[derive(Parser, Debug)]
#[command(name = "microtrack", version)]
#[command(about = "Link particle-tracking exports into trajectories and derive calibrated kinematics")]
struct Args {
    /// CSV export files, or directories to scan for them.
    #[arg(required = true, value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// TOML file overriding the default calibration profile.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the timestamped result CSV is written into.
    #[arg(short, long, default_value = "linked_results")]
    output_dir: PathBuf,

    /// Process input files on a thread pool instead of sequentially.
    #[arg(long)]
    parallel: bool,

    /// Log verbosity (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };

    let files = collect_inputs(&args.inputs)?;
    info!(
        files = files.len(),
        search_range_px = config.search_range_px(),
        parallel = args.parallel,
        "starting batch"
    );

    let outcome = if args.parallel {
        pipeline::run_batch_parallel(&files, &config)
    } else {
        pipeline::run_batch(&files, &config)
    };

    for report in &outcome.reports {
        info!(
            source = %report.source_id,
            detections = report.detections,
            linked = report.trajectories_linked,
            kept = report.after_size_filter,
            rows = report.rows,
            "processed"
        );
    }
    for failure in &outcome.failures {
        warn!(
            path = %failure.path.display(),
            kind = ?failure.error.kind(),
            "skipped: {}",
            failure.error
        );
    }

    if outcome.all_failed() {
        // Nothing to write; surface the first failure as the run's error
        let failure = outcome
            .failures
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidConfig("no input files to process".to_string()))?;
        return Err(failure.error);
    }

    let written = output::write_timestamped(&outcome.dataset, &args.output_dir)?;
    info!(
        path = %written.display(),
        sources = outcome.reports.len(),
        failures = outcome.failures.len(),
        trajectories = outcome.dataset.trajectory_count(),
        rows = outcome.dataset.len(),
        "batch finished"
    );
    Ok(())
}

/// Expand the positional arguments into a flat list of CSV files.
///
/// Directories are scanned one level deep for `.csv` entries, sorted by
/// name so batch order is stable across runs.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.extension()
                        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        return Err(Error::InvalidConfig(
            "no CSV input files found".to_string(),
        ));
    }
    Ok(files)
}
