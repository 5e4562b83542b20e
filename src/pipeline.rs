//! Per-file pipeline and batch driver.
//!
//! One file is processed start to finish in isolation: load, link, filter,
//! derive, filter again. The batch driver runs many files and never lets one
//! file's failure abort or corrupt the others; failures are collected and
//! reported alongside the merged dataset.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::aggregate::LinkedDataset;
use crate::config::PipelineConfig;
use crate::detection::Detection;
use crate::filters::{filter_by_size, filter_by_velocity, filter_stubs, particle_count};
use crate::linker::Linker;
use crate::loader::{load_detections, source_id_from_path};
use crate::units::{derive_rows, TrackRow};
use crate::velocity::estimate_velocities;
use crate::{Error, Result};

/// Counts recorded at each stage of one file's pipeline.
///
/// Makes every drop decision observable: the difference between any two
/// consecutive counts is exactly what the stage in between removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// Source movie this report describes.
    pub source_id: String,

    /// Detections loaded from the export.
    pub detections: usize,

    /// Trajectories produced by linking.
    pub trajectories_linked: usize,

    /// Trajectories surviving the stub filter.
    pub after_stub_filter: usize,

    /// Trajectories surviving the size filter and, when enabled, the
    /// velocity filter.
    pub after_size_filter: usize,

    /// Final output rows.
    pub rows: usize,
}

/// Fully processed output of one file.
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Identifier derived from the export's file stem.
    pub source_id: String,

    /// Derived rows, grouped by particle in ascending frame order.
    pub rows: Vec<TrackRow>,

    /// Stage counts for this file.
    pub report: LinkReport,
}

/// A file the batch driver could not process.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Result of a batch run over many export files.
#[derive(Debug)]
pub struct BatchOutcome {
    /// All surviving rows of all files, in input order.
    pub dataset: LinkedDataset,

    /// One report per successfully processed file, in input order.
    pub reports: Vec<LinkReport>,

    /// Files that failed, in input order. Never fatal to the batch.
    pub failures: Vec<FileFailure>,
}

impl BatchOutcome {
    /// True when at least one file was given and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.reports.is_empty() && !self.failures.is_empty()
    }
}

/// Run the full pipeline on already-loaded detections.
///
/// An outcome with zero rows is not an error: the file simply had nothing
/// trackable, which is logged and reflected in the report counts.
///
/// # Arguments
/// * `source_id` - Identifier for the source movie
/// * `detections` - Loaded detections
/// * `config` - Calibration profile
pub fn process_detections(
    source_id: &str,
    detections: Vec<Detection>,
    config: &PipelineConfig,
) -> Result<FileResult> {
    let linker = Linker::new(config)?;
    info!(
        source_id,
        detections = detections.len(),
        search_range_px = linker.search_range(),
        "linking"
    );
    let detection_count = detections.len();

    let trajectories = linker.link(detections);
    let trajectories_linked = trajectories.len();

    let trajectories = filter_stubs(trajectories, config.stub_threshold_frames());
    let after_stub_filter = trajectories.len();
    info!(
        source_id,
        before = trajectories_linked,
        after = after_stub_filter,
        "stub filter"
    );

    let velocities = estimate_velocities(&trajectories);
    let rows = derive_rows(&trajectories, &velocities, config);

    let mut rows = filter_by_size(rows, config.min_area_um2, config.max_area_um2);
    if let Some(floor) = config.min_velocity_um_per_s {
        rows = filter_by_velocity(rows, floor);
    }
    let after_size_filter = particle_count(&rows);

    if rows.is_empty() {
        warn!(source_id, "pipeline produced no rows");
    }

    let report = LinkReport {
        source_id: source_id.to_string(),
        detections: detection_count,
        trajectories_linked,
        after_stub_filter,
        after_size_filter,
        rows: rows.len(),
    };
    Ok(FileResult {
        source_id: source_id.to_string(),
        rows,
        report,
    })
}

/// Load one export file and run the full pipeline on it.
pub fn process_file<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> Result<FileResult> {
    let path = path.as_ref();
    info!(path = %path.display(), "processing");
    let source_id = source_id_from_path(path);
    let detections = load_detections(path, config)?;
    process_detections(&source_id, detections, config)
}

/// Process every file in order, isolating failures per file.
pub fn run_batch(paths: &[PathBuf], config: &PipelineConfig) -> BatchOutcome {
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match process_file(path, config) {
            Ok(result) => results.push(result),
            Err(error) => {
                error!(path = %path.display(), kind = ?error.kind(), %error, "file failed");
                failures.push(FileFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }
    finish_batch(results, failures)
}

/// Like [`run_batch`], processing files on the rayon thread pool.
///
/// Per-file runs share no mutable state and results are merged back in
/// input order, so the outcome is identical to the sequential driver.
pub fn run_batch_parallel(paths: &[PathBuf], config: &PipelineConfig) -> BatchOutcome {
    let processed: Vec<Result<FileResult>> = paths
        .par_iter()
        .map(|path| process_file(path, config))
        .collect();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (path, outcome) in paths.iter().zip(processed) {
        match outcome {
            Ok(result) => results.push(result),
            Err(error) => {
                error!(path = %path.display(), kind = ?error.kind(), %error, "file failed");
                failures.push(FileFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }
    finish_batch(results, failures)
}

fn finish_batch(results: Vec<FileResult>, failures: Vec<FileFailure>) -> BatchOutcome {
    let reports = results.iter().map(|r| r.report.clone()).collect();
    let dataset = LinkedDataset::from_results(results);
    BatchOutcome {
        dataset,
        reports,
        failures,
    }
}
