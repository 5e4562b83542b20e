//! Aggregated CSV output.
//!
//! One batch run produces one CSV, named after the wall-clock time of the
//! run so successive runs never overwrite each other.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::aggregate::LinkedDataset;
use crate::Result;

/// Output columns, in order. This is the file format contract; the header
/// row is written even when the dataset is empty.
pub const OUTPUT_COLUMNS: [&str; 13] = [
    "frame",
    "x",
    "y",
    "area",
    "dx",
    "dy",
    "time",
    "speed_px",
    "speed_um",
    "area_um",
    "x_velocity_um",
    "source_id",
    "global_trajectory_id",
];

/// Write the dataset as CSV to any writer.
pub fn write_csv<W: Write>(dataset: &LinkedDataset, writer: W) -> Result<()> {
    // Header is written explicitly so empty datasets still produce a
    // well-formed file; rows then serialize without their own header
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(OUTPUT_COLUMNS)?;
    for row in dataset.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the dataset to a file at `path`.
pub fn write_to_path<P: AsRef<Path>>(dataset: &LinkedDataset, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_csv(dataset, BufWriter::new(file))
}

/// File name for a run that finished at `timestamp`, e.g.
/// `240305_0230PM.csv`.
pub fn timestamped_filename(timestamp: &DateTime<Local>) -> String {
    format!("{}.csv", timestamp.format("%y%m%d_%I%M%p"))
}

/// Write the dataset into `dir` under a timestamped name, creating the
/// directory if needed.
///
/// # Returns
/// The path of the file written.
pub fn write_timestamped<P: AsRef<Path>>(dataset: &LinkedDataset, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(timestamped_filename(&Local::now()));
    write_to_path(dataset, &path)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        trajectories = dataset.trajectory_count(),
        "wrote aggregated results"
    );
    Ok(path)
}
