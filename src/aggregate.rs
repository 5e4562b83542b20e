//! Cross-file aggregation.
//!
//! Per-file results are concatenated, never merged: rows keep their input
//! order and nothing is deduplicated. Particle ids from different files may
//! collide, so each row is stamped with a globally unique trajectory id
//! before the files are combined.

use std::collections::HashSet;

use serde::Serialize;

use crate::pipeline::FileResult;
use crate::units::TrackRow;

/// One output row of the aggregated dataset.
///
/// Field order here is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub frame: u32,
    pub x: f64,
    pub y: f64,
    pub area: f64,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub time: f64,
    pub speed_px: Option<f64>,
    pub speed_um: Option<f64>,
    pub area_um: f64,
    pub x_velocity_um: Option<f64>,

    /// Source movie this row came from.
    pub source_id: String,

    /// `"{source_id}-{particle}"`, unique across the whole batch.
    pub global_trajectory_id: String,

    /// File-local particle id, kept for queries but not written out.
    #[serde(skip)]
    pub particle: u32,
}

impl AggregatedRow {
    fn from_track_row(row: TrackRow, source_id: &str) -> Self {
        Self {
            frame: row.frame,
            x: row.x,
            y: row.y,
            area: row.area,
            dx: row.dx,
            dy: row.dy,
            time: row.time,
            speed_px: row.speed_px,
            speed_um: row.speed_um,
            area_um: row.area_um,
            x_velocity_um: row.x_velocity_um,
            source_id: source_id.to_string(),
            global_trajectory_id: format!("{}-{}", source_id, row.particle),
            particle: row.particle,
        }
    }
}

/// The combined output of a batch run.
#[derive(Debug, Clone, Default)]
pub struct LinkedDataset {
    rows: Vec<AggregatedRow>,
}

impl LinkedDataset {
    /// Concatenate per-file results in input order.
    pub fn from_results(results: Vec<FileResult>) -> Self {
        let mut rows = Vec::new();
        for result in results {
            let source_id = result.source_id;
            rows.extend(
                result
                    .rows
                    .into_iter()
                    .map(|row| AggregatedRow::from_track_row(row, &source_id)),
            );
        }
        Self { rows }
    }

    /// All rows, in output order.
    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    /// Number of output rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no file contributed any rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct trajectories across all files.
    pub fn trajectory_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.global_trajectory_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct source ids, in first-appearance order.
    pub fn sources(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for row in &self.rows {
            if seen.insert(row.source_id.as_str()) {
                sources.push(row.source_id.as_str());
            }
        }
        sources
    }

    /// Rows belonging to one source movie.
    pub fn for_source<'a>(&'a self, source_id: &str) -> Vec<&'a AggregatedRow> {
        self.rows
            .iter()
            .filter(|r| r.source_id == source_id)
            .collect()
    }

    /// Rows of one source movie up to and including `frame`.
    ///
    /// This is the replay query a video overlay uses: everything visible by
    /// the time the movie has played `frame` frames.
    pub fn through_frame<'a>(&'a self, source_id: &str, frame: u32) -> Vec<&'a AggregatedRow> {
        self.rows
            .iter()
            .filter(|r| r.source_id == source_id && r.frame <= frame)
            .collect()
    }
}
