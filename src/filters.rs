//! Trajectory-level filters.
//!
//! Every filter here treats a whole trajectory as the unit of inclusion:
//! either all of a particle's rows survive or none do. Filters only remove,
//! they never edit rows, so applying them twice changes nothing.

use itertools::Itertools;
use tracing::debug;

use crate::trajectory::Trajectory;
use crate::units::TrackRow;

/// Drop trajectories shorter than `min_length_frames` detections.
///
/// Short-lived trajectories are usually noise blobs or linking accidents;
/// the threshold comes from the profile's minimum lifetime in seconds.
pub fn filter_stubs(trajectories: Vec<Trajectory>, min_length_frames: usize) -> Vec<Trajectory> {
    let before = trajectories.len();
    let kept: Vec<Trajectory> = trajectories
        .into_iter()
        .filter(|t| {
            let keep = t.len() >= min_length_frames;
            if !keep {
                debug!(particle = t.particle, length = t.len(), "dropped stub");
            }
            keep
        })
        .collect();
    debug!(before, after = kept.len(), "stub filter");
    kept
}

/// Drop trajectories outside the plausible size window.
///
/// A trajectory is removed when its mean area is at or below
/// `min_area_um2` (too small to be a real particle) or its maximum area is
/// at or above `max_area_um2` (a clump or an artifact).
pub fn filter_by_size(rows: Vec<TrackRow>, min_area_um2: f64, max_area_um2: f64) -> Vec<TrackRow> {
    let before = particle_count(&rows);
    let mut kept = Vec::with_capacity(rows.len());

    for (particle, group) in &rows.into_iter().chunk_by(|r| r.particle) {
        let group: Vec<TrackRow> = group.collect();
        let mean = group.iter().map(|r| r.area_um).sum::<f64>() / group.len() as f64;
        let max = group
            .iter()
            .map(|r| r.area_um)
            .fold(f64::NEG_INFINITY, f64::max);

        if mean <= min_area_um2 {
            debug!(particle, mean_area_um2 = mean, "dropped undersized trajectory");
        } else if max >= max_area_um2 {
            debug!(particle, max_area_um2 = max, "dropped oversized trajectory");
        } else {
            kept.extend(group);
        }
    }

    debug!(before, after = particle_count(&kept), "size filter");
    kept
}

/// Drop trajectories whose mean forward velocity is at or below the floor.
///
/// The mean is taken over the rows that actually carry a velocity. A
/// trajectory with no velocity rows at all has no evidence of motion and is
/// dropped too.
pub fn filter_by_velocity(rows: Vec<TrackRow>, min_velocity_um_per_s: f64) -> Vec<TrackRow> {
    let before = particle_count(&rows);
    let mut kept = Vec::with_capacity(rows.len());

    for (particle, group) in &rows.into_iter().chunk_by(|r| r.particle) {
        let group: Vec<TrackRow> = group.collect();
        let velocities: Vec<f64> = group.iter().filter_map(|r| r.x_velocity_um).collect();

        let keep = match mean(&velocities) {
            Some(v) => v > min_velocity_um_per_s,
            None => false,
        };
        if keep {
            kept.extend(group);
        } else {
            debug!(particle, "dropped slow trajectory");
        }
    }

    debug!(before, after = particle_count(&kept), "velocity filter");
    kept
}

/// Number of distinct particles in a row set. Rows are grouped by particle,
/// so counting runs is enough.
pub fn particle_count(rows: &[TrackRow]) -> usize {
    rows.iter().chunk_by(|r| r.particle).into_iter().count()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
