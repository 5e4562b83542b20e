//! Per-trajectory velocity estimation.
//!
//! Velocities are finite differences over the trajectory's sample sequence
//! with unit spacing: central differences in the interior, one-sided at the
//! ends. Occlusion gaps are not expanded; a bridged gap contributes one unit
//! step like any other sample pair, matching how the results have always
//! been computed for this data.

use crate::trajectory::Trajectory;

/// Velocity of one particle at one frame, in pixels per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityRecord {
    /// Particle id within the source file.
    pub particle: u32,

    /// Frame this velocity belongs to.
    pub frame: u32,

    /// Centroid position the velocity was evaluated at. Carried along so
    /// the merge back onto detection rows can demand an exact match.
    pub x: f64,
    pub y: f64,

    /// Displacement per frame along x.
    pub dx: f64,

    /// Displacement per frame along y.
    pub dy: f64,
}

/// Numerical gradient of a sample sequence with unit spacing.
///
/// Interior points use the central difference `(v[i+1] - v[i-1]) / 2`; the
/// two ends use one-sided differences. Sequences shorter than two samples
/// have no usable difference and produce zeros.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let mut out = Vec::with_capacity(n);
            out.push(values[1] - values[0]);
            for i in 1..n - 1 {
                out.push((values[i + 1] - values[i - 1]) / 2.0);
            }
            out.push(values[n - 1] - values[n - 2]);
            out
        }
    }
}

/// Estimate per-frame velocities for every sufficiently long trajectory.
///
/// Trajectories with two or fewer detections are skipped entirely: a
/// central difference needs three samples, and emitting zeros instead would
/// fabricate a measurement. Rows of skipped trajectories simply receive no
/// velocity.
///
/// # Returns
/// One record per detection of every trajectory longer than two detections,
/// in trajectory order.
pub fn estimate_velocities(trajectories: &[Trajectory]) -> Vec<VelocityRecord> {
    let mut records = Vec::new();
    for trajectory in trajectories {
        if trajectory.len() <= 2 {
            continue;
        }

        let xs: Vec<f64> = trajectory.detections.iter().map(|d| d.x).collect();
        let ys: Vec<f64> = trajectory.detections.iter().map(|d| d.y).collect();
        let dxs = gradient(&xs);
        let dys = gradient(&ys);

        for (detection, (dx, dy)) in trajectory
            .detections
            .iter()
            .zip(dxs.into_iter().zip(dys.into_iter()))
        {
            records.push(VelocityRecord {
                particle: trajectory.particle,
                frame: detection.frame,
                x: detection.x,
                y: detection.y,
                dx,
                dy,
            });
        }
    }
    records
}
