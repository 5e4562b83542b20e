//! Physical units and derived kinematic quantities.
//!
//! Pure per-row arithmetic. Row count and order are preserved exactly; the
//! only thing this stage adds is columns.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::trajectory::Trajectory;
use crate::velocity::VelocityRecord;

/// One fully derived output row for a single (particle, frame) pair.
///
/// Velocity-derived fields are `None` for trajectories too short for a
/// gradient; they serialize as empty CSV cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRow {
    /// Particle id within the source file. Not serialized; the aggregator
    /// replaces it with a globally unique id.
    #[serde(skip)]
    pub particle: u32,

    /// Frame index.
    pub frame: u32,

    /// Centroid position in pixels.
    pub x: f64,
    pub y: f64,

    /// Blob area in square pixels.
    pub area: f64,

    /// Displacement per frame in pixels, when available.
    pub dx: Option<f64>,
    pub dy: Option<f64>,

    /// Elapsed time in seconds: `frame / fps`.
    pub time: f64,

    /// Speed in pixels per frame: `sqrt(dx^2 + dy^2)`.
    pub speed_px: Option<f64>,

    /// Speed in microns per second: `speed_px * fps * mpp`.
    pub speed_um: Option<f64>,

    /// Area in square microns: `area * mpp^2`.
    pub area_um: f64,

    /// Signed x velocity in microns per second, the forward/backward
    /// component: `dx * fps * mpp`.
    pub x_velocity_um: Option<f64>,
}

/// Expand trajectories into derived rows, attaching velocities where they
/// exist.
///
/// Velocity records are joined on exact `(particle, frame, x, y)` equality,
/// like a left join: a row with no matching record keeps empty velocity
/// fields rather than a fabricated zero.
///
/// # Arguments
/// * `trajectories` - Linked (and stub-filtered) trajectories
/// * `velocities` - Records from velocity estimation
/// * `config` - Calibration profile for unit conversion
///
/// # Returns
/// One row per detection, grouped by particle in ascending frame order.
pub fn derive_rows(
    trajectories: &[Trajectory],
    velocities: &[VelocityRecord],
    config: &PipelineConfig,
) -> Vec<TrackRow> {
    let fps = config.frames_per_second;
    let mpp = config.microns_per_pixel;

    let mut by_key: HashMap<(u32, u32), &VelocityRecord> = HashMap::new();
    for record in velocities {
        by_key.insert((record.particle, record.frame), record);
    }

    let mut rows = Vec::with_capacity(trajectories.iter().map(|t| t.len()).sum());
    for trajectory in trajectories {
        for detection in &trajectory.detections {
            let velocity = by_key
                .get(&(trajectory.particle, detection.frame))
                .filter(|r| r.x == detection.x && r.y == detection.y);

            let (dx, dy) = match velocity {
                Some(r) => (Some(r.dx), Some(r.dy)),
                None => (None, None),
            };
            let speed_px = dx.zip(dy).map(|(dx, dy)| dx.hypot(dy));

            rows.push(TrackRow {
                particle: trajectory.particle,
                frame: detection.frame,
                x: detection.x,
                y: detection.y,
                area: detection.area,
                dx,
                dy,
                time: detection.frame as f64 / fps,
                speed_px,
                speed_um: speed_px.map(|v| v * fps * mpp),
                area_um: detection.area * mpp * mpp,
                x_velocity_um: dx.map(|v| v * fps * mpp),
            });
        }
    }
    rows
}
