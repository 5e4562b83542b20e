//! Frame-to-frame trajectory linking.
//!
//! Walks the distinct frames of a detection table in ascending order and, at
//! each transition, assigns detections to open trajectories with globally
//! minimal total displacement. Trajectories unseen for more frames than the
//! occlusion memory allows are retired and can never be reopened.

use itertools::Itertools;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::detection::Detection;
use crate::matching::match_frame;
use crate::trajectory::Trajectory;
use crate::Result;

/// Links per-frame detections into trajectories.
///
/// A linker is a pure function of its parameters: the same detections always
/// produce the same trajectories, including particle id assignment.
#[derive(Debug, Clone)]
pub struct Linker {
    search_range: f64,
    memory: u32,
}

impl Linker {
    /// Create a linker from a calibration profile.
    ///
    /// # Arguments
    /// * `config` - Profile supplying the search range and occlusion memory
    ///
    /// # Returns
    /// The linker, or `Error::InvalidConfig` when the profile does not
    /// validate.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            search_range: config.search_range_px(),
            memory: config.memory,
        })
    }

    /// Maximum per-frame displacement in pixels.
    pub fn search_range(&self) -> f64 {
        self.search_range
    }

    /// Frames a particle may go undetected before its trajectory is retired.
    pub fn memory(&self) -> u32 {
        self.memory
    }

    /// Link detections into trajectories.
    ///
    /// Detections may arrive in any order; they are processed frame by
    /// frame, ascending, with the input order preserved inside each frame.
    /// New particle ids are assigned sequentially from 0 in order of first
    /// appearance.
    ///
    /// # Returns
    /// All trajectories, sorted by particle id. Every trajectory has
    /// strictly increasing frames with no step larger than `memory + 1`.
    pub fn link(&self, mut detections: Vec<Detection>) -> Vec<Trajectory> {
        if detections.is_empty() {
            return Vec::new();
        }
        // Stable sort keeps the file order of detections within a frame
        detections.sort_by_key(|d| d.frame);

        let mut open: Vec<Trajectory> = Vec::new();
        let mut closed: Vec<Trajectory> = Vec::new();
        let mut next_particle: u32 = 0;

        let frames = detections.iter().chunk_by(|d| d.frame);
        for (frame, group) in &frames {
            let frame_detections: Vec<Detection> = group.copied().collect();

            // Retire trajectories that have been missing too long. `open`
            // stays sorted by particle id so that candidate column order
            // equals id order.
            let mut still_open = Vec::with_capacity(open.len());
            for trajectory in open.drain(..) {
                let missed = frame - trajectory.last_frame() - 1;
                if missed > self.memory {
                    closed.push(trajectory);
                } else {
                    still_open.push(trajectory);
                }
            }
            open = still_open;

            let candidates: Vec<(f64, f64)> =
                open.iter().map(|t| t.last_position()).collect();
            let outcome = match_frame(&frame_detections, &candidates, self.search_range);

            for &(det_idx, cand_idx) in &outcome.matched {
                open[cand_idx].push(frame_detections[det_idx]);
            }
            for &det_idx in &outcome.unmatched_detections {
                open.push(Trajectory::new(next_particle, frame_detections[det_idx]));
                next_particle += 1;
            }
        }

        closed.extend(open);
        closed.sort_by_key(|t| t.particle);
        debug!(
            trajectories = closed.len(),
            search_range = self.search_range,
            memory = self.memory,
            "linking complete"
        );
        closed
    }
}
