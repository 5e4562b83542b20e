//! Linked particle trajectory.

use crate::detection::Detection;

/// One particle's detections across frames, in strictly increasing frame
/// order.
///
/// Trajectories are created only by the linker. Downstream stages treat the
/// whole trajectory as the unit of inclusion: filters remove trajectories,
/// they never edit the detections inside one.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Per-file particle id, assigned sequentially by the linker.
    pub particle: u32,

    /// The detections, one per frame the particle was seen in.
    pub detections: Vec<Detection>,
}

impl Trajectory {
    /// Start a new trajectory from its first detection.
    pub fn new(particle: u32, first: Detection) -> Self {
        Self {
            particle,
            detections: vec![first],
        }
    }

    /// Append the next detection. Frames must arrive in increasing order;
    /// the linker guarantees this by processing frames in ascending order.
    pub(crate) fn push(&mut self, detection: Detection) {
        debug_assert!(
            detection.frame > self.last_frame(),
            "detections must be appended in increasing frame order"
        );
        self.detections.push(detection);
    }

    /// Number of frames this particle was detected in.
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// True when the trajectory holds no detections. Never the case for
    /// linker output, which always seeds a trajectory with one detection.
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Frame of the first detection.
    pub fn first_frame(&self) -> u32 {
        self.detections.first().map(|d| d.frame).unwrap_or(0)
    }

    /// Frame of the most recent detection.
    pub fn last_frame(&self) -> u32 {
        self.detections.last().map(|d| d.frame).unwrap_or(0)
    }

    /// Position of the most recent detection, used as the matching
    /// candidate for the next frame.
    pub fn last_position(&self) -> (f64, f64) {
        self.detections
            .last()
            .map(|d| d.position())
            .unwrap_or((0.0, 0.0))
    }

    /// Largest frame-to-frame step in this trajectory. A trajectory linked
    /// with occlusion memory `m` never exceeds `m + 1`.
    pub fn max_frame_step(&self) -> u32 {
        self.detections
            .windows(2)
            .map(|w| w[1].frame - w[0].frame)
            .max()
            .unwrap_or(0)
    }

    /// Mean blob area over the trajectory, in square pixels.
    pub fn mean_area(&self) -> f64 {
        if self.detections.is_empty() {
            return 0.0;
        }
        self.detections.iter().map(|d| d.area).sum::<f64>() / self.detections.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn traj() -> Trajectory {
        let mut t = Trajectory::new(7, Detection::new(2, 1.0, 2.0, 10.0));
        t.push(Detection::new(3, 2.0, 3.0, 14.0));
        t.push(Detection::new(6, 3.0, 4.0, 18.0));
        t
    }

    #[test]
    fn test_frame_bounds() {
        let t = traj();
        assert_eq!(t.len(), 3);
        assert_eq!(t.first_frame(), 2);
        assert_eq!(t.last_frame(), 6);
    }

    #[test]
    fn test_last_position() {
        let t = traj();
        assert_eq!(t.last_position(), (3.0, 4.0));
    }

    #[test]
    fn test_max_frame_step() {
        let t = traj();
        // Steps are 1 and 3
        assert_eq!(t.max_frame_step(), 3);

        let single = Trajectory::new(0, Detection::new(0, 0.0, 0.0, 1.0));
        assert_eq!(single.max_frame_step(), 0);
    }

    #[test]
    fn test_mean_area() {
        let t = traj();
        assert_relative_eq!(t.mean_area(), 14.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "increasing frame order")]
    fn test_push_rejects_stale_frame() {
        let mut t = Trajectory::new(0, Detection::new(5, 0.0, 0.0, 1.0));
        t.push(Detection::new(5, 1.0, 1.0, 1.0));
    }
}
