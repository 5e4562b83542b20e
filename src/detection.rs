//! Detection record for a single blob in a single frame.

/// One detected blob: centroid position and area, in pixel units.
///
/// Detections are immutable once loaded; every later stage reads them but
/// never edits them. The frame index is kept as an unsigned integer so a
/// negative frame can never enter the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Zero-based frame index within the source movie.
    pub frame: u32,

    /// Centroid x coordinate in pixels.
    pub x: f64,

    /// Centroid y coordinate in pixels.
    pub y: f64,

    /// Blob area in square pixels.
    pub area: f64,
}

impl Detection {
    /// Create a new detection.
    pub fn new(frame: u32, x: f64, y: f64, area: f64) -> Self {
        Self { frame, x, y, area }
    }

    /// Centroid position as an `(x, y)` pair.
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Euclidean distance from this detection's centroid to `(x, y)`.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_detection_new() {
        let det = Detection::new(3, 1.5, 2.5, 40.0);

        assert_eq!(det.frame, 3);
        assert_relative_eq!(det.x, 1.5);
        assert_relative_eq!(det.y, 2.5);
        assert_relative_eq!(det.area, 40.0);
    }

    #[test]
    fn test_distance_to() {
        let det = Detection::new(0, 0.0, 0.0, 1.0);

        assert_relative_eq!(det.distance_to(3.0, 4.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(det.distance_to(0.0, 0.0), 0.0);
    }
}
