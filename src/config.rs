//! Pipeline calibration profile.
//!
//! All dataset-specific constants live in one [`PipelineConfig`] value that is
//! passed explicitly through every stage. Switching datasets means loading a
//! different profile (e.g. from a TOML file), never editing code.

use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// Area of a disk with the given diameter.
///
/// Convenience for deriving `min_area_um2` from a minimum particle diameter
/// in microns.
pub fn disk_area(diameter: f64) -> f64 {
    std::f64::consts::PI * (diameter / 2.0).powi(2)
}

/// Calibration constants and filter thresholds for one dataset.
///
/// The default profile matches the original wheel-tracking dataset this
/// pipeline was built for; other datasets override fields via TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Acquisition frame rate in frames per second.
    pub frames_per_second: f64,

    /// Spatial calibration in microns per pixel.
    pub microns_per_pixel: f64,

    /// Fastest plausible particle speed in microns per second.
    /// Determines the per-frame search range for linking.
    pub max_speed_um_per_s: f64,

    /// Number of consecutive frames a particle may go undetected and still
    /// be linked to its trajectory when it reappears.
    pub memory: u32,

    /// Minimum trajectory lifetime in seconds; shorter trajectories are
    /// discarded as stubs.
    pub min_lifetime_s: f64,

    /// Trajectories whose mean area is at or below this threshold (in square
    /// microns) are discarded.
    pub min_area_um2: f64,

    /// Trajectories whose maximum area is at or above this threshold (in
    /// square microns) are discarded.
    pub max_area_um2: f64,

    /// Optional speed floor in microns per second. `None` disables the
    /// velocity filter entirely.
    pub min_velocity_um_per_s: Option<f64>,

    /// Which underscore-delimited field of a filename-style frame label
    /// holds the frame number.
    pub stem_frame_field: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 10.0,
            microns_per_pixel: 0.618,
            max_speed_um_per_s: 250.0,
            memory: 0,
            min_lifetime_s: 1.0,
            min_area_um2: disk_area(4.5),
            max_area_um2: 36000.0,
            min_velocity_um_per_s: None,
            stem_frame_field: 2,
        }
    }
}

impl PipelineConfig {
    /// Load a profile from a TOML file. Missing fields fall back to the
    /// default profile. The result is validated before being returned.
    ///
    /// # Arguments
    /// * `path` - Path to the TOML profile
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = toml::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("bad profile: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every calibration constant is usable.
    ///
    /// # Returns
    /// `Ok(())` if the profile is consistent, otherwise an
    /// `Error::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.frames_per_second > 0.0) {
            return Err(Error::InvalidConfig(
                "frames_per_second must be positive".to_string(),
            ));
        }
        if !(self.microns_per_pixel > 0.0) {
            return Err(Error::InvalidConfig(
                "microns_per_pixel must be positive".to_string(),
            ));
        }
        if !(self.max_speed_um_per_s > 0.0) {
            return Err(Error::InvalidConfig(
                "max_speed_um_per_s must be positive".to_string(),
            ));
        }
        if !(self.min_lifetime_s >= 0.0) {
            return Err(Error::InvalidConfig(
                "min_lifetime_s must be non-negative".to_string(),
            ));
        }
        if !(self.max_area_um2 > self.min_area_um2) {
            return Err(Error::InvalidConfig(
                "max_area_um2 must exceed min_area_um2".to_string(),
            ));
        }
        if self.search_range_px() < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "search range rounds to {} px; raise max_speed_um_per_s",
                self.search_range_px()
            )));
        }
        Ok(())
    }

    /// Maximum displacement, in pixels, a particle may travel between
    /// consecutive frames: `max_speed / microns_per_pixel / fps`, rounded to
    /// the nearest whole pixel.
    pub fn search_range_px(&self) -> f64 {
        (self.max_speed_um_per_s / self.microns_per_pixel / self.frames_per_second).round()
    }

    /// Minimum trajectory length in frames implied by `min_lifetime_s`.
    pub fn stub_threshold_frames(&self) -> usize {
        (self.min_lifetime_s * self.frames_per_second).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ===== Default Profile =====

    #[test]
    fn test_default_profile_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_search_range() {
        // 250 um/s / 0.618 um/px / 10 fps = 40.45 px, rounded to 40
        let config = PipelineConfig::default();
        assert_relative_eq!(config.search_range_px(), 40.0);
    }

    #[test]
    fn test_default_stub_threshold() {
        // 1.0 s at 10 fps
        let config = PipelineConfig::default();
        assert_eq!(config.stub_threshold_frames(), 10);
    }

    #[test]
    fn test_disk_area() {
        assert_relative_eq!(disk_area(2.0), std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(disk_area(4.5), 15.904312808798327, epsilon = 1e-9);
    }

    // ===== Validation =====

    #[test]
    fn test_rejects_zero_fps() {
        let config = PipelineConfig {
            frames_per_second: 0.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err(), "Expected error for fps = 0");
    }

    #[test]
    fn test_rejects_negative_calibration() {
        let config = PipelineConfig {
            microns_per_pixel: -0.5,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_area_bounds() {
        let config = PipelineConfig {
            min_area_um2: 100.0,
            max_area_um2: 50.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_vanishing_search_range() {
        // 1 um/s at 10 fps and 0.618 um/px rounds to 0 px per frame
        let config = PipelineConfig {
            max_speed_um_per_s: 1.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err(), "Expected error for 0 px range");
    }

    #[test]
    fn test_nan_fields_rejected() {
        let config = PipelineConfig {
            frames_per_second: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err(), "NaN fps must not validate");
    }

    // ===== TOML Profiles =====

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let toml_text = "frames_per_second = 25.0\nmemory = 3\n";
        let config: PipelineConfig = toml::from_str(toml_text).unwrap();

        assert_relative_eq!(config.frames_per_second, 25.0);
        assert_eq!(config.memory, 3);
        // Untouched fields keep the default profile
        assert_relative_eq!(config.microns_per_pixel, 0.618);
        assert_eq!(config.min_velocity_um_per_s, None);
    }

    #[test]
    fn test_toml_velocity_floor() {
        let config: PipelineConfig = toml::from_str("min_velocity_um_per_s = 2.5\n").unwrap();
        assert_eq!(config.min_velocity_um_per_s, Some(2.5));
    }
}
