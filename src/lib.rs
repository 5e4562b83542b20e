//! # microtrack - Particle Trajectory Linking
//!
//! Post-processing for microscopy particle-tracking exports.
//!
//! Takes per-frame blob detections (centroid + area) exported by an
//! image-analysis tool, links them into particle trajectories across frames,
//! filters out stubs and out-of-range particles, and derives calibrated
//! kinematic quantities ready for analysis or video overlay.
//!
//! ## Pipeline
//!
//! - Load detections from a CSV export (several frame-label conventions)
//! - Link detections across frames with globally minimal total displacement
//! - Drop short-lived trajectories (stubs)
//! - Estimate per-frame velocities with a central-difference gradient
//! - Convert pixel quantities to physical units
//! - Filter whole trajectories by size and optional speed thresholds
//! - Aggregate per-file results under globally unique trajectory ids
//!
//! ## Example
//!
//! ```rust,ignore
//! use microtrack::{pipeline, output, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let outcome = pipeline::run_batch(&paths, &config);
//! let written = output::write_timestamped(&outcome.dataset, "linked_results")?;
//! ```

pub mod config;
pub mod detection;
pub mod label;
pub mod loader;
pub mod assignment;
pub mod matching;
pub mod trajectory;
pub mod linker;
pub mod velocity;
pub mod units;
pub mod filters;
pub mod pipeline;
pub mod aggregate;
pub mod output;

// Re-exports for convenience
pub use aggregate::{AggregatedRow, LinkedDataset};
pub use config::PipelineConfig;
pub use detection::Detection;
pub use label::LabelFormat;
pub use linker::Linker;
pub use pipeline::{BatchOutcome, FileFailure, FileResult, LinkReport};
pub use trajectory::Trajectory;
pub use units::TrackRow;
pub use velocity::VelocityRecord;

// Error types
pub use crate::error::{Error, ErrorKind, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while processing tracking exports.
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Unrecognized frame-label format: {0:?}")]
        UnrecognizedLabelFormat(String),

        #[error("Missing required column: {0}")]
        MissingColumn(String),

        #[error("Invalid frame label {label:?}: {reason}")]
        InvalidFrameLabel { label: String, reason: String },

        #[error("CSV error: {0}")]
        Csv(#[from] csv::Error),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
    }

    /// Broad failure categories used in per-file batch reporting.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ErrorKind {
        /// A calibration constant or label convention is unusable.
        Configuration,
        /// The input file does not match the expected table shape.
        DataIntegrity,
        /// The file system failed underneath us.
        Io,
    }

    impl Error {
        /// Classify this error into the reporting taxonomy.
        pub fn kind(&self) -> ErrorKind {
            match self {
                Error::InvalidConfig(_) | Error::UnrecognizedLabelFormat(_) => {
                    ErrorKind::Configuration
                }
                Error::MissingColumn(_) | Error::InvalidFrameLabel { .. } | Error::Csv(_) => {
                    ErrorKind::DataIntegrity
                }
                Error::Io(_) => ErrorKind::Io,
            }
        }
    }

    /// Result type for microtrack operations.
    pub type Result<T> = std::result::Result<T, Error>;
}
