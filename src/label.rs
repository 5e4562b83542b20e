//! Frame-label parsing for ImageJ-style exports.
//!
//! Different microscopes and capture tools stamp the `Label` column with
//! different conventions. The format is classified once from the first row of
//! a file and then applied uniformly, so a file that mixes conventions fails
//! loudly instead of decoding half its rows by accident.

use crate::{config::PipelineConfig, Error, Result};

/// A recognized frame-label convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    /// The label is the frame number itself, e.g. `"17"`.
    RawFrame,

    /// ImageJ stack notation `name:slice:frame`, e.g. `"1:slice:23"`.
    SliceNotation,

    /// ImageJ elapsed-time stamp ending in an `s` token, e.g.
    /// `"w2 0:01.4 s"`. The seconds value is converted back to a frame
    /// index via the acquisition frame rate.
    ///
    /// Only the seconds component of an `MM:SS.s` stamp is read; minute
    /// fields are discarded. Existing exports rely on this, so it is kept
    /// even though stamps past one minute alias into the first.
    ElapsedSeconds,

    /// Underscore-delimited image filename ending in `.tif`, e.g.
    /// `"run3_w1_0005.tif"`. The frame number sits at a fixed
    /// underscore-separated field configured per dataset.
    FilenameStem { frame_field: usize },
}

impl LabelFormat {
    /// Classify the labeling convention from a single representative label.
    ///
    /// # Arguments
    /// * `label` - The first row's label
    /// * `stem_frame_field` - Underscore field index used by the
    ///   filename-stem convention
    ///
    /// # Returns
    /// The detected format, or `Error::UnrecognizedLabelFormat` when the
    /// label matches none of the known conventions.
    pub fn classify(label: &str, stem_frame_field: usize) -> Result<Self> {
        let trimmed = label.trim();

        if trimmed.parse::<u32>().is_ok() {
            return Ok(LabelFormat::RawFrame);
        }
        if trimmed.contains("slice") {
            return Ok(LabelFormat::SliceNotation);
        }
        if trimmed.split_whitespace().last() == Some("s") {
            return Ok(LabelFormat::ElapsedSeconds);
        }
        if trimmed.ends_with(".tif") {
            return Ok(LabelFormat::FilenameStem {
                frame_field: stem_frame_field,
            });
        }

        Err(Error::UnrecognizedLabelFormat(label.to_string()))
    }

    /// Decode one label into a frame index under this convention.
    ///
    /// # Arguments
    /// * `label` - The label text for one row
    /// * `config` - Calibration profile (frame rate for time stamps)
    pub fn decode(&self, label: &str, config: &PipelineConfig) -> Result<u32> {
        let trimmed = label.trim();
        match self {
            LabelFormat::RawFrame => parse_frame(trimmed, trimmed),

            LabelFormat::SliceNotation => {
                let field = trimmed
                    .split(':')
                    .nth(2)
                    .ok_or_else(|| invalid(trimmed, "expected name:slice:frame"))?;
                parse_frame(field.trim(), trimmed)
            }

            LabelFormat::ElapsedSeconds => {
                let tokens: Vec<&str> = trimmed.split_whitespace().collect();
                if tokens.len() < 2 || *tokens.last().unwrap_or(&"") != "s" {
                    return Err(invalid(trimmed, "expected a trailing `s` time stamp"));
                }
                let stamp = tokens[tokens.len() - 2];
                let seconds: f64 = stamp
                    .split(':')
                    .next_back()
                    .unwrap_or(stamp)
                    .parse()
                    .map_err(|_| invalid(trimmed, "non-numeric seconds"))?;
                let frame = (seconds * config.frames_per_second).round();
                if !(0.0..=u32::MAX as f64).contains(&frame) {
                    return Err(invalid(trimmed, "time stamp out of frame range"));
                }
                Ok(frame as u32)
            }

            LabelFormat::FilenameStem { frame_field } => {
                let field = trimmed
                    .split('_')
                    .nth(*frame_field)
                    .ok_or_else(|| invalid(trimmed, "missing frame field in stem"))?;
                let digits = field.strip_suffix(".tif").unwrap_or(field);
                parse_frame(digits, trimmed)
            }
        }
    }
}

fn parse_frame(digits: &str, label: &str) -> Result<u32> {
    digits
        .parse::<u32>()
        .map_err(|_| invalid(label, "non-numeric frame"))
}

fn invalid(label: &str, reason: &str) -> Error {
    Error::InvalidFrameLabel {
        label: label.to_string(),
        reason: reason.to_string(),
    }
}
