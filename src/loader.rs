//! CSV detection-table loading.
//!
//! Reads the particle-analysis export of one movie: a header row followed by
//! one row per detected blob. Only the `Label`, `X`, `Y` and `Area` columns
//! are used; an unnamed index column and any extra measurement columns are
//! ignored.

use std::fs::File;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::{config::PipelineConfig, detection::Detection, label::LabelFormat, Error, Result};

/// Columns a detection export must provide.
const REQUIRED_COLUMNS: [&str; 4] = ["Label", "X", "Y", "Area"];

/// One raw row of an export, before frame decoding.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Label")]
    label: String,

    #[serde(rename = "X")]
    x: f64,

    #[serde(rename = "Y")]
    y: f64,

    #[serde(rename = "Area")]
    area: f64,
}

/// Load all detections from one export file.
///
/// The frame-label convention is classified from the first data row and then
/// applied to every row, so a file mixing conventions fails instead of
/// decoding inconsistently. Row order is preserved.
///
/// # Arguments
/// * `path` - Path to the CSV export
/// * `config` - Calibration profile (frame rate, label calibration)
///
/// # Returns
/// The detections in file order; empty when the file has a header but no
/// data rows.
pub fn load_detections<P: AsRef<Path>>(
    path: P,
    config: &PipelineConfig,
) -> Result<Vec<Detection>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers()?.clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(Error::MissingColumn(required.to_string()));
        }
    }

    let mut records = Vec::new();
    for result in reader.deserialize::<RawRecord>() {
        records.push(result?);
    }
    if records.is_empty() {
        debug!(path = %path.display(), "export has no data rows");
        return Ok(Vec::new());
    }

    let format = LabelFormat::classify(&records[0].label, config.stem_frame_field)?;
    debug!(path = %path.display(), ?format, rows = records.len(), "decoding frame labels");

    let mut detections = Vec::with_capacity(records.len());
    for record in records {
        let frame = format.decode(&record.label, config)?;
        detections.push(Detection::new(frame, record.x, record.y, record.area));
    }
    Ok(detections)
}

/// Identifier for a source movie, derived from its export's file stem.
///
/// `imagej_data/w2_run1.csv` becomes `w2_run1`.
pub fn source_id_from_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.as_ref().to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    // ===== Loading =====

    #[test]
    fn test_load_raw_frame_export() {
        let file = write_temp(
            " ,Label,Area,X,Y\n\
             1,0,25.0,10.5,20.5\n\
             2,1,26.0,11.0,21.0\n",
        );
        let detections = load_detections(file.path(), &PipelineConfig::default()).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0], Detection::new(0, 10.5, 20.5, 25.0));
        assert_eq!(detections[1], Detection::new(1, 11.0, 21.0, 26.0));
    }

    #[test]
    fn test_load_slice_notation_export() {
        let file = write_temp(
            "Label,X,Y,Area\n\
             1:slice:3,1.0,2.0,30.0\n\
             1:slice:4,1.5,2.5,31.0\n",
        );
        let detections = load_detections(file.path(), &PipelineConfig::default()).unwrap();

        assert_eq!(detections[0].frame, 3);
        assert_eq!(detections[1].frame, 4);
    }

    #[test]
    fn test_load_ignores_extra_columns() {
        let file = write_temp(
            " ,Label,Area,Mean,Min,Max,X,Y,Circ.\n\
             1,5,25.0,80.1,3.0,255.0,10.0,20.0,0.9\n",
        );
        let detections = load_detections(file.path(), &PipelineConfig::default()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].frame, 5);
    }

    #[test]
    fn test_load_empty_export() {
        let file = write_temp("Label,X,Y,Area\n");
        let detections = load_detections(file.path(), &PipelineConfig::default()).unwrap();
        assert!(detections.is_empty());
    }

    // ===== Failure Modes =====

    #[test]
    fn test_missing_column_is_data_integrity() {
        let file = write_temp("Label,X,Y\n0,1.0,2.0\n");
        let err = load_detections(file.path(), &PipelineConfig::default()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "Area"));
    }

    #[test]
    fn test_unrecognized_label_is_configuration() {
        let file = write_temp("Label,X,Y,Area\nnot-a-label,1.0,2.0,3.0\n");
        let err = load_detections(file.path(), &PipelineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_undecodable_row_is_data_integrity() {
        // First row classifies as slice notation; third row does not decode
        let file = write_temp(
            "Label,X,Y,Area\n\
             1:slice:3,1.0,2.0,30.0\n\
             1:slice:4,1.5,2.5,31.0\n\
             1:slice:oops,2.0,3.0,32.0\n",
        );
        let err = load_detections(file.path(), &PipelineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[test]
    fn test_missing_file_is_io() {
        let err =
            load_detections("/nonexistent/export.csv", &PipelineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_non_numeric_coordinate_is_data_integrity() {
        let file = write_temp("Label,X,Y,Area\n0,abc,2.0,3.0\n");
        let err = load_detections(file.path(), &PipelineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    // ===== Source Ids =====

    #[test]
    fn test_source_id_from_path() {
        assert_eq!(source_id_from_path("imagej_data/w2_run1.csv"), "w2_run1");
        assert_eq!(source_id_from_path("plain.csv"), "plain");
    }
}
