//! Integration tests for the full pipeline.
//!
//! These tests write real export files to disk, run the batch drivers over
//! them and check the aggregated output, including the CSV layout.

use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use microtrack::{output, pipeline, ErrorKind, PipelineConfig};
use tempfile::tempdir;

/// Easy numbers: at 2 fps and 0.5 um/px the search range is 10 px and the
/// stub threshold is 4 frames.
fn test_config() -> PipelineConfig {
    PipelineConfig {
        frames_per_second: 2.0,
        microns_per_pixel: 0.5,
        max_speed_um_per_s: 10.0,
        memory: 0,
        min_lifetime_s: 2.0,
        min_area_um2: 1.0,
        max_area_um2: 1.0e6,
        min_velocity_um_per_s: None,
        stem_frame_field: 2,
    }
}

fn write_export(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write export");
    path
}

/// Raw-frame labels: a walker at 2 px/frame for 8 frames plus a 3-frame
/// stub. Area 50 px^2 converts to 12.5 um^2.
fn steady_walker_csv() -> String {
    let mut text = String::from("Label,X,Y,Area\n");
    for frame in 0..8 {
        text.push_str(&format!("{},{},1.0,50.0\n", frame, 2.0 * frame as f64));
    }
    for frame in 0..3 {
        text.push_str(&format!("{},100.0,100.0,50.0\n", frame));
    }
    text
}

/// Slice-notation labels: one walker at 3 px/frame for 6 frames. Area 80
/// px^2 converts to 20 um^2.
fn slice_walker_csv() -> String {
    let mut text = String::from("Label,X,Y,Area\n");
    for frame in 0..6 {
        text.push_str(&format!("m:slice:{},{},0.0,80.0\n", frame, 3.0 * frame as f64));
    }
    text
}

// =============================================================================
// Test 1: Single File End to End
// =============================================================================

#[test]
fn test_integration_single_file_end_to_end() {
    let dir = tempdir().unwrap();
    let path = write_export(dir.path(), "w1.csv", &steady_walker_csv());

    let result = pipeline::process_file(&path, &test_config()).expect("Pipeline failed");

    assert_eq!(result.source_id, "w1");
    assert_eq!(result.report.detections, 11);
    assert_eq!(result.report.trajectories_linked, 2);
    assert_eq!(result.report.after_stub_filter, 1, "Stub must be dropped");
    assert_eq!(result.report.after_size_filter, 1);
    assert_eq!(result.report.rows, 8);

    for (index, row) in result.rows.iter().enumerate() {
        assert_eq!(row.particle, 0);
        assert_eq!(row.frame, index as u32, "Rows must be in frame order");
        assert_relative_eq!(row.time, index as f64 / 2.0, epsilon = 1e-12);
        assert_relative_eq!(row.area_um, 12.5, epsilon = 1e-12);

        // Constant 2 px/frame: 2 px * 2 fps * 0.5 um/px = 2 um/s
        let dx = row.dx.expect("Velocity missing on a long trajectory");
        assert_relative_eq!(dx, 2.0, epsilon = 1e-9);
        assert_relative_eq!(row.speed_um.unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(row.x_velocity_um.unwrap(), 2.0, epsilon = 1e-9);
    }
}

// =============================================================================
// Test 2: Batch Across Label Conventions
// =============================================================================

#[test]
fn test_integration_batch_combines_sources() {
    let dir = tempdir().unwrap();
    let paths = vec![
        write_export(dir.path(), "w1.csv", &steady_walker_csv()),
        write_export(dir.path(), "w2.csv", &slice_walker_csv()),
    ];

    let outcome = pipeline::run_batch(&paths, &test_config());

    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.reports[0].source_id, "w1");
    assert_eq!(outcome.reports[1].source_id, "w2");

    let dataset = &outcome.dataset;
    assert_eq!(dataset.len(), 8 + 6);
    assert_eq!(dataset.trajectory_count(), 2);
    assert_eq!(dataset.sources(), vec!["w1", "w2"]);

    // File order is preserved and ids are disambiguated per source
    for row in &dataset.rows()[..8] {
        assert_eq!(row.global_trajectory_id, "w1-0");
    }
    for row in &dataset.rows()[8..] {
        assert_eq!(row.global_trajectory_id, "w2-0");
    }

    assert_eq!(dataset.for_source("w2").len(), 6);
    let early = dataset.through_frame("w1", 3);
    assert_eq!(early.len(), 4, "through_frame must be inclusive");
    assert!(early.iter().all(|r| r.frame <= 3));
}

// =============================================================================
// Test 3: Parallel Batch Matches Sequential
// =============================================================================

#[test]
fn test_integration_parallel_batch_matches_sequential() {
    let dir = tempdir().unwrap();
    let paths = vec![
        write_export(dir.path(), "w1.csv", &steady_walker_csv()),
        write_export(dir.path(), "w2.csv", &slice_walker_csv()),
        write_export(dir.path(), "w3.csv", &steady_walker_csv()),
    ];
    let config = test_config();

    let sequential = pipeline::run_batch(&paths, &config);
    let parallel = pipeline::run_batch_parallel(&paths, &config);

    assert_eq!(sequential.reports, parallel.reports);
    assert_eq!(sequential.dataset.rows(), parallel.dataset.rows());
    assert!(parallel.failures.is_empty());
}

// =============================================================================
// Test 4: Failure Isolation
// =============================================================================

#[test]
fn test_integration_bad_file_does_not_poison_batch() {
    let dir = tempdir().unwrap();
    let paths = vec![
        write_export(dir.path(), "w1.csv", &steady_walker_csv()),
        write_export(dir.path(), "bad.csv", "Label,X,Y\n0,1.0,2.0\n"),
    ];

    let outcome = pipeline::run_batch(&paths, &test_config());

    assert_eq!(outcome.reports.len(), 1, "Good file must still process");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].error.kind(), ErrorKind::DataIntegrity);
    assert!(outcome.failures[0].path.ends_with("bad.csv"));
    assert_eq!(outcome.dataset.len(), 8);
    assert!(!outcome.all_failed());
}

#[test]
fn test_integration_all_failed_batch() {
    let paths = vec![PathBuf::from("/nonexistent/a.csv")];
    let outcome = pipeline::run_batch(&paths, &test_config());

    assert!(outcome.all_failed());
    assert_eq!(outcome.failures[0].error.kind(), ErrorKind::Io);
    assert!(outcome.dataset.is_empty());
}

// =============================================================================
// Test 5: Empty Results Are Not Errors
// =============================================================================

#[test]
fn test_integration_all_stubs_is_empty_not_error() {
    let dir = tempdir().unwrap();
    let path = write_export(
        dir.path(),
        "stubs.csv",
        "Label,X,Y,Area\n0,1.0,1.0,50.0\n1,1.5,1.0,50.0\n",
    );

    let outcome = pipeline::run_batch(&[path], &test_config());

    assert!(outcome.failures.is_empty(), "Empty result is not a failure");
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.reports[0].trajectories_linked, 1);
    assert_eq!(outcome.reports[0].after_stub_filter, 0);
    assert_eq!(outcome.reports[0].rows, 0);
    assert!(outcome.dataset.is_empty());
    assert!(!outcome.all_failed());
}

// =============================================================================
// Test 6: Written File Layout
// =============================================================================

#[test]
fn test_integration_written_file_layout() {
    let dir = tempdir().unwrap();
    let paths = vec![
        write_export(dir.path(), "w1.csv", &steady_walker_csv()),
        write_export(dir.path(), "w2.csv", &slice_walker_csv()),
    ];
    let outcome = pipeline::run_batch(&paths, &test_config());

    let out_dir = dir.path().join("linked_results");
    let written = output::write_timestamped(&outcome.dataset, &out_dir).unwrap();

    let name = written.file_name().unwrap().to_string_lossy();
    assert_eq!(name.len(), "yymmdd_hhmmPM.csv".len());
    assert_eq!(name.as_bytes()[6], b'_');
    assert!(name.ends_with("M.csv"));

    let text = fs::read_to_string(&written).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "frame,x,y,area,dx,dy,time,speed_px,speed_um,area_um,x_velocity_um,source_id,global_trajectory_id"
    );
    let data_lines: Vec<&str> = lines.collect();
    assert_eq!(data_lines.len(), 14);
    for line in &data_lines {
        assert_eq!(line.split(',').count(), 13, "Malformed row: {}", line);
    }
}

// =============================================================================
// Test 7: Calibration Profile From TOML
// =============================================================================

#[test]
fn test_integration_size_filter_from_toml_profile() {
    let dir = tempdir().unwrap();
    let paths = vec![
        write_export(dir.path(), "w1.csv", &steady_walker_csv()),
        write_export(dir.path(), "w2.csv", &slice_walker_csv()),
    ];

    // w2's particles are 20 um^2, over the 15 um^2 ceiling
    let profile = write_export(
        dir.path(),
        "profile.toml",
        "frames_per_second = 2.0\n\
         microns_per_pixel = 0.5\n\
         max_speed_um_per_s = 10.0\n\
         min_lifetime_s = 2.0\n\
         min_area_um2 = 1.0\n\
         max_area_um2 = 15.0\n",
    );
    let config = PipelineConfig::from_toml_file(&profile).expect("Profile must load");

    let outcome = pipeline::run_batch(&paths, &config);

    assert_eq!(outcome.reports[0].rows, 8, "w1 passes the size filter");
    assert_eq!(outcome.reports[1].after_stub_filter, 1);
    assert_eq!(outcome.reports[1].after_size_filter, 0, "w2 must be dropped");
    assert_eq!(outcome.dataset.sources(), vec!["w1"]);
}

#[test]
fn test_integration_velocity_floor_from_toml_profile() {
    let dir = tempdir().unwrap();

    // A stationary particle has zero mean x velocity
    let mut parked = String::from("Label,X,Y,Area\n");
    for frame in 0..6 {
        parked.push_str(&format!("{},50.0,0.0,50.0\n", frame));
    }
    let paths = vec![
        write_export(dir.path(), "w1.csv", &steady_walker_csv()),
        write_export(dir.path(), "parked.csv", &parked),
    ];

    let profile = write_export(
        dir.path(),
        "profile.toml",
        "frames_per_second = 2.0\n\
         microns_per_pixel = 0.5\n\
         max_speed_um_per_s = 10.0\n\
         min_lifetime_s = 2.0\n\
         min_area_um2 = 1.0\n\
         max_area_um2 = 1000000.0\n\
         min_velocity_um_per_s = 1.0\n",
    );
    let config = PipelineConfig::from_toml_file(&profile).expect("Profile must load");

    let outcome = pipeline::run_batch(&paths, &config);

    assert_eq!(outcome.reports[0].rows, 8, "Moving particle is kept");
    assert_eq!(outcome.reports[1].rows, 0, "Parked particle is dropped");
    assert_eq!(outcome.dataset.sources(), vec!["w1"]);
}
