//! Detection-to-trajectory matching for one frame transition.
//!
//! Builds the displacement cost matrix between the current frame's
//! detections and the open trajectories' last-known positions, solves it
//! optimally, and splits the result into matched pairs and leftovers.

use nalgebra::DMatrix;

use crate::assignment::minimum_cost_assignment;
use crate::detection::Detection;

/// Cost standing in for "this pair may not match".
///
/// Kept large but finite: infinities poison the solver's potentials with
/// NaN, while a finite sentinel just makes forbidden pairs maximally
/// unattractive. Assignments that land on a sentinel are discarded
/// afterwards by the true-distance check.
const FORBIDDEN_COST: f64 = 1.0e12;

/// Outcome of matching one frame's detections against open trajectories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMatch {
    /// `(detection index, candidate index)` pairs, in detection order.
    pub matched: Vec<(usize, usize)>,

    /// Detections that matched no candidate; these start new trajectories.
    pub unmatched_detections: Vec<usize>,

    /// Candidates that received no detection this frame.
    pub unmatched_candidates: Vec<usize>,
}

/// Build the cost matrix for one frame transition.
///
/// Rows are detections, columns are candidate positions. Pairs farther
/// apart than `search_range` get the forbidden sentinel.
pub fn build_cost_matrix(
    detections: &[Detection],
    candidates: &[(f64, f64)],
    search_range: f64,
) -> DMatrix<f64> {
    DMatrix::from_fn(detections.len(), candidates.len(), |i, j| {
        let (cx, cy) = candidates[j];
        let distance = detections[i].distance_to(cx, cy);
        if distance <= search_range {
            distance
        } else {
            FORBIDDEN_COST
        }
    })
}

/// Match detections to candidate positions with minimal total displacement.
///
/// Candidates must be ordered by ascending trajectory id; combined with the
/// solver's lowest-column tie-break this makes the oldest trajectory win any
/// equally-distant contest, so reruns are bit-identical.
///
/// # Arguments
/// * `detections` - Detections of the current frame
/// * `candidates` - Last-known positions of open trajectories
/// * `search_range` - Maximum displacement in pixels for a valid link
pub fn match_frame(
    detections: &[Detection],
    candidates: &[(f64, f64)],
    search_range: f64,
) -> FrameMatch {
    if detections.is_empty() || candidates.is_empty() {
        return FrameMatch {
            matched: Vec::new(),
            unmatched_detections: (0..detections.len()).collect(),
            unmatched_candidates: (0..candidates.len()).collect(),
        };
    }

    let cost = build_cost_matrix(detections, candidates, search_range);
    let assignment = minimum_cost_assignment(&cost);

    let mut matched = Vec::new();
    let mut matched_candidates = vec![false; candidates.len()];
    let mut unmatched_detections = Vec::new();

    for (det_idx, assigned) in assignment.iter().enumerate() {
        // An assignment only counts when the real displacement is in range;
        // forbidden pairs come back with the sentinel cost
        match assigned {
            Some(cand_idx) if cost[(det_idx, *cand_idx)] <= search_range => {
                matched.push((det_idx, *cand_idx));
                matched_candidates[*cand_idx] = true;
            }
            _ => unmatched_detections.push(det_idx),
        }
    }

    let unmatched_candidates = (0..candidates.len())
        .filter(|&j| !matched_candidates[j])
        .collect();

    FrameMatch {
        matched,
        unmatched_detections,
        unmatched_candidates,
    }
}
