//! Minimum-cost bipartite assignment.
//!
//! The linker needs a globally optimal detection-to-trajectory assignment per
//! frame transition, not a greedy one: two particles passing close to each
//! other will swap identities under nearest-first matching. This module
//! solves the rectangular linear sum assignment problem with the
//! potentials-based Hungarian algorithm in O(rows^2 * cols).

use nalgebra::DMatrix;

/// Solve the minimum-cost assignment problem on a rectangular cost matrix.
///
/// Every cost must be finite. Equal-cost alternatives resolve toward the
/// lowest column index, which callers rely on for deterministic output.
///
/// # Arguments
/// * `cost` - Cost matrix, `cost[(i, j)]` being the cost of assigning row
///   `i` to column `j`
///
/// # Returns
/// For each row, the assigned column. Entries are `None` only when rows
/// outnumber columns and the row stays unassigned; otherwise the result is a
/// complete matching of the smaller side.
pub fn minimum_cost_assignment(cost: &DMatrix<f64>) -> Vec<Option<usize>> {
    let rows = cost.nrows();
    let cols = cost.ncols();
    if rows == 0 {
        return Vec::new();
    }
    if cols == 0 {
        return vec![None; rows];
    }

    if rows <= cols {
        solve_wide(cost).into_iter().map(Some).collect()
    } else {
        // Solve on the transpose, then invert the matching
        let transposed = cost.transpose();
        let col_to_row = solve_wide(&transposed);
        let mut assignment = vec![None; rows];
        for (col, row) in col_to_row.into_iter().enumerate() {
            assignment[row] = Some(col);
        }
        assignment
    }
}

/// Hungarian algorithm with row/column potentials, for `rows <= cols`.
///
/// Returns the assigned column for every row. The auxiliary arrays are
/// 1-indexed with column 0 acting as the virtual start of each augmenting
/// path, matching the classic formulation.
fn solve_wide(cost: &DMatrix<f64>) -> Vec<usize> {
    let n = cost.nrows();
    let m = cost.ncols();
    debug_assert!(0 < n && n <= m, "solve_wide requires rows <= cols");

    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    // p[j] = row currently matched to column j, 0 meaning free
    let mut p = vec![0_usize; m + 1];
    let mut way = vec![0_usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0_usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        // Grow the alternating tree until a free column is reached
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0_usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Augment along the recorded path back to the virtual column
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0_usize; n];
    for j in 1..=m {
        if p[j] != 0 {
            assignment[p[j] - 1] = j - 1;
        }
    }
    assignment
}
