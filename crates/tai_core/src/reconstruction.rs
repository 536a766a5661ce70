//! Slope-limited (MUSCL) reconstruction of cell-edge states.
//!
//! Tables follow the state layout: one row per node, one column per variable.
//! The first and last rows are boundary nodes and are never limited.

use nalgebra::DMatrix;

/// Superbee limiter `max(0, min(2r, 1), min(r, 2))`.
pub fn superbee(r: f64) -> f64 {
    0.0_f64.max((2.0 * r).min(1.0)).max(r.min(2.0))
}

/// Limiter value per node and variable; zero on boundary rows.
///
/// Where `u[i+1] == u[i]` the slope ratio is undefined and the limiter is set
/// to zero. The edge correction is proportional to that same difference, so
/// the reconstructed edges are unchanged by this choice.
pub fn superbee_limiter(u: &DMatrix<f64>) -> DMatrix<f64> {
    let (rows, cols) = u.shape();
    let mut phi = DMatrix::zeros(rows, cols);
    for i in 1..rows.saturating_sub(1) {
        for j in 0..cols {
            let forward = u[(i + 1, j)] - u[(i, j)];
            if forward == 0.0 {
                continue;
            }
            let r = (u[(i, j)] - u[(i - 1, j)]) / forward;
            phi[(i, j)] = superbee(r);
        }
    }
    phi
}

/// Left and right edge states of every node.
///
/// Interior nodes get `u -/+ 0.5 phi (u[i+1] - u[i])`; boundary rows are
/// copied through to both tables.
pub fn reconstruct_edges(u: &DMatrix<f64>, phi: &DMatrix<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
    let mut left = u.clone();
    let mut right = u.clone();
    let (rows, cols) = u.shape();
    for i in 1..rows.saturating_sub(1) {
        for j in 0..cols {
            let delta = 0.5 * phi[(i, j)] * (u[(i + 1, j)] - u[(i, j)]);
            left[(i, j)] = u[(i, j)] - delta;
            right[(i, j)] = u[(i, j)] + delta;
        }
    }
    (left, right)
}

/// Limits `u` with [`superbee_limiter`] and reconstructs its edges.
pub fn muscl_edges(u: &DMatrix<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
    let phi = superbee_limiter(u);
    reconstruct_edges(u, &phi)
}
