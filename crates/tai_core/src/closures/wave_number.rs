//! Wave number from the linear dispersion relation.

use super::{angular_frequency, ensure_len};
use crate::constants::G;
use crate::roots::{brent, RootSolution};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const WAVE_NUMBER_TOL: f64 = 1e-6;
const SIMILARITY_MIN_DEPTH: f64 = 0.1;

/// How [`update_wave_number_with`] obtains wave numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveNumberMethod {
    /// Solve the dispersion relation at every node.
    Dispersion,
    /// Solve at the first node and scale by sqrt(h0 / h). Cheaper, less accurate.
    Similarity,
}

/// `sqrt(G k tanh(k h)) - sigma` with `coefs = [sigma, h]`.
fn dispersion_residual(k: f64, coefs: &[f64]) -> f64 {
    let (sigma, depth) = (coefs[0], coefs[1]);
    (G * k * (k * depth).tanh()).sqrt() - sigma
}

/// Search interval for the dispersion root.
///
/// The deep water value sigma^2/G and the shallow water value sigma/sqrt(G h)
/// both bound the root from below; their sum bounds it from above.
pub fn dispersion_bracket(sigma: f64, depth: f64) -> (f64, f64) {
    let deep = sigma * sigma / G;
    let shallow = sigma / (G * depth).sqrt();
    (deep.max(shallow), deep + shallow)
}

/// Solves the dispersion relation for one node, or `None` when depth or period
/// is not positive.
pub fn solve_wave_number(period: f64, depth: f64) -> Option<RootSolution> {
    let sigma = angular_frequency(period);
    if depth <= 0.0 || sigma <= 0.0 {
        return None;
    }
    Some(brent(
        &dispersion_residual,
        &[sigma, depth],
        dispersion_bracket(sigma, depth),
        WAVE_NUMBER_TOL,
    ))
}

/// Wave number (m-1) of one node; zero when depth or period is not positive.
pub fn wave_number(period: f64, depth: f64) -> f64 {
    solve_wave_number(period, depth).map_or(0.0, |solution| solution.root)
}

pub fn update_wave_number(period: &[f64], h: &[f64]) -> Result<Vec<f64>> {
    ensure_len("period", period.len(), h.len())?;
    Ok(period
        .iter()
        .zip(h)
        .map(|(&t, &depth)| wave_number(t, depth))
        .collect())
}

/// Scales the first node's wave number by the shallow water similarity law.
///
/// Depths are floored at 0.1 m; nodes with non-positive depth still get zero.
pub fn update_wave_number_similarity(period: &[f64], h: &[f64]) -> Result<Vec<f64>> {
    ensure_len("period", period.len(), h.len())?;
    if h.is_empty() {
        bail!("Similarity wave numbers need at least one node.");
    }
    let reference_depth = h[0].max(SIMILARITY_MIN_DEPTH);
    let reference = wave_number(period[0], reference_depth);
    Ok(h.iter()
        .map(|&depth| {
            if depth <= 0.0 {
                0.0
            } else {
                reference * (reference_depth / depth.max(SIMILARITY_MIN_DEPTH)).sqrt()
            }
        })
        .collect())
}

pub fn update_wave_number_with(
    method: WaveNumberMethod,
    period: &[f64],
    h: &[f64],
) -> Result<Vec<f64>> {
    match method {
        WaveNumberMethod::Dispersion => update_wave_number(period, h),
        WaveNumberMethod::Similarity => update_wave_number_similarity(period, h),
    }
}

/// Group velocity (m s-1); zero for degenerate nodes.
pub fn group_velocity(k: f64, period: f64, depth: f64) -> f64 {
    let sigma = angular_frequency(period);
    if k <= 0.0 || sigma <= 0.0 || depth <= 0.0 {
        return 0.0;
    }
    let kh2 = 2.0 * k * depth;
    let n = if kh2 > 700.0 {
        0.5
    } else {
        0.5 * (1.0 + kh2 / kh2.sinh())
    };
    n * sigma / k
}
