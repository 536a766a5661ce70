//! Fraction of breaking waves (Battjes-Janssen Qb).
//!
//! Qb solves `(1 - Qb) / ln(Qb) + (Hrms / Hmax)^2 = 0`. The root solver path is
//! exact but costly; [`BreakingTable`] trades accuracy for a table lookup.

use super::ensure_len;
use crate::lookup::{bracket_index, LookupPosition};
use crate::params::ModelParams;
use crate::roots::{brent, RootSolution};
use anyhow::Result;
use serde::{Deserialize, Serialize};

const QB_BRACKET: (f64, f64) = (1e-10, 1.0 - 1e-10);
const QB_TOL: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakingMethod {
    RootSolve,
    Lookup,
}

/// `(1 - qb) / ln(qb) + coefs[0]`, where `coefs[0]` is `(Hrms / Hmax)^2`.
fn breaking_residual(qb: f64, coefs: &[f64]) -> f64 {
    (1.0 - qb) / qb.ln() + coefs[0]
}

/// Value of `(Hrms / Hmax)^2` at which the breaking fraction equals `qb`.
fn ratio_squared_at(qb: f64) -> f64 {
    if qb <= 0.0 {
        0.0
    } else if qb >= 1.0 {
        1.0
    } else {
        -(1.0 - qb) / qb.ln()
    }
}

pub fn solve_breaking_probability(hrms: f64, hmax: f64) -> Option<RootSolution> {
    if hmax <= 0.0 {
        return None;
    }
    let ratio = hrms / hmax;
    Some(brent(&breaking_residual, &[ratio * ratio], QB_BRACKET, QB_TOL))
}

/// Breaking fraction of one node; one when the maximum wave height vanishes.
pub fn breaking_probability(hrms: f64, hmax: f64) -> f64 {
    solve_breaking_probability(hrms, hmax).map_or(1.0, |solution| solution.root)
}

/// Root-solved Qb with Hmax = breaker_index * h; Qb = 1 where h <= 0.
pub fn update_breaking_probability(
    hrms: &[f64],
    h: &[f64],
    params: &ModelParams,
) -> Result<Vec<f64>> {
    ensure_len("hrms", hrms.len(), h.len())?;
    Ok(hrms
        .iter()
        .zip(h)
        .map(|(&height, &depth)| {
            if depth <= 0.0 {
                1.0
            } else {
                breaking_probability(height, params.breaker_index * depth)
            }
        })
        .collect())
}

/// Precomputed `(Hrms / Hmax)^2` on a 0.01 grid of Qb from 0 to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakingTable {
    values: Vec<f64>,
}

impl BreakingTable {
    pub const RESOLUTION: f64 = 0.01;

    pub fn new() -> Self {
        let cells = (1.0 / Self::RESOLUTION).round() as usize;
        let values = (0..=cells)
            .map(|j| ratio_squared_at(j as f64 * Self::RESOLUTION))
            .collect();
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Qb at the centre of the grid cell bracketing `ratio_squared`; 0 and 1
    /// at and beyond the table ends.
    pub fn lookup(&self, ratio_squared: f64) -> f64 {
        let last = self.values.len() - 1;
        if ratio_squared <= self.values[0] {
            return 0.0;
        }
        if ratio_squared >= self.values[last] {
            return 1.0;
        }
        match bracket_index(&self.values, ratio_squared) {
            Some(LookupPosition::Within(i)) => {
                Self::RESOLUTION * (i + 1) as f64 - 0.5 * Self::RESOLUTION
            }
            Some(LookupPosition::AfterLast) => 1.0,
            Some(LookupPosition::BeforeFirst) | None => 0.0,
        }
    }

    pub fn breaking_probability(&self, hrms: f64, hmax: f64) -> f64 {
        if hmax <= 0.0 {
            return 1.0;
        }
        let ratio = hrms / hmax;
        self.lookup(ratio * ratio)
    }
}

impl Default for BreakingTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Table-lookup Qb with Hmax = breaker_index * h; Qb = 1 where h <= 0.
pub fn update_breaking_probability_lookup(
    table: &BreakingTable,
    hrms: &[f64],
    h: &[f64],
    params: &ModelParams,
) -> Result<Vec<f64>> {
    ensure_len("hrms", hrms.len(), h.len())?;
    Ok(hrms
        .iter()
        .zip(h)
        .map(|(&height, &depth)| {
            if depth <= 0.0 {
                1.0
            } else {
                table.breaking_probability(height, params.breaker_index * depth)
            }
        })
        .collect())
}

pub fn update_breaking_probability_with(
    method: BreakingMethod,
    table: &BreakingTable,
    hrms: &[f64],
    h: &[f64],
    params: &ModelParams,
) -> Result<Vec<f64>> {
    match method {
        BreakingMethod::RootSolve => update_breaking_probability(hrms, h, params),
        BreakingMethod::Lookup => update_breaking_probability_lookup(table, hrms, h, params),
    }
}
