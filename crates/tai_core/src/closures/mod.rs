//! Elementwise physical closures.
//!
//! Every closure maps per-node forcing and state arrays to a per-node output
//! array with no coupling between nodes. Wherever the controlling depth is not
//! positive the formula is skipped and a closure-specific degenerate value is
//! returned instead.

pub mod breaking;
pub mod roughness;
pub mod shear;
pub mod sources;
pub mod wave_number;

use crate::constants::{G, RHO_WATER};
use anyhow::{bail, Result};
use std::f64::consts::PI;

pub(crate) fn ensure_len(name: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        bail!("{} has {} entries, expected {}.", name, len, expected);
    }
    Ok(())
}

/// Angular frequency 2π/T (rad s-1); zero for non-positive periods.
pub fn angular_frequency(period: f64) -> f64 {
    if period > 0.0 {
        2.0 * PI / period
    } else {
        0.0
    }
}

/// Root-mean-square wave height (m) of a wave energy density (J m-2).
pub fn rms_wave_height(energy: f64) -> f64 {
    (8.0 * energy.max(0.0) / (RHO_WATER * G)).sqrt()
}

/// Wave energy density (J m-2) of a significant wave height (m).
pub fn wave_energy(significant_height: f64) -> f64 {
    RHO_WATER * G * significant_height * significant_height / 16.0
}
