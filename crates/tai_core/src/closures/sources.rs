//! Wave energy source and sink terms (W m-2).
//!
//! Energy density E is in J m-2. Generation is positive, the three dissipation
//! terms are non-positive. Every term vanishes where depth is not positive or
//! the wave field is degenerate (no period, no wave number).

use super::{angular_frequency, ensure_len};
use crate::constants::{G, RHO_AIR, RHO_WATER};
use crate::params::ModelParams;
use anyhow::Result;
use std::f64::consts::PI;

/// Per-node wave state shared by the source terms.
#[derive(Debug, Clone, Copy)]
pub struct WaveField<'a> {
    pub depth: &'a [f64],
    pub energy: &'a [f64],
    pub wave_number: &'a [f64],
    pub period: &'a [f64],
}

impl<'a> WaveField<'a> {
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    fn validate(&self) -> Result<()> {
        ensure_len("energy", self.energy.len(), self.len())?;
        ensure_len("wave_number", self.wave_number.len(), self.len())?;
        ensure_len("period", self.period.len(), self.len())
    }

    pub fn node(&self, i: usize) -> WaveNode {
        WaveNode {
            depth: self.depth[i],
            energy: self.energy[i],
            wave_number: self.wave_number[i],
            period: self.period[i],
        }
    }
}

/// Wave state of a single node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveNode {
    pub depth: f64,
    pub energy: f64,
    pub wave_number: f64,
    pub period: f64,
}

impl WaveNode {
    fn sigma(&self) -> f64 {
        angular_frequency(self.period)
    }

    fn is_active(&self) -> bool {
        self.depth > 0.0 && self.wave_number > 0.0 && self.period > 0.0
    }
}

/// Wind input `alpha + beta E`.
///
/// The linear term is a Phillips-type constant growth rate scaled by
/// `wind_input`, the exponential term is Snyder's growth rate.
pub fn generation_rate(node: &WaveNode, wind: f64, params: &ModelParams) -> f64 {
    if !node.is_active() {
        return 0.0;
    }
    let sigma = node.sigma();
    let stress = params.wind_drag * wind * wind;
    let alpha = params.wind_input * RHO_AIR * RHO_AIR / RHO_WATER * stress * stress * sigma / G;
    let phase_ratio = wind * node.wave_number / sigma;
    let beta = (5.0 * RHO_AIR / RHO_WATER * sigma / (2.0 * PI) * (phase_ratio - 0.9)).max(0.0);
    alpha + beta * node.energy.max(0.0)
}

/// Komen-style whitecapping `-c sigma (s / s_pm)^m E` with integral steepness
/// `s = E k^2 / (rho g)`.
pub fn whitecapping_rate(node: &WaveNode, params: &ModelParams) -> f64 {
    if !node.is_active() || node.energy <= 0.0 {
        return 0.0;
    }
    let steepness = node.energy * node.wave_number.powi(2) / (RHO_WATER * G);
    let relative = steepness / params.pm_steepness;
    -params.whitecap_rate * node.sigma() * relative.powf(params.whitecap_exponent) * node.energy
}

/// JONSWAP bottom friction `-cf sigma^2 / (g^2 sinh^2(kh)) E`.
pub fn bottom_friction_rate(node: &WaveNode, params: &ModelParams) -> f64 {
    if !node.is_active() || node.energy <= 0.0 {
        return 0.0;
    }
    let sigma = node.sigma();
    let sinh_kh = (node.wave_number * node.depth).sinh();
    -params.bottom_friction * sigma * sigma / (G * G * sinh_kh * sinh_kh) * node.energy
}

/// Battjes-Janssen breaking `-(alpha / 4) rho g f Qb Hmax^2`.
pub fn depth_breaking_rate(node: &WaveNode, qb: f64, params: &ModelParams) -> f64 {
    if node.depth <= 0.0 || node.period <= 0.0 {
        return 0.0;
    }
    let hmax = params.breaker_index * node.depth;
    let frequency = 1.0 / node.period;
    -0.25 * params.breaking_rate * RHO_WATER * G * frequency * qb.clamp(0.0, 1.0) * hmax * hmax
}

pub fn wave_generation(field: &WaveField, wind: &[f64], params: &ModelParams) -> Result<Vec<f64>> {
    field.validate()?;
    ensure_len("wind", wind.len(), field.len())?;
    Ok((0..field.len())
        .map(|i| generation_rate(&field.node(i), wind[i], params))
        .collect())
}

pub fn whitecapping(field: &WaveField, params: &ModelParams) -> Result<Vec<f64>> {
    field.validate()?;
    Ok((0..field.len())
        .map(|i| whitecapping_rate(&field.node(i), params))
        .collect())
}

pub fn bottom_friction(field: &WaveField, params: &ModelParams) -> Result<Vec<f64>> {
    field.validate()?;
    Ok((0..field.len())
        .map(|i| bottom_friction_rate(&field.node(i), params))
        .collect())
}

pub fn depth_breaking(field: &WaveField, qb: &[f64], params: &ModelParams) -> Result<Vec<f64>> {
    field.validate()?;
    ensure_len("qb", qb.len(), field.len())?;
    Ok((0..field.len())
        .map(|i| depth_breaking_rate(&field.node(i), qb[i], params))
        .collect())
}
