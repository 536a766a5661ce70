//! Bed shear stress under combined currents and waves.

use super::{angular_frequency, ensure_len};
use crate::constants::{G, RHO_WATER};
use anyhow::Result;
use std::f64::consts::PI;

/// Per-node inputs of [`update_shear_stress`]. All slices share one length.
#[derive(Debug, Clone, Copy)]
pub struct ShearInputs<'a> {
    pub depth: &'a [f64],
    pub velocity: &'a [f64],
    pub hrms: &'a [f64],
    pub wave_number: &'a [f64],
    pub chezy: &'a [f64],
    pub period: &'a [f64],
    pub grain_size: &'a [f64],
}

/// Current-only stress `rho g U^2 / Cz^2` (Pa).
pub fn current_shear_stress(velocity: f64, chezy: f64) -> f64 {
    if chezy <= 0.0 {
        return 0.0;
    }
    RHO_WATER * G * velocity * velocity / (chezy * chezy)
}

/// Wave-only stress `0.5 rho fw Uw^2` (Pa) with Soulsby's rough-bed friction
/// factor `fw = 1.39 (A / z0)^-0.52` and `z0 = d50 / 12`.
pub fn wave_shear_stress(
    hrms: f64,
    wave_number: f64,
    period: f64,
    depth: f64,
    grain_size: f64,
) -> f64 {
    let sigma = angular_frequency(period);
    let kh = wave_number * depth;
    if sigma <= 0.0 || kh <= 0.0 || hrms <= 0.0 || grain_size <= 0.0 {
        return 0.0;
    }
    let orbital = PI * hrms / (period * kh.sinh());
    if !(orbital > 0.0) {
        return 0.0;
    }
    let excursion = orbital / sigma;
    let z0 = grain_size / 12.0;
    let fw = 1.39 * (excursion / z0).powf(-0.52);
    0.5 * RHO_WATER * fw * orbital * orbital
}

/// Maximum bed shear stress of one node; zero where depth <= 0.
///
/// Mean stress follows `tau_m = tau_c (1 + 1.2 (tau_w / (tau_c + tau_w))^3.2)`
/// and waves are taken collinear with the current, so `tau = tau_m + tau_w`.
pub fn bottom_shear_stress(
    depth: f64,
    velocity: f64,
    hrms: f64,
    wave_number: f64,
    chezy: f64,
    period: f64,
    grain_size: f64,
) -> f64 {
    if depth <= 0.0 {
        return 0.0;
    }
    let tau_c = current_shear_stress(velocity, chezy);
    let tau_w = wave_shear_stress(hrms, wave_number, period, depth, grain_size);
    let total = tau_c + tau_w;
    if total <= 0.0 {
        return 0.0;
    }
    let tau_m = tau_c * (1.0 + 1.2 * (tau_w / total).powf(3.2));
    tau_m + tau_w
}

pub fn update_shear_stress(inputs: &ShearInputs) -> Result<Vec<f64>> {
    let n = inputs.depth.len();
    ensure_len("velocity", inputs.velocity.len(), n)?;
    ensure_len("hrms", inputs.hrms.len(), n)?;
    ensure_len("wave_number", inputs.wave_number.len(), n)?;
    ensure_len("chezy", inputs.chezy.len(), n)?;
    ensure_len("period", inputs.period.len(), n)?;
    ensure_len("grain_size", inputs.grain_size.len(), n)?;
    Ok((0..n)
        .map(|i| {
            bottom_shear_stress(
                inputs.depth[i],
                inputs.velocity[i],
                inputs.hrms[i],
                inputs.wave_number[i],
                inputs.chezy[i],
                inputs.period[i],
                inputs.grain_size[i],
            )
        })
        .collect())
}
