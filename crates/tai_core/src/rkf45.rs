//! Embedded Runge-Kutta-Fehlberg 4(5) integrator with per-variable error control.
//!
//! One call to [`Rkf45::advance`] moves a state table forward by a single
//! accepted step. The step size is owned by the caller: it is shrunk in place
//! until a candidate passes both the error test and the negativity guard, and
//! the report carries the size proposed for the next call.

use crate::error::IntegrationError;
use crate::reduce::{max_abs_along, min_along, Axis};
use crate::traits::StateDerivative;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

// Fehlberg tableau
const A21: f64 = 1.0 / 4.0;
const A31: f64 = 3.0 / 32.0;
const A32: f64 = 9.0 / 32.0;
const A41: f64 = 1932.0 / 2197.0;
const A42: f64 = -7200.0 / 2197.0;
const A43: f64 = 7296.0 / 2197.0;
const A51: f64 = 439.0 / 216.0;
const A52: f64 = -8.0;
const A53: f64 = 3680.0 / 513.0;
const A54: f64 = -845.0 / 4104.0;
const A61: f64 = -8.0 / 27.0;
const A62: f64 = 2.0;
const A63: f64 = -3544.0 / 2565.0;
const A64: f64 = 1859.0 / 4104.0;
const A65: f64 = -11.0 / 40.0;

// 4th order weights (K2 does not contribute)
const B41: f64 = 25.0 / 216.0;
const B43: f64 = 1408.0 / 2565.0;
const B44: f64 = 2197.0 / 4104.0;
const B45: f64 = -1.0 / 5.0;

// 5th order weights
const B51: f64 = 16.0 / 135.0;
const B53: f64 = 6656.0 / 12825.0;
const B54: f64 = 28561.0 / 56430.0;
const B55: f64 = -9.0 / 50.0;
const B56: f64 = 2.0 / 55.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepMode {
    /// Take the 4th order estimate with no error control.
    Fixed,
    /// Adapt the step until the embedded error estimate is acceptable.
    Adaptive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rkf45Settings {
    pub rel_tolerance: f64,
    pub max_iterations: usize,
    pub safety: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// A variable breaks the negativity guard when its minimum drops below
    /// `-constraint_factor * tol`.
    pub constraint_factor: f64,
    /// Added to the 4th order estimate before forming relative errors.
    pub epsilon: f64,
}

impl Default for Rkf45Settings {
    fn default() -> Self {
        Self {
            rel_tolerance: 1e-6,
            max_iterations: 100,
            safety: 0.84,
            min_scale: 0.1,
            max_scale: 4.0,
            constraint_factor: 100.0,
            epsilon: 1e-30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Step size that produced the accepted state.
    pub used_step: f64,
    /// Step size proposed for the next call.
    pub next_step: f64,
    /// Number of stage sweeps, including rejected ones.
    pub iterations: usize,
}

/// Scratch buffers for one integration context.
///
/// Allocate once per state shape and hand the same cache to every call. A cache
/// must not be shared between integrations running at the same time.
#[derive(Debug, Clone)]
pub struct RungeKuttaCache {
    k1: DMatrix<f64>,
    k2: DMatrix<f64>,
    k3: DMatrix<f64>,
    k4: DMatrix<f64>,
    k5: DMatrix<f64>,
    k6: DMatrix<f64>,
    interim: DMatrix<f64>,
    rel_error: DMatrix<f64>,
    ynxt4: DMatrix<f64>,
    ynxt5: DMatrix<f64>,
    error: DMatrix<f64>,
}

impl RungeKuttaCache {
    pub fn new(rows: usize, cols: usize) -> Self {
        let zeros = DMatrix::zeros(rows, cols);
        Self {
            k1: zeros.clone(),
            k2: zeros.clone(),
            k3: zeros.clone(),
            k4: zeros.clone(),
            k5: zeros.clone(),
            k6: zeros.clone(),
            interim: zeros.clone(),
            rel_error: zeros.clone(),
            ynxt4: zeros.clone(),
            ynxt5: zeros.clone(),
            error: zeros,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.k1.shape()
    }

    /// Difference between the 5th and 4th order estimates of the last sweep.
    pub fn error_estimate(&self) -> &DMatrix<f64> {
        &self.error
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Rkf45 {
    pub settings: Rkf45Settings,
}

impl Rkf45 {
    pub fn new(settings: Rkf45Settings) -> Self {
        Self { settings }
    }

    /// Advances `state` by one accepted step and writes the result to `out`.
    ///
    /// `step` is read as the trial step size and left holding the size that was
    /// actually used. `tolerances` holds one absolute tolerance per column.
    pub fn advance<S: StateDerivative + ?Sized>(
        &self,
        system: &mut S,
        cache: &mut RungeKuttaCache,
        state: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
        step: &mut f64,
        tolerances: &[f64],
        mode: StepMode,
    ) -> Result<StepReport, IntegrationError> {
        self.validate(cache, state, out, *step, tolerances)?;
        let settings = &self.settings;

        let RungeKuttaCache {
            k1,
            k2,
            k3,
            k4,
            k5,
            k6,
            interim,
            rel_error,
            ynxt4,
            ynxt5,
            error,
        } = cache;

        system.apply(state, k1);

        for iteration in 1..=settings.max_iterations {
            let h = *step;

            stage(interim, state, h, &[(A21, &*k1)]);
            system.apply(interim, k2);

            stage(interim, state, h, &[(A31, &*k1), (A32, &*k2)]);
            system.apply(interim, k3);

            stage(interim, state, h, &[(A41, &*k1), (A42, &*k2), (A43, &*k3)]);
            system.apply(interim, k4);

            stage(
                interim,
                state,
                h,
                &[(A51, &*k1), (A52, &*k2), (A53, &*k3), (A54, &*k4)],
            );
            system.apply(interim, k5);

            stage(
                ynxt4,
                state,
                h,
                &[(B41, &*k1), (B43, &*k3), (B44, &*k4), (B45, &*k5)],
            );

            if mode == StepMode::Fixed {
                out.copy_from(&*ynxt4);
                return Ok(StepReport {
                    used_step: h,
                    next_step: h,
                    iterations: iteration,
                });
            }

            stage(
                interim,
                state,
                h,
                &[(A61, &*k1), (A62, &*k2), (A63, &*k3), (A64, &*k4), (A65, &*k5)],
            );
            system.apply(interim, k6);

            stage(
                ynxt5,
                state,
                h,
                &[(B51, &*k1), (B53, &*k3), (B54, &*k4), (B55, &*k5), (B56, &*k6)],
            );

            error.copy_from(&*ynxt5);
            *error -= &*ynxt4;
            for ((rel, diff), y4) in rel_error.iter_mut().zip(error.iter()).zip(ynxt4.iter()) {
                *rel = diff / (y4 + settings.epsilon);
            }

            let abs_norm = max_abs_along(&*error, Axis::Rows)?;
            let rel_norm = max_abs_along(&*rel_error, Axis::Rows)?;
            let minimum = min_along(&*ynxt4, Axis::Rows)?;

            // The norms skip NaN entries, so a single bad node must be caught here.
            let mut constraint_broken = error.iter().chain(ynxt4.iter()).any(|v| !v.is_finite());
            let mut large_error = false;
            for (j, &tol) in tolerances.iter().enumerate() {
                if abs_norm[j] > tol && rel_norm[j] > settings.rel_tolerance {
                    large_error = true;
                }
                if minimum[j] < -settings.constraint_factor * tol {
                    constraint_broken = true;
                }
            }

            if constraint_broken {
                log::debug!(
                    "RKF45 iteration {iteration}: negativity guard broken, halving step {h:e}"
                );
                *step = 0.5 * h;
                continue;
            }

            let scale = self.step_scale(abs_norm.as_slice(), rel_norm.as_slice(), tolerances);
            if large_error {
                log::debug!(
                    "RKF45 iteration {iteration}: error too large, scaling step {h:e} by {scale:.3}"
                );
                *step = scale * h;
                continue;
            }

            out.copy_from(&*ynxt4);
            return Ok(StepReport {
                used_step: h,
                next_step: scale * h,
                iterations: iteration,
            });
        }

        Err(IntegrationError::StepIterationExhausted {
            iterations: settings.max_iterations,
            last_step: *step,
        })
    }

    /// Step multiplier `safety * rate^(1/4)` clamped to `[min_scale, max_scale]`.
    fn step_scale(&self, abs_norm: &[f64], rel_norm: &[f64], tolerances: &[f64]) -> f64 {
        let settings = &self.settings;
        let abs_rate = abs_norm
            .iter()
            .zip(tolerances)
            .map(|(diff, tol)| tol / diff.abs())
            .fold(f64::INFINITY, f64::min);
        let rel_rate = rel_norm
            .iter()
            .map(|rel| settings.rel_tolerance / rel.abs())
            .fold(f64::INFINITY, f64::min);
        let rate = abs_rate.max(rel_rate);
        (settings.safety * rate.powf(0.25)).clamp(settings.min_scale, settings.max_scale)
    }

    fn validate(
        &self,
        cache: &RungeKuttaCache,
        state: &DMatrix<f64>,
        out: &DMatrix<f64>,
        step: f64,
        tolerances: &[f64],
    ) -> Result<(), IntegrationError> {
        let expected = cache.shape();
        for actual in [state.shape(), out.shape()] {
            if actual != expected {
                return Err(IntegrationError::ShapeMismatch { expected, actual });
            }
        }
        if tolerances.len() != expected.1 {
            return Err(IntegrationError::ToleranceLength {
                expected: expected.1,
                actual: tolerances.len(),
            });
        }
        if let Some((index, &value)) = tolerances
            .iter()
            .enumerate()
            .find(|(_, tol)| !(**tol > 0.0))
        {
            return Err(IntegrationError::NonPositiveTolerance { index, value });
        }
        if !(step > 0.0) || !step.is_finite() {
            return Err(IntegrationError::NonPositiveStep(step));
        }
        Ok(())
    }
}

/// target = base + h * sum(coef * k)
fn stage(target: &mut DMatrix<f64>, base: &DMatrix<f64>, h: f64, terms: &[(f64, &DMatrix<f64>)]) {
    target.copy_from(base);
    for &(coef, k) in terms {
        let weight = h * coef;
        for (t, kv) in target.iter_mut().zip(k.iter()) {
            *t += weight * kv;
        }
    }
}
