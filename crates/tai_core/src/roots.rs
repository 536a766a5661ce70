//! Bracketed scalar root finding (Brent's method).
//!
//! The solver never fails outright. Degenerate inputs (no sign change across
//! the bracket, iteration cap reached) still yield a best-effort root, and the
//! returned [`RootStatus`] tells callers whether that value can be trusted.

use crate::traits::Residual;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BrentSettings {
    pub max_iterations: usize,
    /// A bound whose |residual| falls below this is returned as the root.
    pub boundary_threshold: f64,
}

impl Default for BrentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            boundary_threshold: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootStatus {
    /// The bracket shrank below the tolerance (or hit an exact zero).
    Converged,
    /// One of the bounds already satisfied the boundary threshold.
    BoundaryRoot,
    /// Residuals at both bounds share a sign; the better bound was returned.
    Unbracketed,
    /// The iteration cap was reached; the last estimate was returned.
    IterationExhausted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RootSolution {
    pub root: f64,
    pub residual: f64,
    /// Width of the bracket when the solver stopped.
    pub width: f64,
    pub iterations: usize,
    pub status: RootStatus,
}

impl RootSolution {
    /// False for the two fallback paths whose root carries no convergence guarantee.
    pub fn is_reliable(&self) -> bool {
        matches!(self.status, RootStatus::Converged | RootStatus::BoundaryRoot)
    }
}

/// Finds a root of `residual(x, coefs)` in `bracket` with the default settings.
pub fn brent<R: Residual + ?Sized>(
    residual: &R,
    coefs: &[f64],
    bracket: (f64, f64),
    tol: f64,
) -> RootSolution {
    brent_with(BrentSettings::default(), residual, coefs, bracket, tol)
}

pub fn brent_with<R: Residual + ?Sized>(
    settings: BrentSettings,
    residual: &R,
    coefs: &[f64],
    bracket: (f64, f64),
    tol: f64,
) -> RootSolution {
    let (mut a, mut b) = bracket;
    let mut fa = residual.evaluate(a, coefs);
    let mut fb = residual.evaluate(b, coefs);

    let lo_is_root = fa.abs() < settings.boundary_threshold;
    let hi_is_root = fb.abs() < settings.boundary_threshold;
    if lo_is_root || hi_is_root {
        let (root, f) = better_bound((a, fa), (b, fb));
        return RootSolution {
            root,
            residual: f,
            width: (b - a).abs(),
            iterations: 0,
            status: RootStatus::BoundaryRoot,
        };
    }

    if fa * fb > 0.0 {
        log::warn!(
            "Root is not bracketed in [{a}, {b}] (f = {fa:e}, {fb:e}); returning the better bound."
        );
        let (root, f) = better_bound((a, fa), (b, fb));
        return RootSolution {
            root,
            residual: f,
            width: (b - a).abs(),
            iterations: 0,
            status: RootStatus::Unbracketed,
        };
    }

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut c = a;
    let mut fc = fa;
    let mut d = c;
    let mut bisected = true;

    for iteration in 1..=settings.max_iterations {
        if (b - a).abs() < tol || fb == 0.0 {
            return RootSolution {
                root: b,
                residual: fb,
                width: (b - a).abs(),
                iterations: iteration - 1,
                status: RootStatus::Converged,
            };
        }

        let mut s = if fa != fc && fb != fc {
            // inverse quadratic interpolation
            a * fb * fc / ((fa - fb) * (fa - fc))
                + b * fa * fc / ((fb - fa) * (fb - fc))
                + c * fa * fb / ((fc - fa) * (fc - fb))
        } else {
            b - fb * (b - a) / (fb - fa)
        };

        let quarter = (3.0 * a + b) / 4.0;
        let outside = !((s > quarter.min(b)) && (s < quarter.max(b)));
        let slow = if bisected {
            (s - b).abs() >= 0.5 * (b - c).abs() || (b - c).abs() < tol
        } else {
            (s - b).abs() >= 0.5 * (c - d).abs() || (c - d).abs() < tol
        };
        if outside || slow {
            s = 0.5 * (a + b);
            bisected = true;
        } else {
            bisected = false;
        }

        let fs = residual.evaluate(s, coefs);
        d = c;
        c = b;
        fc = fb;
        if fa * fs < 0.0 {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }
        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }

    RootSolution {
        root: b,
        residual: fb,
        width: (b - a).abs(),
        iterations: settings.max_iterations,
        status: RootStatus::IterationExhausted,
    }
}

fn better_bound(lo: (f64, f64), hi: (f64, f64)) -> (f64, f64) {
    if hi.1.abs() < lo.1.abs() {
        hi
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{LevelFilter, Log, Metadata, Record};
    use std::cell::Cell;
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    /// Collects warnings so tests can check what the solver reported.
    struct WarningLog {
        records: Mutex<Vec<(ThreadId, String)>>,
    }

    impl Log for WarningLog {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                let message = format!("{}", record.args());
                if let Ok(mut records) = self.records.lock() {
                    records.push((thread::current().id(), message));
                }
            }
        }

        fn flush(&self) {}
    }

    static WARNINGS: WarningLog = WarningLog {
        records: Mutex::new(Vec::new()),
    };

    /// Warnings logged so far by the calling test's thread.
    fn warnings_on_this_thread() -> Vec<String> {
        // Only the first installation succeeds.
        let _ = log::set_logger(&WARNINGS);
        log::set_max_level(LevelFilter::Warn);
        let id = thread::current().id();
        WARNINGS
            .records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|(thread, _)| *thread == id)
                    .map(|(_, message)| message.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn finds_square_root_of_two() {
        let f = |x: f64, _: &[f64]| x * x - 2.0;
        let solution = brent(&f, &[], (0.0, 2.0), 1e-12);
        assert_eq!(solution.status, RootStatus::Converged);
        assert!((solution.root - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!(solution.residual.abs() < 1e-8);
        assert!(solution.iterations > 0 && solution.iterations < 100);
    }

    #[test]
    fn passes_coefficients_through() {
        let f = |x: f64, coefs: &[f64]| coefs[0] * x.powi(3) - coefs[1];
        let solution = brent(&f, &[2.0, 54.0], (0.0, 10.0), 1e-10);
        assert!(solution.is_reliable());
        assert!((solution.root - 3.0).abs() < 1e-8);
    }

    #[test]
    fn converges_on_transcendental_equation() {
        let f = |x: f64, _: &[f64]| x.cos() - x;
        let solution = brent(&f, &[], (0.0, 1.0), 1e-12);
        assert_eq!(solution.status, RootStatus::Converged);
        assert!((solution.root.cos() - solution.root).abs() < 1e-10);
    }

    #[test]
    fn boundary_root_shortcut_skips_iteration() {
        let calls = Cell::new(0);
        let f = |x: f64, _: &[f64]| {
            calls.set(calls.get() + 1);
            x - 1.0005
        };
        let solution = brent(&f, &[], (1.0, 3.0), 1e-12);
        assert_eq!(solution.status, RootStatus::BoundaryRoot);
        assert_eq!(solution.root, 1.0);
        assert_eq!(solution.iterations, 0);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn boundary_root_prefers_smaller_magnitude() {
        let f = |x: f64, _: &[f64]| if x < 0.5 { 5e-4 } else { -1e-4 };
        let solution = brent(&f, &[], (0.0, 1.0), 1e-12);
        assert_eq!(solution.status, RootStatus::BoundaryRoot);
        assert_eq!(solution.root, 1.0);
    }

    #[test]
    fn unbracketed_input_returns_better_bound() {
        let f = |x: f64, _: &[f64]| x * x + 1.0;
        let solution = brent(&f, &[], (-3.0, 2.0), 1e-8);
        assert_eq!(solution.status, RootStatus::Unbracketed);
        assert_eq!(solution.root, 2.0);
        assert!(!solution.is_reliable());
    }

    #[test]
    fn unbracketed_input_is_reported() {
        assert!(warnings_on_this_thread().is_empty());
        let f = |x: f64, _: &[f64]| x * x + 1.0;
        brent(&f, &[], (-3.0, 2.0), 1e-8);
        let warnings = warnings_on_this_thread();
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("not bracketed in [-3, 2]"), "{}", warnings[0]);

        let g = |x: f64, _: &[f64]| x - 0.5;
        brent(&g, &[], (0.0, 2.0), 1e-8);
        assert_eq!(warnings_on_this_thread().len(), 1);
    }

    #[test]
    fn converged_bracket_is_narrower_than_tolerance() {
        let f = |x: f64, _: &[f64]| x.exp() - 3.0;
        for tol in [1e-4, 1e-8, 1e-12] {
            let solution = brent(&f, &[], (0.0, 4.0), tol);
            assert_eq!(solution.status, RootStatus::Converged);
            assert!(solution.width < tol, "width {} at tol {tol}", solution.width);
            assert!((solution.root - 3.0_f64.ln()).abs() <= solution.width.max(1e-15));
        }
    }

    #[test]
    fn iteration_cap_returns_last_estimate() {
        let settings = BrentSettings {
            max_iterations: 2,
            ..BrentSettings::default()
        };
        let f = |x: f64, _: &[f64]| (x - 0.3).powi(3);
        let solution = brent_with(settings, &f, &[], (-1.0, 2.0), 1e-14);
        assert_eq!(solution.status, RootStatus::IterationExhausted);
        assert_eq!(solution.iterations, 2);
        assert!(solution.root > -1.0 && solution.root < 2.0);
    }

    #[test]
    fn reversed_bracket_is_accepted() {
        let f = |x: f64, _: &[f64]| x.exp() - 5.0;
        let solution = brent(&f, &[], (4.0, 0.0), 1e-12);
        assert_eq!(solution.status, RootStatus::Converged);
        assert!((solution.root - 5.0_f64.ln()).abs() < 1e-9);
    }
}
