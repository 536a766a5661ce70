use nalgebra::DMatrix;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in state tables.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A scalar equation `f(x; coefs)` whose root is sought by the bracketing solver.
///
/// Closures of the form `|x, coefs| ...` implement this automatically.
pub trait Residual {
    /// x: trial value
    /// coefs: auxiliary coefficients, passed through the solver untouched
    fn evaluate(&self, x: f64, coefs: &[f64]) -> f64;
}

impl<F> Residual for F
where
    F: Fn(f64, &[f64]) -> f64,
{
    fn evaluate(&self, x: f64, coefs: &[f64]) -> f64 {
        self(x, coefs)
    }
}

/// Right-hand side of a semi-discrete system `dS/dt = f(S)`.
///
/// The state table holds one row per node and one column per state variable.
/// Implementations must write every entry of `out`.
pub trait StateDerivative {
    /// state: current state table
    /// out: buffer to write dS/dt, same shape as `state`
    fn apply(&mut self, state: &DMatrix<f64>, out: &mut DMatrix<f64>);
}

impl<F> StateDerivative for F
where
    F: FnMut(&DMatrix<f64>, &mut DMatrix<f64>),
{
    fn apply(&mut self, state: &DMatrix<f64>, out: &mut DMatrix<f64>) {
        self(state, out)
    }
}
