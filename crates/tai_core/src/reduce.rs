//! Per-slice reductions over 2D state tables.
//!
//! These back the infinity norms and negativity checks of the RKF45
//! integrator, but are usable on any rectangular table.

use crate::error::ReductionError;
use crate::traits::Scalar;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Which dimension a reduction collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Collapse the row index: one result per column (per state variable).
    Rows,
    /// Collapse the column index: one result per row (per node).
    Columns,
}

impl TryFrom<usize> for Axis {
    type Error = ReductionError;

    /// Maps the 1-based dimension numbering (`1` = rows, `2` = columns).
    fn try_from(dim: usize) -> Result<Self, Self::Error> {
        match dim {
            1 => Ok(Axis::Rows),
            2 => Ok(Axis::Columns),
            other => Err(ReductionError::InvalidAxis(other)),
        }
    }
}

/// Returns `max(|min(slice)|, |max(slice)|)` for every slice along `axis`.
///
/// NaN entries are skipped by the folds; callers that must reject them check
/// finiteness themselves.
pub fn max_abs_along<T: Scalar>(
    table: &DMatrix<T>,
    axis: Axis,
) -> Result<DVector<T>, ReductionError> {
    reduce_slices(table, axis, |values| {
        let (lo, hi) = values.fold((T::infinity(), T::neg_infinity()), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        lo.abs().max(hi.abs())
    })
}

/// Returns the plain minimum of every slice along `axis`.
pub fn min_along<T: Scalar>(table: &DMatrix<T>, axis: Axis) -> Result<DVector<T>, ReductionError> {
    reduce_slices(table, axis, |values| values.fold(T::infinity(), |acc, v| acc.min(v)))
}

fn reduce_slices<T, F>(
    table: &DMatrix<T>,
    axis: Axis,
    reduce: F,
) -> Result<DVector<T>, ReductionError>
where
    T: Scalar,
    F: Fn(&mut dyn Iterator<Item = T>) -> T,
{
    let (rows, cols) = table.shape();
    if rows == 0 || cols == 0 {
        return Err(ReductionError::EmptyTable { rows, cols });
    }

    let reduced = match axis {
        Axis::Rows => DVector::from_iterator(
            cols,
            table
                .column_iter()
                .map(|column| reduce(&mut column.iter().copied())),
        ),
        Axis::Columns => DVector::from_iterator(
            rows,
            table.row_iter().map(|row| reduce(&mut row.iter().copied())),
        ),
    };
    Ok(reduced)
}
