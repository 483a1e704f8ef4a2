//! BLAS-style primitives over nalgebra storage.
//!
//! Thin, dimension-checked wrappers around nalgebra's `dot`, `gemv`,
//! `gemv_tr` and `ger`. The manifold code expresses its operator transforms
//! with these so that the level-2 structure of each update stays visible.

use crate::{
    error::{ManifoldError, Result},
    types::{DVector, Scalar},
};
use nalgebra::{DMatrixView, DMatrixViewMut};

/// Whether `gemv` applies the matrix or its transpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    /// y = alpha * A * x + beta * y
    No,
    /// y = alpha * A^T * x + beta * y
    Yes,
}

/// Euclidean dot product `x^T y`.
pub fn dot<T: Scalar>(x: &DVector<T>, y: &DVector<T>) -> Result<T> {
    if x.len() != y.len() {
        return Err(ManifoldError::dimension_mismatch(x.len(), y.len()));
    }
    Ok(x.dot(y))
}

/// Matrix-vector product `y = alpha * op(A) * x + beta * y`.
///
/// When `beta` is zero the previous content of `y` is ignored.
pub fn gemv<T: Scalar>(
    trans: Transpose,
    alpha: T,
    a: &DMatrixView<'_, T>,
    x: &DVector<T>,
    beta: T,
    y: &mut DVector<T>,
) -> Result<()> {
    let (rows, cols) = match trans {
        Transpose::No => (a.nrows(), a.ncols()),
        Transpose::Yes => (a.ncols(), a.nrows()),
    };
    if x.len() != cols {
        return Err(ManifoldError::dimension_mismatch(
            format!("x of length {}", cols),
            format!("x of length {}", x.len()),
        ));
    }
    if y.len() != rows {
        return Err(ManifoldError::dimension_mismatch(
            format!("y of length {}", rows),
            format!("y of length {}", y.len()),
        ));
    }

    match trans {
        Transpose::No => y.gemv(alpha, a, x, beta),
        Transpose::Yes => y.gemv_tr(alpha, a, x, beta),
    }
    Ok(())
}

/// Rank-1 update `A += alpha * x * y^T`.
pub fn ger<T: Scalar>(
    alpha: T,
    x: &DVector<T>,
    y: &DVector<T>,
    a: &mut DMatrixViewMut<'_, T>,
) -> Result<()> {
    if a.nrows() != x.len() || a.ncols() != y.len() {
        return Err(ManifoldError::dimension_mismatch(
            format!("{}x{}", x.len(), y.len()),
            format!("{}x{}", a.nrows(), a.ncols()),
        ));
    }
    a.ger(alpha, x, y, T::one());
    Ok(())
}
