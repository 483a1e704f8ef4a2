//! Type definitions and aliases for Riemannian optimization.
//!
//! This module provides the scalar trait used by every manifold and solver,
//! the vector and matrix aliases built on `nalgebra`, and a few numerical
//! constants.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the necessary numeric traits required
/// for Riemannian optimization algorithms.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance for gradient norm convergence.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Tolerance for checking if a point is on the manifold.
    const MANIFOLD_TOLERANCE: Self;

    /// Tolerance for checking tangency.
    const ORTHOGONALITY_TOLERANCE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Convert from usize (for sample counts).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-5;
    const MANIFOLD_TOLERANCE: Self = 1e-5;
    const ORTHOGONALITY_TOLERANCE: Self = 1e-5;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-8;
    const MANIFOLD_TOLERANCE: Self = 1e-10;
    const ORTHOGONALITY_TOLERANCE: Self = 1e-10;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Points on a manifold are stored in their ambient (extrinsic) representation.
pub type Point<T> = DVector<T>;

/// Tangent vectors share the storage layout of points.
pub type TangentVector<T> = DVector<T>;

/// Dense approximation of a Hessian (or its inverse) acting on tangent vectors.
pub type LinearOperator<T> = DMatrix<T>;

/// Numerical constants for different precision levels.
pub mod constants {
    use super::Scalar;

    /// Get machine epsilon for the given scalar type.
    pub fn epsilon<T: Scalar>() -> T {
        T::EPSILON
    }

    /// Get default gradient convergence tolerance.
    pub fn gradient_tolerance<T: Scalar>() -> T {
        T::DEFAULT_GRADIENT_TOLERANCE
    }

    /// Get manifold membership tolerance.
    pub fn manifold_tolerance<T: Scalar>() -> T {
        T::MANIFOLD_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(<f64 as Scalar>::from_f64(0.5), 0.5);
        assert_eq!(<f32 as Scalar>::from_usize(4), 4.0);
        assert_eq!(Scalar::to_f64(2.0_f32), 2.0);
        assert!(<f64 as Scalar>::try_from_f64(1.0).is_some());
    }

    #[test]
    fn test_constants() {
        assert_eq!(constants::epsilon::<f64>(), f64::EPSILON);
        assert!(
            constants::manifold_tolerance::<f32>() > constants::manifold_tolerance::<f64>() as f32
        );
        assert!(constants::gradient_tolerance::<f64>() > 0.0);
    }
}
