//! Error types for Riemannian manifold operations.
//!
//! This module defines the core error types used throughout the library
//! for manifold-specific operations and numerical computations.

use thiserror::Error;

/// Errors that can occur during manifold operations.
#[derive(Debug, Clone, Error)]
pub enum ManifoldError {
    /// Point is not on the manifold.
    #[error("Point is not on the manifold: {reason}")]
    InvalidPoint {
        /// Description of why the point is invalid
        reason: String,
    },

    /// Vector is not in the tangent space.
    #[error("Vector is not in the tangent space: {reason}")]
    InvalidTangent {
        /// Description of why the tangent vector is invalid
        reason: String,
    },

    /// Dimension mismatch between vectors or operators.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of the invalid parameter
        reason: String,
    },

    /// Numerical instability detected.
    ///
    /// This error occurs when numerical operations become unstable,
    /// such as division by near-zero values or loss of precision.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },

    /// Capability not supported by this manifold.
    ///
    /// Returned instead of a silent pass-through so that callers can detect
    /// the gap and pick their own fallback.
    #[error("Feature not implemented: {feature}")]
    NotImplemented {
        /// Name of the unimplemented feature
        feature: String,
    },

    /// The requested combination of metric, retraction and transport is not available.
    #[error("Unsupported manifold configuration: {reason}")]
    UnsupportedConfiguration {
        /// Which part of the configuration was rejected
        reason: String,
    },

    /// An operation was called without the state its contract requires.
    ///
    /// For example, converting a Euclidean Hessian-vector product before the
    /// Euclidean gradient at the same point has been cached.
    #[error("Precondition violated: {reason}")]
    PreconditionViolated {
        /// The missing precondition
        reason: String,
    },
}

impl ManifoldError {
    /// Create an InvalidPoint error with a custom reason.
    pub fn invalid_point<S: Into<String>>(reason: S) -> Self {
        Self::InvalidPoint {
            reason: reason.into(),
        }
    }

    /// Create an InvalidTangent error with a custom reason.
    pub fn invalid_tangent<S: Into<String>>(reason: S) -> Self {
        Self::InvalidTangent {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an InvalidParameter error with a custom reason.
    pub fn invalid_parameter<S: Into<String>>(reason: S) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Create a NotImplemented error for a specific feature.
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create an UnsupportedConfiguration error.
    pub fn unsupported_configuration<S: Into<String>>(reason: S) -> Self {
        Self::UnsupportedConfiguration {
            reason: reason.into(),
        }
    }

    /// Create a PreconditionViolated error.
    pub fn precondition_violated<S: Into<String>>(reason: S) -> Self {
        Self::PreconditionViolated {
            reason: reason.into(),
        }
    }

    /// Returns true if this error reports a capability the manifold does not offer.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

/// Errors that can occur during optimization.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Line search failed to find an acceptable step.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of iterations attempted
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
        /// Function value at the starting point
        initial_value: f64,
    },

    /// Maximum number of iterations reached without convergence.
    #[error("Maximum iterations ({max_iterations}) reached without convergence")]
    MaxIterationsReached {
        /// Maximum number of iterations allowed
        max_iterations: usize,
        /// Final function value
        final_value: f64,
        /// Final gradient norm
        final_gradient_norm: f64,
        /// Convergence tolerance that was not met
        tolerance: f64,
    },

    /// Invalid optimizer configuration.
    ///
    /// This error occurs when the optimizer is configured with invalid
    /// parameters (e.g. an unknown CG method code or a zero restart period).
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Propagated manifold error.
    #[error("Manifold operation failed: {0}")]
    ManifoldError(#[from] ManifoldError),

    /// Invalid search direction.
    #[error("Invalid search direction: not a descent direction")]
    InvalidSearchDirection,
}

impl OptimizerError {
    /// Create a LineSearchFailed error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
        initial_value: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
            initial_value,
        }
    }

    /// Create a MaxIterationsReached error with convergence information.
    pub fn max_iterations_reached(
        max_iterations: usize,
        final_value: f64,
        final_gradient_norm: f64,
        tolerance: f64,
    ) -> Self {
        Self::MaxIterationsReached {
            max_iterations,
            final_value,
            final_gradient_norm,
            tolerance,
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

/// Result type alias for operations that can produce ManifoldError.
pub type Result<T> = std::result::Result<T, ManifoldError>;

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ManifoldError::invalid_point("metric norm is 2");
        assert!(matches!(err, ManifoldError::InvalidPoint { .. }));
        assert_eq!(err.to_string(), "Point is not on the manifold: metric norm is 2");

        let err = ManifoldError::dimension_mismatch(5, 4);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 5, got 4");
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            ManifoldError::invalid_point("not unit norm"),
            ManifoldError::invalid_tangent("not orthogonal to point"),
            ManifoldError::dimension_mismatch("n = 5", "n = 3"),
            ManifoldError::invalid_parameter("c1 must lie in (0, 1)"),
            ManifoldError::numerical_error("zero denominator"),
            ManifoldError::not_implemented("cotangent vector"),
            ManifoldError::unsupported_configuration("QF retraction"),
            ManifoldError::precondition_violated("no cached Euclidean gradient"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_not_implemented_detection() {
        assert!(ManifoldError::not_implemented("intrinsic coordinates").is_not_implemented());
        assert!(!ManifoldError::numerical_error("nan").is_not_implemented());
    }

    #[test]
    fn test_optimizer_error_context() {
        let err =
            OptimizerError::line_search_failed("Armijo condition not satisfied", 25, 1e-8, 42.0);

        if let OptimizerError::LineSearchFailed {
            reason,
            iterations,
            last_step_size,
            initial_value,
        } = err
        {
            assert_eq!(reason, "Armijo condition not satisfied");
            assert_eq!(iterations, 25);
            assert_eq!(last_step_size, 1e-8);
            assert_eq!(initial_value, 42.0);
        } else {
            panic!("Expected LineSearchFailed variant");
        }

        let err = OptimizerError::invalid_configuration("unknown method code", "RCGmethod", "9");
        assert!(err.to_string().contains("Invalid optimizer configuration"));
    }

    #[test]
    fn test_manifold_error_propagation() {
        let manifold_err = ManifoldError::invalid_point("not on sphere");
        let optimizer_err: OptimizerError = manifold_err.into();

        assert!(matches!(optimizer_err, OptimizerError::ManifoldError(_)));
        assert!(optimizer_err.to_string().contains("not on sphere"));
    }
}
