//! Core traits and types for Riemannian conjugate-gradient optimization.
//!
//! This crate provides the abstractions every manifold and solver in the
//! workspace builds on.
//!
//! # Key Concepts
//!
//! - **Manifolds**: smooth constraint sets with a metric, a retraction and a
//!   vector transport
//! - **Geometry cache**: caller-owned storage for quantities one manifold
//!   operation hands to the next
//! - **Cost functions**: objectives reporting values and Euclidean derivatives
//! - **Line searches**: Armijo backtracking and strong Wolfe
//!
//! # Modules
//!
//! - [`cache`]: Typed geometry cache
//! - [`cost_function`]: Cost function interface
//! - [`error`]: Error types
//! - [`linalg`]: BLAS-style primitives
//! - [`line_search`]: Line search algorithms
//! - [`manifold`]: Core manifold trait and configuration kinds
//! - [`optimizer`]: Results and stopping criteria
//! - [`types`]: Scalar trait, type aliases and numerical constants

pub mod core;
pub mod linalg;
pub mod optimization;
pub mod utils;

pub use crate::core::{cache, cost_function, error, manifold, types};
pub use optimization::{line_search, optimizer};

#[cfg(any(test, feature = "test-utils"))]
pub use utils::test_manifolds;

// Re-export commonly used items at the crate root
pub use error::{ManifoldError, OptimizerError, OptimizerResult, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use rcgopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{BetaEntry, GeometryCache, GradientEntry, TransportEntry};
    pub use crate::cost_function::{
        CostFunction, CountingCostFunction, ProblemUsage, QuadraticCost,
    };
    pub use crate::error::{ManifoldError, OptimizerError, OptimizerResult, Result};
    pub use crate::line_search::{
        BacktrackingLineSearch, LineSearch, LineSearchContext, LineSearchParams,
        LineSearchResult, StrongWolfeLineSearch,
    };
    pub use crate::linalg::Transpose;
    pub use crate::manifold::{Manifold, MetricKind, RetractionKind, TransportKind};
    pub use crate::optimizer::{
        OptimizationResult, SolverStatus, StoppingCriterion, TerminationReason,
    };
    pub use crate::types::{
        constants, DMatrix, DVector, LinearOperator, Point, Scalar, TangentVector,
    };
}
