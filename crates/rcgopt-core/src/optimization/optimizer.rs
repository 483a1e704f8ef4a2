//! Results, termination reasons and stopping criteria shared by solvers.
//!
//! # Convergence Control
//!
//! - **Gradient norm**: ||grad f(x)||_x < ε_grad (first-order optimality)
//! - **Function change**: |f(xₖ) - f(xₖ₋₁)| < ε_f (stationarity)
//! - **Target value**: f(x) ≤ f_target
//! - **Budgets**: iterations, wall-clock time, function evaluations
//!
//! # Examples
//!
//! ```rust
//! # use rcgopt_core::prelude::*;
//! # use std::time::Duration;
//! let criterion = StoppingCriterion::<f64>::new()
//!     .with_gradient_tolerance(1e-10)
//!     .with_max_iterations(500)
//!     .with_max_time(Duration::from_secs(60));
//! assert_eq!(criterion.max_iterations, Some(500));
//! ```

use crate::types::{Point, Scalar};
use num_traits::Float;
use std::time::Duration;

/// Outcome of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T: Scalar> {
    /// The final point xₖ ∈ M
    pub point: Point<T>,

    /// The objective value f(xₖ)
    pub value: T,

    /// The Riemannian gradient norm ||grad f(xₖ)||
    pub gradient_norm: Option<T>,

    /// Number of iterations performed
    pub iterations: usize,

    /// Total number of objective evaluations
    pub function_evaluations: usize,

    /// Total number of gradient evaluations
    pub gradient_evaluations: usize,

    /// Wall-clock time elapsed
    pub duration: Duration,

    /// Reason the solver stopped
    pub termination_reason: TerminationReason,

    /// True if a convergence criterion was met
    pub converged: bool,

    /// Objective value at the initial point and after every accepted step
    pub objective_history: Vec<T>,
}

impl<T: Scalar> OptimizationResult<T> {
    /// Creates a new optimization result.
    pub fn new(
        point: Point<T>,
        value: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        let converged = matches!(
            termination_reason,
            TerminationReason::Converged | TerminationReason::TargetReached
        );

        Self {
            point,
            value,
            gradient_norm: None,
            iterations,
            function_evaluations: 0,
            gradient_evaluations: 0,
            duration,
            termination_reason,
            converged,
            objective_history: Vec::new(),
        }
    }

    /// Sets the gradient norm at the final point.
    pub fn with_gradient_norm(mut self, norm: T) -> Self {
        self.gradient_norm = Some(norm);
        self
    }

    /// Sets the function evaluation count.
    pub fn with_function_evaluations(mut self, count: usize) -> Self {
        self.function_evaluations = count;
        self
    }

    /// Sets the gradient evaluation count.
    pub fn with_gradient_evaluations(mut self, count: usize) -> Self {
        self.gradient_evaluations = count;
        self
    }

    /// Sets the recorded objective values.
    pub fn with_objective_history(mut self, history: Vec<T>) -> Self {
        self.objective_history = history;
        self
    }
}

/// Reasons for solver termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// ||grad f(x)|| below tolerance
    Converged,
    /// Objective value reached the target
    TargetReached,
    /// Objective change below tolerance
    FunctionTolerance,
    /// Iteration budget exhausted
    MaxIterations,
    /// Wall-clock limit exceeded
    MaxTime,
    /// Function evaluation budget exhausted
    MaxFunctionEvaluations,
    /// No acceptable step along the search direction
    LineSearchFailed,
    /// NaN or infinity encountered
    NumericalError,
}

/// Stopping criteria for a solver run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Maximum number of iterations
    pub max_iterations: Option<usize>,

    /// Maximum wall-clock time
    pub max_time: Option<Duration>,

    /// Maximum number of objective evaluations
    pub max_function_evaluations: Option<usize>,

    /// Tolerance on ||grad f(x)||
    pub gradient_tolerance: Option<T>,

    /// Tolerance on |f(xₖ) - f(xₖ₋₁)|
    pub function_tolerance: Option<T>,

    /// Stop when f(x) ≤ target
    pub target_value: Option<T>,
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self {
            max_iterations: Some(1000),
            max_time: None,
            max_function_evaluations: None,
            gradient_tolerance: Some(<T as Scalar>::from_f64(1e-6)),
            function_tolerance: None,
            target_value: None,
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates a new stopping criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = Some(max_iter);
        self
    }

    /// Sets the maximum optimization time.
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Sets the maximum number of objective evaluations.
    pub fn with_max_function_evaluations(mut self, count: usize) -> Self {
        self.max_function_evaluations = Some(count);
        self
    }

    /// Sets the gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = Some(tol);
        self
    }

    /// Sets the function value change tolerance.
    pub fn with_function_tolerance(mut self, tol: T) -> Self {
        self.function_tolerance = Some(tol);
        self
    }

    /// Sets the target objective value.
    pub fn with_target_value(mut self, target: T) -> Self {
        self.target_value = Some(target);
        self
    }

    /// Checks the criteria against the current solver status.
    ///
    /// Non-finite values stop the run first, then convergence tests, then
    /// budgets.
    pub fn check(&self, status: &SolverStatus<T>) -> Option<TerminationReason> {
        if !Float::is_finite(status.value) || !Float::is_finite(status.gradient_norm) {
            return Some(TerminationReason::NumericalError);
        }
        if let Some(tol) = self.gradient_tolerance {
            if status.gradient_norm < tol {
                return Some(TerminationReason::Converged);
            }
        }
        if let Some(target) = self.target_value {
            if status.value <= target {
                return Some(TerminationReason::TargetReached);
            }
        }
        if let (Some(tol), Some(previous)) = (self.function_tolerance, status.previous_value) {
            if <T as Float>::abs(previous - status.value) < tol {
                return Some(TerminationReason::FunctionTolerance);
            }
        }
        if let Some(max_iter) = self.max_iterations {
            if status.iteration >= max_iter {
                return Some(TerminationReason::MaxIterations);
            }
        }
        if let Some(max_evals) = self.max_function_evaluations {
            if status.function_evaluations >= max_evals {
                return Some(TerminationReason::MaxFunctionEvaluations);
            }
        }
        if let Some(max_time) = self.max_time {
            if status.elapsed >= max_time {
                return Some(TerminationReason::MaxTime);
            }
        }
        None
    }
}

/// Snapshot of solver progress used by [`StoppingCriterion::check`].
#[derive(Debug, Clone, Copy)]
pub struct SolverStatus<T: Scalar> {
    /// Completed iterations
    pub iteration: usize,
    /// Current objective value
    pub value: T,
    /// Objective before the last accepted step
    pub previous_value: Option<T>,
    /// Norm of the current Riemannian gradient
    pub gradient_norm: T,
    /// Objective evaluations so far
    pub function_evaluations: usize,
    /// Time since the run started
    pub elapsed: Duration,
}
