//! Generic line-search solver loop.
//!
//! A line-search solver alternates between choosing a search direction and
//! moving along it. The direction rule is pluggable through
//! [`SearchDirectionRule`]; [`LineSearchSolver`] owns the loop and enforces
//! the order of the hooks within one iteration:
//!
//! 1. `get_search_dir` sets `eta1` at `x1`
//! 2. the line search produces `x2`, `f2`, `gf2` and `eta2 = α·eta1`
//! 3. the iteration counter increments
//! 4. `update_data` prepares the next direction
//! 5. `log_iteration` reports progress
//! 6. `x2` becomes `x1` and `gf2` becomes `gf1`
//!
//! # Parameters
//!
//! [`SolverConfig::set_params`] accepts a string-keyed map:
//!
//! | key | meaning |
//! |---|---|
//! | `Max_Iteration` | iteration budget |
//! | `Tolerance` | gradient norm tolerance |
//! | `LineSearch_LS` | 0 = Armijo backtracking, 1 = strong Wolfe |
//! | `Initstepsize` | first trial step of every line search |

use rcgopt_core::{
    cache::GeometryCache,
    cost_function::{CostFunction, ProblemUsage},
    error::{ManifoldError, OptimizerError, OptimizerResult},
    line_search::{
        BacktrackingLineSearch, LineSearch, LineSearchContext, LineSearchParams,
        LineSearchResult, StrongWolfeLineSearch,
    },
    manifold::Manifold,
    optimizer::{OptimizationResult, SolverStatus, StoppingCriterion, TerminationReason},
    types::{DVector, Point, Scalar, TangentVector},
};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::time::Instant;

/// Line search algorithm selected by `LineSearch_LS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineSearchKind {
    /// Armijo backtracking
    Armijo,
    /// Strong Wolfe bracketing and zoom
    #[default]
    StrongWolfe,
}

impl LineSearchKind {
    /// Decodes the numeric `LineSearch_LS` value.
    pub fn from_code(code: f64) -> OptimizerResult<Self> {
        match integer_param("LineSearch_LS", code)? {
            0 => Ok(Self::Armijo),
            1 => Ok(Self::StrongWolfe),
            _ => Err(OptimizerError::invalid_configuration(
                "unknown line search",
                "LineSearch_LS",
                code.to_string(),
            )),
        }
    }

    /// Numeric code of this line search.
    pub fn code(&self) -> usize {
        match self {
            Self::Armijo => 0,
            Self::StrongWolfe => 1,
        }
    }
}

impl fmt::Display for LineSearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Armijo => write!(f, "ARMIJO"),
            Self::StrongWolfe => write!(f, "STRONGWOLFE"),
        }
    }
}

/// Parses a parameter that must be a non-negative integer.
pub(crate) fn integer_param(name: &str, value: f64) -> OptimizerResult<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(OptimizerError::invalid_configuration(
            "expected a non-negative integer",
            name,
            value.to_string(),
        ));
    }
    Ok(value as usize)
}

fn positive_param(name: &str, value: f64) -> OptimizerResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OptimizerError::invalid_configuration(
            "expected a positive number",
            name,
            value.to_string(),
        ));
    }
    Ok(value)
}

/// Configuration of the solver loop.
#[derive(Debug, Clone)]
pub struct SolverConfig<T: Scalar> {
    /// Line search algorithm
    pub line_search: LineSearchKind,
    /// First trial step of every line search
    pub initial_step_size: T,
    /// Explicit line search parameters, overriding the per-kind defaults
    pub line_search_params: Option<LineSearchParams<T>>,
    /// When to stop
    pub criterion: StoppingCriterion<T>,
}

impl<T: Scalar> Default for SolverConfig<T> {
    fn default() -> Self {
        Self {
            line_search: LineSearchKind::default(),
            initial_step_size: T::one(),
            line_search_params: None,
            criterion: StoppingCriterion::default(),
        }
    }
}

impl<T: Scalar> SolverConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the line search algorithm.
    pub fn with_line_search(mut self, kind: LineSearchKind) -> Self {
        self.line_search = kind;
        self
    }

    /// Sets the first trial step.
    pub fn with_initial_step_size(mut self, step: T) -> Self {
        self.initial_step_size = step;
        self
    }

    /// Overrides the line search parameters.
    pub fn with_line_search_params(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search_params = Some(params);
        self
    }

    /// Sets the stopping criterion.
    pub fn with_criterion(mut self, criterion: StoppingCriterion<T>) -> Self {
        self.criterion = criterion;
        self
    }

    /// Applies the solver-loop keys of a parameter map.
    ///
    /// Keys belonging to a direction rule are ignored here.
    pub fn set_params(&mut self, params: &HashMap<String, f64>) -> OptimizerResult<()> {
        for (key, &value) in params {
            match key.as_str() {
                "Max_Iteration" => {
                    self.criterion.max_iterations = Some(integer_param(key, value)?);
                }
                "Tolerance" => {
                    let tol = positive_param(key, value)?;
                    self.criterion.gradient_tolerance = Some(<T as Scalar>::from_f64(tol));
                }
                "LineSearch_LS" => {
                    self.line_search = LineSearchKind::from_code(value)?;
                }
                "Initstepsize" => {
                    self.initial_step_size = <T as Scalar>::from_f64(positive_param(key, value)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Line search parameters the run will use.
    pub fn effective_line_search_params(&self) -> LineSearchParams<T> {
        if let Some(params) = &self.line_search_params {
            return params.clone();
        }
        let params = match self.line_search {
            LineSearchKind::Armijo => LineSearchParams::backtracking(),
            LineSearchKind::StrongWolfe => LineSearchParams::strong_wolfe(),
        };
        params.with_initial_step_size(self.initial_step_size)
    }

    fn build_line_search(&self) -> OptimizerResult<ConfiguredLineSearch<T>> {
        let params = self.effective_line_search_params();
        let search = match self.line_search {
            LineSearchKind::Armijo => {
                ConfiguredLineSearch::Armijo(BacktrackingLineSearch::with_params(params)?)
            }
            LineSearchKind::StrongWolfe => {
                ConfiguredLineSearch::StrongWolfe(StrongWolfeLineSearch::with_params(params)?)
            }
        };
        Ok(search)
    }
}

/// The line search picked by a [`SolverConfig`].
#[derive(Debug, Clone)]
pub enum ConfiguredLineSearch<T: Scalar> {
    /// Armijo backtracking
    Armijo(BacktrackingLineSearch<T>),
    /// Strong Wolfe
    StrongWolfe(StrongWolfeLineSearch<T>),
}

impl<T: Scalar> LineSearch<T> for ConfiguredLineSearch<T> {
    fn search<C, M>(
        &mut self,
        ctx: &LineSearchContext<'_, T, C, M>,
        point: &Point<T>,
        value: T,
        gradient: &TangentVector<T>,
        direction: &TangentVector<T>,
        cache: &mut GeometryCache<T>,
    ) -> OptimizerResult<LineSearchResult<T>>
    where
        C: CostFunction<T> + ?Sized,
        M: Manifold<T> + ?Sized,
    {
        match self {
            Self::Armijo(ls) => ls.search(ctx, point, value, gradient, direction, cache),
            Self::StrongWolfe(ls) => ls.search(ctx, point, value, gradient, direction, cache),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Armijo(ls) => ls.name(),
            Self::StrongWolfe(ls) => ls.name(),
        }
    }
}

/// Iterates and cached geometry shared by the loop and the direction rule.
///
/// Slot `1` holds the current iterate, slot `2` the one produced by the
/// line search.
#[derive(Debug, Clone)]
pub struct SolverState<T: Scalar> {
    /// Current iterate
    pub x1: Point<T>,
    /// Trial iterate accepted by the line search
    pub x2: Point<T>,
    /// Riemannian gradient at `x1`
    pub gf1: TangentVector<T>,
    /// Riemannian gradient at `x2`
    pub gf2: TangentVector<T>,
    /// Search direction at `x1`
    pub eta1: TangentVector<T>,
    /// Accepted step `α·eta1`
    pub eta2: TangentVector<T>,
    /// Objective at `x1`
    pub f1: T,
    /// Objective at `x2`
    pub f2: T,
    /// Completed iterations
    pub iteration: usize,
    /// Last accepted step size
    pub step_size: T,
    /// Line search in use
    pub line_search: LineSearchKind,
    /// Geometry cache owned by this run
    pub cache: GeometryCache<T>,
}

impl<T: Scalar> SolverState<T> {
    /// Starts a run at `x0` with value `f0` and Riemannian gradient `gf0`.
    pub fn new(x0: Point<T>, f0: T, gf0: TangentVector<T>, line_search: LineSearchKind) -> Self {
        let n = x0.len();
        Self {
            x2: x0.clone(),
            x1: x0,
            gf2: gf0.clone(),
            gf1: gf0,
            eta1: DVector::zeros(n),
            eta2: DVector::zeros(n),
            f1: f0,
            f2: f0,
            iteration: 0,
            step_size: T::zero(),
            line_search,
            cache: GeometryCache::new(),
        }
    }

    /// Makes the accepted iterate current.
    pub fn shift(&mut self) {
        std::mem::swap(&mut self.x1, &mut self.x2);
        std::mem::swap(&mut self.gf1, &mut self.gf2);
        self.f1 = self.f2;
    }
}

/// Direction rule plugged into [`LineSearchSolver`].
pub trait SearchDirectionRule<T: Scalar>: Debug {
    /// Name of the rule.
    fn name(&self) -> &str;

    /// Derivatives the rule needs from the objective.
    fn usage(&self) -> ProblemUsage;

    /// Validates and reports the rule's parameters.
    fn check_params(&self) -> OptimizerResult<()> {
        Ok(())
    }

    /// Sets `state.eta1`, the search direction at `state.x1`.
    fn get_search_dir<M>(&mut self, manifold: &M, state: &mut SolverState<T>) -> OptimizerResult<()>
    where
        M: Manifold<T> + ?Sized;

    /// Updates the rule after the line search and the iteration increment.
    fn update_data<M>(&mut self, manifold: &M, state: &mut SolverState<T>) -> OptimizerResult<()>
    where
        M: Manifold<T> + ?Sized;

    /// Reports the rule's per-iteration quantities.
    fn log_iteration(&self, _state: &SolverState<T>) {}
}

/// Line-search solver loop.
#[derive(Debug, Clone)]
pub struct LineSearchSolver<T: Scalar> {
    config: SolverConfig<T>,
}

impl<T: Scalar> Default for LineSearchSolver<T> {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<T: Scalar> LineSearchSolver<T> {
    /// Creates a solver with the given configuration.
    pub fn new(config: SolverConfig<T>) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SolverConfig<T> {
        &self.config
    }

    /// Applies the solver-loop keys of a parameter map.
    pub fn set_params(&mut self, params: &HashMap<String, f64>) -> OptimizerResult<()> {
        self.config.set_params(params)
    }

    /// Minimizes `cost_fn` over `manifold` from `x0`.
    ///
    /// A line search that cannot find an acceptable step ends the run with
    /// `TerminationReason::LineSearchFailed`; other errors are returned.
    /// An accepted step whose point fails `is_point_on_manifold` at
    /// `Scalar::MANIFOLD_TOLERANCE` is reported as `ManifoldError::NumericalError`.
    pub fn run<R, C, M>(
        &self,
        rule: &mut R,
        cost_fn: &C,
        manifold: &M,
        x0: &Point<T>,
    ) -> OptimizerResult<OptimizationResult<T>>
    where
        R: SearchDirectionRule<T>,
        C: CostFunction<T> + ?Sized,
        M: Manifold<T> + ?Sized,
    {
        let start_time = Instant::now();
        let criterion = &self.config.criterion;

        manifold.check_params()?;
        rule.check_params()?;
        let mut line_search = self.config.build_line_search()?;
        tracing::info!(
            solver = rule.name(),
            manifold = manifold.name(),
            line_search = line_search.name(),
            max_iterations = ?criterion.max_iterations,
            "starting line-search solver"
        );

        let usage = rule.usage().supported_by::<T, C>(cost_fn);
        let ctx = LineSearchContext::new(cost_fn, manifold, usage);
        let mut cache = GeometryCache::new();
        let (f0, gf0) = ctx.value_and_gradient(x0, &mut cache)?;
        let mut state = SolverState::new(x0.clone(), f0, gf0, self.config.line_search);
        state.cache = cache;

        let mut function_evaluations = 1;
        let mut gradient_evaluations = 1;
        let mut history = vec![f0];
        let mut previous_value = None;

        let (reason, gradient_norm) = loop {
            let gradient_norm = manifold.norm(&state.x1, &state.gf1)?;
            let status = SolverStatus {
                iteration: state.iteration,
                value: state.f1,
                previous_value,
                gradient_norm,
                function_evaluations,
                elapsed: start_time.elapsed(),
            };
            if let Some(reason) = criterion.check(&status) {
                break (reason, gradient_norm);
            }

            rule.get_search_dir(manifold, &mut state)?;

            let step = match line_search.search(
                &ctx,
                &state.x1,
                state.f1,
                &state.gf1,
                &state.eta1,
                &mut state.cache,
            ) {
                Ok(step) => step,
                Err(OptimizerError::LineSearchFailed { reason, .. }) => {
                    tracing::warn!(iteration = state.iteration, %reason, "line search failed");
                    break (TerminationReason::LineSearchFailed, gradient_norm);
                }
                Err(err) => return Err(err),
            };

            function_evaluations += step.function_evals;
            gradient_evaluations += step.gradient_evals;
            state.step_size = step.step_size;
            state.eta2 = &state.eta1 * step.step_size;
            state.x2 = step.new_point;
            state.f2 = step.new_value;
            state.gf2 = step.new_gradient;

            if !manifold.is_point_on_manifold(&state.x2, T::MANIFOLD_TOLERANCE) {
                tracing::error!(iteration = state.iteration, "accepted step left the manifold");
                return Err(ManifoldError::numerical_error(format!(
                    "iterate {} left {} after the line search",
                    state.iteration + 1,
                    manifold.name()
                ))
                .into());
            }

            state.iteration += 1;
            rule.update_data(manifold, &mut state)?;

            tracing::debug!(
                iteration = state.iteration,
                value = Scalar::to_f64(state.f2),
                step_size = Scalar::to_f64(state.step_size),
                gradient_norm = Scalar::to_f64(gradient_norm),
                "iteration completed"
            );
            rule.log_iteration(&state);

            history.push(state.f2);
            previous_value = Some(state.f1);
            state.shift();
        };

        tracing::info!(
            solver = rule.name(),
            iterations = state.iteration,
            value = Scalar::to_f64(state.f1),
            gradient_norm = Scalar::to_f64(gradient_norm),
            reason = ?reason,
            "solver finished"
        );

        Ok(OptimizationResult::new(
            state.x1,
            state.f1,
            state.iteration,
            start_time.elapsed(),
            reason,
        )
        .with_gradient_norm(gradient_norm)
        .with_function_evaluations(function_evaluations)
        .with_gradient_evaluations(gradient_evaluations)
        .with_objective_history(history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rcgopt_core::{cost_function::QuadraticCost, test_manifolds::TestEuclideanManifold};

    /// Steepest descent, used to exercise the loop on its own.
    #[derive(Debug, Default)]
    struct SteepestDescent {
        calls: Vec<&'static str>,
    }

    impl SearchDirectionRule<f64> for SteepestDescent {
        fn name(&self) -> &str {
            "SteepestDescent"
        }

        fn usage(&self) -> ProblemUsage {
            ProblemUsage::gradient_only()
        }

        fn get_search_dir<M>(
            &mut self,
            _manifold: &M,
            state: &mut SolverState<f64>,
        ) -> OptimizerResult<()>
        where
            M: Manifold<f64> + ?Sized,
        {
            self.calls.push("get_search_dir");
            state.eta1 = -&state.gf1;
            Ok(())
        }

        fn update_data<M>(
            &mut self,
            _manifold: &M,
            state: &mut SolverState<f64>,
        ) -> OptimizerResult<()>
        where
            M: Manifold<f64> + ?Sized,
        {
            assert!(state.iteration > 0);
            self.calls.push("update_data");
            Ok(())
        }
    }

    /// Flat space whose points must keep the first coordinate above 0.6.
    ///
    /// The retraction ignores the bound, so descent towards the origin
    /// eventually produces a point outside the set.
    #[derive(Debug)]
    struct HalfSpace {
        flat: TestEuclideanManifold,
    }

    impl Manifold<f64> for HalfSpace {
        fn name(&self) -> &str {
            "HalfSpace"
        }

        fn dimension(&self) -> usize {
            Manifold::<f64>::dimension(&self.flat)
        }

        fn ambient_dimension(&self) -> usize {
            Manifold::<f64>::ambient_dimension(&self.flat)
        }

        fn is_point_on_manifold(&self, point: &Point<f64>, _tol: f64) -> bool {
            point[0] > 0.6
        }

        fn is_vector_in_tangent_space(
            &self,
            point: &Point<f64>,
            vector: &TangentVector<f64>,
            tol: f64,
        ) -> bool {
            self.flat.is_vector_in_tangent_space(point, vector, tol)
        }

        fn project_point(&self, point: &DVector<f64>) -> rcgopt_core::error::Result<Point<f64>> {
            self.flat.project_point(point)
        }

        fn inner_product(
            &self,
            point: &Point<f64>,
            u: &TangentVector<f64>,
            v: &TangentVector<f64>,
        ) -> rcgopt_core::error::Result<f64> {
            self.flat.inner_product(point, u, v)
        }

        fn project_tangent(
            &self,
            point: &Point<f64>,
            vector: &DVector<f64>,
        ) -> rcgopt_core::error::Result<TangentVector<f64>> {
            self.flat.project_tangent(point, vector)
        }

        fn retract(
            &self,
            point: &Point<f64>,
            tangent: &TangentVector<f64>,
        ) -> rcgopt_core::error::Result<Point<f64>> {
            self.flat.retract(point, tangent)
        }

        fn vector_transport(
            &self,
            x: &Point<f64>,
            eta: &TangentVector<f64>,
            y: &Point<f64>,
            xi: &TangentVector<f64>,
            cache: &mut GeometryCache<f64>,
        ) -> rcgopt_core::error::Result<TangentVector<f64>> {
            self.flat.vector_transport(x, eta, y, xi, cache)
        }

        fn random_point(&self) -> Point<f64> {
            self.flat.random_point()
        }

        fn random_tangent(
            &self,
            point: &Point<f64>,
        ) -> rcgopt_core::error::Result<TangentVector<f64>> {
            self.flat.random_tangent(point)
        }
    }

    fn params(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_set_params() {
        let mut config = SolverConfig::<f64>::new();
        config
            .set_params(&params(&[
                ("Max_Iteration", 50.0),
                ("Tolerance", 1e-8),
                ("LineSearch_LS", 0.0),
                ("Initstepsize", 0.5),
                ("RCGmethod", 3.0),
            ]))
            .unwrap();

        assert_eq!(config.criterion.max_iterations, Some(50));
        assert_eq!(config.criterion.gradient_tolerance, Some(1e-8));
        assert_eq!(config.line_search, LineSearchKind::Armijo);
        assert_eq!(config.effective_line_search_params().initial_step_size, 0.5);
    }

    #[test]
    fn test_invalid_params() {
        let mut config = SolverConfig::<f64>::new();
        for entry in [("LineSearch_LS", 2.0), ("Max_Iteration", -1.0), ("Tolerance", 0.0)] {
            assert!(matches!(
                config.set_params(&params(&[entry])),
                Err(OptimizerError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn test_shift_swaps_slots() {
        let mut state = SolverState::new(
            DVector::from_vec(vec![1.0, 0.0]),
            3.0,
            DVector::from_vec(vec![0.5, 0.5]),
            LineSearchKind::Armijo,
        );
        state.x2 = DVector::from_vec(vec![0.0, 1.0]);
        state.gf2 = DVector::from_vec(vec![0.1, 0.2]);
        state.f2 = 1.0;

        state.shift();
        assert_eq!(state.x1, DVector::from_vec(vec![0.0, 1.0]));
        assert_eq!(state.gf1, DVector::from_vec(vec![0.1, 0.2]));
        assert_eq!(state.x2, DVector::from_vec(vec![1.0, 0.0]));
        assert_eq!(state.f1, 1.0);
    }

    #[test]
    fn test_loop_hook_order_and_history() {
        let cost_fn = QuadraticCost::simple(3);
        let manifold = TestEuclideanManifold::new(3);
        let x0 = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let solver = LineSearchSolver::new(
            SolverConfig::new()
                .with_line_search(LineSearchKind::Armijo)
                .with_initial_step_size(0.5)
                .with_criterion(
                    StoppingCriterion::new()
                        .with_max_iterations(3)
                        .with_gradient_tolerance(1e-12),
                ),
        );
        let mut rule = SteepestDescent::default();

        let result = solver.run(&mut rule, &cost_fn, &manifold, &x0).unwrap();

        assert_eq!(
            rule.calls,
            vec![
                "get_search_dir",
                "update_data",
                "get_search_dir",
                "update_data",
                "get_search_dir",
                "update_data",
            ]
        );
        assert_eq!(result.iterations, 3);
        assert_eq!(result.termination_reason, TerminationReason::MaxIterations);
        assert_eq!(result.objective_history.len(), 4);
        assert!(result
            .objective_history
            .windows(2)
            .all(|pair| pair[1] <= pair[0]));
    }

    #[test]
    fn test_step_off_manifold_is_an_error() {
        let cost_fn = QuadraticCost::simple(1);
        let manifold = HalfSpace {
            flat: TestEuclideanManifold::new(1),
        };
        let x0 = DVector::from_vec(vec![2.0]);
        let solver = LineSearchSolver::new(
            SolverConfig::new()
                .with_line_search(LineSearchKind::Armijo)
                .with_initial_step_size(0.5)
                .with_criterion(
                    StoppingCriterion::new()
                        .with_max_iterations(10)
                        .with_gradient_tolerance(1e-12),
                ),
        );
        let mut rule = SteepestDescent::default();

        // 2.0 -> 1.0 stays inside, 1.0 -> 0.5 does not.
        let err = solver.run(&mut rule, &cost_fn, &manifold, &x0).unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::ManifoldError(ManifoldError::NumericalError { .. })
        ));
        assert_eq!(rule.calls, vec!["get_search_dir", "update_data", "get_search_dir"]);
    }

    #[test]
    fn test_converges_on_quadratic() {
        let cost_fn = QuadraticCost::simple(4);
        let manifold = TestEuclideanManifold::new(4);
        let x0 = DVector::from_vec(vec![1.0, 2.0, -1.0, 0.5]);
        let solver = LineSearchSolver::<f64>::default();
        let mut rule = SteepestDescent::default();

        let result = solver.run(&mut rule, &cost_fn, &manifold, &x0).unwrap();

        assert!(result.converged);
        assert!(result.point.norm() < 1e-6);
        assert!(result.function_evaluations >= result.iterations);
    }
}
