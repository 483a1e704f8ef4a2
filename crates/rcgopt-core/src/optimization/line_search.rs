//! Line search algorithms for Riemannian optimization.
//!
//! Given a point x ∈ M, a search direction η ∈ T_x M and an objective f,
//! a line search picks a step size α > 0 for the curve
//!
//! φ(α) = f(R_x(α η))
//!
//! where R_x is the manifold's retraction.
//!
//! # Conditions
//!
//! **Armijo (sufficient decrease)**:
//! f(R_x(α η)) ≤ f(x) + c₁ α ⟨grad f(x), η⟩_x
//!
//! **Strong Wolfe** adds the curvature condition
//! |φ′(α)| ≤ c₂ |⟨grad f(x), η⟩_x|
//!
//! with φ′(α) = ⟨grad f(y), DR_x(α η)[η]⟩_y, where the differentiated
//! retraction is supplied by the manifold.
//!
//! Both searches return the Riemannian gradient at the accepted point so the
//! caller does not evaluate it again.

use crate::{
    core::{
        cache::GeometryCache,
        cost_function::{CostFunction, ProblemUsage},
        manifold::Manifold,
    },
    error::{ManifoldError, OptimizerError, OptimizerResult, Result},
    types::{Point, Scalar, TangentVector},
};
use num_traits::Float;
use std::fmt::Debug;

/// Result of a successful line search.
#[derive(Debug, Clone)]
pub struct LineSearchResult<T: Scalar> {
    /// The accepted step size α
    pub step_size: T,

    /// The new point y = R_x(α η)
    pub new_point: Point<T>,

    /// The objective value f(y)
    pub new_value: T,

    /// The Riemannian gradient grad f(y)
    pub new_gradient: TangentVector<T>,

    /// Number of objective evaluations performed
    pub function_evals: usize,

    /// Number of gradient evaluations performed
    pub gradient_evals: usize,
}

/// Parameters shared by the line search algorithms.
///
/// # Parameter Guidelines
///
/// ```rust
/// # use rcgopt_core::prelude::*;
/// let armijo = LineSearchParams::<f64>::backtracking();
/// let wolfe = LineSearchParams::<f64>::strong_wolfe();
/// assert!(armijo.validate().is_ok() && wolfe.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// Initial step size α₀
    pub initial_step_size: T,

    /// Maximum allowable step size
    pub max_step_size: T,

    /// Minimum step size before declaring failure
    pub min_step_size: T,

    /// Maximum number of line search iterations
    pub max_iterations: usize,

    /// Armijo parameter c₁ ∈ (0,1)
    pub c1: T,

    /// Wolfe parameter c₂ ∈ (c₁,1)
    pub c2: T,

    /// Backtracking reduction factor ρ ∈ (0,1)
    pub rho: T,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            initial_step_size: T::one(),
            max_step_size: <T as Scalar>::from_f64(10.0),
            min_step_size: <T as Scalar>::from_f64(1e-10),
            max_iterations: 50,
            c1: <T as Scalar>::from_f64(1e-4),
            c2: <T as Scalar>::from_f64(0.9),
            rho: <T as Scalar>::from_f64(0.5),
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns `ManifoldError::InvalidParameter` if the step sizes are not
    /// positive and ordered, if 0 < c₁ < c₂ < 1 does not hold, if ρ ∉ (0, 1)
    /// or if `max_iterations` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.initial_step_size <= T::zero() {
            return Err(ManifoldError::invalid_parameter(
                "Initial step size must be positive",
            ));
        }

        if self.min_step_size <= T::zero() {
            return Err(ManifoldError::invalid_parameter(
                "Minimum step size must be positive",
            ));
        }

        if self.max_step_size <= self.min_step_size {
            return Err(ManifoldError::invalid_parameter(
                "Maximum step size must be greater than minimum step size",
            ));
        }

        if self.c1 <= T::zero() || self.c1 >= T::one() {
            return Err(ManifoldError::invalid_parameter(
                "Armijo constant c1 must be in (0, 1)",
            ));
        }

        if self.c2 <= self.c1 || self.c2 >= T::one() {
            return Err(ManifoldError::invalid_parameter(
                "Wolfe constant c2 must satisfy c1 < c2 < 1",
            ));
        }

        if self.rho <= T::zero() || self.rho >= T::one() {
            return Err(ManifoldError::invalid_parameter(
                "Backtracking factor rho must be in (0, 1)",
            ));
        }

        if self.max_iterations == 0 {
            return Err(ManifoldError::invalid_parameter(
                "Maximum iterations must be at least 1",
            ));
        }

        Ok(())
    }

    /// Parameters for the strong Wolfe search.
    ///
    /// c₂ = 0.1 keeps the curvature condition tight enough for nonlinear CG.
    pub fn strong_wolfe() -> Self {
        Self {
            c2: <T as Scalar>::from_f64(0.1),
            ..Self::default()
        }
    }

    /// Parameters for plain Armijo backtracking.
    pub fn backtracking() -> Self {
        Self {
            c1: <T as Scalar>::from_f64(0.5),
            c2: <T as Scalar>::from_f64(0.9),
            rho: <T as Scalar>::from_f64(0.5),
            max_iterations: 20,
            ..Self::default()
        }
    }

    /// Sets the initial step size.
    pub fn with_initial_step_size(mut self, step: T) -> Self {
        self.initial_step_size = step;
        self
    }
}

/// Objective and manifold a line search runs on.
#[derive(Debug)]
pub struct LineSearchContext<'a, T, C, M>
where
    T: Scalar,
    C: CostFunction<T> + ?Sized,
    M: Manifold<T> + ?Sized,
{
    /// The objective function
    pub cost_fn: &'a C,
    /// The manifold constraining the search
    pub manifold: &'a M,
    /// Derivatives the calling solver consumes
    pub usage: ProblemUsage,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T, C, M> LineSearchContext<'a, T, C, M>
where
    T: Scalar,
    C: CostFunction<T> + ?Sized,
    M: Manifold<T> + ?Sized,
{
    /// Binds a cost function to a manifold.
    pub fn new(cost_fn: &'a C, manifold: &'a M, usage: ProblemUsage) -> Self {
        Self {
            cost_fn,
            manifold,
            usage,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Evaluates value and Riemannian gradient at `point`.
    pub fn value_and_gradient(
        &self,
        point: &Point<T>,
        cache: &mut GeometryCache<T>,
    ) -> OptimizerResult<(T, TangentVector<T>)> {
        let (value, egrad) = self.cost_fn.cost_and_gradient(point)?;
        let rgrad = self
            .manifold
            .euclidean_to_riemannian_gradient(point, &egrad, self.usage, cache)?;
        Ok((value, rgrad))
    }
}

/// Interface for line search algorithms on Riemannian manifolds.
pub trait LineSearch<T: Scalar>: Debug {
    /// Searches along `direction` from `point`.
    ///
    /// `gradient` is the Riemannian gradient at `point` and `value` the
    /// objective there.
    ///
    /// # Errors
    ///
    /// `OptimizerError::InvalidSearchDirection` if `direction` is not a
    /// descent direction, `OptimizerError::LineSearchFailed` if no acceptable
    /// step is found within the budget.
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
        M: Manifold<T> + ?Sized;

    /// Returns the name of this line search method.
    fn name(&self) -> &str;
}

fn descent_slope<T, C, M>(
    ctx: &LineSearchContext<'_, T, C, M>,
    point: &Point<T>,
    gradient: &TangentVector<T>,
    direction: &TangentVector<T>,
) -> OptimizerResult<T>
where
    T: Scalar,
    C: CostFunction<T> + ?Sized,
    M: Manifold<T> + ?Sized,
{
    let slope = ctx.manifold.inner_product(point, gradient, direction)?;
    if slope >= T::zero() {
        return Err(OptimizerError::InvalidSearchDirection);
    }
    Ok(slope)
}

/// Armijo backtracking line search.
///
/// Starts at `initial_step_size` and multiplies the step by ρ until the
/// sufficient decrease condition holds.
#[derive(Debug, Clone)]
pub struct BacktrackingLineSearch<T: Scalar> {
    params: LineSearchParams<T>,
}

impl<T: Scalar> BacktrackingLineSearch<T> {
    /// Creates a backtracking search with `LineSearchParams::backtracking()`.
    pub fn new() -> Self {
        Self {
            params: LineSearchParams::backtracking(),
        }
    }

    /// Creates a backtracking search with custom parameters.
    pub fn with_params(params: LineSearchParams<T>) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters in use.
    pub fn params(&self) -> &LineSearchParams<T> {
        &self.params
    }
}

impl<T: Scalar> Default for BacktrackingLineSearch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingLineSearch<T> {
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
        let slope = descent_slope(ctx, point, gradient, direction)?;
        let params = &self.params;
        let mut alpha = <T as Float>::min(params.initial_step_size, params.max_step_size);
        let mut function_evals = 0;

        for _ in 0..params.max_iterations {
            let trial = ctx.manifold.retract(point, &(direction * alpha))?;
            let trial_value = ctx.cost_fn.cost(&trial)?;
            function_evals += 1;

            if trial_value <= value + params.c1 * alpha * slope {
                let (new_value, new_gradient) = ctx.value_and_gradient(&trial, cache)?;
                return Ok(LineSearchResult {
                    step_size: alpha,
                    new_point: trial,
                    new_value,
                    new_gradient,
                    function_evals: function_evals + 1,
                    gradient_evals: 1,
                });
            }

            alpha *= params.rho;
            if alpha < params.min_step_size {
                break;
            }
        }

        Err(OptimizerError::line_search_failed(
            "Armijo condition not satisfied",
            function_evals,
            Scalar::to_f64(alpha),
            Scalar::to_f64(value),
        ))
    }

    fn name(&self) -> &str {
        "Backtracking"
    }
}

/// One evaluated step of the strong Wolfe search.
struct Trial<T: Scalar> {
    alpha: T,
    point: Point<T>,
    value: T,
    gradient: TangentVector<T>,
}

/// Strong Wolfe line search with bracketing and bisection zoom.
///
/// The bracketing phase doubles the step until the minimum of φ is
/// enclosed; the zoom phase bisects the bracket until both Wolfe conditions
/// hold.
#[derive(Debug, Clone)]
pub struct StrongWolfeLineSearch<T: Scalar> {
    params: LineSearchParams<T>,
    function_evals: usize,
}

impl<T: Scalar> StrongWolfeLineSearch<T> {
    /// Creates a strong Wolfe search with `LineSearchParams::strong_wolfe()`.
    pub fn new() -> Self {
        Self {
            params: LineSearchParams::strong_wolfe(),
            function_evals: 0,
        }
    }

    /// Creates a strong Wolfe search with custom parameters.
    pub fn with_params(params: LineSearchParams<T>) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            function_evals: 0,
        })
    }

    /// Parameters in use.
    pub fn params(&self) -> &LineSearchParams<T> {
        &self.params
    }

    fn evaluate<C, M>(
        &mut self,
        ctx: &LineSearchContext<'_, T, C, M>,
        point: &Point<T>,
        direction: &TangentVector<T>,
        alpha: T,
        cache: &mut GeometryCache<T>,
    ) -> OptimizerResult<Trial<T>>
    where
        C: CostFunction<T> + ?Sized,
        M: Manifold<T> + ?Sized,
    {
        let new_point = ctx.manifold.retract(point, &(direction * alpha))?;
        let (value, gradient) = ctx.value_and_gradient(&new_point, cache)?;
        self.function_evals += 1;
        Ok(Trial {
            alpha,
            point: new_point,
            value,
            gradient,
        })
    }

    /// φ′(α) through the differentiated retraction.
    fn derivative<C, M>(
        ctx: &LineSearchContext<'_, T, C, M>,
        point: &Point<T>,
        direction: &TangentVector<T>,
        trial: &Trial<T>,
        cache: &mut GeometryCache<T>,
    ) -> OptimizerResult<T>
    where
        C: CostFunction<T> + ?Sized,
        M: Manifold<T> + ?Sized,
    {
        let step = direction * trial.alpha;
        let moved = ctx
            .manifold
            .diff_retraction(point, &step, &trial.point, direction, true, cache)?;
        Ok(ctx.manifold.inner_product(&trial.point, &trial.gradient, &moved)?)
    }

    fn accept(&self, trial: Trial<T>) -> LineSearchResult<T> {
        LineSearchResult {
            step_size: trial.alpha,
            new_point: trial.point,
            new_value: trial.value,
            new_gradient: trial.gradient,
            function_evals: self.function_evals,
            gradient_evals: self.function_evals,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn zoom<C, M>(
        &mut self,
        ctx: &LineSearchContext<'_, T, C, M>,
        point: &Point<T>,
        value: T,
        slope: T,
        direction: &TangentVector<T>,
        mut lo: (T, T),
        mut hi: T,
        cache: &mut GeometryCache<T>,
    ) -> OptimizerResult<LineSearchResult<T>>
    where
        C: CostFunction<T> + ?Sized,
        M: Manifold<T> + ?Sized,
    {
        let two = <T as Scalar>::from_f64(2.0);

        for _ in 0..self.params.max_iterations {
            if <T as Float>::abs(hi - lo.0) < self.params.min_step_size {
                break;
            }

            let alpha = (lo.0 + hi) / two;
            let trial = self.evaluate(ctx, point, direction, alpha, cache)?;

            if trial.value > value + self.params.c1 * alpha * slope || trial.value >= lo.1 {
                hi = alpha;
                continue;
            }

            let dphi = Self::derivative(ctx, point, direction, &trial, cache)?;
            if <T as Float>::abs(dphi) <= -self.params.c2 * slope {
                return Ok(self.accept(trial));
            }
            if dphi * (hi - lo.0) >= T::zero() {
                hi = lo.0;
            }
            lo = (alpha, trial.value);
        }

        Err(OptimizerError::line_search_failed(
            "strong Wolfe zoom did not converge",
            self.function_evals,
            Scalar::to_f64(lo.0),
            Scalar::to_f64(value),
        ))
    }
}

impl<T: Scalar> Default for StrongWolfeLineSearch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> LineSearch<T> for StrongWolfeLineSearch<T> {
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
        let slope = descent_slope(ctx, point, gradient, direction)?;
        self.function_evals = 0;

        let two = <T as Scalar>::from_f64(2.0);
        let mut prev = (T::zero(), value);
        let mut alpha = <T as Float>::min(self.params.initial_step_size, self.params.max_step_size);

        for i in 0..self.params.max_iterations {
            let trial = self.evaluate(ctx, point, direction, alpha, cache)?;

            if trial.value > value + self.params.c1 * alpha * slope
                || (i > 0 && trial.value >= prev.1)
            {
                return self.zoom(ctx, point, value, slope, direction, prev, alpha, cache);
            }

            let dphi = Self::derivative(ctx, point, direction, &trial, cache)?;
            if <T as Float>::abs(dphi) <= -self.params.c2 * slope {
                return Ok(self.accept(trial));
            }
            if dphi >= T::zero() {
                return self.zoom(
                    ctx,
                    point,
                    value,
                    slope,
                    direction,
                    (alpha, trial.value),
                    prev.0,
                    cache,
                );
            }

            if alpha >= self.params.max_step_size {
                tracing::debug!(
                    step = Scalar::to_f64(alpha),
                    "strong Wolfe reached the maximum step"
                );
                return Ok(self.accept(trial));
            }

            prev = (alpha, trial.value);
            alpha = <T as Float>::min(alpha * two, self.params.max_step_size);
        }

        Err(OptimizerError::line_search_failed(
            "strong Wolfe bracketing did not converge",
            self.function_evals,
            Scalar::to_f64(alpha),
            Scalar::to_f64(value),
        ))
    }

    fn name(&self) -> &str {
        "StrongWolfe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost_function::QuadraticCost;
    use crate::test_manifolds::TestEuclideanManifold;
    use crate::types::DVector;
    use approx::assert_relative_eq;

    fn setup(point: Vec<f64>) -> (TestEuclideanManifold, QuadraticCost<f64>, DVector<f64>) {
        let n = point.len();
        (
            TestEuclideanManifold::new(n),
            QuadraticCost::simple(n),
            DVector::from_vec(point),
        )
    }

    #[test]
    fn test_backtracking_line_search() {
        let (manifold, cost, point) = setup(vec![1.0, 1.0]);
        let ctx = LineSearchContext::new(&cost, &manifold, ProblemUsage::gradient_only());
        let mut cache = GeometryCache::new();
        let (value, gradient) = cost.cost_and_gradient(&point).unwrap();
        let direction = -&gradient;

        let mut ls = BacktrackingLineSearch::new();
        let result = ls
            .search(&ctx, &point, value, &gradient, &direction, &mut cache)
            .unwrap();

        assert!(result.step_size > 0.0);
        assert!(result.new_value < value);
        assert_relative_eq!(result.new_gradient, result.new_point);
    }

    #[test]
    fn test_backtracking_descent_check() {
        let (manifold, cost, point) = setup(vec![1.0, 1.0]);
        let ctx = LineSearchContext::new(&cost, &manifold, ProblemUsage::gradient_only());
        let mut cache = GeometryCache::new();
        let (value, gradient) = cost.cost_and_gradient(&point).unwrap();

        let mut ls = BacktrackingLineSearch::new();
        let result = ls.search(&ctx, &point, value, &gradient, &gradient, &mut cache);

        assert!(matches!(result, Err(OptimizerError::InvalidSearchDirection)));
    }

    #[test]
    fn test_backtracking_shrinks_long_steps() {
        let (manifold, cost, point) = setup(vec![1.0, -2.0]);
        let ctx = LineSearchContext::new(&cost, &manifold, ProblemUsage::gradient_only());
        let mut cache = GeometryCache::new();
        let (value, gradient) = cost.cost_and_gradient(&point).unwrap();
        let direction = &gradient * -4.0;

        let mut ls = BacktrackingLineSearch::new();
        let result = ls
            .search(&ctx, &point, value, &gradient, &direction, &mut cache)
            .unwrap();

        assert_relative_eq!(result.step_size, 0.25);
        assert!(result.function_evals >= 3);
    }

    #[test]
    fn test_strong_wolfe_line_search() {
        let (manifold, cost, point) = setup(vec![2.0, 3.0]);
        let ctx = LineSearchContext::new(&cost, &manifold, ProblemUsage::gradient_only());
        let mut cache = GeometryCache::new();
        let (value, gradient) = cost.cost_and_gradient(&point).unwrap();
        let direction = -&gradient;

        let mut ls = StrongWolfeLineSearch::new();
        let result = ls
            .search(&ctx, &point, value, &gradient, &direction, &mut cache)
            .unwrap();

        assert!(result.new_value < value);
        assert_relative_eq!(result.step_size, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_strong_wolfe_zooms_into_bracket() {
        let (manifold, cost, point) = setup(vec![2.0, 3.0]);
        let ctx = LineSearchContext::new(&cost, &manifold, ProblemUsage::gradient_only());
        let mut cache = GeometryCache::new();
        let (value, gradient) = cost.cost_and_gradient(&point).unwrap();
        let direction = &gradient * -0.3;

        let mut ls = StrongWolfeLineSearch::new();
        let result = ls
            .search(&ctx, &point, value, &gradient, &direction, &mut cache)
            .unwrap();

        let slope = gradient.dot(&direction);
        let dphi = result.new_gradient.dot(&direction);
        assert!(result.new_value <= value + 1e-4 * result.step_size * slope);
        assert!(dphi.abs() <= 0.1 * slope.abs());
    }

    #[test]
    fn test_line_search_params() {
        let params = LineSearchParams::<f64>::strong_wolfe();
        assert_eq!(params.c1, 1e-4);
        assert_eq!(params.c2, 0.1);
        assert!(params.validate().is_ok());

        let params = LineSearchParams::<f64>::backtracking();
        assert_eq!(params.c1, 0.5);
        assert_eq!(params.rho, 0.5);
        assert_eq!(params.max_iterations, 20);

        let bad = LineSearchParams::<f64> {
            c2: 1e-5,
            ..LineSearchParams::default()
        };
        assert!(bad.validate().is_err());
        assert!(BacktrackingLineSearch::with_params(bad).is_err());
    }
}
