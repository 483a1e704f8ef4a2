//! Cost function interface for optimization algorithms.
//!
//! Objectives report their value and Euclidean gradient; the manifold turns
//! the Euclidean quantities into Riemannian ones. Solvers announce which
//! derivatives they consume through [`ProblemUsage`], which lets the manifold
//! decide whether the Euclidean gradient has to be kept for a later
//! Hessian-vector conversion.

use crate::{
    error::{ManifoldError, Result},
    types::{DMatrix, DVector, Point, Scalar, TangentVector},
};
use num_traits::Float;
use std::cell::RefCell;
use std::fmt::Debug;

/// Derivative information a solver needs from the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProblemUsage {
    /// The solver evaluates gradients.
    pub use_gradient: bool,
    /// The solver evaluates Hessian-vector products.
    pub use_hessian: bool,
}

impl ProblemUsage {
    /// Usage of a first-order method.
    pub fn gradient_only() -> Self {
        Self {
            use_gradient: true,
            use_hessian: false,
        }
    }

    /// Sets whether gradients are used.
    pub fn with_gradient(mut self, use_gradient: bool) -> Self {
        self.use_gradient = use_gradient;
        self
    }

    /// Sets whether Hessian-vector products are used.
    pub fn with_hessian(mut self, use_hessian: bool) -> Self {
        self.use_hessian = use_hessian;
        self
    }

    /// Drops Hessian usage that `cost_fn` cannot serve.
    pub fn supported_by<T, C>(self, cost_fn: &C) -> Self
    where
        T: Scalar,
        C: CostFunction<T> + ?Sized,
    {
        self.with_hessian(self.use_hessian && cost_fn.uses_hessian())
    }
}

/// Trait for cost functions on Riemannian manifolds.
///
/// This is the main trait that optimization algorithms use to evaluate
/// the objective function and its derivatives. Gradients and Hessian-vector
/// products are Euclidean (ambient) quantities.
pub trait CostFunction<T: Scalar>: Debug {
    /// Evaluates the cost function at a point.
    fn cost(&self, point: &Point<T>) -> Result<T>;

    /// Evaluates the cost and Euclidean gradient at a point.
    ///
    /// # Default Implementation
    ///
    /// Uses central finite differences if not overridden.
    fn cost_and_gradient(&self, point: &Point<T>) -> Result<(T, TangentVector<T>)> {
        let cost = self.cost(point)?;
        let gradient = self.gradient_fd(point)?;
        Ok((cost, gradient))
    }

    /// Computes only the Euclidean gradient at a point.
    fn gradient(&self, point: &Point<T>) -> Result<TangentVector<T>> {
        self.cost_and_gradient(point).map(|(_, grad)| grad)
    }

    /// Computes the Euclidean Hessian applied to `vector`.
    ///
    /// # Default Implementation
    ///
    /// Returns `NotImplemented`. Override for second-order methods.
    fn hessian_vector_product(
        &self,
        _point: &Point<T>,
        _vector: &TangentVector<T>,
    ) -> Result<TangentVector<T>> {
        Err(ManifoldError::not_implemented(
            "Hessian-vector product not implemented for this cost function",
        ))
    }

    /// Whether `hessian_vector_product` is available.
    fn uses_hessian(&self) -> bool {
        false
    }

    /// Computes the gradient using central finite differences.
    fn gradient_fd(&self, point: &Point<T>) -> Result<TangentVector<T>> {
        let n = point.len();
        let h = <T as Float>::sqrt(T::EPSILON);
        let two_h = h + h;
        let mut gradient = DVector::zeros(n);
        let mut shifted = point.clone();

        for i in 0..n {
            let original = shifted[i];

            shifted[i] = original + h;
            let f_plus = self.cost(&shifted)?;
            shifted[i] = original - h;
            let f_minus = self.cost(&shifted)?;
            shifted[i] = original;

            gradient[i] = (f_plus - f_minus) / two_h;
        }

        Ok(gradient)
    }
}

/// A simple quadratic cost function for testing.
///
/// Computes f(x) = 0.5 * x^T * A * x + b^T * x + c
#[derive(Debug, Clone)]
pub struct QuadraticCost<T: Scalar> {
    /// The quadratic form matrix (should be symmetric)
    pub a: DMatrix<T>,
    /// The linear term
    pub b: DVector<T>,
    /// The constant term
    pub c: T,
}

impl<T: Scalar> QuadraticCost<T> {
    /// Creates a new quadratic cost function.
    pub fn new(a: DMatrix<T>, b: DVector<T>, c: T) -> Result<Self> {
        if !a.is_square() || a.nrows() != b.len() {
            return Err(ManifoldError::dimension_mismatch(
                format!("{}x{} matrix", b.len(), b.len()),
                format!("{}x{} matrix", a.nrows(), a.ncols()),
            ));
        }
        Ok(Self { a, b, c })
    }

    /// Creates a simple quadratic with identity matrix: f(x) = 0.5 * ||x||^2
    pub fn simple(dim: usize) -> Self {
        Self {
            a: DMatrix::identity(dim, dim),
            b: DVector::zeros(dim),
            c: T::zero(),
        }
    }
}

impl<T: Scalar> CostFunction<T> for QuadraticCost<T> {
    fn cost(&self, point: &Point<T>) -> Result<T> {
        let ax = &self.a * point;
        let quad_term = point.dot(&ax) * <T as Scalar>::from_f64(0.5);
        Ok(quad_term + self.b.dot(point) + self.c)
    }

    fn cost_and_gradient(&self, point: &Point<T>) -> Result<(T, TangentVector<T>)> {
        let ax = &self.a * point;
        let cost = point.dot(&ax) * <T as Scalar>::from_f64(0.5) + self.b.dot(point) + self.c;
        Ok((cost, ax + &self.b))
    }

    fn hessian_vector_product(
        &self,
        _point: &Point<T>,
        vector: &TangentVector<T>,
    ) -> Result<TangentVector<T>> {
        Ok(&self.a * vector)
    }

    fn uses_hessian(&self) -> bool {
        true
    }
}

/// Wrapper to count function evaluations for testing and debugging.
#[derive(Debug)]
pub struct CountingCostFunction<F> {
    /// The underlying cost function
    pub inner: F,
    cost_count: RefCell<usize>,
    gradient_count: RefCell<usize>,
    hessian_count: RefCell<usize>,
}

impl<F> CountingCostFunction<F> {
    /// Creates a new counting wrapper around a cost function.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cost_count: RefCell::new(0),
            gradient_count: RefCell::new(0),
            hessian_count: RefCell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        *self.cost_count.borrow_mut() = 0;
        *self.gradient_count.borrow_mut() = 0;
        *self.hessian_count.borrow_mut() = 0;
    }

    /// Returns `(cost, gradient, hessian)` evaluation counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            *self.cost_count.borrow(),
            *self.gradient_count.borrow(),
            *self.hessian_count.borrow(),
        )
    }
}

impl<T, F> CostFunction<T> for CountingCostFunction<F>
where
    T: Scalar,
    F: CostFunction<T>,
{
    fn cost(&self, point: &Point<T>) -> Result<T> {
        *self.cost_count.borrow_mut() += 1;
        self.inner.cost(point)
    }

    fn cost_and_gradient(&self, point: &Point<T>) -> Result<(T, TangentVector<T>)> {
        *self.cost_count.borrow_mut() += 1;
        *self.gradient_count.borrow_mut() += 1;
        self.inner.cost_and_gradient(point)
    }

    fn gradient(&self, point: &Point<T>) -> Result<TangentVector<T>> {
        *self.gradient_count.borrow_mut() += 1;
        self.inner.gradient(point)
    }

    fn hessian_vector_product(
        &self,
        point: &Point<T>,
        vector: &TangentVector<T>,
    ) -> Result<TangentVector<T>> {
        *self.hessian_count.borrow_mut() += 1;
        self.inner.hessian_vector_product(point, vector)
    }

    fn uses_hessian(&self) -> bool {
        self.inner.uses_hessian()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_cost() {
        let cost = QuadraticCost::<f64>::simple(3);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        assert_relative_eq!(cost.cost(&x).unwrap(), 7.0);
        assert_relative_eq!(cost.gradient(&x).unwrap(), x);
    }

    #[test]
    fn test_quadratic_cost_rejects_bad_shapes() {
        let a = DMatrix::<f64>::identity(3, 3);
        let b = DVector::zeros(2);
        assert!(QuadraticCost::new(a, b, 0.0).is_err());
    }

    #[test]
    fn test_finite_difference_gradient() {
        #[derive(Debug)]
        struct SimpleCost;

        impl CostFunction<f64> for SimpleCost {
            fn cost(&self, point: &DVector<f64>) -> Result<f64> {
                Ok(point[0] * point[0] + 2.0 * point[1] * point[1])
            }
        }

        let x = DVector::from_vec(vec![1.0, -1.0]);
        let grad = SimpleCost.gradient(&x).unwrap();

        assert_relative_eq!(grad[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(grad[1], -4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_hessian_defaults_to_not_implemented() {
        #[derive(Debug)]
        struct ValueOnly;

        impl CostFunction<f64> for ValueOnly {
            fn cost(&self, _point: &DVector<f64>) -> Result<f64> {
                Ok(0.0)
            }
        }

        let x = DVector::zeros(2);
        let err = ValueOnly.hessian_vector_product(&x, &x).unwrap_err();
        assert!(err.is_not_implemented());
        assert!(!ValueOnly.uses_hessian());
    }

    #[test]
    fn test_counting_cost_function() {
        let counting = CountingCostFunction::new(QuadraticCost::<f64>::simple(2));
        let x = DVector::from_vec(vec![1.0, 1.0]);

        counting.cost(&x).unwrap();
        counting.cost_and_gradient(&x).unwrap();
        counting.hessian_vector_product(&x, &x).unwrap();
        assert_eq!(counting.counts(), (2, 1, 1));

        counting.reset_counts();
        assert_eq!(counting.counts(), (0, 0, 0));
    }

    #[test]
    fn test_problem_usage_builders() {
        let usage = ProblemUsage::gradient_only().with_hessian(true);
        assert!(usage.use_gradient);
        assert!(usage.use_hessian);
        assert_eq!(ProblemUsage::default(), ProblemUsage::default().with_gradient(false));
    }

    #[test]
    fn test_problem_usage_follows_objective() {
        #[derive(Debug)]
        struct ValueOnly;

        impl CostFunction<f64> for ValueOnly {
            fn cost(&self, _point: &DVector<f64>) -> Result<f64> {
                Ok(0.0)
            }
        }

        let wanted = ProblemUsage::gradient_only().with_hessian(true);
        assert!(!wanted.supported_by(&ValueOnly).use_hessian);
        assert!(wanted.supported_by(&QuadraticCost::<f64>::simple(2)).use_hessian);
        assert!(!ProblemUsage::gradient_only()
            .supported_by(&QuadraticCost::<f64>::simple(2))
            .use_hessian);
    }
}
