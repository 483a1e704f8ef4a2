//! Common test manifolds for use in unit tests.
//!
//! Flat geometry makes every operation trivial, which lets solver tests check
//! coefficient formulas in closed form.

#![cfg(any(test, feature = "test-utils"))]

use crate::{
    core::cache::GeometryCache,
    error::{ManifoldError, Result},
    manifold::Manifold,
    types::{DVector, LinearOperator, Point, Scalar, TangentVector},
};
use rand_distr::{Distribution, StandardNormal};
use std::ops::Range;

/// A simple Euclidean manifold for testing.
///
/// Projections are the identity, the retraction is `x + η` and the vector
/// transport leaves vectors unchanged.
#[derive(Debug, Clone)]
pub struct TestEuclideanManifold {
    dim: usize,
}

impl TestEuclideanManifold {
    /// Creates the flat space of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn check_len<T: Scalar>(&self, v: &DVector<T>) -> Result<()> {
        if v.len() != self.dim {
            return Err(ManifoldError::dimension_mismatch(self.dim, v.len()));
        }
        Ok(())
    }
}

impl<T: Scalar> Manifold<T> for TestEuclideanManifold {
    fn name(&self) -> &str {
        "TestEuclidean"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn ambient_dimension(&self) -> usize {
        self.dim
    }

    fn is_point_on_manifold(&self, point: &Point<T>, _tol: T) -> bool {
        point.len() == self.dim
    }

    fn is_vector_in_tangent_space(
        &self,
        _point: &Point<T>,
        vector: &TangentVector<T>,
        _tol: T,
    ) -> bool {
        vector.len() == self.dim
    }

    fn project_point(&self, point: &DVector<T>) -> Result<Point<T>> {
        self.check_len(point)?;
        Ok(point.clone())
    }

    fn inner_product(
        &self,
        _point: &Point<T>,
        u: &TangentVector<T>,
        v: &TangentVector<T>,
    ) -> Result<T> {
        self.check_len(u)?;
        self.check_len(v)?;
        Ok(u.dot(v))
    }

    fn project_tangent(&self, _point: &Point<T>, vector: &DVector<T>) -> Result<TangentVector<T>> {
        self.check_len(vector)?;
        Ok(vector.clone())
    }

    fn retract(&self, point: &Point<T>, tangent: &TangentVector<T>) -> Result<Point<T>> {
        self.check_len(tangent)?;
        Ok(point + tangent)
    }

    fn vector_transport(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        xi: &TangentVector<T>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        Ok(xi.clone())
    }

    fn inverse_vector_transport(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        xi: &TangentVector<T>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        Ok(xi.clone())
    }

    fn h_inv_tran(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        h: &LinearOperator<T>,
        _range: Range<usize>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<LinearOperator<T>> {
        Ok(h.clone())
    }

    fn tran_h(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        h: &LinearOperator<T>,
        _range: Range<usize>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<LinearOperator<T>> {
        Ok(h.clone())
    }

    fn obtain_eta_flat(&self, _x: &Point<T>, eta: &TangentVector<T>) -> Result<DVector<T>> {
        Ok(eta.clone())
    }

    fn random_point(&self) -> Point<T> {
        let mut rng = rand::thread_rng();
        DVector::from_fn(self.dim, |_, _| {
            let val: f64 = StandardNormal.sample(&mut rng);
            <T as Scalar>::from_f64(val)
        })
    }

    fn random_tangent(&self, point: &Point<T>) -> Result<TangentVector<T>> {
        self.check_len(point)?;
        Ok(self.random_point())
    }
}
