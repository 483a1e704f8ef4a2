//! Core manifold trait and associated types.
//!
//! This module defines the `Manifold` trait that every Riemannian manifold
//! implements, together with the kinds of metric, retraction and vector
//! transport a manifold can be configured with.
//!
//! # Mathematical Background
//!
//! A Riemannian manifold (M, g) consists of a smooth manifold M and a metric
//! g that assigns an inner product to each tangent space T_x M. Optimization
//! algorithms only interact with M through:
//!
//! - **Metric**: ⟨u, v⟩_x on T_x M
//! - **Projection**: P_x mapping ambient vectors onto T_x M
//! - **Retraction**: R_x: T_x M → M
//! - **Vector transport**: T_{η_x}: T_x M → T_{R_x(η_x)} M
//! - **Operator transport**: moving a linear operator on T_x M to T_y M
//!
//! Quantities that one operation produces and another consumes (transport
//! directions, the Euclidean gradient, retraction scale factors) live in a
//! caller-owned [`GeometryCache`].

use crate::{
    core::{cache::GeometryCache, cost_function::ProblemUsage},
    error::{ManifoldError, Result},
    types::{DVector, LinearOperator, Point, Scalar, TangentVector},
};
use num_traits::Float;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::ops::Range;

/// Riemannian metric a manifold is equipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetricKind {
    /// Plain Euclidean inner product of the ambient coordinates
    Euclidean,
    /// L2 inner product of sampled functions, integrated with the trapezoid rule
    Trapezoid,
}

/// Retraction used to move along tangent vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetractionKind {
    /// Exponential map (great-circle motion on spheres)
    Exponential,
    /// Step in the ambient space followed by normalization
    Normalized,
}

/// Vector transport used to move tangent vectors between tangent spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportKind {
    /// Parallel translation along the retraction curve
    Parallel,
    /// Orthogonal projection onto the target tangent space
    Projection,
    /// Isometric transport by a Householder reflection
    IsometricHouseholder,
}

impl Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Euclidean => write!(f, "EUCLIDEAN"),
            Self::Trapezoid => write!(f, "TRAPEZOID"),
        }
    }
}

impl Display for RetractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exponential => write!(f, "EXP"),
            Self::Normalized => write!(f, "NORMALIZED"),
        }
    }
}

impl Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parallel => write!(f, "PARALLEL"),
            Self::Projection => write!(f, "PROJECTION"),
            Self::IsometricHouseholder => write!(f, "ISOBYHHR"),
        }
    }
}

/// Trait for Riemannian manifolds.
///
/// Points and tangent vectors are stored in their extrinsic (ambient)
/// representation as `DVector<T>`. Operations that produce a new point or
/// vector return it; operations that read or write shared geometric data
/// take the caller's [`GeometryCache`].
///
/// Capabilities a manifold does not offer are reported as
/// `ManifoldError::NotImplemented` so that callers can choose a fallback.
///
/// # Mathematical Properties
///
/// Implementations are expected to satisfy:
///
/// 1. **Tangent orthogonality**: ⟨P_x(v), x⟩_x = 0 for embedded manifolds
/// 2. **Retraction constraints**: R_x(0) = x and R_x(η) ∈ M
/// 3. **Metric properties**: ⟨·,·⟩_x is symmetric, bilinear, and positive definite
/// 4. **Isometric transport**: ‖T(ξ)‖_y = ‖ξ‖_x when the transport is isometric
pub trait Manifold<T: Scalar>: Debug + Send + Sync {
    /// Returns a human-readable name for the manifold.
    fn name(&self) -> &str;

    /// Returns the intrinsic dimension of the manifold.
    fn dimension(&self) -> usize;

    /// Returns the length of the extrinsic representation.
    fn ambient_dimension(&self) -> usize;

    /// Checks if a point lies on the manifold within a given tolerance.
    fn is_point_on_manifold(&self, point: &Point<T>, tol: T) -> bool;

    /// Checks if a vector is in the tangent space at a given point.
    fn is_vector_in_tangent_space(
        &self,
        point: &Point<T>,
        vector: &TangentVector<T>,
        tol: T,
    ) -> bool;

    /// Maps an ambient vector to the closest point on the manifold.
    fn project_point(&self, point: &DVector<T>) -> Result<Point<T>>;

    /// Riemannian metric ⟨u, v⟩_x.
    fn inner_product(
        &self,
        point: &Point<T>,
        u: &TangentVector<T>,
        v: &TangentVector<T>,
    ) -> Result<T>;

    /// Norm induced by the metric.
    fn norm(&self, point: &Point<T>, vector: &TangentVector<T>) -> Result<T> {
        self.inner_product(point, vector, vector)
            .map(|value| <T as Float>::sqrt(value))
    }

    /// Projects an ambient vector onto the tangent space at `point`.
    fn project_tangent(&self, point: &Point<T>, vector: &DVector<T>) -> Result<TangentVector<T>>;

    /// Retraction R_x(η).
    fn retract(&self, point: &Point<T>, tangent: &TangentVector<T>) -> Result<Point<T>>;

    /// Transports `xi` from T_x M to T_y M, where y = R_x(η).
    fn vector_transport(
        &self,
        x: &Point<T>,
        eta: &TangentVector<T>,
        y: &Point<T>,
        xi: &TangentVector<T>,
        cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>>;

    /// Transports `xi` from T_y M back to T_x M.
    fn inverse_vector_transport(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        _xi: &TangentVector<T>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        Err(ManifoldError::not_implemented(format!(
            "inverse vector transport on {}",
            self.name()
        )))
    }

    /// Differentiated retraction applied to `xi`.
    ///
    /// `same_dir` states that `xi` is parallel to `eta`. The default handles
    /// that case with the vector transport and reports the general case as
    /// unsupported.
    fn diff_retraction(
        &self,
        x: &Point<T>,
        eta: &TangentVector<T>,
        y: &Point<T>,
        xi: &TangentVector<T>,
        same_dir: bool,
        cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        if same_dir {
            return self.vector_transport(x, eta, y, xi, cache);
        }
        tracing::warn!(manifold = self.name(), "differentiated retraction is not implemented");
        Err(ManifoldError::not_implemented(format!(
            "differentiated retraction on {}",
            self.name()
        )))
    }

    /// Composes a linear operator with the inverse transport on the
    /// column block `range`: H ↦ H ∘ T⁻¹.
    fn h_inv_tran(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        _h: &LinearOperator<T>,
        _range: Range<usize>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<LinearOperator<T>> {
        Err(ManifoldError::not_implemented(format!(
            "operator inverse transport on {}",
            self.name()
        )))
    }

    /// Composes the transport with a linear operator on the row block
    /// `range`: H ↦ T ∘ H.
    fn tran_h(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        _h: &LinearOperator<T>,
        _range: Range<usize>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<LinearOperator<T>> {
        Err(ManifoldError::not_implemented(format!(
            "operator transport on {}",
            self.name()
        )))
    }

    /// Full conjugation H ↦ T ∘ H ∘ T⁻¹.
    fn tran_h_inv_tran(
        &self,
        x: &Point<T>,
        eta: &TangentVector<T>,
        y: &Point<T>,
        h: &LinearOperator<T>,
        cache: &mut GeometryCache<T>,
    ) -> Result<LinearOperator<T>> {
        let n = self.ambient_dimension();
        let right = self.h_inv_tran(x, eta, y, h, 0..n, cache)?;
        self.tran_h(x, eta, y, &right, 0..n, cache)
    }

    /// Flat (musical) version of `eta` with respect to the metric at `x`.
    fn obtain_eta_flat(&self, _x: &Point<T>, _eta: &TangentVector<T>) -> Result<DVector<T>> {
        Err(ManifoldError::not_implemented(format!(
            "flat of a tangent vector on {}",
            self.name()
        )))
    }

    /// Projection in the intrinsic representation.
    fn intr_projection(&self, _x: &Point<T>, vector: &DVector<T>) -> Result<DVector<T>> {
        Ok(vector.clone())
    }

    /// Projection in the extrinsic representation.
    fn extr_projection(&self, x: &Point<T>, vector: &DVector<T>) -> Result<TangentVector<T>> {
        self.project_tangent(x, vector)
    }

    /// Converts a Euclidean gradient into the Riemannian gradient.
    ///
    /// When the solver uses Hessian information the Euclidean gradient is
    /// stored in `cache` for a later [`Manifold::euclidean_to_riemannian_hvp`].
    fn euclidean_to_riemannian_gradient(
        &self,
        x: &Point<T>,
        euclidean_grad: &TangentVector<T>,
        usage: ProblemUsage,
        cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        if usage.use_hessian {
            cache.store_euclidean_gradient(x, euclidean_grad);
        }
        self.project_tangent(x, euclidean_grad)
    }

    /// Converts a Euclidean Hessian-vector product into the Riemannian one.
    fn euclidean_to_riemannian_hvp(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _euclidean_hvp: &TangentVector<T>,
        _cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        Err(ManifoldError::not_implemented(format!(
            "Hessian-vector conversion on {}",
            self.name()
        )))
    }

    /// Cotangent vector of `xi` along the retraction.
    fn co_tangent_vector(
        &self,
        _x: &Point<T>,
        _eta: &TangentVector<T>,
        _y: &Point<T>,
        _xi: &TangentVector<T>,
    ) -> Result<TangentVector<T>> {
        tracing::warn!(manifold = self.name(), "cotangent vector is not implemented");
        Err(ManifoldError::not_implemented(format!(
            "cotangent vector on {}",
            self.name()
        )))
    }

    /// Intrinsic coordinates of a tangent vector.
    fn obtain_intr(&self, _x: &Point<T>, _eta: &TangentVector<T>) -> Result<DVector<T>> {
        tracing::warn!(manifold = self.name(), "intrinsic representation is not implemented");
        Err(ManifoldError::not_implemented(format!(
            "intrinsic representation on {}",
            self.name()
        )))
    }

    /// Extrinsic vector from intrinsic coordinates.
    fn obtain_extr(&self, _x: &Point<T>, _intr: &DVector<T>) -> Result<TangentVector<T>> {
        tracing::warn!(manifold = self.name(), "extrinsic representation is not implemented");
        Err(ManifoldError::not_implemented(format!(
            "extrinsic representation on {}",
            self.name()
        )))
    }

    /// Generates a random point on the manifold.
    fn random_point(&self) -> Point<T>;

    /// Generates a random tangent vector at `point`.
    fn random_tangent(&self, point: &Point<T>) -> Result<TangentVector<T>>;

    /// Parameter dump of the manifold.
    fn summary(&self) -> HashMap<String, String> {
        let mut summary = HashMap::new();
        summary.insert("name".to_string(), self.name().to_string());
        summary.insert("dimension".to_string(), self.dimension().to_string());
        summary.insert(
            "ambient_dimension".to_string(),
            self.ambient_dimension().to_string(),
        );
        summary
    }

    /// Validates the configuration and logs the parameter dump.
    fn check_params(&self) -> Result<()> {
        tracing::info!(
            manifold = self.name(),
            dimension = self.dimension(),
            ambient_dimension = self.ambient_dimension(),
            "manifold parameters"
        );
        Ok(())
    }
}
