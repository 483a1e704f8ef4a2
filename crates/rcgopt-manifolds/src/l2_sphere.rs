//! Unit sphere of sampled functions under the trapezoidal L2 metric.
//!
//! A point is a function on [0, 1] sampled at n equispaced nodes, stored as
//! the vector of its samples. The metric approximates the L2 inner product
//! with the trapezoid rule,
//!
//! ⟨u, v⟩ = h (u₀v₀/2 + u₁v₁ + … + u_{n−2}v_{n−2} + u_{n−1}v_{n−1}/2),  h = 1/(n−1),
//!
//! and the manifold is the set of samples with unit metric norm. It has
//! intrinsic dimension n − 1.
//!
//! # Operations
//!
//! - **Retraction**: the exponential map, motion along a great circle
//! - **Vector transport**: isometric, built from the Householder direction
//!   d = (x + y) / ⟨x + y, x + y⟩
//! - **Operator transport**: rank-1 corrections of a dense operator by the
//!   same direction, applied to a column or row block
//!
//! The Householder direction of the last `(x, y)` pair is kept in the
//! caller's [`GeometryCache`].

use nalgebra::DVector;
use num_traits::Float;
use rand_distr::{Distribution, StandardNormal};
use rcgopt_core::{
    cache::GeometryCache,
    error::{ManifoldError, Result},
    linalg::{self, Transpose},
    manifold::{Manifold, MetricKind, RetractionKind, TransportKind},
    types::{LinearOperator, Point, Scalar, TangentVector},
};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Configuration of an [`L2Sphere`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct L2SphereConfig {
    /// Number of samples per function
    pub n: usize,
    /// Riemannian metric
    pub metric: MetricKind,
    /// Retraction
    pub retraction: RetractionKind,
    /// Vector transport
    pub transport: TransportKind,
    /// Keep the scaled transported vector for Householder-based quasi-Newton updates
    pub has_hhr: bool,
    /// Keep the transport scale factors without the scaled vector
    pub upd_beta_alone: bool,
    /// Locking condition requested by the solver
    pub has_lock_con: bool,
    /// Use the intrinsic representation of tangent vectors
    pub is_intrinsic: bool,
}

impl L2SphereConfig {
    /// Default configuration for `n` samples.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            metric: MetricKind::Trapezoid,
            retraction: RetractionKind::Exponential,
            transport: TransportKind::IsometricHouseholder,
            has_hhr: false,
            upd_beta_alone: false,
            has_lock_con: false,
            is_intrinsic: false,
        }
    }

    /// Sets the metric.
    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    /// Sets the retraction.
    pub fn with_retraction(mut self, retraction: RetractionKind) -> Self {
        self.retraction = retraction;
        self
    }

    /// Sets the vector transport.
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Enables the Householder-retraction bookkeeping.
    pub fn with_hhr(mut self, has_hhr: bool) -> Self {
        self.has_hhr = has_hhr;
        self
    }

    /// Enables storing the transport scale factors alone.
    pub fn with_upd_beta_alone(mut self, upd_beta_alone: bool) -> Self {
        self.upd_beta_alone = upd_beta_alone;
        self
    }

    /// Sets the locking condition flag.
    pub fn with_lock_con(mut self, has_lock_con: bool) -> Self {
        self.has_lock_con = has_lock_con;
        self
    }

    /// Selects the intrinsic representation.
    pub fn with_intrinsic(mut self, is_intrinsic: bool) -> Self {
        self.is_intrinsic = is_intrinsic;
        self
    }

    /// Checks that the combination is one `L2Sphere` implements.
    ///
    /// # Errors
    ///
    /// `ManifoldError::UnsupportedConfiguration` for fewer than two samples,
    /// any metric other than `Trapezoid`, any retraction other than
    /// `Exponential`, any transport other than `IsometricHouseholder`, or the
    /// intrinsic representation.
    pub fn validate(&self) -> Result<()> {
        if self.n < 2 {
            return Err(ManifoldError::unsupported_configuration(format!(
                "L2Sphere needs at least 2 samples, got {}",
                self.n
            )));
        }
        if self.metric != MetricKind::Trapezoid {
            return Err(ManifoldError::unsupported_configuration(format!(
                "metric {} is not available on L2Sphere",
                self.metric
            )));
        }
        if self.retraction != RetractionKind::Exponential {
            return Err(ManifoldError::unsupported_configuration(format!(
                "retraction {} is not available on L2Sphere",
                self.retraction
            )));
        }
        if self.transport != TransportKind::IsometricHouseholder {
            return Err(ManifoldError::unsupported_configuration(format!(
                "vector transport {} is not available on L2Sphere",
                self.transport
            )));
        }
        if self.is_intrinsic {
            return Err(ManifoldError::unsupported_configuration(
                "L2Sphere only supports the extrinsic representation",
            ));
        }
        Ok(())
    }
}

/// The unit sphere of sampled functions with the trapezoidal L2 metric.
#[derive(Debug, Clone)]
pub struct L2Sphere {
    config: L2SphereConfig,
}

impl L2Sphere {
    /// Creates the sphere of functions sampled at `n` nodes.
    ///
    /// # Errors
    /// Returns an error if `n` < 2
    pub fn new(n: usize) -> Result<Self> {
        Self::with_config(L2SphereConfig::new(n))
    }

    /// Creates the sphere from an explicit configuration.
    pub fn with_config(config: L2SphereConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &L2SphereConfig {
        &self.config
    }

    /// Number of samples.
    pub fn n(&self) -> usize {
        self.config.n
    }

    fn step<T: Scalar>(&self) -> T {
        T::one() / <T as Scalar>::from_usize(self.config.n - 1)
    }

    fn check_len<T: Scalar>(&self, v: &DVector<T>) -> Result<()> {
        if v.len() != self.config.n {
            return Err(ManifoldError::dimension_mismatch(self.config.n, v.len()));
        }
        Ok(())
    }

    fn check_operator<T: Scalar>(
        &self,
        h: &LinearOperator<T>,
        range: &Range<usize>,
        extent: usize,
    ) -> Result<()> {
        if range.start > range.end || range.end > extent {
            return Err(ManifoldError::invalid_parameter(format!(
                "block {}..{} outside an operator dimension of {}",
                range.start, range.end, extent
            )));
        }
        if range.len() != self.config.n {
            return Err(ManifoldError::dimension_mismatch(
                format!("block of length {}", self.config.n),
                format!(
                    "block of length {} in a {}x{} operator",
                    range.len(),
                    h.nrows(),
                    h.ncols()
                ),
            ));
        }
        Ok(())
    }

    /// Trapezoid-weighted copy of `v`: scaled by h with both ends halved.
    fn flat<T: Scalar>(&self, v: &DVector<T>) -> DVector<T> {
        let h = self.step::<T>();
        let mut flat = v * h;
        let half = <T as Scalar>::from_f64(0.5);
        let last = self.config.n - 1;
        flat[0] = flat[0] * half;
        flat[last] = flat[last] * half;
        flat
    }

    fn metric<T: Scalar>(&self, u: &DVector<T>, v: &DVector<T>) -> Result<T> {
        self.check_len(u)?;
        let dot = linalg::dot(u, v)?;
        let last = self.config.n - 1;
        let ends = (u[0] * v[0] + u[last] * v[last]) * <T as Scalar>::from_f64(0.5);
        Ok((dot - ends) * self.step::<T>())
    }

    fn householder_direction<T: Scalar>(&self, x: &Point<T>, y: &Point<T>) -> Result<DVector<T>> {
        let sum = x + y;
        let squared = self.metric(&sum, &sum)?;
        if squared <= T::EPSILON {
            return Err(ManifoldError::numerical_error(
                "transport between antipodal points is undefined",
            ));
        }
        Ok(sum / squared)
    }

    fn normalize<T: Scalar>(&self, v: &DVector<T>) -> Result<Point<T>> {
        let norm = <T as Float>::sqrt(self.metric(v, v)?);
        if norm > T::EPSILON {
            return Ok(v / norm);
        }
        Ok(self.first_sample())
    }

    /// Unit point concentrated on the first node.
    fn first_sample<T: Scalar>(&self) -> Point<T> {
        let mut e0 = DVector::zeros(self.config.n);
        e0[0] = <T as Float>::sqrt(<T as Scalar>::from_usize(2 * (self.config.n - 1)));
        e0
    }

    fn standard_normal<T: Scalar>(&self) -> DVector<T> {
        let mut rng = rand::thread_rng();
        DVector::from_fn(self.config.n, |_, _| {
            let val: f64 = StandardNormal.sample(&mut rng);
            <T as Scalar>::from_f64(val)
        })
    }
}

impl fmt::Display for L2Sphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(f, "L2Sphere PARAMETERS:")?;
        writeln!(f, "n             : {:>15}", c.n)?;
        writeln!(f, "metric        : {:>15}", c.metric.to_string())?;
        writeln!(f, "retraction    : {:>15}", c.retraction.to_string())?;
        write!(f, "VecTran       : {:>15}", c.transport.to_string())
    }
}

impl<T: Scalar> Manifold<T> for L2Sphere {
    fn name(&self) -> &str {
        "L2Sphere"
    }

    fn dimension(&self) -> usize {
        self.config.n - 1
    }

    fn ambient_dimension(&self) -> usize {
        self.config.n
    }

    fn is_point_on_manifold(&self, point: &Point<T>, tol: T) -> bool {
        self.metric(point, point)
            .is_ok_and(|squared| <T as Float>::abs(squared - T::one()) < tol)
    }

    fn is_vector_in_tangent_space(
        &self,
        point: &Point<T>,
        vector: &TangentVector<T>,
        tol: T,
    ) -> bool {
        self.metric(point, vector)
            .is_ok_and(|along| <T as Float>::abs(along) < tol)
    }

    fn project_point(&self, point: &DVector<T>) -> Result<Point<T>> {
        self.normalize(point)
    }

    fn inner_product(
        &self,
        _point: &Point<T>,
        u: &TangentVector<T>,
        v: &TangentVector<T>,
    ) -> Result<T> {
        self.metric(u, v)
    }

    fn project_tangent(&self, point: &Point<T>, vector: &DVector<T>) -> Result<TangentVector<T>> {
        self.check_len(point)?;
        self.check_len(vector)?;
        let along = self.metric(point, vector)?;
        Ok(vector - point * along)
    }

    fn retract(&self, point: &Point<T>, tangent: &TangentVector<T>) -> Result<Point<T>> {
        self.check_len(point)?;
        self.check_len(tangent)?;
        let r = <T as Float>::sqrt(self.metric(tangent, tangent)?);
        let cos_r = <T as Float>::cos(r);
        let moved = if r < T::EPSILON {
            point * cos_r
        } else {
            point * cos_r + tangent * (<T as Float>::sin(r) / r)
        };
        // Rounding in the metric compounds across iterations; keep the result on the sphere.
        self.normalize(&moved)
    }

    fn vector_transport(
        &self,
        x: &Point<T>,
        _eta: &TangentVector<T>,
        y: &Point<T>,
        xi: &TangentVector<T>,
        cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        self.check_len(x)?;
        self.check_len(y)?;
        self.check_len(xi)?;
        let d = cache.transport_direction(x, y, || self.householder_direction(x, y))?;
        let coef = self.metric(xi, y)? * <T as Scalar>::from_f64(2.0);
        Ok(xi - d * coef)
    }

    fn inverse_vector_transport(
        &self,
        x: &Point<T>,
        _eta: &TangentVector<T>,
        y: &Point<T>,
        xi: &TangentVector<T>,
        cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        self.check_len(x)?;
        self.check_len(y)?;
        self.check_len(xi)?;
        let d = cache.transport_direction(x, y, || self.householder_direction(x, y))?;
        let coef = self.metric(xi, x)? * <T as Scalar>::from_f64(2.0);
        Ok(xi - d * coef)
    }

    fn diff_retraction(
        &self,
        x: &Point<T>,
        eta: &TangentVector<T>,
        y: &Point<T>,
        xi: &TangentVector<T>,
        same_dir: bool,
        cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        if !same_dir {
            tracing::warn!(
                manifold = "L2Sphere",
                "differentiated retraction along a different direction is not implemented"
            );
            return Err(ManifoldError::not_implemented(
                "differentiated retraction on L2Sphere for xi not parallel to eta",
            ));
        }

        let result = self.vector_transport(x, eta, y, xi, cache)?;

        if self.config.has_hhr || self.config.upd_beta_alone {
            let eta_sq = self.metric(eta, eta)?;
            let xi_sq = self.metric(xi, xi)?;
            let result_sq = self.metric(&result, &result)?;
            let s = <T as Float>::sqrt(eta_sq / xi_sq);
            let beta = [
                <T as Float>::sqrt(eta_sq / result_sq) / s,
                eta_sq,
                result_sq * s * s,
            ];
            let transported = self.config.has_hhr.then(|| &result * (beta[0] * s));
            cache.store_beta(eta, beta, transported);
        }

        Ok(result)
    }

    fn h_inv_tran(
        &self,
        x: &Point<T>,
        _eta: &TangentVector<T>,
        y: &Point<T>,
        h: &LinearOperator<T>,
        range: Range<usize>,
        cache: &mut GeometryCache<T>,
    ) -> Result<LinearOperator<T>> {
        self.check_len(x)?;
        self.check_len(y)?;
        self.check_operator(h, &range, h.ncols())?;

        let d = cache.transport_direction(x, y, || self.householder_direction(x, y))?;
        let x_flat = self.flat(x);
        let mut hd = DVector::zeros(h.nrows());
        linalg::gemv(
            Transpose::No,
            T::one(),
            &h.columns(range.start, range.len()),
            &d,
            T::zero(),
            &mut hd,
        )?;

        let mut result = h.clone();
        linalg::ger(
            <T as Scalar>::from_f64(-2.0),
            &hd,
            &x_flat,
            &mut result.columns_mut(range.start, range.len()),
        )?;
        Ok(result)
    }

    fn tran_h(
        &self,
        x: &Point<T>,
        _eta: &TangentVector<T>,
        y: &Point<T>,
        h: &LinearOperator<T>,
        range: Range<usize>,
        cache: &mut GeometryCache<T>,
    ) -> Result<LinearOperator<T>> {
        self.check_len(x)?;
        self.check_len(y)?;
        self.check_operator(h, &range, h.nrows())?;

        let d = cache.transport_direction(x, y, || self.householder_direction(x, y))?;
        let y_flat = self.flat(y);
        let mut hty = DVector::zeros(h.ncols());
        linalg::gemv(
            Transpose::Yes,
            T::one(),
            &h.rows(range.start, range.len()),
            &y_flat,
            T::zero(),
            &mut hty,
        )?;

        let mut result = h.clone();
        linalg::ger(
            <T as Scalar>::from_f64(-2.0),
            &d,
            &hty,
            &mut result.rows_mut(range.start, range.len()),
        )?;
        Ok(result)
    }

    fn obtain_eta_flat(&self, _x: &Point<T>, eta: &TangentVector<T>) -> Result<DVector<T>> {
        self.check_len(eta)?;
        Ok(self.flat(eta))
    }

    fn euclidean_to_riemannian_hvp(
        &self,
        x: &Point<T>,
        eta: &TangentVector<T>,
        euclidean_hvp: &TangentVector<T>,
        cache: &mut GeometryCache<T>,
    ) -> Result<TangentVector<T>> {
        self.check_len(eta)?;
        self.check_len(euclidean_hvp)?;
        let egrad = cache.euclidean_gradient_at(x).ok_or_else(|| {
            ManifoldError::precondition_violated(
                "the Euclidean gradient at this point must be converted before its Hessian",
            )
        })?;

        let x_cubed = x.map(|v| v * v * v);
        let a1 = self.metric(&x_cubed, &x_cubed)?;
        let a2 = self.metric(egrad, &x_cubed)?;
        let x_sq_eta = x.component_mul(x).component_mul(eta);
        let scale = <T as Scalar>::from_f64(3.0) * a2 / a1;

        let corrected = euclidean_hvp - x_sq_eta * scale;
        self.project_tangent(x, &corrected)
    }

    fn random_point(&self) -> Point<T> {
        let v = self.standard_normal();
        self.normalize(&v).unwrap_or_else(|_| self.first_sample())
    }

    fn random_tangent(&self, point: &Point<T>) -> Result<TangentVector<T>> {
        let v = self.standard_normal();
        self.project_tangent(point, &v)
    }

    fn summary(&self) -> HashMap<String, String> {
        let c = &self.config;
        let mut summary = HashMap::new();
        summary.insert("name".to_string(), "L2Sphere".to_string());
        summary.insert("n".to_string(), c.n.to_string());
        summary.insert("dimension".to_string(), (c.n - 1).to_string());
        summary.insert("metric".to_string(), c.metric.to_string());
        summary.insert("retraction".to_string(), c.retraction.to_string());
        summary.insert("vector_transport".to_string(), c.transport.to_string());
        summary.insert("has_hhr".to_string(), c.has_hhr.to_string());
        summary.insert("upd_beta_alone".to_string(), c.upd_beta_alone.to_string());
        summary.insert("has_lock_con".to_string(), c.has_lock_con.to_string());
        summary.insert("intrinsic".to_string(), c.is_intrinsic.to_string());
        summary
    }

    fn check_params(&self) -> Result<()> {
        self.config.validate()?;
        let c = &self.config;
        tracing::info!(
            manifold = "L2Sphere",
            n = c.n,
            metric = %c.metric,
            retraction = %c.retraction,
            vector_transport = %c.transport,
            has_hhr = c.has_hhr,
            upd_beta_alone = c.upd_beta_alone,
            has_lock_con = c.has_lock_con,
            "manifold parameters"
        );
        Ok(())
    }
}
