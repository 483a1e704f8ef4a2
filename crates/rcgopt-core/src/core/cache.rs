//! Typed side cache for geometric quantities shared between manifold calls.
//!
//! Several manifold operations reuse data computed by an earlier call: the
//! Householder direction of a vector transport, the Euclidean gradient needed
//! to convert a Hessian-vector product, and the scale factors produced by the
//! differentiated retraction. `GeometryCache` holds one slot per quantity.
//!
//! Each slot remembers the values it was computed for. A lookup made with
//! different points misses and replaces the entry, so a cached direction is
//! never applied to a pair of points it does not belong to.
//!
//! The cache is owned by the caller (typically the solver state) and passed
//! as `&mut` into the operations that read or write it.

use crate::{
    error::Result,
    types::{DVector, Point, Scalar, TangentVector},
};

/// Householder direction cached for one `(from, to)` pair of points.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEntry<T: Scalar> {
    /// Point the transport starts from
    pub from: Point<T>,
    /// Point the transport arrives at
    pub to: Point<T>,
    /// Reflection direction used by the transport
    pub direction: DVector<T>,
}

/// Euclidean gradient cached together with the point it was evaluated at.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientEntry<T: Scalar> {
    /// Point of evaluation
    pub point: Point<T>,
    /// Euclidean gradient at `point`
    pub gradient: TangentVector<T>,
}

/// Scale factors of the differentiated retraction along a tangent vector.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaEntry<T: Scalar> {
    /// Tangent vector the factors were computed for
    pub eta: TangentVector<T>,
    /// `[beta, <eta, eta>, <T xi, T xi> s^2]`
    pub beta: [T; 3],
    /// Transported vector scaled by `beta * s`, kept for Householder-based schemes
    pub transported: Option<TangentVector<T>>,
}

/// Typed, caller-owned cache of geometric quantities.
#[derive(Debug, Clone, Default)]
pub struct GeometryCache<T: Scalar> {
    transport: Option<TransportEntry<T>>,
    euclidean_gradient: Option<GradientEntry<T>>,
    beta: Option<BetaEntry<T>>,
    transport_hits: usize,
    transport_computations: usize,
}

impl<T: Scalar> GeometryCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            transport: None,
            euclidean_gradient: None,
            beta: None,
            transport_hits: 0,
            transport_computations: 0,
        }
    }

    /// Returns the transport direction for `(from, to)`, computing it on a miss.
    ///
    /// The entry is reused only when both points match the cached ones exactly.
    pub fn transport_direction<F>(
        &mut self,
        from: &Point<T>,
        to: &Point<T>,
        compute: F,
    ) -> Result<DVector<T>>
    where
        F: FnOnce() -> Result<DVector<T>>,
    {
        if let Some(entry) = &self.transport {
            if entry.from == *from && entry.to == *to {
                self.transport_hits += 1;
                return Ok(entry.direction.clone());
            }
        }

        let direction = compute()?;
        self.transport = Some(TransportEntry {
            from: from.clone(),
            to: to.clone(),
            direction: direction.clone(),
        });
        self.transport_computations += 1;
        Ok(direction)
    }

    /// Current transport entry, if any.
    pub fn transport(&self) -> Option<&TransportEntry<T>> {
        self.transport.as_ref()
    }

    /// Stores the Euclidean gradient evaluated at `point`.
    pub fn store_euclidean_gradient(&mut self, point: &Point<T>, gradient: &TangentVector<T>) {
        self.euclidean_gradient = Some(GradientEntry {
            point: point.clone(),
            gradient: gradient.clone(),
        });
    }

    /// Euclidean gradient cached for exactly this point.
    pub fn euclidean_gradient_at(&self, point: &Point<T>) -> Option<&TangentVector<T>> {
        self.euclidean_gradient
            .as_ref()
            .filter(|entry| entry.point == *point)
            .map(|entry| &entry.gradient)
    }

    /// Current gradient entry, whatever point it belongs to.
    pub fn euclidean_gradient(&self) -> Option<&GradientEntry<T>> {
        self.euclidean_gradient.as_ref()
    }

    /// Stores the differentiated-retraction scale factors for `eta`.
    pub fn store_beta(
        &mut self,
        eta: &TangentVector<T>,
        beta: [T; 3],
        transported: Option<TangentVector<T>>,
    ) {
        self.beta = Some(BetaEntry {
            eta: eta.clone(),
            beta,
            transported,
        });
    }

    /// Scale factors cached for exactly this tangent vector.
    pub fn beta_for(&self, eta: &TangentVector<T>) -> Option<&BetaEntry<T>> {
        self.beta.as_ref().filter(|entry| entry.eta == *eta)
    }

    /// Current beta entry.
    pub fn beta(&self) -> Option<&BetaEntry<T>> {
        self.beta.as_ref()
    }

    /// Number of transport lookups answered from the cache.
    pub fn transport_hits(&self) -> usize {
        self.transport_hits
    }

    /// Number of transport directions computed.
    pub fn transport_computations(&self) -> usize {
        self.transport_computations
    }

    /// Clears every slot. Counters are kept.
    pub fn invalidate(&mut self) {
        self.transport = None;
        self.euclidean_gradient = None;
        self.beta = None;
    }
}
