//! Concrete manifolds for rcgopt.
//!
//! [`L2Sphere`] is the unit sphere of functions on [0, 1] sampled at
//! equispaced nodes, with the trapezoidal approximation of the L2 metric.

pub mod l2_sphere;

pub use l2_sphere::{L2Sphere, L2SphereConfig};
