//! # rcgopt
//!
//! Riemannian nonlinear conjugate gradient on the unit sphere of sampled
//! functions, where functions on [0, 1] are stored as their values at n
//! equispaced nodes and compared with the trapezoidal L2 inner product.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`core`]: scalar trait, errors, the `Manifold` and `CostFunction`
//!   traits, the geometry cache, BLAS-style primitives and line searches
//! - [`manifolds`]: [`L2Sphere`](manifolds::L2Sphere)
//! - [`optim`]: the line-search solver loop and [`RCG`](optim::RCG)
//!
//! # Example
//!
//! ```rust
//! use rcgopt::prelude::*;
//!
//! #[derive(Debug)]
//! struct Functional {
//!     sphere: L2Sphere,
//!     c: DVector<f64>,
//! }
//!
//! impl CostFunction<f64> for Functional {
//!     fn cost(&self, x: &DVector<f64>) -> Result<f64> {
//!         Ok(-self.sphere.inner_product(x, &self.c, x)?)
//!     }
//!
//!     fn cost_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
//!         Ok((self.cost(x)?, -&self.c))
//!     }
//! }
//!
//! let sphere = L2Sphere::new(5)?;
//! let cost_fn = Functional {
//!     sphere: sphere.clone(),
//!     c: DVector::from_vec(vec![1.0, 2.0, 3.0, 2.0, 1.0]),
//! };
//! let x0 = sphere.project_point(&DVector::from_element(5, 1.0))?;
//!
//! let mut rcg = RCG::new(RcgConfig::new().with_method(RcgMethod::FletcherReeves));
//! let solver = LineSearchSolver::new(SolverConfig::new());
//! let result = solver.run(&mut rcg, &cost_fn, &sphere, &x0)?;
//! assert!(result.converged);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use rcgopt_core as core;
pub use rcgopt_manifolds as manifolds;
pub use rcgopt_optim as optim;

pub use nalgebra;

/// Common imports.
pub mod prelude {
    pub use rcgopt_core::prelude::*;
    pub use rcgopt_manifolds::{L2Sphere, L2SphereConfig};
    pub use rcgopt_optim::{
        LineSearchKind, LineSearchSolver, RcgConfig, RcgMethod, SearchDirectionRule,
        SolverConfig, SolverState, RCG,
    };
}
