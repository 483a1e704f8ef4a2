//! rcgopt optimization - Riemannian conjugate gradient for rcgopt manifolds.
//!
//! # Available Solvers
//!
//! - **RCG**: nonlinear conjugate gradient with six conjugacy formulas,
//!   periodic restarts and a descent safeguard
//!
//! Direction rules plug into [`LineSearchSolver`], which runs the line
//! search, keeps the iterates and applies the stopping criterion.
//!
//! # Examples
//!
//! ```rust
//! use rcgopt_optim::{LineSearchKind, LineSearchSolver, RcgConfig, RcgMethod, SolverConfig, RCG};
//! use rcgopt_core::optimizer::StoppingCriterion;
//!
//! let mut rcg = RCG::<f64>::new(RcgConfig::new().with_method(RcgMethod::HagerZhang));
//! let solver = LineSearchSolver::new(
//!     SolverConfig::<f64>::new()
//!         .with_line_search(LineSearchKind::StrongWolfe)
//!         .with_criterion(StoppingCriterion::new().with_max_iterations(200)),
//! );
//!
//! // Run optimization (cost_fn, manifold, initial_point defined elsewhere)
//! // let result = solver.run(&mut rcg, &cost_fn, &manifold, &initial_point)?;
//! # let _ = (&mut rcg, &solver);
//! ```

pub mod conjugate_gradient;
pub mod solver;

pub use conjugate_gradient::{RcgConfig, RcgMethod, RCG};
pub use solver::{
    ConfiguredLineSearch, LineSearchKind, LineSearchSolver, SearchDirectionRule, SolverConfig,
    SolverState,
};
