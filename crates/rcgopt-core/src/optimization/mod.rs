//! Line searches and solver bookkeeping shared by the optimizers.

pub mod line_search;
pub mod optimizer;

pub use line_search::*;
pub use optimizer::*;
