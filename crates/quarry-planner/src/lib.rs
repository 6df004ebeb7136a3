#![forbid(unsafe_code)]
//! quarry-planner: rewrites over whole plans.
//!
//! - `rules::optimize` runs projection pushdown from the root once and
//!   returns a new `Plan`; the input plan is left as it was.
//! - `explain` compares the structural records of two plans.

pub mod explain;
pub mod rules;

pub use explain::{explain, ExplainReport};
pub use rules::optimize;
