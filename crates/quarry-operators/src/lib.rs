#![forbid(unsafe_code)]
//! Pull-based plan nodes for quarry.
//!
//! Nodes form a tree; pulling the root with `execute` pulls the children.
//! `Scan` slices in-memory data, `Select` evaluates a projection over each
//! batch and `Join` pairs rows of one left and one right batch. All three
//! take part in projection pushdown through the `PlanNode` trait.

pub mod compute;
pub mod join;
pub mod plan;
pub(crate) mod pushdown;
pub mod record;
pub mod scan;
pub mod select;
pub mod traits;

pub use compute::{compute_columns, compute_row};
pub use join::{Join, JoinHow};
pub use plan::Plan;
pub use record::{PlanRecord, ProjectionEntry};
pub use scan::Scan;
pub use select::Select;
pub use traits::{Accepted, OpError, PlanNode};
