//! Plan node trait + common interfaces.
//!
//! A plan is a tree of `PlanNode`s. The caller pulls the root with
//! `execute(...)` until it returns `Ok(None)` (end-of-stream); each pull
//! recursively pulls the children. Optimization goes through the two-method
//! pushdown protocol (`accept_pushdown` / `pushdown`), which never mutates a
//! node: every rewrite returns a new subtree.

use quarry_core::error::Error as CoreError;
use quarry_core::expr::ExprArena;
use quarry_core::projection::Projection;
use quarry_core::types::Batch;

use thiserror::Error;

use crate::record::PlanRecord;

#[derive(Debug, Error)]
pub enum OpError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A join projection used a column reference with no join side.
    #[error("join output '{output}' references unqualified column '{column}'")]
    UnqualifiedJoinColumn { output: String, column: String },

    /// Pushdown could not decide which join child supplies a column.
    #[error("column '{column}' is not produced by either join source")]
    UnreachableSourceTable { column: String },

    #[error("scan batch size must be positive")]
    InvalidBatchSize,

    #[error("execution error: {0}")]
    Exec(String),
}

impl OpError {
    /// Add context to an error, creating an error chain.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match self {
            OpError::Core(e) => OpError::Core(e.with_context(ctx)),
            OpError::Exec(msg) => OpError::Exec(format!("{}: {}", ctx, msg)),
            other => OpError::Exec(format!("{}: {}", ctx, other)),
        }
    }

    /// The underlying core error, if any.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            OpError::Core(e) => Some(e),
            _ => None,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            OpError::Core(e) => e.suggestions(),
            OpError::UnqualifiedJoinColumn { .. } => {
                vec!["Build join column references with col_left/col_right".into()]
            }
            OpError::UnreachableSourceTable { .. } => vec![
                "Check that every qualified join column exists in that side's projection".into(),
            ],
            _ => vec![],
        }
    }
}

/// Result of offering candidate expressions to a node.
pub struct Accepted {
    /// The node with the accepted expressions merged into its projection.
    pub node: Box<dyn PlanNode>,
    /// Output names the node now computes on behalf of its parent.
    pub names: Vec<String>,
}

impl Accepted {
    pub fn nothing(node: Box<dyn PlanNode>) -> Self {
        Self {
            node,
            names: Vec::new(),
        }
    }
}

/// Trait that all plan nodes implement.
///
/// Invariants:
/// - Once `execute` returns `Ok(None)` every later call returns `Ok(None)`.
/// - `projection()` describes exactly the columns of the batches `execute`
///   produces.
/// - `accept_pushdown`, `pushdown` and `with_projection` leave `self`
///   untouched and return new nodes.
pub trait PlanNode: Send + Sync {
    /// Stable node kind name ("scan", "select", "join").
    fn name(&self) -> &'static str;

    /// Current output schema.
    fn projection(&self) -> &Projection;

    fn children(&self) -> Vec<&dyn PlanNode>;

    /// Node-specific detail for diagnostics (batch size, join condition, ...).
    fn detail(&self) -> Option<String> {
        None
    }

    /// Produce the next output batch, or `None` at end-of-stream.
    fn execute(&mut self, arena: &ExprArena) -> Result<Option<Batch>, OpError>;

    /// Try to compute (some of) `candidates` in this node. Candidate column
    /// references name columns of this node's output.
    fn accept_pushdown(
        &self,
        arena: &mut ExprArena,
        candidates: &Projection,
    ) -> Result<Accepted, OpError>;

    /// Push this node's work into its children, recursively.
    fn pushdown(&self, arena: &mut ExprArena) -> Result<Box<dyn PlanNode>, OpError>;

    /// A copy of this node exposing `projection` instead of its own.
    fn with_projection(&self, projection: Projection) -> Box<dyn PlanNode>;

    fn clone_box(&self) -> Box<dyn PlanNode>;

    /// Recursive structural record. Pure.
    fn describe(&self, arena: &ExprArena) -> PlanRecord {
        PlanRecord::new(
            self.name(),
            self.detail(),
            self.projection().describe(arena),
            self.children()
                .into_iter()
                .map(|c| c.describe(arena))
                .collect(),
        )
    }
}

impl Clone for Box<dyn PlanNode> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
