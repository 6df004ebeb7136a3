//! Scan: the leaf node, slicing in-memory column data into batches.

use std::sync::Arc;

use quarry_core::expr::ExprArena;
use quarry_core::projection::Projection;
use quarry_core::types::Batch;

use crate::traits::{Accepted, OpError, PlanNode};

#[derive(Clone)]
pub struct Scan {
    batch_size: usize,
    data: Arc<Batch>,
    /// Next row to emit; monotonic, never exceeds `data.len()`.
    cursor: usize,
    projection: Projection,
}

impl Scan {
    /// Scan over `data`, exposing every raw column as `name: col(name)`.
    pub fn new(arena: &mut ExprArena, batch_size: usize, data: Batch) -> Result<Self, OpError> {
        if batch_size == 0 {
            return Err(OpError::InvalidBatchSize);
        }
        let projection = data
            .column_names()
            .map(|name| (name.to_string(), arena.col(name)))
            .collect();
        Ok(Self {
            batch_size,
            data: Arc::new(data),
            cursor: 0,
            projection,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.data.len()
    }
}

impl PlanNode for Scan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn projection(&self) -> &Projection {
        &self.projection
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        Vec::new()
    }

    fn detail(&self) -> Option<String> {
        Some(format!(
            "batch_size={}, rows={}, cursor={}",
            self.batch_size,
            self.data.len(),
            self.cursor
        ))
    }

    fn execute(&mut self, _arena: &ExprArena) -> Result<Option<Batch>, OpError> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let names: Vec<&str> = self.projection.names().collect();
        let end = self.cursor.saturating_add(self.batch_size);
        let batch = self.data.slice(&names, self.cursor, end)?;
        self.cursor = end.min(self.data.len());
        Ok(Some(batch))
    }

    /// A scan exposes raw columns only; it cannot compute expressions.
    fn accept_pushdown(
        &self,
        _arena: &mut ExprArena,
        _candidates: &Projection,
    ) -> Result<Accepted, OpError> {
        Ok(Accepted::nothing(self.clone_box()))
    }

    fn pushdown(&self, _arena: &mut ExprArena) -> Result<Box<dyn PlanNode>, OpError> {
        Ok(self.clone_box())
    }

    fn with_projection(&self, projection: Projection) -> Box<dyn PlanNode> {
        Box::new(Scan {
            projection,
            ..self.clone()
        })
    }

    fn clone_box(&self) -> Box<dyn PlanNode> {
        Box::new(self.clone())
    }
}
