//! Select operator: computes its projection over each source batch.
//!
//! Column references in a select's projection are unqualified and resolve
//! against the source's output. No buffering: one pull in, one batch out.

use quarry_core::expr::{DataRefs, ExprArena, Qualifier};
use quarry_core::projection::Projection;
use quarry_core::types::Batch;

use crate::compute::compute_columns;
use crate::pushdown::{absorb, forwarded_from, prune};
use crate::traits::{Accepted, OpError, PlanNode};

pub struct Select {
    source: Box<dyn PlanNode>,
    projection: Projection,
}

impl Select {
    pub fn new(source: Box<dyn PlanNode>, projection: Projection) -> Self {
        Self { source, projection }
    }

    pub fn source(&self) -> &dyn PlanNode {
        self.source.as_ref()
    }
}

impl PlanNode for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn projection(&self) -> &Projection {
        &self.projection
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        vec![self.source.as_ref()]
    }

    fn execute(&mut self, arena: &ExprArena) -> Result<Option<Batch>, OpError> {
        let Some(input) = self.source.execute(arena)? else {
            return Ok(None);
        };
        let out = compute_columns(arena, &self.projection, &DataRefs::batch(&input), input.len())?;
        Ok(Some(out))
    }

    fn accept_pushdown(
        &self,
        arena: &mut ExprArena,
        candidates: &Projection,
    ) -> Result<Accepted, OpError> {
        let forwarded =
            forwarded_from(arena, &self.projection, self.source.projection(), Qualifier::None);
        let absorbed = absorb(arena, &self.projection, candidates, &forwarded, |_| {
            Ok(Qualifier::None)
        })?;
        Ok(Accepted {
            node: Box::new(Select {
                source: self.source.clone_box(),
                projection: absorbed.projection,
            }),
            names: absorbed.names,
        })
    }

    fn pushdown(&self, arena: &mut ExprArena) -> Result<Box<dyn PlanNode>, OpError> {
        let Accepted { node: source, names } =
            self.source.accept_pushdown(arena, &self.projection)?;

        let mut projection = self.projection.clone();
        for name in &names {
            let already = projection
                .get(name)
                .map_or(false, |id| arena.is_column(id, name, Qualifier::None));
            if !already {
                let pass = arena.col(name.as_str());
                projection.insert(name.as_str(), pass);
            }
        }

        let needed = projection.referenced_columns(arena, None)?;
        let source = prune(source.as_ref(), &needed).pushdown(arena)?;
        Ok(Box::new(Select { source, projection }))
    }

    fn with_projection(&self, projection: Projection) -> Box<dyn PlanNode> {
        Box::new(Select {
            source: self.source.clone_box(),
            projection,
        })
    }

    fn clone_box(&self) -> Box<dyn PlanNode> {
        Box::new(Select {
            source: self.source.clone_box(),
            projection: self.projection.clone(),
        })
    }
}
