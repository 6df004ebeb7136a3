//! Single-pass nested-loop join.
//!
//! Each `execute` pulls exactly one batch from the left input and one from
//! the right, and joins those two batches only. Rows in later batches of
//! either side are never paired with earlier ones.

use std::collections::{BTreeMap, BTreeSet};

use quarry_core::error::Error as CoreError;
use quarry_core::expr::{ColumnRef, DataRefs, ExprArena, Qualifier};
use quarry_core::projection::Projection;
use quarry_core::types::{Batch, Row};

use crate::compute::compute_row;
use crate::pushdown::{absorb, prune};
use crate::traits::{Accepted, OpError, PlanNode};

use super::JoinHow;

pub struct Join {
    left: Box<dyn PlanNode>,
    right: Box<dyn PlanNode>,
    how: JoinHow,
    projection: Projection,
    /// Set once either input reports end-of-stream.
    finished: bool,
}

impl Join {
    /// Build a join. Every column referenced by `projection` must be
    /// qualified with `left` or `right`.
    pub fn new(
        arena: &ExprArena,
        left: Box<dyn PlanNode>,
        right: Box<dyn PlanNode>,
        how: JoinHow,
        projection: Projection,
    ) -> Result<Self, OpError> {
        for (output, id) in projection.iter() {
            if let Some(col) = arena
                .source_columns(id)?
                .iter()
                .find(|c| !c.qualifier.is_qualified())
            {
                return Err(OpError::UnqualifiedJoinColumn {
                    output: output.to_string(),
                    column: col.name.clone(),
                });
            }
        }
        Ok(Self {
            left,
            right,
            how,
            projection,
            finished: false,
        })
    }

    pub fn how(&self) -> &JoinHow {
        &self.how
    }

    pub fn left(&self) -> &dyn PlanNode {
        self.left.as_ref()
    }

    pub fn right(&self) -> &dyn PlanNode {
        self.right.as_ref()
    }

    fn side(&self, qualifier: Qualifier) -> Option<&dyn PlanNode> {
        match qualifier {
            Qualifier::Left => Some(self.left.as_ref()),
            Qualifier::Right => Some(self.right.as_ref()),
            Qualifier::None => None,
        }
    }

    fn rebuild(
        &self,
        left: Box<dyn PlanNode>,
        right: Box<dyn PlanNode>,
        projection: Projection,
    ) -> Box<dyn PlanNode> {
        Box::new(Join {
            left,
            right,
            how: self.how.clone(),
            projection,
            finished: self.finished,
        })
    }

    fn matches(&self, left: &Row, right: &Row) -> Result<bool, OpError> {
        match &self.how {
            JoinHow::Cross => Ok(true),
            JoinHow::Inner {
                left_key,
                right_key,
            } => {
                let l = left
                    .get(left_key)
                    .ok_or_else(|| CoreError::missing_column(left_key.clone(), Qualifier::Left))?;
                let r = right.get(right_key).ok_or_else(|| {
                    CoreError::missing_column(right_key.clone(), Qualifier::Right)
                })?;
                Ok(l == r)
            }
        }
    }

    /// Entries of `projection` that compute something from exactly one side,
    /// as candidates for that side.
    fn side_candidates(
        arena: &ExprArena,
        projection: &Projection,
        side: Qualifier,
    ) -> Result<Projection, OpError> {
        let mut out = Projection::new();
        for (name, id) in projection.iter() {
            let cols = arena.source_columns(id)?;
            if !cols.is_empty() && cols.iter().all(|c| c.qualifier == side) {
                out.insert(name, id);
            }
        }
        Ok(out)
    }

    /// Columns `side` must keep: everything own projection reads from it
    /// plus the join key.
    fn needed_from(
        &self,
        arena: &ExprArena,
        projection: &Projection,
        side: Qualifier,
    ) -> Result<BTreeSet<String>, OpError> {
        let mut needed = projection.referenced_columns(arena, Some(side))?;
        let key = match side {
            Qualifier::Left => self.how.left_key(),
            Qualifier::Right => self.how.right_key(),
            Qualifier::None => None,
        };
        if let Some(key) = key {
            needed.insert(key.to_string());
        }
        Ok(needed)
    }

    /// Offer one side its share of `projection`, turn what it accepts into
    /// pass-throughs, then prune and recurse into that side.
    fn push_side(
        &self,
        arena: &mut ExprArena,
        projection: &mut Projection,
        side: Qualifier,
    ) -> Result<Box<dyn PlanNode>, OpError> {
        let child = match side {
            Qualifier::Right => self.right.as_ref(),
            _ => self.left.as_ref(),
        };
        let candidates = Self::side_candidates(arena, projection, side)?;
        let Accepted { node, names } = child.accept_pushdown(arena, &candidates)?;
        for name in &names {
            let pass = arena.column(name.as_str(), side);
            projection.insert(name.as_str(), pass);
        }
        let needed = self.needed_from(arena, projection, side)?;
        prune(node.as_ref(), &needed).pushdown(arena)
    }
}

impl PlanNode for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn projection(&self) -> &Projection {
        &self.projection
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    fn detail(&self) -> Option<String> {
        Some(self.how.to_string())
    }

    fn execute(&mut self, arena: &ExprArena) -> Result<Option<Batch>, OpError> {
        if self.finished {
            return Ok(None);
        }
        let Some(left) = self.left.execute(arena)? else {
            self.finished = true;
            return Ok(None);
        };
        let Some(right) = self.right.execute(arena)? else {
            self.finished = true;
            return Ok(None);
        };

        let right_rows: Vec<Row> = right.rows().collect();
        let mut out = Vec::new();
        for left_row in left.rows() {
            for right_row in &right_rows {
                if self.matches(&left_row, right_row)? {
                    let refs = DataRefs::row_pair(&left_row, right_row);
                    out.push(compute_row(arena, &self.projection, &refs)?);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            left_rows = left.len(),
            right_rows = right_rows.len(),
            matched = out.len(),
            "join batch"
        );

        let names: Vec<&str> = self.projection.names().collect();
        if out.is_empty() {
            return Ok(Some(Batch::empty(names)));
        }
        let batch = Batch::from_rows(out)?;
        Ok(Some(batch.slice(&names, 0, batch.len())?))
    }

    fn accept_pushdown(
        &self,
        arena: &mut ExprArena,
        candidates: &Projection,
    ) -> Result<Accepted, OpError> {
        let left_out = self.left.projection();
        let right_out = self.right.projection();

        // Pass-through outputs `name: side.name` of a column either input has.
        let forwarded: BTreeMap<String, Qualifier> = self
            .projection
            .iter()
            .filter(|(name, _)| left_out.contains(name) || right_out.contains(name))
            .filter_map(|(name, id)| {
                [Qualifier::Left, Qualifier::Right]
                    .into_iter()
                    .find(|q| arena.is_column(id, name, *q))
                    .map(|q| (name.to_string(), q))
            })
            .collect();

        let resolve = |col: &ColumnRef| -> Result<Qualifier, OpError> {
            let unreachable = || OpError::UnreachableSourceTable {
                column: col.name.clone(),
            };
            let qualifier = *forwarded.get(&col.name).ok_or_else(unreachable)?;
            match self.side(qualifier) {
                Some(side) if side.projection().contains(&col.name) => Ok(qualifier),
                _ => Err(unreachable()),
            }
        };
        let absorbed = absorb(arena, &self.projection, candidates, &forwarded, resolve)?;

        Ok(Accepted {
            node: self.rebuild(
                self.left.clone_box(),
                self.right.clone_box(),
                absorbed.projection,
            ),
            names: absorbed.names,
        })
    }

    fn pushdown(&self, arena: &mut ExprArena) -> Result<Box<dyn PlanNode>, OpError> {
        let mut projection = self.projection.clone();
        let left = self.push_side(arena, &mut projection, Qualifier::Left)?;
        let right = self.push_side(arena, &mut projection, Qualifier::Right)?;
        Ok(self.rebuild(left, right, projection))
    }

    fn with_projection(&self, projection: Projection) -> Box<dyn PlanNode> {
        self.rebuild(self.left.clone_box(), self.right.clone_box(), projection)
    }

    fn clone_box(&self) -> Box<dyn PlanNode> {
        self.rebuild(
            self.left.clone_box(),
            self.right.clone_box(),
            self.projection.clone(),
        )
    }
}
