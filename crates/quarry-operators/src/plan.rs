//! A runnable plan: the expression arena plus the root node reading from it.

use quarry_core::expr::ExprArena;
use quarry_core::types::Batch;

use crate::record::PlanRecord;
use crate::traits::{OpError, PlanNode};

pub struct Plan {
    arena: ExprArena,
    root: Box<dyn PlanNode>,
}

impl Plan {
    pub fn new(arena: ExprArena, root: Box<dyn PlanNode>) -> Self {
        Self { arena, root }
    }

    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    pub fn root(&self) -> &dyn PlanNode {
        self.root.as_ref()
    }

    /// Pull the next batch from the root; `None` once the plan is exhausted.
    pub fn execute(&mut self) -> Result<Option<Batch>, OpError> {
        self.root.execute(&self.arena)
    }

    pub fn describe(&self) -> PlanRecord {
        self.root.describe(&self.arena)
    }
}

impl Clone for Plan {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            root: self.root.clone_box(),
        }
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("exprs", &self.arena.len())
            .field("root", &self.root.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Scan;
    use quarry_core::types::Batch;

    #[test]
    fn clones_run_independently() {
        let mut arena = ExprArena::new();
        let data = Batch::from_pairs([("id", vec![1, 2, 3])]).unwrap();
        let scan = Scan::new(&mut arena, 2, data).unwrap();
        let mut plan = Plan::new(arena, Box::new(scan));
        let mut copy = plan.clone();

        assert_eq!(plan.execute().unwrap().unwrap().len(), 2);
        assert_eq!(plan.execute().unwrap().unwrap().len(), 1);
        assert!(plan.execute().unwrap().is_none());

        // The copy still starts at the first row.
        assert_eq!(copy.execute().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn describe_renders_tree() {
        let mut arena = ExprArena::new();
        let data = Batch::from_pairs([("id", vec![1])]).unwrap();
        let scan = Scan::new(&mut arena, 4, data).unwrap();
        let plan = Plan::new(arena, Box::new(scan));
        let record = plan.describe();
        assert_eq!(record.kind, "scan");
        assert_eq!(record.expr_of("id"), Some("id"));
        assert_eq!(
            record.to_string(),
            "scan [batch_size=4, rows=1, cursor=0] {id: id}\n"
        );
    }
}
