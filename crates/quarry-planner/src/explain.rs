//! Before/after plan comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

use quarry_core::error::Result;
use quarry_core::hash::Hash256;
use quarry_operators::plan::Plan;
use quarry_operators::record::PlanRecord;

/// Structural records and fingerprints of a plan before and after a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainReport {
    pub before: PlanRecord,
    pub after: PlanRecord,
    pub before_hash: Hash256,
    pub after_hash: Hash256,
    pub changed: bool,
}

impl ExplainReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn explain(before: &Plan, after: &Plan) -> Result<ExplainReport> {
    let before = before.describe();
    let after = after.describe();
    let before_hash = before.fingerprint()?;
    let after_hash = after.fingerprint()?;
    Ok(ExplainReport {
        changed: before_hash != after_hash,
        before,
        after,
        before_hash,
        after_hash,
    })
}

impl fmt::Display for ExplainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== before ({}) ==", self.before_hash)?;
        write!(f, "{}", self.before)?;
        writeln!(f, "== after ({}) ==", self.after_hash)?;
        write!(f, "{}", self.after)?;
        if !self.changed {
            writeln!(f, "(unchanged)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::optimize;
    use quarry_core::expr::ExprArena;
    use quarry_core::projection::Projection;
    use quarry_core::types::Batch;
    use quarry_operators::scan::Scan;
    use quarry_operators::select::Select;

    fn plan() -> Plan {
        let mut arena = ExprArena::new();
        let data = Batch::from_pairs([("id", vec![1, 2]), ("v", vec![3, 4])]).unwrap();
        let scan = Scan::new(&mut arena, 2, data).unwrap();
        let id = arena.col("id");
        let select = Select::new(Box::new(scan), Projection::new().with("id", id));
        Plan::new(arena, Box::new(select))
    }

    #[test]
    fn reports_pruning_as_a_change() {
        let before = plan();
        let after = optimize(&before).unwrap();
        let report = explain(&before, &after).unwrap();
        assert!(report.changed);
        assert_eq!(report.before.children[0].projection.len(), 2);
        assert_eq!(report.after.children[0].projection.len(), 1);

        let text = report.to_string();
        assert!(text.starts_with("== before ("));
        assert!(text.contains("== after ("));
        assert!(!text.contains("(unchanged)"));
    }

    #[test]
    fn identical_plans_are_unchanged() {
        let p = plan();
        let report = explain(&p, &p).unwrap();
        assert!(!report.changed);
        assert_eq!(report.before_hash, report.after_hash);
        assert!(report.to_string().ends_with("(unchanged)\n"));
    }
}
