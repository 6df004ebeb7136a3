//! Optimization rules.
//!
//! There is a single rule, projection pushdown: every node offers its
//! expressions to its children, children compute what they can, and
//! columns nobody reads any more are pruned. It is applied unconditionally
//! (no cost model) and exactly once per call.

use quarry_operators::plan::Plan;
use quarry_operators::traits::OpError;

/// Apply projection pushdown to a copy of `plan`.
///
/// The returned plan owns its own arena (a copy of the input's, extended
/// with any rewritten expressions). On error nothing is returned and `plan`
/// is unchanged either way.
pub fn optimize(plan: &Plan) -> Result<Plan, OpError> {
    let mut arena = plan.arena().clone();
    let root = plan
        .root()
        .pushdown(&mut arena)
        .map_err(|e| e.with_context("projection pushdown"))?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        exprs_before = plan.arena().len(),
        exprs_after = arena.len(),
        root = root.name(),
        "optimized plan"
    );

    Ok(Plan::new(arena, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::expr::ExprArena;
    use quarry_core::projection::Projection;
    use quarry_core::types::{Batch, Value};
    use quarry_operators::scan::Scan;
    use quarry_operators::select::Select;
    use quarry_operators::traits::PlanNode;

    fn drain(mut plan: Plan) -> Vec<Batch> {
        let mut out = Vec::new();
        while let Some(batch) = plan.execute().unwrap() {
            out.push(batch);
        }
        out
    }

    /// select {x: a * 2} over select {a: a, b: b + 1} over scan {a, b, c}
    fn stacked_selects() -> Plan {
        let mut arena = ExprArena::new();
        let data = Batch::from_pairs([
            ("a", vec![1, 2, 3]),
            ("b", vec![4, 5, 6]),
            ("c", vec![7, 8, 9]),
        ])
        .unwrap();
        let scan = Scan::new(&mut arena, 2, data).unwrap();

        let a = arena.col("a");
        let b = arena.col("b");
        let one = arena.lit(1);
        let b1 = arena.add(b, one);
        let inner = Select::new(Box::new(scan), Projection::new().with("a", a).with("b", b1));

        let outer_a = arena.col("a");
        let two = arena.lit(2);
        let x = arena.mul(outer_a, two);
        let outer = Select::new(Box::new(inner), Projection::new().with("x", x));
        Plan::new(arena, Box::new(outer))
    }

    #[test]
    fn pushes_expression_into_inner_select_and_prunes() {
        let plan = stacked_selects();
        let optimized = optimize(&plan).unwrap();

        let outer = optimized.root();
        let x = outer.projection().get("x").unwrap();
        assert_eq!(optimized.arena().display(x), "x");

        let inner = outer.children()[0];
        assert_eq!(inner.projection().names().collect::<Vec<_>>(), vec!["x"]);
        let scan = inner.children()[0];
        assert_eq!(scan.projection().names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn optimized_plan_produces_same_batches() {
        let plan = stacked_selects();
        let optimized = optimize(&plan).unwrap();
        let expected = drain(plan);
        let actual = drain(optimized);
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(&actual) {
            assert_eq!(e.column("x").unwrap().values, a.column("x").unwrap().values);
        }
        assert_eq!(
            actual[0].column("x").unwrap().values,
            vec![Value::Int(2), Value::Int(4)]
        );
    }

    #[test]
    fn input_plan_is_untouched() {
        let plan = stacked_selects();
        let before = plan.describe();
        let exprs = plan.arena().len();
        let _ = optimize(&plan).unwrap();
        assert_eq!(plan.describe(), before);
        assert_eq!(plan.arena().len(), exprs);
    }
}
