//! Property-based tests for join cardinality.

use proptest::prelude::*;
use quarry_core::expr::ExprArena;
use quarry_core::projection::Projection;
use quarry_core::types::Batch;
use quarry_operators::join::{Join, JoinHow};
use quarry_operators::scan::Scan;
use quarry_operators::traits::PlanNode;

fn keys_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..6, 1..20)
}

fn run_join(how: JoinHow, left: &[i64], right: &[i64]) -> usize {
    let mut arena = ExprArena::new();
    let l = Batch::from_pairs([("k", left.to_vec())]).unwrap();
    let r = Batch::from_pairs([("k", right.to_vec())]).unwrap();
    let l = Scan::new(&mut arena, left.len(), l).unwrap();
    let r = Scan::new(&mut arena, right.len(), r).unwrap();
    let lk = arena.col_left("k");
    let rk = arena.col_right("k");
    let mut join = Join::new(
        &arena,
        Box::new(l),
        Box::new(r),
        how,
        Projection::new().with("lk", lk).with("rk", rk),
    )
    .unwrap();
    let out = join.execute(&arena).unwrap().map_or(0, |b| b.len());
    assert!(join.execute(&arena).unwrap().is_none());
    out
}

proptest! {
    /// Property: inner join size equals the number of equal-key pairs.
    #[test]
    fn inner_join_counts_matching_pairs(left in keys_strategy(), right in keys_strategy()) {
        let expected = left
            .iter()
            .map(|l| right.iter().filter(|r| *r == l).count())
            .sum::<usize>();
        prop_assert_eq!(run_join(JoinHow::inner("k", "k"), &left, &right), expected);
    }

    /// Property: cross join size is |left| × |right|.
    #[test]
    fn cross_join_is_product(left in keys_strategy(), right in keys_strategy()) {
        prop_assert_eq!(run_join(JoinHow::Cross, &left, &right), left.len() * right.len());
    }
}
