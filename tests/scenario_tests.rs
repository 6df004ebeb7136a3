//! Worked examples: a batched scan and a two-scan inner join.

mod common;

use common::{int_column, ints, scan};
use quarry_core::expr::ExprArena;
use quarry_core::projection::Projection;
use quarry_operators::join::{Join, JoinHow};
use quarry_operators::plan::Plan;

#[test]
fn scan_emits_two_batches_then_ends() {
    let mut arena = ExprArena::new();
    let root = scan(
        &mut arena,
        2,
        vec![("id", ints([0, 1, 2])), ("v", ints([10, 20, 30]))],
    );
    let mut plan = Plan::new(arena, root);

    let first = plan.execute().unwrap().unwrap();
    assert_eq!(int_column(&first, "id"), vec![0, 1]);
    assert_eq!(int_column(&first, "v"), vec![10, 20]);

    let second = plan.execute().unwrap().unwrap();
    assert_eq!(int_column(&second, "id"), vec![2]);
    assert_eq!(int_column(&second, "v"), vec![30]);

    assert!(plan.execute().unwrap().is_none());
    assert!(plan.execute().unwrap().is_none());
}

#[test]
fn inner_join_sums_matching_rows() {
    let mut arena = ExprArena::new();
    let left = scan(&mut arena, 2, vec![("id", ints([0, 1])), ("v", ints([10, 20]))]);
    let right = scan(&mut arena, 2, vec![("id", ints([1, 0])), ("w", ints([5, 7]))]);

    let id = arena.col_left("id");
    let v = arena.col_left("v");
    let w = arena.col_right("w");
    let sum = arena.add(v, w);
    let join = Join::new(
        &arena,
        left,
        right,
        JoinHow::inner("id", "id"),
        Projection::new().with("id", id).with("sum", sum),
    )
    .unwrap();
    let mut plan = Plan::new(arena, Box::new(join));

    let out = plan.execute().unwrap().unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out.column_names().collect::<Vec<_>>(), vec!["id", "sum"]);
    assert_eq!(int_column(&out, "id"), vec![0, 1]);
    assert_eq!(int_column(&out, "sum"), vec![10 + 7, 20 + 5]);
    assert!(plan.execute().unwrap().is_none());
}
