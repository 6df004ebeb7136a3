//! Shared builders for the integration tests.

#![allow(dead_code)]

use quarry_core::expr::{ExprArena, Qualifier};
use quarry_core::projection::Projection;
use quarry_core::types::{Batch, Value};
use quarry_operators::join::{Join, JoinHow};
use quarry_operators::plan::Plan;
use quarry_operators::scan::Scan;
use quarry_operators::select::Select;
use quarry_operators::traits::PlanNode;

pub fn scan(
    arena: &mut ExprArena,
    batch_size: usize,
    pairs: Vec<(&str, Vec<Value>)>,
) -> Box<dyn PlanNode> {
    let data = Batch::from_pairs(pairs).expect("valid test data");
    Box::new(Scan::new(arena, batch_size, data).expect("valid batch size"))
}

pub fn ints(values: impl IntoIterator<Item = i64>) -> Vec<Value> {
    values.into_iter().map(Value::Int).collect()
}

pub fn int_column(batch: &Batch, name: &str) -> Vec<i64> {
    batch
        .column(name)
        .unwrap_or_else(|| panic!("column '{name}' missing"))
        .values
        .iter()
        .map(|v| v.as_i64().unwrap_or_else(|| panic!("non-integer in '{name}'")))
        .collect()
}

pub fn drain(plan: &mut Plan) -> Vec<Batch> {
    let mut out = Vec::new();
    while let Some(batch) = plan.execute().expect("execute") {
        out.push(batch);
    }
    out
}

/// `n` rows of `[x, x + 1, x + 2]` raised to `power`, keyed by `id = x`.
fn powers(n: i64, power: u32) -> (Vec<Value>, Vec<Value>) {
    let ids = ints(0..n);
    let lists = (0..n)
        .map(|x| Value::list((x..x + 3).map(|v| v.pow(power))))
        .collect();
    (ids, lists)
}

/// select {id, computed: max(squaretimes2) + max(cubes)}
///   join inner(left.id = right.id) {id, squaretimes2, cubes}
///     select {id, newcol: squares, squaretimes2: squares * 2}
///       scan {id, squares}
///     scan {id, cubes}
pub fn squares_and_cubes(rows: i64, batch_size: usize) -> Plan {
    let mut arena = ExprArena::new();
    let (ids, squares) = powers(rows, 2);
    let source1 = scan(&mut arena, batch_size, vec![("id", ids), ("squares", squares)]);
    let (ids, cubes) = powers(rows, 3);
    let source2 = scan(&mut arena, batch_size, vec![("id", ids), ("cubes", cubes)]);

    let id = arena.col("id");
    let newcol = arena.col("squares");
    let sq = arena.col("squares");
    let two = arena.lit(2);
    let sq2 = arena.mul(sq, two);
    let select = Select::new(
        source1,
        Projection::new()
            .with("id", id)
            .with("newcol", newcol)
            .with("squaretimes2", sq2),
    );

    let id = arena.col_left("id");
    let sq2 = arena.col_left("squaretimes2");
    let cubes = arena.col_right("cubes");
    let join = Join::new(
        &arena,
        Box::new(select),
        source2,
        JoinHow::inner("id", "id"),
        Projection::new()
            .with("id", id)
            .with("squaretimes2", sq2)
            .with("cubes", cubes),
    )
    .expect("qualified join projection");

    let id = arena.col("id");
    let sq2 = arena.col("squaretimes2");
    let sq2_max = arena.max(sq2);
    let cubes = arena.col("cubes");
    let cubes_max = arena.max(cubes);
    let computed = arena.add(sq2_max, cubes_max);
    let top = Select::new(
        Box::new(join),
        Projection::new().with("id", id).with("computed", computed),
    );
    Plan::new(arena, Box::new(top))
}

/// Every column a node reads from a child is still exposed by that child.
pub fn assert_children_cover_references(arena: &ExprArena, node: &dyn PlanNode) {
    let children = node.children();
    for (idx, child) in children.iter().enumerate() {
        let side = match (node.name(), idx) {
            ("join", 0) => Qualifier::Left,
            ("join", _) => Qualifier::Right,
            _ => Qualifier::None,
        };
        let needed = node
            .projection()
            .referenced_columns(arena, Some(side))
            .expect("known expressions");
        for name in needed {
            assert!(
                child.projection().contains(&name),
                "{} child {idx} lost column '{name}' still read by its parent",
                node.name()
            );
        }
        assert_children_cover_references(arena, *child);
    }
}
