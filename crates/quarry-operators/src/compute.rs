//! Batch compute helper: evaluate a whole projection in one pass.

use quarry_core::expr::{DataRefs, ExprArena};
use quarry_core::projection::Projection;
use quarry_core::types::{Batch, Column, Row};

use crate::traits::OpError;

/// Evaluate every entry of `projection` against columnar `refs`, producing a
/// batch of `rows` rows in projection order. Scalar results are broadcast.
pub fn compute_columns(
    arena: &ExprArena,
    projection: &Projection,
    refs: &DataRefs<'_>,
    rows: usize,
) -> Result<Batch, OpError> {
    let mut columns = Vec::with_capacity(projection.len());
    for (name, id) in projection.iter() {
        let values = arena.evaluate(id, refs)?.into_column(rows)?;
        columns.push(Column::new(name, values));
    }
    Ok(Batch::from_columns(columns)?)
}

/// Row-major variant: every entry must evaluate to a single value.
pub fn compute_row(
    arena: &ExprArena,
    projection: &Projection,
    refs: &DataRefs<'_>,
) -> Result<Row, OpError> {
    let mut row = Row::new();
    for (name, id) in projection.iter() {
        row.insert(name.to_string(), arena.evaluate(id, refs)?.into_scalar()?);
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::types::Value;

    #[test]
    fn literals_are_broadcast_to_the_batch() {
        let mut arena = ExprArena::new();
        let one = arena.lit(1);
        let id = arena.col("id");
        let projection = Projection::new().with("id", id).with("one", one);
        let input = Batch::from_pairs([("id", vec![5, 6, 7])]).unwrap();
        let out =
            compute_columns(&arena, &projection, &DataRefs::batch(&input), input.len()).unwrap();
        assert_eq!(out.column_names().collect::<Vec<_>>(), vec!["id", "one"]);
        assert_eq!(out.column("one").unwrap().values, vec![Value::Int(1); 3]);
    }

    #[test]
    fn row_compute_reads_both_sides() {
        let mut arena = ExprArena::new();
        let v = arena.col_left("v");
        let w = arena.col_right("w");
        let sum = arena.add(v, w);
        let projection = Projection::new().with("sum", sum);
        let left: Row = [("v".to_string(), Value::Int(10))].into_iter().collect();
        let right: Row = [("w".to_string(), Value::Int(1))].into_iter().collect();
        let row = compute_row(&arena, &projection, &DataRefs::row_pair(&left, &right)).unwrap();
        assert_eq!(row["sum"], Value::Int(11));
    }
}
