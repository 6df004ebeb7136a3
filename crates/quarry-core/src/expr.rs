//! Expression engine: an arena of scalar/aggregate expression nodes.
//!
//! Expressions are built through `ExprArena` builder methods and referred to
//! by `ExprId`, a stable index into the arena. Evaluation is lazy: nothing is
//! computed until a plan node evaluates an id against its input data.
//!
//! The arena is append-only. Rewrites (e.g. re-qualifying column references
//! during pushdown) allocate new nodes, so an id keeps its meaning for the
//! lifetime of the arena and cloned arenas stay compatible with old ids.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Batch, Row, Value};

/// Stable handle to a node in an `ExprArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExprId(usize);

impl ExprId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which join side (or neither) a column reference resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    None,
    Left,
    Right,
}

impl Qualifier {
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Qualifier::None => None,
            Qualifier::Left => Some("left"),
            Qualifier::Right => Some("right"),
        }
    }

    pub fn is_qualified(self) -> bool {
        self != Qualifier::None
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

/// Row-wise aggregates: reduce the innermost dimension of each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFunc {
    Max,
    Min,
}

impl AggFunc {
    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Max => "max",
            AggFunc::Min => "min",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub name: String,
    pub qualifier: Qualifier,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.qualifier.prefix() {
            Some(prefix) => write!(f, "{prefix}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Expression AST node. Children are arena ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Value),
    Column(ColumnRef),
    BinaryOp {
        op: BinOp,
        left: ExprId,
        right: ExprId,
    },
    Aggregate {
        func: AggFunc,
        arg: ExprId,
    },
}

#[derive(Debug, Clone)]
struct Slot {
    expr: Expr,
    sources: OnceLock<Vec<ColumnRef>>,
}

/// Intermediate evaluation result: a whole column or a single value that is
/// broadcast against columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Column(Vec<Value>),
    Scalar(Value),
}

impl Datum {
    /// Materialize as a column of `rows` values, broadcasting scalars.
    pub fn into_column(self, rows: usize) -> Result<Vec<Value>> {
        match self {
            Datum::Column(values) if values.len() == rows => Ok(values),
            Datum::Column(values) => Err(Error::LengthMismatch {
                left: values.len(),
                right: rows,
            }),
            Datum::Scalar(v) => Ok(vec![v; rows]),
        }
    }

    pub fn into_scalar(self) -> Result<Value> {
        match self {
            Datum::Scalar(v) => Ok(v),
            Datum::Column(values) => Err(Error::type_mismatch(format!(
                "expected a single value, got a column of {}",
                values.len()
            ))),
        }
    }
}

/// The data an expression is evaluated against for one qualifier.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Batch(&'a Batch),
    Row(&'a Row),
}

/// Mapping from qualifier to the data visible under it.
#[derive(Debug, Clone, Default)]
pub struct DataRefs<'a> {
    sources: BTreeMap<Qualifier, Source<'a>>,
}

impl<'a> DataRefs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unqualified columnar data, as seen by a select.
    pub fn batch(batch: &'a Batch) -> Self {
        Self::new().with(Qualifier::None, Source::Batch(batch))
    }

    /// One left row and one right row, as seen by a join.
    pub fn row_pair(left: &'a Row, right: &'a Row) -> Self {
        Self::new()
            .with(Qualifier::Left, Source::Row(left))
            .with(Qualifier::Right, Source::Row(right))
    }

    pub fn with(mut self, qualifier: Qualifier, source: Source<'a>) -> Self {
        self.sources.insert(qualifier, source);
        self
    }

    fn lookup(&self, col: &ColumnRef) -> Result<Datum> {
        let missing = || Error::missing_column(col.name.clone(), col.qualifier);
        match self.sources.get(&col.qualifier) {
            Some(Source::Batch(batch)) => batch
                .column(&col.name)
                .map(|c| Datum::Column(c.values.clone()))
                .ok_or_else(missing),
            Some(Source::Row(row)) => row
                .get(&col.name)
                .map(|v| Datum::Scalar(v.clone()))
                .ok_or_else(missing),
            None => Err(missing()),
        }
    }
}

/// Append-only store of expression nodes.
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    slots: Vec<Slot>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add a node. Each call yields a fresh id, even for identical nodes.
    pub fn push(&mut self, expr: Expr) -> ExprId {
        self.slots.push(Slot {
            expr,
            sources: OnceLock::new(),
        });
        ExprId(self.slots.len() - 1)
    }

    pub fn get(&self, id: ExprId) -> Result<&Expr> {
        self.slots
            .get(id.0)
            .map(|s| &s.expr)
            .ok_or(Error::UnknownExpr(id.0))
    }

    // --- builders ---

    pub fn lit(&mut self, value: impl Into<Value>) -> ExprId {
        self.push(Expr::Literal(value.into()))
    }

    pub fn column(&mut self, name: impl Into<String>, qualifier: Qualifier) -> ExprId {
        self.push(Expr::Column(ColumnRef {
            name: name.into(),
            qualifier,
        }))
    }

    pub fn col(&mut self, name: impl Into<String>) -> ExprId {
        self.column(name, Qualifier::None)
    }

    pub fn col_left(&mut self, name: impl Into<String>) -> ExprId {
        self.column(name, Qualifier::Left)
    }

    pub fn col_right(&mut self, name: impl Into<String>) -> ExprId {
        self.column(name, Qualifier::Right)
    }

    pub fn binary(&mut self, op: BinOp, left: ExprId, right: ExprId) -> ExprId {
        self.push(Expr::BinaryOp { op, left, right })
    }

    pub fn add(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinOp::Add, left, right)
    }

    pub fn sub(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinOp::Sub, left, right)
    }

    pub fn mul(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinOp::Mul, left, right)
    }

    pub fn div(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinOp::Div, left, right)
    }

    pub fn aggregate(&mut self, func: AggFunc, arg: ExprId) -> ExprId {
        self.push(Expr::Aggregate { func, arg })
    }

    pub fn max(&mut self, arg: ExprId) -> ExprId {
        self.aggregate(AggFunc::Max, arg)
    }

    pub fn min(&mut self, arg: ExprId) -> ExprId {
        self.aggregate(AggFunc::Min, arg)
    }

    // --- analysis ---

    /// All column references reachable from `id`, left to right.
    ///
    /// Memoized per id: the first call walks the tree, later calls return the
    /// cached slice.
    pub fn source_columns(&self, id: ExprId) -> Result<&[ColumnRef]> {
        let slot = self.slots.get(id.0).ok_or(Error::UnknownExpr(id.0))?;
        if let Some(cached) = slot.sources.get() {
            return Ok(cached.as_slice());
        }
        let computed = match &slot.expr {
            Expr::Literal(_) => Vec::new(),
            Expr::Column(col) => vec![col.clone()],
            Expr::BinaryOp { left, right, .. } => {
                let mut out = self.source_columns(*left)?.to_vec();
                out.extend_from_slice(self.source_columns(*right)?);
                out
            }
            Expr::Aggregate { arg, .. } => self.source_columns(*arg)?.to_vec(),
        };
        Ok(slot.sources.get_or_init(|| computed).as_slice())
    }

    /// Whether `id` is exactly the column reference `qualifier.name`.
    pub fn is_column(&self, id: ExprId, name: &str, qualifier: Qualifier) -> bool {
        matches!(
            self.get(id),
            Ok(Expr::Column(c)) if c.name == name && c.qualifier == qualifier
        )
    }

    /// Structural equality of two expression trees (ids may differ).
    pub fn same_shape(&self, a: ExprId, b: ExprId) -> Result<bool> {
        if a == b {
            return Ok(true);
        }
        Ok(match (self.get(a)?, self.get(b)?) {
            (Expr::Literal(x), Expr::Literal(y)) => x == y && x.type_name() == y.type_name(),
            (Expr::Column(x), Expr::Column(y)) => x == y,
            (
                Expr::BinaryOp {
                    op: op_a,
                    left: la,
                    right: ra,
                },
                Expr::BinaryOp {
                    op: op_b,
                    left: lb,
                    right: rb,
                },
            ) => op_a == op_b && self.same_shape(*la, *lb)? && self.same_shape(*ra, *rb)?,
            (
                Expr::Aggregate { func: fa, arg: aa },
                Expr::Aggregate { func: fb, arg: ab },
            ) => fa == fb && self.same_shape(*aa, *ab)?,
            _ => false,
        })
    }

    /// Copy `id` with every column reference's qualifier replaced by
    /// `requalify(column)`. Returns `id` itself when nothing changes.
    pub fn rewrite_qualifiers<F, E>(
        &mut self,
        id: ExprId,
        requalify: &mut F,
    ) -> std::result::Result<ExprId, E>
    where
        F: FnMut(&ColumnRef) -> std::result::Result<Qualifier, E>,
        E: From<Error>,
    {
        let expr = self.get(id)?.clone();
        match expr {
            Expr::Literal(_) => Ok(id),
            Expr::Column(col) => {
                let qualifier = requalify(&col)?;
                if qualifier == col.qualifier {
                    Ok(id)
                } else {
                    Ok(self.column(col.name, qualifier))
                }
            }
            Expr::BinaryOp { op, left, right } => {
                let new_left = self.rewrite_qualifiers(left, requalify)?;
                let new_right = self.rewrite_qualifiers(right, requalify)?;
                if new_left == left && new_right == right {
                    Ok(id)
                } else {
                    Ok(self.binary(op, new_left, new_right))
                }
            }
            Expr::Aggregate { func, arg } => {
                let new_arg = self.rewrite_qualifiers(arg, requalify)?;
                if new_arg == arg {
                    Ok(id)
                } else {
                    Ok(self.aggregate(func, new_arg))
                }
            }
        }
    }

    // --- evaluation ---

    /// Evaluate `id` against `refs`.
    pub fn evaluate(&self, id: ExprId, refs: &DataRefs<'_>) -> Result<Datum> {
        match self.get(id)? {
            Expr::Literal(v) => Ok(Datum::Scalar(v.clone())),
            Expr::Column(col) => refs.lookup(col),
            Expr::BinaryOp { op, left, right } => {
                let l = self.evaluate(*left, refs)?;
                let r = self.evaluate(*right, refs)?;
                evaluate_binary_datum(*op, l, r)
            }
            Expr::Aggregate { func, arg } => match self.evaluate(*arg, refs)? {
                Datum::Scalar(v) => Ok(Datum::Scalar(reduce_innermost(*func, &v)?)),
                Datum::Column(cells) => cells
                    .iter()
                    .map(|cell| reduce_innermost(*func, cell))
                    .collect::<Result<Vec<_>>>()
                    .map(Datum::Column),
            },
        }
    }

    /// Render `id` in a stable, human-readable form.
    pub fn display(&self, id: ExprId) -> String {
        let mut out = String::new();
        self.write_expr(id, &mut out);
        out
    }

    fn write_expr(&self, id: ExprId, out: &mut String) {
        use std::fmt::Write;
        match self.get(id) {
            Err(_) => {
                let _ = write!(out, "<unknown {id}>");
            }
            Ok(Expr::Literal(v)) => {
                let _ = write!(out, "{v}");
            }
            Ok(Expr::Column(col)) => {
                let _ = write!(out, "{col}");
            }
            Ok(Expr::BinaryOp { op, left, right }) => {
                out.push('(');
                self.write_expr(*left, out);
                let _ = write!(out, " {} ", op.symbol());
                self.write_expr(*right, out);
                out.push(')');
            }
            Ok(Expr::Aggregate { func, arg }) => {
                let _ = write!(out, "{}(", func.name());
                self.write_expr(*arg, out);
                out.push(')');
            }
        }
    }
}

/// Apply a binary operator with column/scalar broadcasting.
fn evaluate_binary_datum(op: BinOp, left: Datum, right: Datum) -> Result<Datum> {
    match (left, right) {
        (Datum::Scalar(a), Datum::Scalar(b)) => Ok(Datum::Scalar(evaluate_binary_op(op, &a, &b)?)),
        (Datum::Column(a), Datum::Column(b)) => {
            if a.len() != b.len() {
                return Err(Error::LengthMismatch {
                    left: a.len(),
                    right: b.len(),
                });
            }
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| evaluate_binary_op(op, x, y))
                .collect::<Result<Vec<_>>>()
                .map(Datum::Column)
        }
        (Datum::Column(a), Datum::Scalar(b)) => a
            .iter()
            .map(|x| evaluate_binary_op(op, x, &b))
            .collect::<Result<Vec<_>>>()
            .map(Datum::Column),
        (Datum::Scalar(a), Datum::Column(b)) => b
            .iter()
            .map(|y| evaluate_binary_op(op, &a, y))
            .collect::<Result<Vec<_>>>()
            .map(Datum::Column),
    }
}

/// Elementwise arithmetic on two values; lists broadcast like arrays.
fn evaluate_binary_op(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    use Value::*;

    match (left, right) {
        (List(a), List(b)) => {
            if a.len() != b.len() {
                return Err(Error::LengthMismatch {
                    left: a.len(),
                    right: b.len(),
                });
            }
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| evaluate_binary_op(op, x, y))
                .collect::<Result<Vec<_>>>()
                .map(List)
        }
        (List(a), b) => a
            .iter()
            .map(|x| evaluate_binary_op(op, x, b))
            .collect::<Result<Vec<_>>>()
            .map(List),
        (a, List(b)) => b
            .iter()
            .map(|y| evaluate_binary_op(op, a, y))
            .collect::<Result<Vec<_>>>()
            .map(List),
        (Int(a), Int(b)) => Ok(match op {
            // Fixed-width integer arrays wrap on overflow.
            BinOp::Add => Int(a.wrapping_add(*b)),
            BinOp::Sub => Int(a.wrapping_sub(*b)),
            BinOp::Mul => Int(a.wrapping_mul(*b)),
            BinOp::Div => Float(*a as f64 / *b as f64),
        }),
        (Int(_) | Float(_), Int(_) | Float(_)) => {
            // Both sides are numeric here.
            let (a, b) = (left.as_f64().unwrap_or_default(), right.as_f64().unwrap_or_default());
            Ok(Float(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
            }))
        }
        _ => Err(Error::type_mismatch(format!(
            "unsupported operands for '{}': {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Reduce the innermost dimension of a list value.
fn reduce_innermost(func: AggFunc, value: &Value) -> Result<Value> {
    let Value::List(items) = value else {
        return Err(Error::type_mismatch(format!(
            "{} expects a list value, got {}",
            func.name(),
            value.type_name()
        )));
    };
    if items.first().map(Value::is_list).unwrap_or(false) {
        return items
            .iter()
            .map(|item| reduce_innermost(func, item))
            .collect::<Result<Vec<_>>>()
            .map(Value::List);
    }

    let mut best: Option<&Value> = None;
    for item in items {
        let x = item.as_f64().ok_or_else(|| {
            Error::type_mismatch(format!(
                "{} expects numeric elements, got {}",
                func.name(),
                item.type_name()
            ))
        })?;
        best = match best {
            None => Some(item),
            Some(current) => {
                let y = current.as_f64().unwrap_or_default();
                let better = match func {
                    AggFunc::Max => x > y,
                    AggFunc::Min => x < y,
                };
                // NaN propagates.
                if better || x.is_nan() {
                    Some(item)
                } else {
                    Some(current)
                }
            }
        };
    }
    let best = best.ok_or(Error::EmptyAggregate { func: func.name() })?;
    // A list holding any float reduces as a float list.
    if items.iter().any(|v| matches!(v, Value::Float(_))) {
        return Ok(Value::Float(best.as_f64().unwrap_or(f64::NAN)));
    }
    Ok(best.clone())
}
