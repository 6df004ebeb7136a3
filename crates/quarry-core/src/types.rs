//! Values, columns and batches: the data that flows between plan nodes.
//!
//! A `Batch` is columnar (one equal-length `Vec<Value>` per column). Cells may
//! themselves be lists, which is how nested arrays are modeled; row-wise
//! aggregates in `expr` reduce those lists.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Build a list value from anything that converts into values.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            // Handle cross-type numeric comparisons
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// One named column of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// One row, keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Columnar unit of data passed between nodes.
///
/// Invariant: every column has the same number of values. Deserialization
/// goes through `from_columns`, so it holds for decoded batches too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBatch")]
pub struct Batch {
    columns: Vec<Column>,
}

/// Unvalidated wire form of a `Batch`.
#[derive(Deserialize)]
struct RawBatch {
    columns: Vec<Column>,
}

impl TryFrom<RawBatch> for Batch {
    type Error = Error;

    fn try_from(raw: RawBatch) -> Result<Self> {
        Batch::from_columns(raw.columns)
    }
}

impl Batch {
    /// Build a batch from column-major data. All columns must have equal length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.values.len();
            for col in &columns {
                if col.values.len() != expected {
                    return Err(Error::RaggedColumns {
                        column: col.name.clone(),
                        expected,
                        actual: col.values.len(),
                    });
                }
            }
        }
        let mut seen = std::collections::BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::Invariant(format!(
                    "duplicate column '{}' in batch",
                    col.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Convenience constructor from `(name, values)` pairs.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, Vec<V>)>) -> Result<Self>
    where
        N: Into<String>,
        V: Into<Value>,
    {
        Self::from_columns(
            pairs
                .into_iter()
                .map(|(name, values)| {
                    Column::new(name, values.into_iter().map(Into::into).collect())
                })
                .collect(),
        )
    }

    /// Build a batch from row-major data.
    ///
    /// Every row must carry exactly the same field names; the error names the
    /// first field found missing from (or extra in) some row. Column order is
    /// the rows' key order.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self::default());
        };
        let names: Vec<String> = first.keys().cloned().collect();
        for (idx, row) in rows.iter().enumerate() {
            if let Some(missing) = names.iter().find(|n| !row.contains_key(*n)) {
                return Err(Error::HeterogeneousRows {
                    field: missing.clone(),
                    row: idx,
                });
            }
            if row.len() != names.len() {
                let extra = row
                    .keys()
                    .find(|k| !first.contains_key(*k))
                    .cloned()
                    .unwrap_or_default();
                return Err(Error::HeterogeneousRows {
                    field: extra,
                    row: idx,
                });
            }
        }

        let mut columns: Vec<Column> = names
            .iter()
            .map(|n| Column::new(n.clone(), Vec::with_capacity(rows.len())))
            .collect();
        for mut row in rows {
            for col in columns.iter_mut() {
                // Presence was checked above.
                if let Some(v) = row.remove(&col.name) {
                    col.values.push(v);
                }
            }
        }
        Ok(Self { columns })
    }

    /// A zero-row batch with the given column names.
    pub fn empty<N: Into<String>>(names: impl IntoIterator<Item = N>) -> Self {
        Self {
            columns: names
                .into_iter()
                .map(|n| Column::new(n, Vec::new()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Rows `[start, end)` of the named columns, clamped to the batch length.
    pub fn slice(&self, names: &[&str], start: usize, end: usize) -> Result<Batch> {
        let end = end.min(self.len());
        let start = start.min(end);
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let col = self
                .column(name)
                .ok_or_else(|| Error::missing_column(*name, crate::expr::Qualifier::None))?;
            columns.push(Column::new(*name, col.values[start..end].to_vec()));
        }
        Ok(Batch { columns })
    }

    pub fn row(&self, idx: usize) -> Option<Row> {
        if idx >= self.len() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values[idx].clone()))
                .collect(),
        )
    }

    /// Iterate rows as name → value mappings.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shape: ({}, {})", self.len(), self.columns.len())?;
        let header: Vec<&str> = self.column_names().collect();
        writeln!(f, "| {} |", header.join(" | "))?;
        for row in 0..self.len() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.values[row].to_string())
                .collect();
            writeln!(f, "| {} |", cells.join(" | "))?;
        }
        Ok(())
    }
}
