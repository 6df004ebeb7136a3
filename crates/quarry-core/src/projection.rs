//! Projections: the named set of expressions defining a node's output.
//!
//! A node's schema *is* its projection. Entries keep insertion order, which
//! is used for display and for the column order of computed batches.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::expr::{ExprArena, ExprId, Qualifier};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    entries: Vec<(String, ExprId)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the definition of `name`. Replacing keeps the
    /// entry's position.
    pub fn insert(&mut self, name: impl Into<String>, expr: ExprId) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = expr,
            None => self.entries.push((name, expr)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, expr: ExprId) -> Self {
        self.insert(name, expr);
        self
    }

    pub fn get(&self, name: &str) -> Option<ExprId> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ExprId)> {
        self.entries.iter().map(|(n, id)| (n.as_str(), *id))
    }

    /// Names of every column referenced by this projection's expressions.
    /// With `side = Some(q)` only references qualified with `q` count.
    pub fn referenced_columns(
        &self,
        arena: &ExprArena,
        side: Option<Qualifier>,
    ) -> Result<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for (_, id) in &self.entries {
            for col in arena.source_columns(*id)? {
                if side.map_or(true, |q| q == col.qualifier) {
                    out.insert(col.name.clone());
                }
            }
        }
        Ok(out)
    }

    /// A copy holding only the entries named in `needed`.
    pub fn pruned(&self, needed: &BTreeSet<String>) -> Projection {
        Projection {
            entries: self
                .entries
                .iter()
                .filter(|(n, _)| needed.contains(n))
                .cloned()
                .collect(),
        }
    }

    /// Render every entry as `(name, expression text)`.
    pub fn describe(&self, arena: &ExprArena) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(n, id)| (n.clone(), arena.display(*id)))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, ExprId)> for Projection {
    fn from_iter<I: IntoIterator<Item = (S, ExprId)>>(iter: I) -> Self {
        let mut out = Projection::new();
        for (name, id) in iter {
            out.insert(name, id);
        }
        out
    }
}
