//! Structural plan records for diagnostics.
//!
//! A `PlanRecord` is a plain-data snapshot of a node tree: kind, detail,
//! projection (expressions rendered as text) and children. Records are
//! serializable so plans can be dumped as JSON and fingerprinted.

use std::fmt;

use serde::{Deserialize, Serialize};

use quarry_core::error::Result;
use quarry_core::hash::{hash_serde, Hash256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionEntry {
    pub name: String,
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
    pub projection: Vec<ProjectionEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<PlanRecord>,
}

impl PlanRecord {
    pub fn new(
        kind: impl Into<String>,
        detail: Option<String>,
        projection: Vec<(String, String)>,
        children: Vec<PlanRecord>,
    ) -> Self {
        Self {
            kind: kind.into(),
            detail,
            projection: projection
                .into_iter()
                .map(|(name, expr)| ProjectionEntry { name, expr })
                .collect(),
            children,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// blake3 of the record's JSON encoding; equal plans hash equal.
    pub fn fingerprint(&self) -> Result<Hash256> {
        hash_serde(self)
    }

    /// Total number of nodes in the record tree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PlanRecord::node_count).sum::<usize>()
    }

    /// Look up a projection entry's expression text by output name.
    pub fn expr_of(&self, name: &str) -> Option<&str> {
        self.projection
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.expr.as_str())
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        write!(f, "{pad}{}", self.kind)?;
        if let Some(detail) = &self.detail {
            write!(f, " [{detail}]")?;
        }
        let entries: Vec<String> = self
            .projection
            .iter()
            .map(|e| format!("{}: {}", e.name, e.expr))
            .collect();
        writeln!(f, " {{{}}}", entries.join(", "))?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for PlanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
