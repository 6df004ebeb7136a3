//! Shared pieces of the projection pushdown protocol.
//!
//! A node may compute a parent's expression itself when every column the
//! expression references is one the node forwards unchanged from its input
//! (a pass-through entry `name: col(name)`). Forwarding is what makes the
//! rewrite sound: the parent's reference to `name` and the node's input
//! column `name` then denote the same data.

use std::collections::{BTreeMap, BTreeSet};

use quarry_core::expr::{ColumnRef, ExprArena, Qualifier};
use quarry_core::projection::Projection;

use crate::traits::{OpError, PlanNode};

/// Outcome of merging candidate expressions into a node's projection.
pub(crate) struct Absorbed {
    pub projection: Projection,
    pub names: Vec<String>,
}

/// Merge every acceptable candidate into a copy of `own`.
///
/// `forwarded` maps each pass-through output name to the qualifier it reads
/// from in the node's input. A candidate is accepted when all of its column
/// references are forwarded; `resolve` then picks the input qualifier for
/// each reference. A candidate may not redefine an existing output with a
/// different expression.
pub(crate) fn absorb<F>(
    arena: &mut ExprArena,
    own: &Projection,
    candidates: &Projection,
    forwarded: &BTreeMap<String, Qualifier>,
    mut resolve: F,
) -> Result<Absorbed, OpError>
where
    F: FnMut(&ColumnRef) -> Result<Qualifier, OpError>,
{
    let mut projection = own.clone();
    let mut names = Vec::new();
    for (name, id) in candidates.iter() {
        let reachable = arena
            .source_columns(id)?
            .iter()
            .all(|c| forwarded.contains_key(&c.name));
        if !reachable {
            continue;
        }
        let rewritten = arena.rewrite_qualifiers(id, &mut resolve)?;
        if let Some(existing) = own.get(name) {
            if !arena.same_shape(existing, rewritten)? {
                continue;
            }
        }
        projection.insert(name, rewritten);
        names.push(name.to_string());
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(offered = candidates.len(), accepted = ?names, "absorbed pushdown candidates");

    Ok(Absorbed { projection, names })
}

/// Names of `own` that are pass-throughs of a column `source` produces.
pub(crate) fn forwarded_from(
    arena: &ExprArena,
    own: &Projection,
    source: &Projection,
    qualifier: Qualifier,
) -> BTreeMap<String, Qualifier> {
    own.iter()
        .filter(|(name, id)| arena.is_column(*id, name, qualifier) && source.contains(name))
        .map(|(name, _)| (name.to_string(), qualifier))
        .collect()
}

/// Replace `child`'s projection with the entries in `needed`.
///
/// At least one column is always kept so batches still carry their row
/// count.
pub(crate) fn prune(child: &dyn PlanNode, needed: &BTreeSet<String>) -> Box<dyn PlanNode> {
    let current = child.projection();
    let mut pruned = current.pruned(needed);
    if pruned.is_empty() {
        if let Some((name, id)) = current.iter().next() {
            pruned.insert(name, id);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        node = child.name(),
        before = current.len(),
        after = pruned.len(),
        "pruned unreferenced columns"
    );

    child.with_projection(pruned)
}
