//! Aggregation topology: allowed parents and cycle detection

use std::collections::HashSet;

use tracing::warn;

use crate::model::{AggregationNode, Schema, SchemaObject};

impl Schema {
    /// Object that may directly enclose `node` when groups are nested.
    ///
    /// Inheritance-only edges are followed transparently to their own parent;
    /// the first nesting edge decides. A root node yields `None`.
    pub fn nesting_parent(&self, node: &AggregationNode) -> Option<&SchemaObject> {
        let mut visited = HashSet::new();
        let mut current = node;
        loop {
            if !visited.insert(current.id.as_str()) {
                warn!(node = %node.id, "Cyclic inheritance chain in aggregation topology");
                return None;
            }
            let parent = self.aggregation(current.parent.as_deref()?)?;
            if current.parent_connection.is_nesting() {
                return self.object(&parent.object);
            }
            current = parent;
        }
    }

    /// All objects allowed to enclose `object`, one per aggregation node,
    /// without duplicates.
    pub fn allowed_parents(&self, object: &SchemaObject) -> Vec<&SchemaObject> {
        let mut parents: Vec<&SchemaObject> = Vec::new();
        for node in self.aggregations_of(&object.ident_value) {
            if let Some(parent) = self.nesting_parent(node) {
                if !parents.iter().any(|p| p.ident_value == parent.ident_value) {
                    parents.push(parent);
                }
            }
        }
        parents
    }
}

/// Follow `next` from `start` and report the first id seen twice.
pub(crate) fn find_cycle<'a>(
    start: &'a str,
    next: impl Fn(&str) -> Option<&'a str>,
) -> Option<Vec<&'a str>> {
    let mut chain = vec![start];
    let mut visited = HashSet::from([start]);
    let mut current = start;
    while let Some(parent) = next(current) {
        chain.push(parent);
        if !visited.insert(parent) {
            return Some(chain);
        }
        current = parent;
    }
    None
}
