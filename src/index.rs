//! Reference Index - identifier → node map scoped to one decode
//!
//! Populated while nodes are materialized, consulted while references are
//! bound, then dropped. It is a plain value owned by the decode call, never
//! shared between decodes.

use std::collections::HashMap;
use crate::{Error, Result};
use crate::graph::{Graph, NodeId};

/// Where an identifier landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub node: NodeId,
    pub entity: &'static str,
}

#[derive(Debug, Default)]
pub struct ReferenceIndex {
    entries: HashMap<String, IndexEntry>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Index every node of an existing graph
    pub fn from_graph(graph: &Graph) -> Result<Self> {
        let mut index = Self::with_capacity(graph.len());
        for (id, node) in graph.nodes() {
            index.insert(node.identifier(), id, node.entity().name)?;
        }
        Ok(index)
    }

    /// Record a node. A second node with the same identifier is fatal.
    pub fn insert(&mut self, identifier: &str, node: NodeId, entity: &'static str) -> Result<()> {
        if let Some(existing) = self.entries.get(identifier) {
            return Err(Error::DuplicateIdentifier {
                identifier: identifier.to_string(),
                first: existing.entity.to_string(),
                second: entity.to_string(),
            });
        }
        self.entries
            .insert(identifier.to_string(), IndexEntry { node, entity });
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&IndexEntry> {
        self.entries.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
