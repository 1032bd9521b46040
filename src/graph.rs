//! Graph - arena representation of one unified lexical resource
//!
//! All nodes of a graph live in one `Vec` and are addressed by [`NodeId`].
//! Owned children are stored as id lists on the parent (the ownership
//! forest); references are stored as [`Reference`] values that either carry
//! the target's business identifier (unresolved) or its arena id (resolved).
//! Cycles among references therefore never create ownership cycles.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use serde::Serialize;
use crate::{Error, Result};
use crate::registry::{TypeInfo, TypeRegistry};
use crate::role::{EntityType, FieldDescriptor, FieldRole, Multiplicity};
use crate::value::Value;

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Value of one reference slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Known only by business identifier (importer-built or mid-decode)
    Unresolved(String),
    /// Bound to a node of this graph
    Resolved(NodeId),
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }
}

/// Storage for one field of a node, aligned with the type's field list.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Scratch value importers may keep; never stored
    Transient(Option<Value>),
    Scalar(Option<Value>),
    Scalars(Vec<Value>),
    Children(Vec<NodeId>),
    Ref(Option<Reference>),
    Refs(Vec<Reference>),
}

impl Slot {
    /// Empty slot for a field: collections start empty, singles start absent
    pub fn empty(field: &FieldDescriptor) -> Self {
        match (field.role, field.multiplicity) {
            (FieldRole::Transient, _) => Slot::Transient(None),
            (FieldRole::Attribute, Multiplicity::One) => Slot::Scalar(None),
            (FieldRole::Attribute, Multiplicity::Many) => Slot::Scalars(Vec::new()),
            (FieldRole::Children, _) => Slot::Children(Vec::new()),
            (FieldRole::Reference, Multiplicity::One) => Slot::Ref(None),
            (FieldRole::Reference, Multiplicity::Many) => Slot::Refs(Vec::new()),
        }
    }
}

/// One instance of an entity type.
#[derive(Debug, Clone)]
pub struct Node {
    entity: &'static EntityType,
    identifier: String,
    parent: Option<(NodeId, &'static str)>,
    slots: Vec<Slot>,
}

impl Node {
    pub fn entity(&self) -> &'static EntityType {
        self.entity
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Owning node and the children field holding this node
    pub fn parent(&self) -> Option<(NodeId, &'static str)> {
        self.parent
    }

    /// Field storage in declaration order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// Identifier alongside mutable slots, for rewriting references in place
    pub(crate) fn split_mut(&mut self) -> (&str, &mut [Slot]) {
        (&self.identifier, &mut self.slots)
    }
}

/// In-memory graph: a rooted forest of owned nodes plus references.
#[derive(Debug, Clone)]
pub struct Graph {
    registry: Arc<TypeRegistry>,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Graph {
    /// Create an empty graph over a registry
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Add a top-level node. The type must be declared as a root.
    pub fn add_root(&mut self, entity: &str, identifier: impl Into<String>) -> Result<NodeId> {
        let info = self.registry.require(entity)?;
        if !info.is_root() {
            return Err(Error::schema(format!("{} is not a root entity type", entity)));
        }
        let node = self.push_node(info.entity, identifier.into(), None)?;
        self.roots.push(node);
        Ok(node)
    }

    /// Append a new node to the children field `field` of `parent`.
    /// The child's type is the field's declared nested type.
    pub fn add_child(&mut self, parent: NodeId, field: &str, identifier: impl Into<String>) -> Result<NodeId> {
        let (pos, descriptor) = self.field_of(parent, field)?;
        if descriptor.role != FieldRole::Children {
            return Err(self.role_error(parent, descriptor, "add a child to"));
        }
        let child_type = self.registry.require(descriptor.target.unwrap_or_default())?.entity;
        let child = self.push_node(child_type, identifier.into(), Some((parent, descriptor.name)))?;
        if let Slot::Children(children) = &mut self.nodes[parent.0].slots[pos] {
            children.push(child);
        }
        Ok(child)
    }

    /// Set a single attribute
    pub fn set_attribute(&mut self, node: NodeId, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let pos = self.check_scalar(node, field, &value, Multiplicity::One)?;
        self.nodes[node.0].slots[pos] = Slot::Scalar(Some(value));
        Ok(())
    }

    /// Clear a single attribute
    pub fn clear_attribute(&mut self, node: NodeId, field: &str) -> Result<()> {
        let (pos, descriptor) = self.field_of(node, field)?;
        if !(descriptor.role == FieldRole::Attribute && !descriptor.is_list()) {
            return Err(self.role_error(node, descriptor, "clear the attribute"));
        }
        self.nodes[node.0].slots[pos] = Slot::Scalar(None);
        Ok(())
    }

    /// Append to a scalar list attribute
    pub fn push_attribute(&mut self, node: NodeId, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let pos = self.check_scalar(node, field, &value, Multiplicity::Many)?;
        if let Slot::Scalars(values) = &mut self.nodes[node.0].slots[pos] {
            values.push(value);
        }
        Ok(())
    }

    /// Keep a scratch value in a transient field
    pub fn set_transient(&mut self, node: NodeId, field: &str, value: impl Into<Value>) -> Result<()> {
        let (pos, descriptor) = self.field_of(node, field)?;
        if descriptor.role != FieldRole::Transient {
            return Err(self.role_error(node, descriptor, "set a transient value on"));
        }
        self.nodes[node.0].slots[pos] = Slot::Transient(Some(value.into()));
        Ok(())
    }

    /// Point a single reference at a node of this graph
    pub fn set_reference(&mut self, node: NodeId, field: &str, target: NodeId) -> Result<()> {
        let pos = self.check_reference(node, field, Some(target), Multiplicity::One)?;
        self.nodes[node.0].slots[pos] = Slot::Ref(Some(Reference::Resolved(target)));
        Ok(())
    }

    /// Point a single reference at a business identifier, resolved later
    pub fn set_reference_id(&mut self, node: NodeId, field: &str, target: impl Into<String>) -> Result<()> {
        let pos = self.check_reference(node, field, None, Multiplicity::One)?;
        self.nodes[node.0].slots[pos] = Slot::Ref(Some(Reference::Unresolved(target.into())));
        Ok(())
    }

    /// Unset a single reference
    pub fn clear_reference(&mut self, node: NodeId, field: &str) -> Result<()> {
        let pos = self.check_reference(node, field, None, Multiplicity::One)?;
        self.nodes[node.0].slots[pos] = Slot::Ref(None);
        Ok(())
    }

    /// Append a node to a reference list
    pub fn push_reference(&mut self, node: NodeId, field: &str, target: NodeId) -> Result<()> {
        let pos = self.check_reference(node, field, Some(target), Multiplicity::Many)?;
        if let Slot::Refs(refs) = &mut self.nodes[node.0].slots[pos] {
            refs.push(Reference::Resolved(target));
        }
        Ok(())
    }

    /// Append a business identifier to a reference list
    pub fn push_reference_id(&mut self, node: NodeId, field: &str, target: impl Into<String>) -> Result<()> {
        let pos = self.check_reference(node, field, None, Multiplicity::Many)?;
        if let Slot::Refs(refs) = &mut self.nodes[node.0].slots[pos] {
            refs.push(Reference::Unresolved(target.into()));
        }
        Ok(())
    }

    // ========== Read access ==========

    /// Get a node by id. Panics on an id from another graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by business identifier (linear scan)
    pub fn find(&self, identifier: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.identifier == identifier)
            .map(NodeId)
    }

    fn slot(&self, node: NodeId, field: &str) -> Option<&Slot> {
        let n = &self.nodes[node.0];
        let info = self.registry.info(n.entity.name)?;
        info.position(field).map(|pos| &n.slots[pos])
    }

    /// Value of a single attribute
    pub fn attribute(&self, node: NodeId, field: &str) -> Option<&Value> {
        match self.slot(node, field) {
            Some(Slot::Scalar(v)) => v.as_ref(),
            _ => None,
        }
    }

    /// Values of a scalar list attribute
    pub fn attributes(&self, node: NodeId, field: &str) -> &[Value] {
        match self.slot(node, field) {
            Some(Slot::Scalars(v)) => v,
            _ => &[],
        }
    }

    /// Owned children of a children field, in order
    pub fn children(&self, node: NodeId, field: &str) -> &[NodeId] {
        match self.slot(node, field) {
            Some(Slot::Children(v)) => v,
            _ => &[],
        }
    }

    /// Value of a single reference
    pub fn reference(&self, node: NodeId, field: &str) -> Option<&Reference> {
        match self.slot(node, field) {
            Some(Slot::Ref(r)) => r.as_ref(),
            _ => None,
        }
    }

    /// Values of a reference list
    pub fn references(&self, node: NodeId, field: &str) -> &[Reference] {
        match self.slot(node, field) {
            Some(Slot::Refs(v)) => v,
            _ => &[],
        }
    }

    /// Resolved target of a single reference
    pub fn target(&self, node: NodeId, field: &str) -> Option<NodeId> {
        match self.reference(node, field) {
            Some(Reference::Resolved(id)) => Some(*id),
            _ => None,
        }
    }

    /// Business identifier a reference points to, resolved or not
    pub fn reference_identifier<'a>(&'a self, reference: &'a Reference) -> &'a str {
        match reference {
            Reference::Unresolved(id) => id,
            Reference::Resolved(node) => &self.nodes[node.0].identifier,
        }
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let mut per_type: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut references = 0;
        let mut unresolved = 0;
        for node in &self.nodes {
            *per_type.entry(node.entity.name).or_default() += 1;
            for slot in &node.slots {
                let refs: &[Reference] = match slot {
                    Slot::Ref(Some(r)) => std::slice::from_ref(r),
                    Slot::Refs(v) => v,
                    _ => &[],
                };
                references += refs.len();
                unresolved += refs.iter().filter(|r| !r.is_resolved()).count();
            }
        }
        GraphStats {
            nodes: self.nodes.len(),
            roots: self.roots.len(),
            references,
            unresolved,
            per_type,
        }
    }

    /// Snapshot of the ownership forest as JSON. References appear as
    /// target identifiers, so two graphs that agree on every attribute,
    /// child order and reference target produce equal snapshots.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.roots.iter().map(|&r| self.node_json(r)).collect())
    }

    fn node_json(&self, id: NodeId) -> serde_json::Value {
        let node = &self.nodes[id.0];
        let mut fields = serde_json::Map::new();
        for (descriptor, slot) in node.entity.fields.iter().zip(&node.slots) {
            let value = match slot {
                Slot::Transient(_) => continue,
                Slot::Scalar(v) => v.as_ref().map(Value::to_json).unwrap_or(serde_json::Value::Null),
                Slot::Scalars(v) => v.iter().map(Value::to_json).collect(),
                Slot::Children(v) => v.iter().map(|&c| self.node_json(c)).collect(),
                Slot::Ref(r) => r
                    .as_ref()
                    .map(|r| serde_json::Value::from(self.reference_identifier(r)))
                    .unwrap_or(serde_json::Value::Null),
                Slot::Refs(v) => v.iter().map(|r| serde_json::Value::from(self.reference_identifier(r))).collect(),
            };
            fields.insert(descriptor.name.to_string(), value);
        }
        serde_json::json!({
            "type": node.entity.name,
            "id": node.identifier,
            "fields": fields,
        })
    }

    // ========== Construction helpers ==========

    /// Append a node with empty slots. Children linkage is the caller's job.
    pub(crate) fn push_node(
        &mut self,
        entity: &'static EntityType,
        identifier: String,
        parent: Option<(NodeId, &'static str)>,
    ) -> Result<NodeId> {
        if identifier.is_empty() {
            return Err(Error::schema(format!("Empty identifier on a {}", entity.name)));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            entity,
            identifier,
            parent,
            slots: entity.fields.iter().map(Slot::empty).collect(),
        });
        Ok(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn roots_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.roots
    }

    /// `node` and every node it owns, preorder
    pub(crate) fn subtree_of(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            out.push(id);
            for slot in self.nodes[id.0].slots.iter().rev() {
                if let Slot::Children(children) = slot {
                    stack.extend(children.iter().rev());
                }
            }
        }
        out
    }

    /// Drop `doomed` and compact the arena, renumbering the survivors.
    /// `doomed` must be closed under ownership. Resolved references to a
    /// dropped node fall back to its identifier.
    pub(crate) fn remove_nodes(&mut self, doomed: &HashSet<NodeId>) {
        if doomed.is_empty() {
            return;
        }
        let mut remap: Vec<Option<NodeId>> = Vec::with_capacity(self.nodes.len());
        let mut dropped: HashMap<usize, String> = HashMap::with_capacity(doomed.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if doomed.contains(&NodeId(i)) {
                remap.push(None);
                dropped.insert(i, node.identifier.clone());
            } else {
                remap.push(Some(NodeId(i - dropped.len())));
            }
        }

        let rebind = |r: Reference| match r {
            Reference::Resolved(n) => match remap[n.0] {
                Some(n) => Reference::Resolved(n),
                None => Reference::Unresolved(dropped.get(&n.0).cloned().unwrap_or_default()),
            },
            other => other,
        };

        let old = std::mem::take(&mut self.nodes);
        self.nodes = old
            .into_iter()
            .enumerate()
            .filter(|(i, _)| remap[*i].is_some())
            .map(|(_, mut node)| {
                node.parent = node.parent.and_then(|(p, f)| remap[p.0].map(|p| (p, f)));
                for slot in &mut node.slots {
                    match slot {
                        Slot::Children(children) => {
                            *children = children.iter().filter_map(|c| remap[c.0]).collect();
                        }
                        Slot::Ref(r) => *r = r.take().map(&rebind),
                        Slot::Refs(refs) => *refs = refs.drain(..).map(&rebind).collect(),
                        _ => {}
                    }
                }
                node
            })
            .collect();
        self.roots = self.roots.iter().filter_map(|r| remap[r.0]).collect();
    }

    fn info(&self, node: NodeId) -> Result<&TypeInfo> {
        self.registry.require(self.nodes[node.0].entity.name)
    }

    fn field_of(&self, node: NodeId, field: &str) -> Result<(usize, &'static FieldDescriptor)> {
        let info = self.info(node)?;
        info.field(field).ok_or_else(|| {
            Error::schema(format!("{} has no field '{}'", info.entity.name, field))
        })
    }

    fn role_error(&self, node: NodeId, descriptor: &FieldDescriptor, action: &str) -> Error {
        let n = &self.nodes[node.0];
        Error::schema(format!(
            "Cannot {} {} field '{}' of {} '{}'",
            action, descriptor.role, descriptor.name, n.entity.name, n.identifier
        ))
    }

    fn check_scalar(&self, node: NodeId, field: &str, value: &Value, multiplicity: Multiplicity) -> Result<usize> {
        let (pos, descriptor) = self.field_of(node, field)?;
        if descriptor.role != FieldRole::Attribute || descriptor.multiplicity != multiplicity {
            return Err(self.role_error(node, descriptor, "store a scalar in"));
        }
        if descriptor.scalar != Some(value.kind()) || !value.is_storable() {
            let n = &self.nodes[node.0];
            return Err(Error::InvalidValue {
                entity: n.entity.name.to_string(),
                identifier: n.identifier.clone(),
                field: descriptor.name.to_string(),
                kind: descriptor.scalar.unwrap_or(value.kind()),
                value: value.to_text(),
            });
        }
        Ok(pos)
    }

    fn check_reference(
        &self,
        node: NodeId,
        field: &str,
        target: Option<NodeId>,
        multiplicity: Multiplicity,
    ) -> Result<usize> {
        let (pos, descriptor) = self.field_of(node, field)?;
        if descriptor.role != FieldRole::Reference || descriptor.multiplicity != multiplicity {
            return Err(self.role_error(node, descriptor, "store a reference in"));
        }
        if let Some(target) = target {
            let t = &self.nodes[target.0];
            if Some(t.entity.name) != descriptor.target {
                let n = &self.nodes[node.0];
                return Err(Error::ReferenceTypeMismatch {
                    referrer: n.identifier.clone(),
                    entity: n.entity.name.to_string(),
                    field: descriptor.name.to_string(),
                    target: t.identifier.clone(),
                    expected: descriptor.target.unwrap_or_default().to_string(),
                    found: t.entity.name.to_string(),
                });
            }
        }
        Ok(pos)
    }
}

/// Statistics about a graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub roots: usize,
    pub references: usize,
    pub unresolved: usize,
    pub per_type: BTreeMap<&'static str, usize>,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph Statistics:")?;
        writeln!(f, "  Nodes: {} ({} roots)", self.nodes, self.roots)?;
        writeln!(f, "  References: {} ({} unresolved)", self.references, self.unresolved)?;
        for (entity, count) in &self.per_type {
            writeln!(f, "  {}: {}", entity, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;

    fn graph() -> Graph {
        Graph::new(model::registry().unwrap())
    }

    #[test]
    fn test_build_and_read_back() {
        let mut g = graph();
        let res = g.add_root("LexicalResource", "res").unwrap();
        let lex = g.add_child(res, "lexicons", "lex-en").unwrap();
        g.set_attribute(lex, "language", "en").unwrap();
        let e1 = g.add_child(lex, "entries", "e1").unwrap();
        let e2 = g.add_child(lex, "entries", "e2").unwrap();

        assert_eq!(g.children(lex, "entries"), &[e1, e2]);
        assert_eq!(g.attribute(lex, "language"), Some(&Value::text("en")));
        assert_eq!(g.node(e1).parent(), Some((lex, "entries")));
        assert_eq!(g.node(e2).entity().name, "LexicalEntry");
        assert_eq!(g.find("e2"), Some(e2));
        assert!(g.children(e1, "senses").is_empty());
    }

    #[test]
    fn test_role_violations_rejected() {
        let mut g = graph();
        let res = g.add_root("LexicalResource", "res").unwrap();
        let lex = g.add_child(res, "lexicons", "lex").unwrap();

        // children field used as attribute
        assert!(g.set_attribute(res, "lexicons", "x").is_err());
        // wrong scalar kind
        assert!(matches!(
            g.set_attribute(lex, "language", 3i64),
            Err(Error::InvalidValue { .. })
        ));
        // unknown field
        assert!(g.set_attribute(lex, "colour", "red").is_err());
        // floats SQLite cannot keep
        let entry = g.add_child(lex, "entries", "e").unwrap();
        let sense = g.add_child(entry, "senses", "s").unwrap();
        assert!(matches!(
            g.set_attribute(sense, "frequency", f64::NAN),
            Err(Error::InvalidValue { ref field, .. }) if field == "frequency"
        ));
        assert!(g.set_attribute(sense, "frequency", f64::INFINITY).is_err());
        assert_eq!(g.attribute(sense, "frequency"), None);
        // non-root type at the top
        assert!(g.add_root("Lexicon", "other").is_err());
    }

    #[test]
    fn test_reference_type_checked() {
        let mut g = graph();
        let res = g.add_root("LexicalResource", "res").unwrap();
        let lex = g.add_child(res, "lexicons", "lex").unwrap();
        let entry = g.add_child(lex, "entries", "e").unwrap();
        let sense = g.add_child(entry, "senses", "s").unwrap();
        let synset = g.add_child(lex, "synsets", "ss").unwrap();

        g.set_reference(sense, "synset", synset).unwrap();
        assert_eq!(g.target(sense, "synset"), Some(synset));

        let err = g.set_reference(sense, "synset", entry).unwrap_err();
        assert!(matches!(err, Error::ReferenceTypeMismatch { .. }));

        g.set_reference_id(sense, "synset", "ss-later").unwrap();
        assert_eq!(g.reference(sense, "synset"), Some(&Reference::Unresolved("ss-later".into())));
        assert_eq!(g.stats().unresolved, 1);
    }

    #[test]
    fn test_snapshot_uses_identifiers() {
        let mut g = graph();
        let res = g.add_root("LexicalResource", "res").unwrap();
        let lex = g.add_child(res, "lexicons", "lex").unwrap();
        let synset = g.add_child(lex, "synsets", "ss1").unwrap();
        let entry = g.add_child(lex, "entries", "e").unwrap();
        let sense = g.add_child(entry, "senses", "s").unwrap();
        g.set_reference(sense, "synset", synset).unwrap();

        let snapshot = g.to_json();
        let sense_json = &snapshot[0]["fields"]["lexicons"][0]["fields"]["entries"][0]["fields"]["senses"][0];
        assert_eq!(sense_json["id"], "s");
        assert_eq!(sense_json["fields"]["synset"], "ss1");
    }

    #[test]
    fn test_remove_subtree_compacts_arena() {
        let mut g = graph();
        let res = g.add_root("LexicalResource", "res").unwrap();
        let lex = g.add_child(res, "lexicons", "lex").unwrap();
        let entry = g.add_child(lex, "entries", "e").unwrap();
        g.add_child(entry, "senses", "s").unwrap();
        let synset = g.add_child(lex, "synsets", "ss").unwrap();
        let keep = g.add_child(lex, "entries", "f").unwrap();
        let sense = g.add_child(keep, "senses", "t").unwrap();
        g.set_reference(sense, "synset", synset).unwrap();

        let mut doomed: HashSet<NodeId> = g.subtree_of(entry).into_iter().collect();
        assert_eq!(doomed.len(), 2);
        doomed.extend(g.subtree_of(synset));
        g.remove_nodes(&doomed);

        assert_eq!(g.len(), 4);
        assert!(g.find("e").is_none() && g.find("s").is_none());
        let lex = g.find("lex").unwrap();
        let keep = g.find("f").unwrap();
        assert_eq!(g.children(lex, "entries"), &[keep]);
        assert!(g.children(lex, "synsets").is_empty());
        assert_eq!(g.node(keep).parent(), Some((lex, "entries")));
        let sense = g.find("t").unwrap();
        assert_eq!(g.reference(sense, "synset"), Some(&Reference::Unresolved("ss".into())));
    }
}
