//! Graph Decoder - rebuilds a graph from a record stream in two phases
//!
//! Phase 1 materializes every node, fills attributes, hooks each node into
//! its owner's collection and indexes it by identifier. References are
//! parked as [`Reference::Unresolved`]. Phase 2 walks the parked references
//! and binds them through the [`ReferenceIndex`], which is why forward and
//! cyclic references come back intact: by the time anything is bound, every
//! node already exists.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::{Error, Result};
use crate::graph::{Graph, NodeId, Reference, Slot};
use crate::index::ReferenceIndex;
use crate::registry::TypeRegistry;
use crate::role::{FieldDescriptor, FieldRole, Multiplicity};
use crate::stream::{FieldValue, NodeRecord, RecordSource, RefValue};
use crate::value::Value;

/// What to do with a reference whose target cannot be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Fail the decode on the first miss
    Strict,
    /// Leave the field unset, keep going, report a warning. A node whose
    /// required reference misses is dropped with its subtree.
    Lenient,
}

impl ResolutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMode::Strict => "strict",
            ResolutionMode::Lenient => "lenient",
        }
    }
}

impl FromStr for ResolutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ResolutionMode::Strict),
            "lenient" => Ok(ResolutionMode::Lenient),
            other => Err(format!("unknown resolution mode '{}' (expected strict or lenient)", other)),
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reference could not be bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MissReason {
    /// No node carries the identifier
    Missing,
    /// A node carries it, but of the wrong type
    WrongType { found: String },
}

/// One reference left unset by a lenient decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionWarning {
    pub referrer: String,
    pub entity: String,
    pub field: String,
    pub target: String,
    #[serde(flatten)]
    pub reason: MissReason,
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' field '{}' -> '{}'",
            self.entity, self.referrer, self.field, self.target
        )?;
        match &self.reason {
            MissReason::Missing => write!(f, " (no such identifier)"),
            MissReason::WrongType { found } => write!(f, " (is a {})", found),
        }
    }
}

/// Counters gathered during one decode
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodeStats {
    pub records: usize,
    pub references: usize,
    pub resolved: usize,
    pub dropped: usize,
    /// Nodes removed because a required reference missed
    pub pruned: usize,
}

impl fmt::Display for DecodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Decode Stats:")?;
        writeln!(f, "  Records: {}", self.records)?;
        writeln!(f, "  References: {}", self.references)?;
        writeln!(f, "  Resolved: {}", self.resolved)?;
        writeln!(f, "  Dropped: {}", self.dropped)?;
        writeln!(f, "  Pruned: {}", self.pruned)
    }
}

/// Outcome of a successful decode
#[derive(Debug)]
pub struct Decoded {
    pub graph: Graph,
    pub warnings: Vec<ResolutionWarning>,
    pub stats: DecodeStats,
}

/// Rebuilds graphs from record streams.
#[derive(Debug, Clone)]
pub struct Decoder {
    registry: Arc<TypeRegistry>,
    mode: ResolutionMode,
}

impl Decoder {
    pub fn new(registry: Arc<TypeRegistry>, mode: ResolutionMode) -> Self {
        Self { registry, mode }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Drain `source` and rebuild the graph it describes
    pub fn decode<S: RecordSource + ?Sized>(&self, source: &mut S) -> Result<Decoded> {
        let mut graph = Graph::new(Arc::clone(&self.registry));
        let mut index = ReferenceIndex::new();
        // order key per arena slot
        let mut orders: Vec<i64> = Vec::new();

        while let Some(record) = source.next_record()? {
            let order = record.order;
            let node = self.materialize(&mut graph, &index, record)?;
            let n = graph.node(node);
            index.insert(n.identifier(), node, n.entity().name)?;
            orders.push(order);
        }
        sort_by_order(&mut graph, &orders);
        tracing::debug!("Materialized {} nodes", graph.len());

        let mut stats = DecodeStats {
            records: graph.len(),
            ..DecodeStats::default()
        };
        let warnings = resolve(&mut graph, index, self.mode, &mut stats)?;
        tracing::info!(
            "Decoded {} nodes, {} references ({} dropped)",
            stats.records,
            stats.references,
            stats.dropped
        );

        Ok(Decoded { graph, warnings, stats })
    }

    fn materialize(&self, graph: &mut Graph, index: &ReferenceIndex, record: NodeRecord) -> Result<NodeId> {
        let info = self.registry.require(record.entity)?;
        let entity = info.entity;

        // (owner node, owner field name, slot position)
        let parent = match &record.parent {
            None if info.is_root() => None,
            None => {
                return Err(Error::schema(format!(
                    "{} '{}' has no parent but is not a root entity type",
                    entity.name, record.identifier
                )));
            }
            Some(link) => {
                let owner = index.get(&link.identifier).ok_or_else(|| Error::OrphanRecord {
                    entity: entity.name.to_string(),
                    identifier: record.identifier.clone(),
                    parent: link.identifier.clone(),
                })?;
                let (pos, field) = self
                    .registry
                    .require(owner.entity)?
                    .field(link.field)
                    .filter(|(_, d)| d.role == FieldRole::Children && d.target == Some(entity.name))
                    .ok_or_else(|| {
                        Error::schema(format!(
                            "{} '{}' cannot be owned by field '{}' of {} '{}'",
                            entity.name, record.identifier, link.field, owner.entity, link.identifier
                        ))
                    })?;
                Some((owner.node, field.name, pos))
            }
        };

        let node = graph.push_node(entity, record.identifier, parent.map(|(p, f, _)| (p, f)))?;
        match parent {
            Some((owner, _, pos)) => {
                if let Slot::Children(children) = &mut graph.node_mut(owner).slots_mut()[pos] {
                    children.push(node);
                }
            }
            None => graph.roots_mut().push(node),
        }

        for field in record.fields {
            let (pos, descriptor) = info.field(field.name).ok_or_else(|| {
                Error::schema(format!("{} has no field '{}'", entity.name, field.name))
            })?;
            let slot = fill_slot(descriptor, field.value).map_err(|miss| match miss {
                FillError::Role => Error::schema(format!(
                    "Value for {}.{} does not fit its {} role",
                    entity.name, descriptor.name, descriptor.role
                )),
                FillError::Kind(value) => Error::InvalidValue {
                    entity: entity.name.to_string(),
                    identifier: graph.node(node).identifier().to_string(),
                    field: descriptor.name.to_string(),
                    kind: descriptor.scalar.unwrap_or(value.kind()),
                    value: value.to_text(),
                },
            })?;
            graph.node_mut(node).slots_mut()[pos] = slot;
        }

        let n = graph.node(node);
        for (descriptor, slot) in entity.fields.iter().zip(n.slots()) {
            if descriptor.required && matches!(slot, Slot::Scalar(None) | Slot::Ref(None)) {
                return Err(Error::MissingRequired {
                    entity: entity.name.to_string(),
                    identifier: n.identifier().to_string(),
                    field: descriptor.name.to_string(),
                });
            }
        }

        Ok(node)
    }
}

enum FillError {
    /// Value shape does not match the declared role and multiplicity
    Role,
    /// Scalar of the wrong kind
    Kind(Value),
}

fn check_kind(descriptor: &FieldDescriptor, value: Value) -> std::result::Result<Value, FillError> {
    if descriptor.scalar == Some(value.kind()) && value.is_storable() {
        Ok(value)
    } else {
        Err(FillError::Kind(value))
    }
}

fn fill_slot(descriptor: &FieldDescriptor, value: FieldValue) -> std::result::Result<Slot, FillError> {
    let slot = match (descriptor.role, descriptor.multiplicity, value) {
        (FieldRole::Attribute, Multiplicity::One, FieldValue::Scalar(v)) => {
            Slot::Scalar(v.map(|v| check_kind(descriptor, v)).transpose()?)
        }
        (FieldRole::Attribute, Multiplicity::Many, FieldValue::Scalars(values)) => Slot::Scalars(
            values
                .into_iter()
                .map(|v| check_kind(descriptor, v))
                .collect::<std::result::Result<_, _>>()?,
        ),
        (FieldRole::Reference, Multiplicity::One, FieldValue::Reference(r)) => Slot::Ref(match r {
            RefValue::Absent => None,
            RefValue::Target(id) => Some(Reference::Unresolved(id)),
        }),
        (FieldRole::Reference, Multiplicity::Many, FieldValue::References(ids)) => {
            Slot::Refs(ids.into_iter().map(Reference::Unresolved).collect())
        }
        _ => return Err(FillError::Role),
    };
    Ok(slot)
}

/// Children lists and roots follow the recorded order key, not arrival.
/// The sort is stable so equal keys keep stream order.
fn sort_by_order(graph: &mut Graph, orders: &[i64]) {
    for i in 0..graph.len() {
        for slot in graph.node_mut(NodeId(i)).slots_mut() {
            if let Slot::Children(children) = slot {
                children.sort_by_key(|c| orders[c.index()]);
            }
        }
    }
    graph.roots_mut().sort_by_key(|r| orders[r.index()]);
}

struct Resolver<'a> {
    index: &'a ReferenceIndex,
    mode: ResolutionMode,
    stats: &'a mut DecodeStats,
    warnings: Vec<ResolutionWarning>,
}

impl Resolver<'_> {
    /// Bind one parked identifier. `Ok(None)` means a lenient miss.
    fn bind(
        &mut self,
        referrer: &str,
        entity: &str,
        descriptor: &FieldDescriptor,
        target: String,
    ) -> Result<Option<Reference>> {
        self.stats.references += 1;
        let expected = descriptor.target.unwrap_or_default();
        let reason = match self.index.get(&target) {
            Some(entry) if entry.entity == expected => {
                self.stats.resolved += 1;
                return Ok(Some(Reference::Resolved(entry.node)));
            }
            Some(entry) => MissReason::WrongType {
                found: entry.entity.to_string(),
            },
            None => MissReason::Missing,
        };

        match (self.mode, reason) {
            (ResolutionMode::Strict, MissReason::Missing) => Err(Error::UnresolvedReference {
                referrer: referrer.to_string(),
                entity: entity.to_string(),
                field: descriptor.name.to_string(),
                target,
            }),
            (ResolutionMode::Strict, MissReason::WrongType { found }) => Err(Error::ReferenceTypeMismatch {
                referrer: referrer.to_string(),
                entity: entity.to_string(),
                field: descriptor.name.to_string(),
                target,
                expected: expected.to_string(),
                found,
            }),
            (ResolutionMode::Lenient, reason) => {
                let warning = ResolutionWarning {
                    referrer: referrer.to_string(),
                    entity: entity.to_string(),
                    field: descriptor.name.to_string(),
                    target,
                    reason,
                };
                tracing::warn!("Unresolved reference: {}", warning);
                self.stats.dropped += 1;
                self.warnings.push(warning);
                Ok(None)
            }
        }
    }
}

/// Nodes whose required single reference cannot be bound, with their
/// subtrees. Repeats until every survivor's required references point at
/// survivors, since dropping a node can strand references to it.
fn dangling_owners(graph: &Graph, index: &ReferenceIndex) -> (HashSet<NodeId>, Vec<ResolutionWarning>) {
    let mut doomed: HashSet<NodeId> = HashSet::new();
    let mut warnings = Vec::new();
    loop {
        let mut changed = false;
        for (id, node) in graph.nodes() {
            if doomed.contains(&id) {
                continue;
            }
            let entity = node.entity();
            for (descriptor, slot) in entity.fields.iter().zip(node.slots()) {
                let Slot::Ref(Some(reference)) = slot else { continue };
                if !descriptor.required {
                    continue;
                }
                let (target, found) = match reference {
                    Reference::Unresolved(t) => (t.as_str(), index.get(t).map(|e| (e.node, e.entity))),
                    Reference::Resolved(n) => {
                        let t = graph.node(*n);
                        (t.identifier(), Some((*n, t.entity().name)))
                    }
                };
                let expected = descriptor.target.unwrap_or_default();
                let reason = match found {
                    Some((n, e)) if e == expected && !doomed.contains(&n) => continue,
                    Some((_, e)) if e != expected => MissReason::WrongType { found: e.to_string() },
                    _ => MissReason::Missing,
                };
                warnings.push(ResolutionWarning {
                    referrer: node.identifier().to_string(),
                    entity: entity.name.to_string(),
                    field: descriptor.name.to_string(),
                    target: target.to_string(),
                    reason,
                });
                doomed.extend(graph.subtree_of(id));
                changed = true;
                break;
            }
        }
        if !changed {
            return (doomed, warnings);
        }
    }
}

/// Rewrite every parked reference of `graph` through `index`.
fn resolve(
    graph: &mut Graph,
    index: ReferenceIndex,
    mode: ResolutionMode,
    stats: &mut DecodeStats,
) -> Result<Vec<ResolutionWarning>> {
    let mut warnings = Vec::new();
    let index = match mode {
        ResolutionMode::Strict => index,
        ResolutionMode::Lenient => {
            let (doomed, pruned) = dangling_owners(graph, &index);
            if doomed.is_empty() {
                index
            } else {
                for w in &pruned {
                    tracing::warn!("Dropping {} '{}': required reference unresolved: {}", w.entity, w.referrer, w);
                }
                stats.references += pruned.len();
                stats.dropped += pruned.len();
                stats.pruned += doomed.len();
                warnings = pruned;
                graph.remove_nodes(&doomed);
                ReferenceIndex::from_graph(graph)?
            }
        }
    };

    let mut resolver = Resolver {
        index: &index,
        mode,
        stats,
        warnings,
    };

    for i in 0..graph.len() {
        let node = graph.node_mut(NodeId(i));
        let entity = node.entity();
        let (identifier, slots) = node.split_mut();
        for (descriptor, slot) in entity.fields.iter().zip(slots.iter_mut()) {
            match slot {
                Slot::Ref(r) => {
                    *r = match r.take() {
                        Some(Reference::Unresolved(target)) => {
                            resolver.bind(identifier, entity.name, descriptor, target)?
                        }
                        other => other,
                    };
                }
                Slot::Refs(refs) => {
                    let mut bound = Vec::with_capacity(refs.len());
                    for r in refs.drain(..) {
                        match r {
                            Reference::Unresolved(target) => {
                                if let Some(r) = resolver.bind(identifier, entity.name, descriptor, target)? {
                                    bound.push(r);
                                }
                            }
                            resolved => bound.push(resolved),
                        }
                    }
                    *refs = bound;
                }
                _ => {}
            }
        }
    }

    Ok(resolver.warnings)
}

impl Graph {
    /// Bind references an importer set by identifier.
    ///
    /// Already resolved references are left alone. In strict mode a miss
    /// returns an error and the graph keeps whatever was bound before it.
    /// In lenient mode nodes whose required reference misses are removed
    /// with their subtrees, which renumbers the remaining [`NodeId`]s.
    pub fn link(&mut self, mode: ResolutionMode) -> Result<Vec<ResolutionWarning>> {
        let index = ReferenceIndex::from_graph(self)?;
        let mut stats = DecodeStats::default();
        let warnings = resolve(self, index, mode, &mut stats)?;
        tracing::debug!("Linked {} of {} references", stats.resolved, stats.references);
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Encoder;
    use crate::model;
    use crate::stream::{FieldRecord, ParentLink, ReplaySource};

    fn rec(
        entity: &'static str,
        identifier: &str,
        parent: Option<(&str, &'static str)>,
        order: i64,
        fields: Vec<(&'static str, FieldValue)>,
    ) -> NodeRecord {
        NodeRecord {
            entity,
            identifier: identifier.to_string(),
            parent: parent.map(|(p, field)| ParentLink {
                identifier: p.to_string(),
                field,
            }),
            order,
            depth: 0,
            fields: fields
                .into_iter()
                .map(|(name, value)| FieldRecord { name, value })
                .collect(),
        }
    }

    fn target(id: &str) -> FieldValue {
        FieldValue::Reference(RefValue::Target(id.to_string()))
    }

    fn head() -> Vec<NodeRecord> {
        vec![
            rec("LexicalResource", "res", None, 0, vec![("label", FieldValue::Scalar(Some(Value::text("r"))))]),
            rec("Lexicon", "lex", Some(("res", "lexicons")), 0, vec![("language", FieldValue::Scalar(Some(Value::text("en"))))]),
        ]
    }

    fn decode(records: Vec<NodeRecord>, mode: ResolutionMode) -> Result<Decoded> {
        Decoder::new(model::registry().unwrap(), mode).decode(&mut ReplaySource::new(records))
    }

    #[test]
    fn test_forward_and_cyclic_references() {
        let mut records = head();
        // relation ra points at ss2 before ss2 exists; ss2 points back at ss1
        records.push(rec("Synset", "ss1", Some(("lex", "synsets")), 0, vec![]));
        records.push(rec("SynsetRelation", "ra", Some(("ss1", "relations")), 0, vec![
            ("relType", FieldValue::Scalar(Some(Value::text("hypernym")))),
            ("target", target("ss2")),
        ]));
        records.push(rec("Synset", "ss2", Some(("lex", "synsets")), 1, vec![]));
        records.push(rec("SynsetRelation", "rb", Some(("ss2", "relations")), 0, vec![
            ("relType", FieldValue::Scalar(Some(Value::text("hyponym")))),
            ("target", target("ss1")),
        ]));

        let decoded = decode(records, ResolutionMode::Strict).unwrap();
        let g = &decoded.graph;
        let (ss1, ss2) = (g.find("ss1").unwrap(), g.find("ss2").unwrap());
        assert_eq!(g.target(g.find("ra").unwrap(), "target"), Some(ss2));
        assert_eq!(g.target(g.find("rb").unwrap(), "target"), Some(ss1));
        assert_eq!(decoded.stats.resolved, 2);
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn test_children_sorted_by_order_key() {
        let mut records = head();
        records.push(rec("LexicalEntry", "second", Some(("lex", "entries")), 1, vec![]));
        records.push(rec("LexicalEntry", "first", Some(("lex", "entries")), 0, vec![]));

        let g = decode(records, ResolutionMode::Strict).unwrap().graph;
        let lex = g.find("lex").unwrap();
        let ids: Vec<_> = g.children(lex, "entries").iter().map(|&c| g.node(c).identifier()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_dangling_reference_strict_vs_lenient() {
        let mut records = head();
        records.push(rec("LexicalEntry", "e", Some(("lex", "entries")), 0, vec![
            ("frames", FieldValue::References(vec!["nowhere".into()])),
        ]));
        records.push(rec("Sense", "s", Some(("e", "senses")), 0, vec![("synset", target("ghost"))]));

        let err = decode(records.clone(), ResolutionMode::Strict).unwrap_err();
        assert!(err.to_string().contains("nowhere"));

        let decoded = decode(records, ResolutionMode::Lenient).unwrap();
        let g = &decoded.graph;
        assert_eq!(g.reference(g.find("s").unwrap(), "synset"), None);
        assert!(g.references(g.find("e").unwrap(), "frames").is_empty());
        assert_eq!(decoded.warnings.len(), 2);
        assert_eq!(decoded.warnings[1].target, "ghost");
        assert_eq!(decoded.warnings[1].reason, MissReason::Missing);
        assert_eq!(decoded.stats.dropped, 2);
    }

    #[test]
    fn test_lenient_drops_owner_of_dangling_required_reference() {
        let mut g = model::sample_graph(model::registry().unwrap()).unwrap();
        let rel = g.find("bank-n-2-rel-1").unwrap();
        g.set_reference_id(rel, "target", "ghost").unwrap();
        let records = Encoder::new(&g).collect_records().unwrap();

        assert!(decode(records.clone(), ResolutionMode::Strict).is_err());

        let decoded = decode(records, ResolutionMode::Lenient).unwrap();
        assert_eq!(decoded.warnings.len(), 1);
        assert_eq!(decoded.warnings[0].referrer, "bank-n-2-rel-1");
        assert_eq!(decoded.warnings[0].target, "ghost");
        assert_eq!(decoded.stats.pruned, 1);
        assert_eq!(decoded.stats.records, g.len());

        let out = &decoded.graph;
        assert_eq!(out.len(), g.len() - 1);
        assert!(out.find("bank-n-2-rel-1").is_none());
        let money = out.find("bank-n-2").unwrap();
        assert!(out.children(money, "relations").is_empty());
        assert_eq!(out.children(money, "subsenses").len(), 1);
        assert_eq!(out.stats().unresolved, 0);

        // what survives a lenient decode encodes and decodes strictly
        let again = Encoder::new(out).collect_records().unwrap();
        let strict = decode(again, ResolutionMode::Strict).unwrap();
        assert_eq!(strict.graph.to_json(), out.to_json());
    }

    #[test]
    fn test_wrong_target_type_is_a_miss() {
        let mut records = head();
        records.push(rec("LexicalEntry", "e", Some(("lex", "entries")), 0, vec![]));
        records.push(rec("Sense", "s", Some(("e", "senses")), 0, vec![("synset", target("e"))]));

        let err = decode(records.clone(), ResolutionMode::Strict).unwrap_err();
        assert!(matches!(err, Error::ReferenceTypeMismatch { ref found, .. } if found == "LexicalEntry"));

        let decoded = decode(records, ResolutionMode::Lenient).unwrap();
        assert_eq!(
            decoded.warnings[0].reason,
            MissReason::WrongType { found: "LexicalEntry".into() }
        );
    }

    #[test]
    fn test_structural_errors() {
        // duplicate identifier
        let mut records = head();
        records.push(rec("LexicalEntry", "lex", Some(("lex", "entries")), 0, vec![]));
        let err = decode(records, ResolutionMode::Lenient).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier { .. }));

        // parent not materialized yet
        let mut records = head();
        records.push(rec("LexicalEntry", "e", Some(("later", "entries")), 0, vec![]));
        let err = decode(records, ResolutionMode::Lenient).unwrap_err();
        assert!(matches!(err, Error::OrphanRecord { ref parent, .. } if parent == "later"));

        // undeclared field
        let mut records = head();
        records.push(rec("LexicalEntry", "e", Some(("lex", "entries")), 0, vec![
            ("colour", FieldValue::Scalar(None)),
        ]));
        assert!(decode(records, ResolutionMode::Lenient).unwrap_err().is_structural());

        // wrong scalar kind
        let mut records = head();
        records.push(rec("LexicalEntry", "e", Some(("lex", "entries")), 0, vec![]));
        records.push(rec("Sense", "s", Some(("e", "senses")), 0, vec![
            ("index", FieldValue::Scalar(Some(Value::text("first")))),
        ]));
        let err = decode(records, ResolutionMode::Lenient).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));

        // non-finite float
        let mut records = head();
        records.push(rec("LexicalEntry", "e", Some(("lex", "entries")), 0, vec![]));
        records.push(rec("Sense", "s", Some(("e", "senses")), 0, vec![
            ("frequency", FieldValue::Scalar(Some(Value::Float(f64::NAN)))),
        ]));
        let err = decode(records, ResolutionMode::Lenient).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref identifier, .. } if identifier == "s"));
    }

    #[test]
    fn test_missing_required_on_decode() {
        let records = vec![rec("LexicalResource", "res", None, 0, vec![])];
        let err = decode(records, ResolutionMode::Lenient).unwrap_err();
        assert!(matches!(err, Error::MissingRequired { .. }));
    }

    #[test]
    fn test_round_trip_through_records() {
        let mut g = model::sample_graph(model::registry().unwrap()).unwrap();
        g.link(ResolutionMode::Strict).unwrap();
        let records = Encoder::new(&g).collect_records().unwrap();
        let back = decode(records, ResolutionMode::Strict).unwrap().graph;
        assert_eq!(back.to_json(), g.to_json());
        assert_eq!(back.stats().unresolved, 0);
    }

    #[test]
    fn test_link_importer_graph() {
        let mut g = Graph::new(model::registry().unwrap());
        let res = g.add_root("LexicalResource", "res").unwrap();
        let lex = g.add_child(res, "lexicons", "lex").unwrap();
        let entry = g.add_child(lex, "entries", "e").unwrap();
        let sense = g.add_child(entry, "senses", "s").unwrap();
        g.set_reference_id(sense, "synset", "ss").unwrap();
        g.push_reference_id(entry, "frames", "f1").unwrap();
        g.push_reference_id(entry, "frames", "missing").unwrap();
        let synset = g.add_child(lex, "synsets", "ss").unwrap();
        let frame = g.add_child(lex, "frames", "f1").unwrap();

        let warnings = g.link(ResolutionMode::Lenient).unwrap();
        assert_eq!(g.target(sense, "synset"), Some(synset));
        assert_eq!(g.references(entry, "frames"), &[Reference::Resolved(frame)]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].target, "missing");
    }

    #[test]
    fn test_resolution_mode_parsing() {
        assert_eq!("Strict".parse::<ResolutionMode>(), Ok(ResolutionMode::Strict));
        assert_eq!("lenient".parse::<ResolutionMode>(), Ok(ResolutionMode::Lenient));
        assert!("maybe".parse::<ResolutionMode>().is_err());
    }
}
