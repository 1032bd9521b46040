//! Graph Walker - turns a graph into a preorder record stream
//!
//! The walk follows ownership edges only. References contribute their
//! target identifier and are never followed, which is what keeps cyclic
//! reference structures finite. The walker borrows the graph immutably and
//! keeps its own explicit stack, so any number of walkers may run over the
//! same graph at once.

use crate::{Error, Result};
use crate::graph::{Graph, NodeId, Slot};
use crate::stream::{FieldRecord, FieldValue, NodeRecord, ParentLink, RecordSource, RefValue};

#[derive(Debug, Clone, Copy)]
struct Pending {
    node: NodeId,
    order: i64,
    depth: usize,
}

/// Lazy preorder encoder over one graph.
#[derive(Debug, Clone)]
pub struct Encoder<'g> {
    graph: &'g Graph,
    stack: Vec<Pending>,
    emitted: usize,
}

impl<'g> Encoder<'g> {
    /// Encode the whole graph, roots in insertion order
    pub fn new(graph: &'g Graph) -> Self {
        let stack = graph
            .roots()
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &node)| Pending {
                node,
                order: i as i64,
                depth: 0,
            })
            .collect();
        Self {
            graph,
            stack,
            emitted: 0,
        }
    }

    /// Encode one node and everything it owns. The first record keeps its
    /// real parent link and order so it can be appended to an existing SQLite
    /// store. [`crate::store::XmlWriter`] refuses it: a document holds whole graphs.
    pub fn subtree(graph: &'g Graph, node: NodeId) -> Self {
        let order = match graph.node(node).parent() {
            Some((parent, field)) => graph
                .children(parent, field)
                .iter()
                .position(|&c| c == node)
                .unwrap_or(0) as i64,
            None => graph.roots().iter().position(|&r| r == node).unwrap_or(0) as i64,
        };
        Self {
            graph,
            stack: vec![Pending { node, order, depth: 0 }],
            emitted: 0,
        }
    }

    /// Number of records produced so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Drain the walk into a vector
    pub fn collect_records(mut self) -> Result<Vec<NodeRecord>> {
        let mut records = Vec::with_capacity(self.graph.len());
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    fn record(&mut self, pending: Pending) -> Result<NodeRecord> {
        let graph = self.graph;
        let node = graph.node(pending.node);
        let entity = node.entity();
        let mut fields = Vec::new();
        let mut children = Vec::new();

        for (descriptor, slot) in entity.fields.iter().zip(node.slots()) {
            let value = match slot {
                Slot::Transient(_) => continue,
                Slot::Children(ids) => {
                    children.extend(ids.iter().enumerate().map(|(i, &child)| Pending {
                        node: child,
                        order: i as i64,
                        depth: pending.depth + 1,
                    }));
                    continue;
                }
                Slot::Scalar(v) => FieldValue::Scalar(v.clone()),
                Slot::Scalars(v) => FieldValue::Scalars(v.clone()),
                Slot::Ref(r) => FieldValue::Reference(
                    r.as_ref()
                        .map(|r| graph.reference_identifier(r).to_string())
                        .into(),
                ),
                Slot::Refs(v) => FieldValue::References(
                    v.iter()
                        .map(|r| graph.reference_identifier(r).to_string())
                        .collect(),
                ),
            };

            let missing = matches!(
                value,
                FieldValue::Scalar(None) | FieldValue::Reference(RefValue::Absent)
            );
            if descriptor.required && missing {
                return Err(Error::MissingRequired {
                    entity: entity.name.to_string(),
                    identifier: node.identifier().to_string(),
                    field: descriptor.name.to_string(),
                });
            }
            fields.push(FieldRecord {
                name: descriptor.name,
                value,
            });
        }

        // Children of the first field come out first
        self.stack.extend(children.into_iter().rev());

        Ok(NodeRecord {
            entity: entity.name,
            identifier: node.identifier().to_string(),
            parent: node.parent().map(|(p, field)| ParentLink {
                identifier: graph.node(p).identifier().to_string(),
                field,
            }),
            order: pending.order,
            depth: pending.depth,
            fields,
        })
    }
}

impl RecordSource for Encoder<'_> {
    fn next_record(&mut self) -> Result<Option<NodeRecord>> {
        let Some(pending) = self.stack.pop() else {
            return Ok(None);
        };
        let record = self.record(pending)?;
        self.emitted += 1;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;
    use crate::value::Value;

    fn sample() -> Graph {
        let mut g = Graph::new(model::registry().unwrap());
        let res = g.add_root("LexicalResource", "res").unwrap();
        g.set_attribute(res, "label", "test").unwrap();
        let lex = g.add_child(res, "lexicons", "lex").unwrap();
        g.set_attribute(lex, "language", "en").unwrap();
        let entry = g.add_child(lex, "entries", "e1").unwrap();
        let s1 = g.add_child(entry, "senses", "s1").unwrap();
        let s2 = g.add_child(entry, "senses", "s2").unwrap();
        g.push_attribute(s1, "examples", "a run in the park").unwrap();
        let ss = g.add_child(lex, "synsets", "ss1").unwrap();
        g.set_reference(s1, "synset", ss).unwrap();
        g.set_reference(s2, "synset", ss).unwrap();
        g
    }

    #[test]
    fn test_preorder_with_parent_links() {
        let g = sample();
        let records = Encoder::new(&g).collect_records().unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["res", "lex", "e1", "s1", "s2", "ss1"]);

        let s2 = &records[4];
        assert_eq!(s2.depth, 3);
        assert_eq!(s2.order, 1);
        assert_eq!(s2.parent, Some(ParentLink { identifier: "e1".into(), field: "senses" }));
        assert!(records[0].parent.is_none());
    }

    #[test]
    fn test_references_emit_identifiers_only() {
        let g = sample();
        let records = Encoder::new(&g).collect_records().unwrap();
        let s1 = records.iter().find(|r| r.identifier == "s1").unwrap();
        assert_eq!(
            s1.field("synset"),
            Some(&FieldValue::Reference(RefValue::Target("ss1".into())))
        );
        assert_eq!(
            s1.field("examples"),
            Some(&FieldValue::Scalars(vec![Value::text("a run in the park")]))
        );
        // the synset is emitted once, under its owner, not under the senses
        assert_eq!(records.iter().filter(|r| r.identifier == "ss1").count(), 1);
    }

    #[test]
    fn test_absent_reference_is_explicit() {
        let mut g = sample();
        let entry = g.find("e1").unwrap();
        g.add_child(entry, "senses", "s3").unwrap();
        let records = Encoder::new(&g).collect_records().unwrap();
        let s3 = records.iter().find(|r| r.identifier == "s3").unwrap();
        assert_eq!(s3.field("synset"), Some(&FieldValue::Reference(RefValue::Absent)));
    }

    #[test]
    fn test_missing_required_field() {
        let mut g = Graph::new(model::registry().unwrap());
        g.add_root("LexicalResource", "res").unwrap();
        let err = Encoder::new(&g).collect_records().unwrap_err();
        assert!(matches!(err, Error::MissingRequired { ref field, .. } if field == "label"));
    }

    #[test]
    fn test_subtree_keeps_parent_link() {
        let g = sample();
        let entry = g.find("e1").unwrap();
        let records = Encoder::subtree(&g, entry).collect_records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].depth, 0);
        assert_eq!(records[0].parent.as_ref().unwrap().identifier, "lex");
    }

    #[test]
    fn test_concurrent_walks() {
        let g = sample();
        let expected = Encoder::new(&g).collect_records().unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| Encoder::new(&g).collect_records().unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
