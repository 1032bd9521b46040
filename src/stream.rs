//! Record stream - the seam between graphs and storage backends
//!
//! The encoder and both store readers are [`RecordSource`]s; both store
//! writers (and a plain `Vec`) are [`RecordSink`]s. A stream lists nodes
//! parent-before-children in preorder; `depth` and `parent` describe where
//! each node sits in the ownership forest.

use serde::Serialize;
use crate::Result;
use crate::value::Value;

/// Where an owned node hangs in its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentLink {
    pub identifier: String,
    pub field: &'static str,
}

/// Value of a single reference in the stream.
///
/// `Absent` is explicit so a reader can tell "never set" apart from a
/// target that is not resolved yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefValue {
    Absent,
    Target(String),
}

impl RefValue {
    pub fn target(&self) -> Option<&str> {
        match self {
            RefValue::Absent => None,
            RefValue::Target(id) => Some(id),
        }
    }
}

impl From<Option<String>> for RefValue {
    fn from(id: Option<String>) -> Self {
        id.map(RefValue::Target).unwrap_or(RefValue::Absent)
    }
}

/// Stored value of one persistent, non-children field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Scalar(Option<Value>),
    Scalars(Vec<Value>),
    Reference(RefValue),
    References(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    pub name: &'static str,
    pub value: FieldValue,
}

/// One node of the encoded stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub entity: &'static str,
    pub identifier: String,
    /// `None` for roots
    pub parent: Option<ParentLink>,
    /// Position among the parent's children in `parent.field`, or among roots
    pub order: i64,
    /// Distance from the top of the stream
    pub depth: usize,
    /// Attributes and references in declaration order
    pub fields: Vec<FieldRecord>,
}

impl NodeRecord {
    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.iter_mut().find(|f| f.name == name).map(|f| &mut f.value)
    }
}

/// Pull-style producer of node records.
pub trait RecordSource {
    /// Next record, or `None` at end of stream
    fn next_record(&mut self) -> Result<Option<NodeRecord>>;
}

/// Consumer of node records.
pub trait RecordSink {
    fn write_record(&mut self, record: NodeRecord) -> Result<()>;

    /// Flush buffered output and close the representation
    fn finish(&mut self) -> Result<()>;
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    fn next_record(&mut self) -> Result<Option<NodeRecord>> {
        (**self).next_record()
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<NodeRecord>> {
        (**self).next_record()
    }
}

impl<K: RecordSink + ?Sized> RecordSink for &mut K {
    fn write_record(&mut self, record: NodeRecord) -> Result<()> {
        (**self).write_record(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

impl<K: RecordSink + ?Sized> RecordSink for Box<K> {
    fn write_record(&mut self, record: NodeRecord) -> Result<()> {
        (**self).write_record(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// In-memory capture
impl RecordSink for Vec<NodeRecord> {
    fn write_record(&mut self, record: NodeRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Replays a prepared sequence of records.
#[derive(Debug)]
pub struct ReplaySource {
    records: std::vec::IntoIter<NodeRecord>,
}

impl ReplaySource {
    pub fn new(records: Vec<NodeRecord>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl RecordSource for ReplaySource {
    fn next_record(&mut self) -> Result<Option<NodeRecord>> {
        Ok(self.records.next())
    }
}

impl From<Vec<NodeRecord>> for ReplaySource {
    fn from(records: Vec<NodeRecord>) -> Self {
        Self::new(records)
    }
}
