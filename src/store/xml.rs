//! XML store - nested document writer and streaming reader
//!
//! ```text
//! <lexbridge fingerprint="…">
//!   <LexicalResource id="sample" label="…">
//!     <lexicons id="sample-en" language="en">
//!       <entries id="bank-n" partOfSpeech="noun">
//!         <frames ref="frame-np"/>
//!         <senses id="bank-n-1" synset="ss-bank-land">…</senses>
//!       </entries>
//!     </lexicons>
//!   </LexicalResource>
//! </lexbridge>
//! ```
//!
//! Roots are named after their type, owned nodes after the field holding
//! them. List items come before nested nodes inside an element.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use crate::{Error, Result};
use crate::registry::TypeRegistry;
use crate::role::{EntityType, FieldRole, Multiplicity};
use crate::schema::Schema;
use crate::stream::{FieldRecord, FieldValue, NodeRecord, ParentLink, RecordSink, RecordSource, RefValue};
use crate::value::{ScalarKind, Value};

/// Document element name
pub const DOCUMENT_ELEMENT: &str = "lexbridge";
const FINGERPRINT_ATTR: &str = "fingerprint";
const REF_ATTR: &str = "ref";
const VALUE_ATTR: &str = "value";

// ========== Writer ==========

/// Writes a record stream as one nested XML document.
pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
    registry: Arc<TypeRegistry>,
    /// Names of the node elements currently open, outermost first
    open: Vec<&'static str>,
    written: usize,
    finished: bool,
}

impl XmlWriter<BufWriter<File>> {
    /// Create (or truncate) a document file
    pub fn create(path: &Path, registry: Arc<TypeRegistry>) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), registry)
    }
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W, registry: Arc<TypeRegistry>) -> Result<Self> {
        let mut writer = Writer::new_with_indent(inner, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let fingerprint = Schema::derive(&registry).fingerprint();
        let mut start = BytesStart::new(DOCUMENT_ELEMENT);
        start.push_attribute((FINGERPRINT_ATTR, fingerprint.as_str()));
        writer.write_event(Event::Start(start))?;
        Ok(Self {
            writer,
            registry,
            open: Vec::new(),
            written: 0,
            finished: false,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Underlying output. Call [`RecordSink::finish`] first.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn close_to(&mut self, depth: usize) -> Result<()> {
        while self.open.len() > depth {
            if let Some(name) = self.open.pop() {
                self.writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for XmlWriter<W> {
    fn write_record(&mut self, record: NodeRecord) -> Result<()> {
        if record.depth > self.open.len() {
            return Err(Error::Document(format!(
                "{} '{}' at depth {} has no open parent element",
                record.entity, record.identifier, record.depth
            )));
        }
        if record.depth == 0 && record.parent.is_some() {
            // a document element nests only whole graphs; subtrees go to SQLite
            return Err(Error::Document(format!(
                "{} '{}' is a subtree top with a parent link and cannot start a document",
                record.entity, record.identifier
            )));
        }
        self.close_to(record.depth)?;

        let entity = self.registry.require(record.entity)?.entity;
        let name = match &record.parent {
            Some(link) if record.depth > 0 => link.field,
            _ => entity.name,
        };

        let mut start = BytesStart::new(name);
        start.push_attribute((entity.identifier_attribute(), record.identifier.as_str()));
        let mut items: Vec<(&'static str, &'static str, String)> = Vec::new();
        for field in &record.fields {
            match &field.value {
                FieldValue::Scalar(Some(v)) => start.push_attribute((field.name, v.to_text().as_str())),
                FieldValue::Reference(RefValue::Target(id)) => start.push_attribute((field.name, id.as_str())),
                FieldValue::Scalar(None) | FieldValue::Reference(RefValue::Absent) => {}
                FieldValue::Scalars(values) => {
                    items.extend(values.iter().map(|v| (field.name, VALUE_ATTR, v.to_text())));
                }
                FieldValue::References(ids) => {
                    items.extend(ids.iter().map(|id| (field.name, REF_ATTR, id.clone())));
                }
            }
        }
        self.writer.write_event(Event::Start(start))?;
        for (element, attr, value) in &items {
            let mut item = BytesStart::new(*element);
            item.push_attribute((*attr, value.as_str()));
            self.writer.write_event(Event::Empty(item))?;
        }
        self.open.push(name);
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.close_to(0)?;
        self.writer.write_event(Event::End(BytesEnd::new(DOCUMENT_ELEMENT)))?;
        self.writer.get_mut().write_all(b"\n")?;
        self.writer.get_mut().flush()?;
        self.finished = true;
        tracing::debug!("Wrote XML document with {} nodes", self.written);
        Ok(())
    }
}

// ========== Reader ==========

#[derive(Debug)]
enum Frame {
    Document,
    Node {
        entity: &'static EntityType,
        identifier: String,
        /// Next order key per children field
        counters: HashMap<&'static str, i64>,
    },
    Item,
}

/// Streams a document back as preorder records.
pub struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    registry: Arc<TypeRegistry>,
    fingerprint: String,
    buf: Vec<u8>,
    frames: Vec<Frame>,
    /// Record whose list items may still arrive
    pending: Option<NodeRecord>,
    ready: VecDeque<NodeRecord>,
    roots: i64,
    /// Document element closed
    done: bool,
    eof: bool,
}

impl XmlReader<BufReader<File>> {
    pub fn open(path: &Path, registry: Arc<TypeRegistry>) -> Result<Self> {
        Ok(Self::from_reader(BufReader::new(File::open(path)?), registry))
    }
}

impl<R: BufRead> XmlReader<R> {
    pub fn from_reader(inner: R, registry: Arc<TypeRegistry>) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.config_mut().trim_text(true);
        let fingerprint = Schema::derive(&registry).fingerprint();
        Self {
            reader,
            registry,
            fingerprint,
            buf: Vec::new(),
            frames: Vec::new(),
            pending: None,
            ready: VecDeque::new(),
            roots: 0,
            done: false,
            eof: false,
        }
    }

    fn flush_pending(&mut self) {
        if let Some(record) = self.pending.take() {
            self.ready.push_back(record);
        }
    }

    /// Read one event and update the frame stack
    fn step(&mut self) -> Result<()> {
        self.buf.clear();
        let event = self.reader.read_event_into(&mut self.buf)?.into_owned();
        match event {
            Event::Start(e) => self.open_element(&e, false),
            Event::Empty(e) => self.open_element(&e, true),
            Event::End(_) => {
                match self.frames.pop() {
                    Some(Frame::Node { .. }) => self.flush_pending(),
                    Some(Frame::Document) => {
                        self.flush_pending();
                        self.done = true;
                    }
                    Some(Frame::Item) => {}
                    None => return Err(Error::Document("unbalanced closing tag".into())),
                }
                Ok(())
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if text.trim().is_empty() {
                    Ok(())
                } else {
                    Err(Error::Document(format!("unexpected text content {:?}", text)))
                }
            }
            Event::Eof => {
                if self.frames.is_empty() && self.done {
                    self.eof = true;
                    Ok(())
                } else if self.frames.is_empty() {
                    Err(Error::Document(format!("missing <{}> document element", DOCUMENT_ELEMENT)))
                } else {
                    Err(Error::Document("document ends inside an open element".into()))
                }
            }
            _ => Ok(()),
        }
    }

    fn open_element(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        let name = std::str::from_utf8(e.name().as_ref())
            .map_err(|err| Error::Document(err.to_string()))?
            .to_string();
        let attrs = attributes(e)?;

        match self.frames.last_mut() {
            None => {
                if name != DOCUMENT_ELEMENT || self.done {
                    return Err(Error::Document(format!(
                        "expected <{}> document element, found <{}>",
                        DOCUMENT_ELEMENT, name
                    )));
                }
                if let Some((_, found)) = attrs.iter().find(|(k, _)| k == FINGERPRINT_ATTR) {
                    if *found != self.fingerprint {
                        return Err(Error::SchemaMismatch {
                            expected: self.fingerprint.clone(),
                            found: found.clone(),
                        });
                    }
                }
                if empty {
                    self.done = true;
                } else {
                    self.frames.push(Frame::Document);
                }
                Ok(())
            }
            Some(Frame::Document) => {
                let info = self
                    .registry
                    .info(&name)
                    .filter(|info| info.is_root())
                    .ok_or_else(|| Error::Document(format!("<{}> is not a root entity type", name)))?;
                let entity = info.entity;
                let order = self.roots;
                self.roots += 1;
                self.start_node(entity, None, order, attrs, empty)
            }
            Some(Frame::Node { entity, identifier, counters }) => {
                let owner = *entity;
                let info = self.registry.require(owner.name)?;
                let (_, field) = info.field(&name).ok_or_else(|| {
                    Error::Document(format!("<{}> is not a field of {} '{}'", name, owner.name, identifier))
                })?;
                match (field.role, field.multiplicity) {
                    (FieldRole::Children, _) => {
                        let counter = counters.entry(field.name).or_insert(0);
                        let order = *counter;
                        *counter += 1;
                        let parent = ParentLink {
                            identifier: identifier.clone(),
                            field: field.name,
                        };
                        let child = self.registry.require(field.target.unwrap_or_default())?.entity;
                        self.start_node(child, Some(parent), order, attrs, empty)
                    }
                    (FieldRole::Attribute | FieldRole::Reference, Multiplicity::Many) => {
                        let owner_id = identifier.clone();
                        self.push_item(owner, &owner_id, field.name, field.role, field.scalar, attrs)?;
                        if !empty {
                            self.frames.push(Frame::Item);
                        }
                        Ok(())
                    }
                    _ => Err(Error::Document(format!(
                        "<{}> on {} '{}' is not an element field",
                        name, owner.name, identifier
                    ))),
                }
            }
            Some(Frame::Item) => Err(Error::Document(format!("<{}> inside a list item", name))),
        }
    }

    fn start_node(
        &mut self,
        entity: &'static EntityType,
        parent: Option<ParentLink>,
        order: i64,
        attrs: Vec<(String, String)>,
        empty: bool,
    ) -> Result<()> {
        self.flush_pending();
        let depth = self.frames.iter().filter(|f| matches!(f, Frame::Node { .. })).count();
        let info = self.registry.require(entity.name)?;
        let id_attr = entity.identifier_attribute();

        let mut identifier = None;
        let mut inline: HashMap<String, String> = HashMap::new();
        for (key, value) in attrs {
            if key == id_attr {
                identifier = Some(value);
                continue;
            }
            match info.field(&key) {
                Some((_, f)) if f.role.is_persistent() && !f.is_list() && f.role != FieldRole::Children => {
                    inline.insert(key, value);
                }
                _ => {
                    return Err(Error::Document(format!(
                        "unknown attribute '{}' on a {} element",
                        key, entity.name
                    )));
                }
            }
        }
        let identifier = identifier.ok_or_else(|| {
            Error::Document(format!("{} element without '{}' attribute", entity.name, id_attr))
        })?;

        let mut fields = Vec::new();
        for field in entity.persistent_fields() {
            let value = match (field.role, field.multiplicity) {
                (FieldRole::Attribute, Multiplicity::One) => {
                    let kind = field.scalar.unwrap_or(ScalarKind::Text);
                    let parsed = match inline.remove(field.name) {
                        Some(raw) => Some(parse(entity.name, &identifier, field.name, kind, &raw)?),
                        None => None,
                    };
                    FieldValue::Scalar(parsed)
                }
                (FieldRole::Reference, Multiplicity::One) => {
                    FieldValue::Reference(inline.remove(field.name).into())
                }
                (FieldRole::Attribute, Multiplicity::Many) => FieldValue::Scalars(Vec::new()),
                (FieldRole::Reference, Multiplicity::Many) => FieldValue::References(Vec::new()),
                _ => continue,
            };
            fields.push(FieldRecord { name: field.name, value });
        }

        if !empty {
            self.frames.push(Frame::Node {
                entity,
                identifier: identifier.clone(),
                counters: HashMap::new(),
            });
        }
        self.pending = Some(NodeRecord {
            entity: entity.name,
            identifier,
            parent,
            order,
            depth,
            fields,
        });
        Ok(())
    }

    fn push_item(
        &mut self,
        owner: &'static EntityType,
        owner_id: &str,
        field: &'static str,
        role: FieldRole,
        scalar: Option<ScalarKind>,
        attrs: Vec<(String, String)>,
    ) -> Result<()> {
        let key = if role == FieldRole::Reference { REF_ATTR } else { VALUE_ATTR };
        let raw = match attrs.into_iter().find(|(k, _)| k == key) {
            Some((_, raw)) => raw,
            None => {
                return Err(Error::Document(format!(
                    "<{}> item of {} '{}' lacks a '{}' attribute",
                    field, owner.name, owner_id, key
                )));
            }
        };

        let record = match self.pending.as_mut() {
            Some(record) if record.identifier == owner_id => record,
            _ => {
                return Err(Error::Document(format!(
                    "<{}> item of {} '{}' appears after a nested element",
                    field, owner.name, owner_id
                )));
            }
        };
        match record.field_mut(field) {
            Some(FieldValue::Scalars(values)) => {
                let kind = scalar.unwrap_or(ScalarKind::Text);
                values.push(parse(owner.name, owner_id, field, kind, &raw)?);
            }
            Some(FieldValue::References(ids)) => ids.push(raw),
            _ => {
                return Err(Error::Document(format!("<{}> is not a list of {}", field, owner.name)));
            }
        }
        Ok(())
    }
}

impl<R: BufRead> RecordSource for XmlReader<R> {
    fn next_record(&mut self) -> Result<Option<NodeRecord>> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Ok(Some(record));
            }
            if self.done {
                self.flush_pending();
                if let Some(record) = self.ready.pop_front() {
                    return Ok(Some(record));
                }
                if self.eof {
                    return Ok(None);
                }
            }
            // past the document element only whitespace and comments may follow
            self.step()?;
        }
    }
}

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| Error::Document(err.to_string()))?
            .to_string();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn parse(entity: &str, identifier: &str, field: &str, kind: ScalarKind, raw: &str) -> Result<Value> {
    Value::parse(kind, raw).ok_or_else(|| Error::InvalidValue {
        entity: entity.to_string(),
        identifier: identifier.to_string(),
        field: field.to_string(),
        kind,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Decoder, ResolutionMode};
    use crate::encode::Encoder;
    use crate::model;
    use crate::pipeline::pump;

    fn write(g: &crate::Graph) -> String {
        let mut writer = XmlWriter::new(Vec::new(), Arc::clone(g.registry())).unwrap();
        pump(Encoder::new(g), &mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn read_all(xml: &str) -> Result<Vec<NodeRecord>> {
        let mut reader = XmlReader::from_reader(xml.as_bytes(), model::registry().unwrap());
        let mut records = Vec::new();
        while let Some(record) = reader.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    fn linked_sample() -> crate::Graph {
        let mut g = model::sample_graph(model::registry().unwrap()).unwrap();
        g.link(ResolutionMode::Strict).unwrap();
        g
    }

    #[test]
    fn test_document_shape() {
        let xml = write(&linked_sample());
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<LexicalResource id=\"sample\""));
        assert!(xml.contains("<lexicons id=\"sample-en\" language=\"en\""));
        assert!(xml.contains("<frames ref=\"frame-np\"/>"));
        assert!(xml.contains("synset=\"ss-bank-land\""));
        // identifier-less types use the reserved attribute
        assert!(xml.contains("<lemmas _id=\"bank-n-lemma\" writtenForm=\"bank\""));
        assert!(xml.trim_end().ends_with("</lexbridge>"));
    }

    #[test]
    fn test_reader_matches_encoder_stream() {
        let g = linked_sample();
        let records = read_all(&write(&g)).unwrap();
        assert_eq!(records, Encoder::new(&g).collect_records().unwrap());
    }

    #[test]
    fn test_round_trip_graph() {
        let g = linked_sample();
        let xml = write(&g);
        let mut reader = XmlReader::from_reader(xml.as_bytes(), model::registry().unwrap());
        let decoded = Decoder::new(model::registry().unwrap(), ResolutionMode::Strict)
            .decode(&mut reader)
            .unwrap();
        assert_eq!(decoded.graph.to_json(), g.to_json());
    }

    #[test]
    fn test_escaping_survives() {
        let mut g = linked_sample();
        let sense = g.find("bank-n-1").unwrap();
        g.set_attribute(sense, "gloss", "land <by> \"water\" & such").unwrap();
        let records = read_all(&write(&g)).unwrap();
        let sense = records.iter().find(|r| r.identifier == "bank-n-1").unwrap();
        assert_eq!(
            sense.field("gloss"),
            Some(&FieldValue::Scalar(Some(Value::text("land <by> \"water\" & such"))))
        );
    }

    #[test]
    fn test_malformed_documents() {
        let truncated = "<lexbridge><LexicalResource id=\"r\" label=\"x\">";
        assert!(read_all(truncated).is_err());

        let unknown = "<lexbridge><LexicalResource id=\"r\" label=\"x\" colour=\"red\"/></lexbridge>";
        assert!(matches!(read_all(unknown), Err(Error::Document(_))));

        let not_root = "<lexbridge><Lexicon id=\"l\" language=\"en\"/></lexbridge>";
        assert!(matches!(read_all(not_root), Err(Error::Document(_))));

        let late_item = concat!(
            "<lexbridge><LexicalResource id=\"r\" label=\"x\"><lexicons id=\"l\" language=\"en\">",
            "<entries id=\"e\"><senses id=\"s\"/><frames ref=\"f\"/></entries>",
            "</lexicons></LexicalResource></lexbridge>"
        );
        assert!(matches!(read_all(late_item), Err(Error::Document(_))));

        let bad_int = concat!(
            "<lexbridge><LexicalResource id=\"r\" label=\"x\"><lexicons id=\"l\" language=\"en\">",
            "<entries id=\"e\"><senses id=\"s\" index=\"first\"/></entries>",
            "</lexicons></LexicalResource></lexbridge>"
        );
        assert!(matches!(read_all(bad_int), Err(Error::InvalidValue { .. })));

        let wrong_schema = "<lexbridge fingerprint=\"0000\"></lexbridge>";
        assert!(matches!(read_all(wrong_schema), Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_content_after_document_element() {
        let doc = write(&linked_sample());
        assert!(read_all(&doc).is_ok());
        assert!(read_all(&format!("{}<!-- trailer -->\n", doc)).is_ok());

        let second = format!("{}<lexbridge></lexbridge>", doc);
        assert!(matches!(read_all(&second), Err(Error::Document(_))));
        assert!(read_all(&format!("{}junk", doc)).is_err());
    }

    #[test]
    fn test_subtree_cannot_start_a_document() {
        let g = linked_sample();
        let sense = g.find("bank-n-2").unwrap();
        let mut writer = XmlWriter::new(Vec::new(), Arc::clone(g.registry())).unwrap();
        let err = pump(Encoder::subtree(&g, sense), &mut writer).unwrap_err();
        assert!(matches!(err, Error::Document(ref msg) if msg.contains("bank-n-2")));
    }

    #[test]
    fn test_empty_document() {
        let g = crate::Graph::new(model::registry().unwrap());
        let records = read_all(&write(&g)).unwrap();
        assert!(records.is_empty());
    }
}
