//! # lexbridge - role-driven round trips for lexical-resource graphs
//!
//! Importers turn dictionaries, semantic nets and verb inventories into one
//! unified, deeply nested object graph. lexbridge moves that graph between
//! three representations without per-type mapping code:
//! - an in-memory arena ([`Graph`])
//! - a relational store (SQLite, [`store::SqliteWriter`] / [`store::SqliteReader`])
//! - an XML document ([`store::XmlWriter`] / [`store::XmlReader`])
//!
//! Every entity type declares one role per field (attribute, owned children,
//! reference, transient). From those declarations the crate derives the
//! storage schema, walks graphs into a record stream and rebuilds graphs from
//! that stream in two phases so forward and cyclic references resolve.

pub mod value;
pub mod role;
pub mod registry;
pub mod graph;
pub mod schema;
pub mod stream;
pub mod encode;
pub mod index;
pub mod decode;
pub mod store;
pub mod pipeline;
pub mod model;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use value::{ScalarKind, Value};
pub use role::{EntityType, FieldDescriptor, FieldRole, Multiplicity};
pub use registry::TypeRegistry;
pub use graph::{Graph, Node, NodeId, Reference};
pub use schema::Schema;
pub use stream::{NodeRecord, RecordSink, RecordSource};
pub use encode::Encoder;
pub use index::ReferenceIndex;
pub use decode::{Decoded, Decoder, ResolutionMode, ResolutionWarning};

/// Result type alias for lexbridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for lexbridge operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed document: {0}")]
    Document(String),

    #[error("Invalid {kind} value {value:?} for field '{field}' of {entity} '{identifier}'")]
    InvalidValue {
        entity: String,
        identifier: String,
        field: String,
        kind: ScalarKind,
        value: String,
    },

    #[error("Missing required field '{field}' on {entity} '{identifier}'")]
    MissingRequired {
        entity: String,
        identifier: String,
        field: String,
    },

    #[error("Duplicate identifier '{identifier}' (already used by a {first}, found again on a {second})")]
    DuplicateIdentifier {
        identifier: String,
        first: String,
        second: String,
    },

    #[error("Orphan record: {entity} '{identifier}' names parent '{parent}' which has not been materialized")]
    OrphanRecord {
        entity: String,
        identifier: String,
        parent: String,
    },

    #[error("Unresolved reference: field '{field}' of {entity} '{referrer}' points to unknown identifier '{target}'")]
    UnresolvedReference {
        referrer: String,
        entity: String,
        field: String,
        target: String,
    },

    #[error("Reference type mismatch: field '{field}' of {entity} '{referrer}' expects a {expected} but '{target}' is a {found}")]
    ReferenceTypeMismatch {
        referrer: String,
        entity: String,
        field: String,
        target: String,
        expected: String,
        found: String,
    },

    #[error("Schema fingerprint mismatch: expected {expected}, store has {found}")]
    SchemaMismatch { expected: String, found: String },
}

impl Error {
    /// Build a schema error from anything displayable
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    /// Whether this error invalidates the whole operation regardless of mode
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Schema(_)
                | Error::DuplicateIdentifier { .. }
                | Error::OrphanRecord { .. }
                | Error::SchemaMismatch { .. }
        )
    }
}
