//! Field roles - the per-type declaration everything else is derived from
//!
//! Each field of an entity type carries exactly one role:
//! - `Attribute`: scalar stored inline with the owning node
//! - `Children`: ordered, exclusively owned nested nodes
//! - `Reference`: identifier of a node owned elsewhere (IDREF)
//! - `Transient`: never stored anywhere
//!
//! Types are declared as static descriptor tables:
//!
//! ```
//! use lexbridge::{EntityType, FieldDescriptor, ScalarKind};
//!
//! static SYNSET: EntityType = EntityType {
//!     name: "Synset",
//!     identifier: Some("id"),
//!     fields: &[
//!         FieldDescriptor::attribute("definition", ScalarKind::Text),
//!         FieldDescriptor::reference_list("hypernyms", "Synset"),
//!     ],
//! };
//! assert_eq!(SYNSET.fields.len(), 2);
//! ```

use crate::value::ScalarKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage role of one field, fixed at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    /// Scalar stored with the owning node
    Attribute,
    /// Owned, ordered nested nodes
    Children,
    /// Pointer to another node's business identifier
    Reference,
    /// Excluded from every representation
    Transient,
}

impl FieldRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::Attribute => "attribute",
            FieldRole::Children => "children",
            FieldRole::Reference => "reference",
            FieldRole::Transient => "transient",
        }
    }

    /// Whether the field appears in any stored representation
    pub fn is_persistent(&self) -> bool {
        !matches!(self, FieldRole::Transient)
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single value or ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    One,
    Many,
}

/// Declaration of one field of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub role: FieldRole,
    pub multiplicity: Multiplicity,
    /// Scalar kind for attributes
    pub scalar: Option<ScalarKind>,
    /// Nested entity type name for children and references
    pub target: Option<&'static str>,
    pub required: bool,
}

impl FieldDescriptor {
    /// Single scalar attribute
    pub const fn attribute(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            role: FieldRole::Attribute,
            multiplicity: Multiplicity::One,
            scalar: Some(kind),
            target: None,
            required: false,
        }
    }

    /// Ordered collection of scalars
    pub const fn attribute_list(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            multiplicity: Multiplicity::Many,
            ..Self::attribute(name, kind)
        }
    }

    /// Owned collection of `target` nodes. Always ordered, always a collection.
    pub const fn children(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Children,
            multiplicity: Multiplicity::Many,
            scalar: None,
            target: Some(target),
            required: false,
        }
    }

    /// Single reference to a `target` node
    pub const fn reference(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Reference,
            multiplicity: Multiplicity::One,
            scalar: None,
            target: Some(target),
            required: false,
        }
    }

    /// Ordered collection of references to `target` nodes
    pub const fn reference_list(name: &'static str, target: &'static str) -> Self {
        Self {
            multiplicity: Multiplicity::Many,
            ..Self::reference(name, target)
        }
    }

    /// Field that is never stored
    pub const fn transient(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Transient,
            multiplicity: Multiplicity::One,
            scalar: None,
            target: None,
            required: false,
        }
    }

    /// Mark a single attribute or reference as mandatory
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_list(&self) -> bool {
        self.multiplicity == Multiplicity::Many
    }

    /// Stored inline with the node: single attributes and single references
    pub fn is_inline(&self) -> bool {
        matches!(self.role, FieldRole::Attribute | FieldRole::Reference) && !self.is_list()
    }

    /// Stored in an auxiliary `(owner, order, item)` table
    pub fn is_auxiliary(&self) -> bool {
        matches!(self.role, FieldRole::Attribute | FieldRole::Reference) && self.is_list()
    }
}

/// A declared record shape.
#[derive(Debug)]
pub struct EntityType {
    pub name: &'static str,
    /// Document attribute carrying the business identifier. Types without
    /// one cannot be reference targets.
    pub identifier: Option<&'static str>,
    pub fields: &'static [FieldDescriptor],
}

impl EntityType {
    /// Attribute name used for the identifier in documents
    pub fn identifier_attribute(&self) -> &'static str {
        self.identifier.unwrap_or("_id")
    }

    /// Fields that take part in storage, in declaration order
    pub fn persistent_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.role.is_persistent())
    }

    /// Owned-collection fields, in declaration order
    pub fn children_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.role == FieldRole::Children)
    }
}
