//! Schema Deriver - storage layout computed from field roles
//!
//! Relational layout (one table per entity type):
//! - `_id` primary key (business identifier)
//! - `_parent`, `_field` for types that appear inside an owned collection
//! - `_ord` order key (root order for roots, collection order for children)
//! - one column per single attribute / single reference
//!
//! Every list-valued field gets an auxiliary table `<Type>__<field>` with
//! `(_owner, _ord, _target)` for references or `(_owner, _ord, value)` for
//! scalars.
//!
//! Document layout: one element per node, identifier and single fields as
//! XML attributes, owned children and list items as child elements named
//! after their field.
//!
//! Derivation walks types in registration order and fields in declaration
//! order, so the same registry always renders byte-identical definitions.

use std::fmt::Write as _;
use crate::registry::TypeRegistry;
use crate::role::{FieldRole, Multiplicity};
use crate::value::ScalarKind;

pub const ID_COLUMN: &str = "_id";
pub const PARENT_COLUMN: &str = "_parent";
pub const FIELD_COLUMN: &str = "_field";
pub const ORDER_COLUMN: &str = "_ord";
pub const OWNER_COLUMN: &str = "_owner";
pub const TARGET_COLUMN: &str = "_target";
pub const VALUE_COLUMN: &str = "value";
pub const META_TABLE: &str = "_lexbridge_meta";

/// What a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    Identifier,
    Parent,
    ParentField,
    Order,
    Attribute { field: &'static str, kind: ScalarKind },
    Reference { field: &'static str },
    Owner,
    Target,
    Value { kind: ScalarKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: &'static str,
    pub not_null: bool,
    pub source: ColumnSource,
}

impl ColumnDef {
    fn new(name: &str, sql_type: &'static str, not_null: bool, source: ColumnSource) -> Self {
        Self {
            name: name.to_string(),
            sql_type,
            not_null,
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub table: String,
}

/// Linkage from a parent table to the table of one of its owned collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLink {
    pub field: &'static str,
    /// Child entity type; its table is named after it
    pub entity: &'static str,
    pub parent_column: &'static str,
    pub field_column: &'static str,
    pub order_column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// One row per node of the entity type
    Entity { owned: bool, root: bool },
    /// One row per item of a reference list field
    References { field: &'static str },
    /// One row per item of a scalar list field
    Values { field: &'static str, kind: ScalarKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub entity: &'static str,
    pub kind: TableKind,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Owned collections whose rows live in other entity tables
    pub children: Vec<ChildLink>,
}

impl TableDef {
    /// Whether rows carry `_parent` / `_field` columns
    pub fn has_parent(&self) -> bool {
        matches!(self.kind, TableKind::Entity { owned: true, .. })
    }

    fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `INSERT` with one positional parameter per column
    pub fn insert_sql(&self) -> String {
        let params: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(&self.name),
            self.column_list(),
            params.join(", ")
        )
    }

    /// Rows of root nodes, in root order
    pub fn select_roots_sql(&self) -> String {
        let filter = if self.has_parent() {
            format!(" WHERE {} IS NULL", quote(PARENT_COLUMN))
        } else {
            String::new()
        };
        format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            self.column_list(),
            quote(&self.name),
            filter,
            quote(ORDER_COLUMN)
        )
    }

    /// Rows owned by `?1` through field `?2`, in collection order
    pub fn select_children_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = ?1 AND {} = ?2 ORDER BY {}",
            self.column_list(),
            quote(&self.name),
            quote(PARENT_COLUMN),
            quote(FIELD_COLUMN),
            quote(ORDER_COLUMN)
        )
    }

    /// Items of one owner (`?1`) from an auxiliary table, in order
    pub fn select_items_sql(&self) -> String {
        let item = match self.kind {
            TableKind::Values { .. } => VALUE_COLUMN,
            _ => TARGET_COLUMN,
        };
        format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY {}",
            quote(item),
            quote(&self.name),
            quote(OWNER_COLUMN),
            quote(ORDER_COLUMN)
        )
    }

    fn create_sql(&self, out: &mut String) {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut line = format!("    {} {}", quote(&c.name), c.sql_type);
                if self.primary_key.len() == 1 && self.primary_key[0] == c.name {
                    line.push_str(" PRIMARY KEY");
                } else if c.not_null {
                    line.push_str(" NOT NULL");
                }
                line
            })
            .collect();
        if self.primary_key.len() > 1 {
            let cols: Vec<String> = self.primary_key.iter().map(|c| quote(c)).collect();
            lines.push(format!("    PRIMARY KEY ({})", cols.join(", ")));
        }
        for fk in &self.foreign_keys {
            lines.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({})",
                quote(&fk.column),
                quote(&fk.table),
                quote(ID_COLUMN)
            ));
        }
        let _ = writeln!(out, "CREATE TABLE IF NOT EXISTS {} (", quote(&self.name));
        let _ = writeln!(out, "{}", lines.join(",\n"));
        let _ = writeln!(out, ");");

        if self.has_parent() {
            let _ = writeln!(
                out,
                "CREATE INDEX IF NOT EXISTS {} ON {} ({}, {}, {});",
                quote(&format!("idx_{}_parent", self.name)),
                quote(&self.name),
                quote(PARENT_COLUMN),
                quote(FIELD_COLUMN),
                quote(ORDER_COLUMN)
            );
        }
    }
}

/// How a field shows up on a document element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Business identifier
    Id,
    /// Identifier of another node
    IdRef { target: &'static str },
    Data(ScalarKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
}

/// Content of a repeated child element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildContent {
    /// A nested node of the given type
    Node { entity: &'static str },
    /// `<field ref="…"/>`
    ReferenceItem { target: &'static str },
    /// `<field value="…"/>`
    ValueItem { kind: ScalarKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildElementDef {
    pub element: &'static str,
    pub content: ChildContent,
}

/// Document element layout of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDef {
    pub entity: &'static str,
    pub root: bool,
    pub attributes: Vec<AttributeDef>,
    pub children: Vec<ChildElementDef>,
}

/// Storage layout derived from a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<TableDef>,
    elements: Vec<ElementDef>,
}

impl Schema {
    /// Derive the layout of every registered type.
    ///
    /// The registry already rejected unresolvable declarations, so
    /// derivation itself cannot fail.
    pub fn derive(registry: &TypeRegistry) -> Self {
        let mut tables = Vec::new();
        let mut elements = Vec::new();

        for info in registry.types() {
            let entity = info.entity;
            let owned = info.is_owned();
            let root = info.is_root();

            let mut columns = vec![ColumnDef::new(ID_COLUMN, "TEXT", true, ColumnSource::Identifier)];
            let mut foreign_keys = Vec::new();
            if owned {
                // Roots leave the parent columns NULL
                columns.push(ColumnDef::new(PARENT_COLUMN, "TEXT", !root, ColumnSource::Parent));
                columns.push(ColumnDef::new(FIELD_COLUMN, "TEXT", !root, ColumnSource::ParentField));
                let mut owner_types: Vec<&str> = info.owners().iter().map(|o| o.entity).collect();
                owner_types.sort_unstable();
                owner_types.dedup();
                if owner_types.len() == 1 {
                    foreign_keys.push(ForeignKey {
                        column: PARENT_COLUMN.to_string(),
                        table: owner_types[0].to_string(),
                    });
                }
            }
            columns.push(ColumnDef::new(ORDER_COLUMN, "INTEGER", true, ColumnSource::Order));

            let mut attributes = vec![AttributeDef {
                name: entity.identifier_attribute(),
                kind: AttributeKind::Id,
                required: true,
            }];
            let mut child_elements = Vec::new();
            let mut children = Vec::new();
            let mut aux_tables = Vec::new();

            for field in entity.persistent_fields() {
                match (field.role, field.multiplicity) {
                    (FieldRole::Attribute, Multiplicity::One) => {
                        let kind = field.scalar.unwrap_or(ScalarKind::Text);
                        columns.push(ColumnDef::new(
                            field.name,
                            kind.sql_type(),
                            field.required,
                            ColumnSource::Attribute { field: field.name, kind },
                        ));
                        attributes.push(AttributeDef {
                            name: field.name,
                            kind: AttributeKind::Data(kind),
                            required: field.required,
                        });
                    }
                    (FieldRole::Reference, Multiplicity::One) => {
                        let target = field.target.unwrap_or_default();
                        columns.push(ColumnDef::new(
                            field.name,
                            "TEXT",
                            field.required,
                            ColumnSource::Reference { field: field.name },
                        ));
                        attributes.push(AttributeDef {
                            name: field.name,
                            kind: AttributeKind::IdRef { target },
                            required: field.required,
                        });
                    }
                    (FieldRole::Attribute, Multiplicity::Many) => {
                        let kind = field.scalar.unwrap_or(ScalarKind::Text);
                        aux_tables.push(aux_table(
                            entity.name,
                            field.name,
                            TableKind::Values { field: field.name, kind },
                            ColumnDef::new(VALUE_COLUMN, kind.sql_type(), true, ColumnSource::Value { kind }),
                        ));
                        child_elements.push(ChildElementDef {
                            element: field.name,
                            content: ChildContent::ValueItem { kind },
                        });
                    }
                    (FieldRole::Reference, Multiplicity::Many) => {
                        let target = field.target.unwrap_or_default();
                        aux_tables.push(aux_table(
                            entity.name,
                            field.name,
                            TableKind::References { field: field.name },
                            ColumnDef::new(TARGET_COLUMN, "TEXT", true, ColumnSource::Target),
                        ));
                        child_elements.push(ChildElementDef {
                            element: field.name,
                            content: ChildContent::ReferenceItem { target },
                        });
                    }
                    (FieldRole::Children, _) => {
                        let target = field.target.unwrap_or_default();
                        children.push(ChildLink {
                            field: field.name,
                            entity: target,
                            parent_column: PARENT_COLUMN,
                            field_column: FIELD_COLUMN,
                            order_column: ORDER_COLUMN,
                        });
                    }
                    (FieldRole::Transient, _) => {}
                }
            }

            // List items precede nested nodes inside an element
            for link in &children {
                child_elements.push(ChildElementDef {
                    element: link.field,
                    content: ChildContent::Node { entity: link.entity },
                });
            }

            tables.push(TableDef {
                name: entity.name.to_string(),
                entity: entity.name,
                kind: TableKind::Entity { owned, root },
                columns,
                primary_key: vec![ID_COLUMN.to_string()],
                foreign_keys,
                children,
            });
            tables.extend(aux_tables);

            elements.push(ElementDef {
                entity: entity.name,
                root,
                attributes,
                children: child_elements,
            });
        }

        Self { tables, elements }
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn elements(&self) -> &[ElementDef] {
        &self.elements
    }

    /// Entity table of a type
    pub fn table(&self, entity: &str) -> Option<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.entity == entity && matches!(t.kind, TableKind::Entity { .. }))
    }

    /// Auxiliary table of a list-valued field
    pub fn aux_table(&self, entity: &str, field: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| {
            t.entity == entity
                && match t.kind {
                    TableKind::References { field: f } | TableKind::Values { field: f, .. } => f == field,
                    TableKind::Entity { .. } => false,
                }
        })
    }

    pub fn element(&self, entity: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.entity == entity)
    }

    /// SQL DDL for every table and index
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, table) in self.tables.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            table.create_sql(&mut out);
        }
        out
    }

    /// Human-readable element layout of the document format
    pub fn to_layout(&self) -> String {
        let mut out = String::new();
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let marker = if element.root { " (root)" } else { "" };
            let _ = writeln!(out, "element {}{}", element.entity, marker);
            for attr in &element.attributes {
                let kind = match attr.kind {
                    AttributeKind::Id => "ID".to_string(),
                    AttributeKind::IdRef { target } => format!("IDREF -> {}", target),
                    AttributeKind::Data(kind) => kind.as_str().to_string(),
                };
                let presence = if attr.required { "required" } else { "optional" };
                let _ = writeln!(out, "  @{}: {} {}", attr.name, kind, presence);
            }
            for child in &element.children {
                let content = match child.content {
                    ChildContent::Node { entity } => format!("<{}> {}", child.element, entity),
                    ChildContent::ReferenceItem { target } => {
                        format!("<{} ref=IDREF> -> {}", child.element, target)
                    }
                    ChildContent::ValueItem { kind } => format!("<{} value={}>", child.element, kind),
                };
                let _ = writeln!(out, "  {}*", content);
            }
        }
        out
    }

    /// BLAKE3 digest of the DDL; equal fingerprints mean equal layouts
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.to_sql().as_bytes()).to_hex().to_string()
    }
}

fn aux_table(entity: &'static str, field: &'static str, kind: TableKind, item: ColumnDef) -> TableDef {
    TableDef {
        name: format!("{}__{}", entity, field),
        entity,
        kind,
        columns: vec![
            ColumnDef::new(OWNER_COLUMN, "TEXT", true, ColumnSource::Owner),
            ColumnDef::new(ORDER_COLUMN, "INTEGER", true, ColumnSource::Order),
            item,
        ],
        primary_key: vec![OWNER_COLUMN.to_string(), ORDER_COLUMN.to_string()],
        foreign_keys: vec![ForeignKey {
            column: OWNER_COLUMN.to_string(),
            table: entity.to_string(),
        }],
        children: Vec::new(),
    }
}

/// Quote an SQL identifier
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;

    #[test]
    fn test_derivation_is_deterministic() {
        let a = Schema::derive(&model::registry().unwrap());
        let b = Schema::derive(&model::registry().unwrap());
        assert_eq!(a.to_sql(), b.to_sql());
        assert_eq!(a.to_layout(), b.to_layout());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_root_table_has_no_parent_columns() {
        let schema = Schema::derive(&model::registry().unwrap());
        let root = schema.table("LexicalResource").unwrap();
        assert!(!root.has_parent());
        let names: Vec<_> = root.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(&names[..2], &["_id", "_ord"]);
    }

    #[test]
    fn test_single_owner_gets_foreign_key() {
        let schema = Schema::derive(&model::registry().unwrap());
        let entry = schema.table("LexicalEntry").unwrap();
        assert_eq!(
            entry.foreign_keys,
            vec![ForeignKey { column: "_parent".into(), table: "Lexicon".into() }]
        );
        // senses are owned by entries and by other senses
        let sense = schema.table("Sense").unwrap();
        assert!(sense.foreign_keys.is_empty());
        assert_eq!(sense.children.len(), 2);
    }

    #[test]
    fn test_list_fields_get_aux_tables() {
        let schema = Schema::derive(&model::registry().unwrap());
        let frames = schema.aux_table("LexicalEntry", "frames").unwrap();
        assert_eq!(frames.name, "LexicalEntry__frames");
        assert_eq!(frames.primary_key, vec!["_owner".to_string(), "_ord".to_string()]);
        let examples = schema.aux_table("Sense", "examples").unwrap();
        assert!(matches!(examples.kind, TableKind::Values { kind: ScalarKind::Text, .. }));
    }

    #[test]
    fn test_reference_column_is_text() {
        let schema = Schema::derive(&model::registry().unwrap());
        let sense = schema.table("Sense").unwrap();
        let synset = sense.columns.iter().find(|c| c.name == "synset").unwrap();
        assert_eq!(synset.sql_type, "TEXT");
        assert_eq!(synset.source, ColumnSource::Reference { field: "synset" });
        let sql = schema.to_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"Sense__examples\""));
        assert!(sql.contains("FOREIGN KEY (\"_parent\") REFERENCES \"Lexicon\" (\"_id\")"));
    }

    #[test]
    fn test_layout_marks_identifiers() {
        let schema = Schema::derive(&model::registry().unwrap());
        let layout = schema.to_layout();
        assert!(layout.contains("element LexicalResource (root)"));
        assert!(layout.contains("@synset: IDREF -> Synset optional"));
        assert!(layout.contains("<frames ref=IDREF> -> SubcategorizationFrame*"));
    }
}
