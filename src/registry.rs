//! Type Registry - the closed set of entity types known to one process
//!
//! Built once at startup from static descriptor tables. Building validates
//! every declaration, so a misconfigured type surfaces as a schema error
//! before any encode or decode starts, never halfway through one.

use std::collections::HashMap;
use crate::{Error, Result};
use crate::role::{EntityType, FieldDescriptor, FieldRole};

/// A place where a type can be owned: `entity.field` is a children field
/// whose target is the owned type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub entity: &'static str,
    pub field: &'static str,
}

/// Cached, validated view of one entity type.
#[derive(Debug)]
pub struct TypeInfo {
    pub entity: &'static EntityType,
    positions: HashMap<&'static str, usize>,
    owners: Vec<Owner>,
    root: bool,
}

impl TypeInfo {
    /// Position of a field in the declaration order
    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    /// Look up a field descriptor with its position
    pub fn field(&self, field: &str) -> Option<(usize, &'static FieldDescriptor)> {
        let entity = self.entity;
        self.position(field).map(|i| (i, &entity.fields[i]))
    }

    /// Children fields (of any type) that may own nodes of this type
    pub fn owners(&self) -> &[Owner] {
        &self.owners
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_owned(&self) -> bool {
        !self.owners.is_empty()
    }
}

/// Registry of entity types.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    by_name: HashMap<&'static str, usize>,
    roots: Vec<&'static str>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Get the cached info for a type
    pub fn info(&self, name: &str) -> Option<&TypeInfo> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    /// Get the cached info for a type, or a schema error naming it
    pub fn require(&self, name: &str) -> Result<&TypeInfo> {
        self.info(name)
            .ok_or_else(|| Error::schema(format!("Unknown entity type: {}", name)))
    }

    pub fn get(&self, name: &str) -> Option<&'static EntityType> {
        self.info(name).map(|info| info.entity)
    }

    /// All types in registration order
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }

    /// Root type names in declaration order
    pub fn roots(&self) -> &[&'static str] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Collects type declarations and validates them into a [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    types: Vec<&'static EntityType>,
    roots: Vec<&'static str>,
}

impl TypeRegistryBuilder {
    /// Register an entity type
    pub fn register(mut self, entity: &'static EntityType) -> Self {
        self.types.push(entity);
        self
    }

    /// Register several entity types in order
    pub fn register_all(mut self, entities: &[&'static EntityType]) -> Self {
        self.types.extend_from_slice(entities);
        self
    }

    /// Declare a type whose nodes may appear at the top of a graph
    pub fn root(mut self, name: &'static str) -> Self {
        self.roots.push(name);
        self
    }

    /// Validate every declaration and build the registry
    pub fn build(self) -> Result<TypeRegistry> {
        if self.roots.is_empty() {
            return Err(Error::schema("No root entity type declared"));
        }

        let mut by_name = HashMap::new();
        for (i, entity) in self.types.iter().enumerate() {
            check_name(entity.name, "entity type")?;
            // list tables are named `<Type>__<field>`
            if entity.name.contains("__") {
                return Err(Error::schema(format!(
                    "Entity type name {:?} must not contain '__'",
                    entity.name
                )));
            }
            if by_name.insert(entity.name, i).is_some() {
                return Err(Error::schema(format!("Duplicate entity type: {}", entity.name)));
            }
        }

        for root in &self.roots {
            if !by_name.contains_key(root) {
                return Err(Error::schema(format!("Root type {} is not registered", root)));
            }
        }

        let mut types = Vec::with_capacity(self.types.len());
        for &entity in &self.types {
            let positions = check_fields(entity, &self.types, &by_name)?;
            types.push(TypeInfo {
                entity,
                positions,
                owners: Vec::new(),
                root: self.roots.contains(&entity.name),
            });
        }

        // Ownership is derived from children fields, in registration then
        // declaration order, so it is stable across builds.
        for &entity in &self.types {
            for field in entity.children_fields() {
                if let Some(&target) = field.target.as_ref().and_then(|t| by_name.get(t)) {
                    types[target].owners.push(Owner {
                        entity: entity.name,
                        field: field.name,
                    });
                }
            }
        }

        let mut roots = Vec::new();
        for root in self.roots {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }

        tracing::debug!("Type registry built: {} types, {} roots", types.len(), roots.len());
        Ok(TypeRegistry { types, by_name, roots })
    }
}

fn check_name(name: &str, what: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::schema(format!("Invalid {} name: {:?}", what, name)))
    }
}

fn check_fields(
    entity: &'static EntityType,
    all: &[&'static EntityType],
    by_name: &HashMap<&'static str, usize>,
) -> Result<HashMap<&'static str, usize>> {
    let mut positions = HashMap::new();

    if let Some(id) = entity.identifier {
        check_name(id, "identifier")?;
    }

    for (i, field) in entity.fields.iter().enumerate() {
        let at = || format!("{}.{}", entity.name, field.name);
        check_name(field.name, "field")?;
        if positions.insert(field.name, i).is_some() {
            return Err(Error::schema(format!("Duplicate field {}", at())));
        }
        if Some(field.name) == entity.identifier {
            return Err(Error::schema(format!("Field {} collides with the identifier attribute", at())));
        }

        match field.role {
            FieldRole::Attribute => {
                if field.scalar.is_none() {
                    return Err(Error::schema(format!("Attribute {} has no scalar kind", at())));
                }
                if field.target.is_some() {
                    return Err(Error::schema(format!("Attribute {} declares a nested type", at())));
                }
            }
            FieldRole::Children | FieldRole::Reference => {
                let target = field
                    .target
                    .ok_or_else(|| Error::schema(format!("Field {} has no nested type", at())))?;
                let target_entity = by_name
                    .get(target)
                    .map(|&t| all[t])
                    .ok_or_else(|| Error::schema(format!("Field {} names unknown type {}", at(), target)))?;
                if field.role == FieldRole::Reference && target_entity.identifier.is_none() {
                    return Err(Error::schema(format!(
                        "Reference {} targets {} which declares no identifier field",
                        at(),
                        target
                    )));
                }
                if field.role == FieldRole::Children && field.required {
                    return Err(Error::schema(format!("Children field {} cannot be required", at())));
                }
            }
            FieldRole::Transient => {}
        }

        if field.required && field.is_list() {
            return Err(Error::schema(format!("Collection {} cannot be required", at())));
        }
    }

    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarKind;

    static BOOK: EntityType = EntityType {
        name: "Book",
        identifier: Some("id"),
        fields: &[
            FieldDescriptor::attribute("title", ScalarKind::Text),
            FieldDescriptor::children("chapters", "Chapter"),
        ],
    };

    static CHAPTER: EntityType = EntityType {
        name: "Chapter",
        identifier: None,
        fields: &[
            FieldDescriptor::children("sections", "Chapter"),
            FieldDescriptor::reference("book", "Book"),
        ],
    };

    #[test]
    fn test_build_valid_registry() {
        let registry = TypeRegistry::builder()
            .register(&BOOK)
            .register(&CHAPTER)
            .root("Book")
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.info("Book").unwrap().is_root());
        let chapter = registry.info("Chapter").unwrap();
        assert_eq!(
            chapter.owners(),
            &[
                Owner { entity: "Book", field: "chapters" },
                Owner { entity: "Chapter", field: "sections" },
            ]
        );
        assert_eq!(chapter.field("book").unwrap().0, 1);
    }

    #[test]
    fn test_unknown_nested_type() {
        let err = TypeRegistry::builder().register(&BOOK).root("Book").build().unwrap_err();
        assert!(err.to_string().contains("Book.chapters"));
        assert!(err.is_structural());
    }

    #[test]
    fn test_reference_needs_identifier() {
        static NOTE: EntityType = EntityType {
            name: "Note",
            identifier: Some("id"),
            fields: &[FieldDescriptor::reference("chapter", "Chapter")],
        };
        let err = TypeRegistry::builder()
            .register_all(&[&BOOK, &CHAPTER, &NOTE])
            .root("Book")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("declares no identifier"));
    }

    #[test]
    fn test_reserved_and_duplicate_names() {
        static HIDDEN: EntityType = EntityType {
            name: "Hidden",
            identifier: Some("id"),
            fields: &[FieldDescriptor::attribute("_ord", ScalarKind::Integer)],
        };
        assert!(TypeRegistry::builder().register(&HIDDEN).root("Hidden").build().is_err());

        assert!(TypeRegistry::builder()
            .register_all(&[&BOOK, &CHAPTER, &BOOK])
            .root("Book")
            .build()
            .is_err());

        // `__` is the list-table separator
        static SHADOW: EntityType = EntityType {
            name: "Book__tags",
            identifier: Some("id"),
            fields: &[],
        };
        let err = TypeRegistry::builder()
            .register_all(&[&BOOK, &CHAPTER, &SHADOW])
            .root("Book")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Book__tags"));
    }

    #[test]
    fn test_roots_required() {
        assert!(TypeRegistry::builder().register(&BOOK).build().is_err());
        assert!(TypeRegistry::builder()
            .register_all(&[&BOOK, &CHAPTER])
            .root("Library")
            .build()
            .is_err());
    }
}
