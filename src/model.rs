//! Built-in unified lexical-resource model
//!
//! A resource holds lexicons; a lexicon holds entries, synsets and
//! subcategorization frames. Senses point at synsets, relations point at
//! senses or synsets, and entries list the frames they take. Importers fill
//! graphs of these types; the CLI and the tests use them directly.

use std::sync::Arc;
use chrono::NaiveDate;
use crate::Result;
use crate::graph::Graph;
use crate::registry::TypeRegistry;
use crate::role::{EntityType, FieldDescriptor};
use crate::value::ScalarKind;

pub static LEXICAL_RESOURCE: EntityType = EntityType {
    name: "LexicalResource",
    identifier: Some("id"),
    fields: &[
        FieldDescriptor::attribute("label", ScalarKind::Text).required(),
        FieldDescriptor::attribute("created", ScalarKind::Date),
        FieldDescriptor::children("lexicons", "Lexicon"),
    ],
};

pub static LEXICON: EntityType = EntityType {
    name: "Lexicon",
    identifier: Some("id"),
    fields: &[
        FieldDescriptor::attribute("language", ScalarKind::Text).required(),
        FieldDescriptor::attribute("name", ScalarKind::Text),
        FieldDescriptor::children("entries", "LexicalEntry"),
        FieldDescriptor::children("synsets", "Synset"),
        FieldDescriptor::children("frames", "SubcategorizationFrame"),
    ],
};

pub static LEXICAL_ENTRY: EntityType = EntityType {
    name: "LexicalEntry",
    identifier: Some("id"),
    fields: &[
        FieldDescriptor::attribute("partOfSpeech", ScalarKind::Text),
        FieldDescriptor::children("lemmas", "Lemma"),
        FieldDescriptor::children("senses", "Sense"),
        FieldDescriptor::reference_list("frames", "SubcategorizationFrame"),
        // where the importer found the entry in its source file
        FieldDescriptor::transient("sourceOffset"),
    ],
};

pub static LEMMA: EntityType = EntityType {
    name: "Lemma",
    identifier: None,
    fields: &[
        FieldDescriptor::attribute("writtenForm", ScalarKind::Text).required(),
        FieldDescriptor::attribute("script", ScalarKind::Text),
    ],
};

pub static SENSE: EntityType = EntityType {
    name: "Sense",
    identifier: Some("id"),
    fields: &[
        FieldDescriptor::attribute("index", ScalarKind::Integer),
        FieldDescriptor::attribute("gloss", ScalarKind::Text),
        FieldDescriptor::attribute_list("examples", ScalarKind::Text),
        FieldDescriptor::reference("synset", "Synset"),
        FieldDescriptor::attribute("frequency", ScalarKind::Float),
        FieldDescriptor::attribute("core", ScalarKind::Boolean),
        FieldDescriptor::children("subsenses", "Sense"),
        FieldDescriptor::children("relations", "SenseRelation"),
    ],
};

pub static SENSE_RELATION: EntityType = EntityType {
    name: "SenseRelation",
    identifier: None,
    fields: &[
        FieldDescriptor::attribute("relType", ScalarKind::Text).required(),
        FieldDescriptor::reference("target", "Sense").required(),
    ],
};

pub static SYNSET: EntityType = EntityType {
    name: "Synset",
    identifier: Some("id"),
    fields: &[
        FieldDescriptor::attribute("definition", ScalarKind::Text),
        FieldDescriptor::children("relations", "SynsetRelation"),
    ],
};

pub static SYNSET_RELATION: EntityType = EntityType {
    name: "SynsetRelation",
    identifier: None,
    fields: &[
        FieldDescriptor::attribute("relType", ScalarKind::Text).required(),
        FieldDescriptor::reference("target", "Synset").required(),
    ],
};

pub static SUBCATEGORIZATION_FRAME: EntityType = EntityType {
    name: "SubcategorizationFrame",
    identifier: Some("id"),
    fields: &[FieldDescriptor::attribute("label", ScalarKind::Text)],
};

/// Every type of the model, in registration order
pub static TYPES: &[&EntityType] = &[
    &LEXICAL_RESOURCE,
    &LEXICON,
    &LEXICAL_ENTRY,
    &LEMMA,
    &SENSE,
    &SENSE_RELATION,
    &SYNSET,
    &SYNSET_RELATION,
    &SUBCATEGORIZATION_FRAME,
];

/// Build the registry for the built-in model
pub fn registry() -> Result<Arc<TypeRegistry>> {
    let registry = TypeRegistry::builder()
        .register_all(TYPES)
        .root(LEXICAL_RESOURCE.name)
        .build()?;
    Ok(Arc::new(registry))
}

/// A small resource exercising every role: nested senses, scalar lists,
/// reference lists, a reference cycle between two synsets and a sense
/// relation pointing forward to a sense of a later entry.
///
/// References are set by identifier, the way an importer would; call
/// [`Graph::link`] to bind them.
pub fn sample_graph(registry: Arc<TypeRegistry>) -> Result<Graph> {
    let mut g = Graph::new(registry);

    let res = g.add_root("LexicalResource", "sample")?;
    g.set_attribute(res, "label", "Sample lexical resource")?;
    if let Some(date) = NaiveDate::from_ymd_opt(2024, 5, 1) {
        g.set_attribute(res, "created", date)?;
    }

    let lex = g.add_child(res, "lexicons", "sample-en")?;
    g.set_attribute(lex, "language", "en")?;
    g.set_attribute(lex, "name", "Sample English")?;

    let bank = g.add_child(lex, "entries", "bank-n")?;
    g.set_attribute(bank, "partOfSpeech", "noun")?;
    g.set_transient(bank, "sourceOffset", 1024i64)?;
    let lemma = g.add_child(bank, "lemmas", "bank-n-lemma")?;
    g.set_attribute(lemma, "writtenForm", "bank")?;
    g.push_reference_id(bank, "frames", "frame-np")?;

    let river = g.add_child(bank, "senses", "bank-n-1")?;
    g.set_attribute(river, "index", 1i64)?;
    g.set_attribute(river, "gloss", "sloping land beside a body of water")?;
    g.push_attribute(river, "examples", "they pulled the canoe up on the bank")?;
    g.push_attribute(river, "examples", "he sat on the bank of the river")?;
    g.set_reference_id(river, "synset", "ss-bank-land")?;
    g.set_attribute(river, "frequency", 0.25)?;
    g.set_attribute(river, "core", true)?;

    let money = g.add_child(bank, "senses", "bank-n-2")?;
    g.set_attribute(money, "index", 2i64)?;
    g.set_attribute(money, "gloss", "a financial institution")?;
    g.set_reference_id(money, "synset", "ss-bank-finance")?;
    let branch = g.add_child(money, "subsenses", "bank-n-2a")?;
    g.set_attribute(branch, "gloss", "a branch office of a bank")?;

    // points forward to a sense of the next entry
    let rel = g.add_child(money, "relations", "bank-n-2-rel-1")?;
    g.set_attribute(rel, "relType", "related")?;
    g.set_reference_id(rel, "target", "shore-n-1")?;

    let shore = g.add_child(lex, "entries", "shore-n")?;
    g.set_attribute(shore, "partOfSpeech", "noun")?;
    let lemma = g.add_child(shore, "lemmas", "shore-n-lemma")?;
    g.set_attribute(lemma, "writtenForm", "shore")?;
    let shore_sense = g.add_child(shore, "senses", "shore-n-1")?;
    g.set_attribute(shore_sense, "gloss", "the land along the edge of a body of water")?;
    g.set_reference_id(shore_sense, "synset", "ss-bank-land")?;

    // empty entry: no lemmas, senses or frames
    g.add_child(lex, "entries", "placeholder-n")?;

    let land = g.add_child(lex, "synsets", "ss-bank-land")?;
    g.set_attribute(land, "definition", "land alongside water")?;
    let finance = g.add_child(lex, "synsets", "ss-bank-finance")?;
    g.set_attribute(finance, "definition", "an institution accepting deposits")?;

    // land <-> finance, a reference cycle
    let up = g.add_child(land, "relations", "ss-bank-land-rel")?;
    g.set_attribute(up, "relType", "also")?;
    g.set_reference_id(up, "target", "ss-bank-finance")?;
    let back = g.add_child(finance, "relations", "ss-bank-finance-rel")?;
    g.set_attribute(back, "relType", "also")?;
    g.set_reference_id(back, "target", "ss-bank-land")?;

    let frame = g.add_child(lex, "frames", "frame-np")?;
    g.set_attribute(frame, "label", "NP")?;

    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ResolutionMode;

    #[test]
    fn test_registry_builds() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), TYPES.len());
        assert_eq!(registry.roots(), &["LexicalResource"]);
        let sense = registry.info("Sense").unwrap();
        assert_eq!(sense.owners().len(), 2);
    }

    #[test]
    fn test_sample_links_cleanly() {
        let mut g = sample_graph(registry().unwrap()).unwrap();
        assert!(g.stats().unresolved > 0);
        let warnings = g.link(ResolutionMode::Strict).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(g.stats().unresolved, 0);
        assert_eq!(g.stats().per_type["Sense"], 4);
    }
}
