//! SQLite store - relational writer and reader over the derived schema

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use crate::{Error, Result};
use crate::registry::TypeRegistry;
use crate::role::{FieldRole, Multiplicity};
use crate::schema::{quote, ColumnSource, Schema, TableKind, META_TABLE};
use crate::stream::{FieldRecord, FieldValue, NodeRecord, ParentLink, RecordSink, RecordSource, RefValue};
use crate::value::{ScalarKind, Value};

const FINGERPRINT_KEY: &str = "fingerprint";

/// SQL text per table, aligned with `Schema::tables()`
#[derive(Debug)]
struct Statements {
    insert: String,
    select_roots: String,
    select_children: String,
    select_items: String,
}

fn statements(schema: &Schema) -> Vec<Statements> {
    schema
        .tables()
        .iter()
        .map(|t| Statements {
            insert: t.insert_sql(),
            select_roots: t.select_roots_sql(),
            select_children: t.select_children_sql(),
            select_items: t.select_items_sql(),
        })
        .collect()
}

/// Table positions by entity and by (entity, list field)
#[derive(Debug, Default)]
struct TableIndex {
    entities: HashMap<&'static str, usize>,
    lists: HashMap<(&'static str, &'static str), usize>,
}

impl TableIndex {
    fn new(schema: &Schema) -> Self {
        let mut index = Self::default();
        for (i, table) in schema.tables().iter().enumerate() {
            match table.kind {
                TableKind::Entity { .. } => {
                    index.entities.insert(table.entity, i);
                }
                TableKind::References { field } | TableKind::Values { field, .. } => {
                    index.lists.insert((table.entity, field), i);
                }
            }
        }
        index
    }

    fn entity(&self, entity: &str) -> Result<usize> {
        self.entities
            .get(entity)
            .copied()
            .ok_or_else(|| Error::schema(format!("No table for entity type {}", entity)))
    }

    fn list(&self, entity: &str, field: &str) -> Result<usize> {
        self.lists
            .get(&(entity, field))
            .copied()
            .ok_or_else(|| Error::schema(format!("No list table for {}.{}", entity, field)))
    }
}

fn meta_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        quote(META_TABLE)
    )
}

/// Fingerprint stored in a database, `None` when it was never initialized
fn stored_fingerprint(conn: &Connection) -> Result<Option<String>> {
    let has_meta: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [META_TABLE],
            |row| row.get(0),
        )
        .optional()?;
    if has_meta.is_none() {
        return Ok(None);
    }
    let sql = format!("SELECT value FROM {} WHERE key = ?1", quote(META_TABLE));
    Ok(conn.query_row(&sql, [FINGERPRINT_KEY], |row| row.get(0)).optional()?)
}

// ========== Writer ==========

/// Writes a record stream into SQLite tables.
///
/// Rows are queued in emission order and flushed in one transaction every
/// `batch_size` records, so parents always land before their children and
/// owners before their linkage rows.
pub struct SqliteWriter {
    conn: Connection,
    schema: Schema,
    statements: Vec<Statements>,
    tables: TableIndex,
    batch_size: usize,
    /// (table position, row values) waiting for the next flush
    pending: Vec<(usize, Vec<SqlValue>)>,
    buffered: usize,
    written: usize,
}

impl SqliteWriter {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, registry: &TypeRegistry, batch_size: usize) -> Result<Self> {
        Self::from_connection(Connection::open(path)?, registry, batch_size)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(registry: &TypeRegistry, batch_size: usize) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, registry, batch_size)
    }

    /// Create the schema on an existing connection.
    ///
    /// A database already stamped with another fingerprint is refused.
    pub fn from_connection(conn: Connection, registry: &TypeRegistry, batch_size: usize) -> Result<Self> {
        let schema = Schema::derive(registry);
        let fingerprint = schema.fingerprint();
        if let Some(found) = stored_fingerprint(&conn)? {
            if found != fingerprint {
                return Err(Error::SchemaMismatch {
                    expected: fingerprint,
                    found,
                });
            }
        }

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(&schema.to_sql())?;
        conn.execute(&meta_table_sql(), [])?;
        conn.execute(
            &format!("INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)", quote(META_TABLE)),
            params![FINGERPRINT_KEY, fingerprint],
        )?;
        tracing::debug!("Initialized SQLite schema ({} tables)", schema.tables().len());

        Ok(Self {
            conn,
            statements: statements(&schema),
            tables: TableIndex::new(&schema),
            schema,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            buffered: 0,
            written: 0,
        })
    }

    /// Records committed so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Hand back the connection, e.g. to read the store again
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn rows(&self, record: &NodeRecord) -> Result<Vec<(usize, Vec<SqlValue>)>> {
        let t = self.tables.entity(record.entity)?;
        let table = &self.schema.tables()[t];

        for field in &record.fields {
            let inline = matches!(field.value, FieldValue::Scalar(_) | FieldValue::Reference(_));
            if inline && !table.columns.iter().any(|c| c.name == field.name) {
                return Err(Error::schema(format!("{} has no column '{}'", table.name, field.name)));
            }
        }

        let parent = record.parent.as_ref();
        let mut row = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let value = match column.source {
                ColumnSource::Identifier => SqlValue::Text(record.identifier.clone()),
                ColumnSource::Parent => parent
                    .map(|p| SqlValue::Text(p.identifier.clone()))
                    .unwrap_or(SqlValue::Null),
                ColumnSource::ParentField => parent
                    .map(|p| SqlValue::Text(p.field.to_string()))
                    .unwrap_or(SqlValue::Null),
                ColumnSource::Order => SqlValue::Integer(record.order),
                ColumnSource::Attribute { field, .. } => match record.field(field) {
                    Some(FieldValue::Scalar(Some(v))) => v.to_sql(),
                    _ => SqlValue::Null,
                },
                ColumnSource::Reference { field } => match record.field(field) {
                    Some(FieldValue::Reference(RefValue::Target(id))) => SqlValue::Text(id.clone()),
                    _ => SqlValue::Null,
                },
                ColumnSource::Owner | ColumnSource::Target | ColumnSource::Value { .. } => SqlValue::Null,
            };
            row.push(value);
        }

        let mut rows = vec![(t, row)];
        for field in &record.fields {
            let items: Vec<SqlValue> = match &field.value {
                FieldValue::Scalars(values) => values.iter().map(Value::to_sql).collect(),
                FieldValue::References(ids) => ids.iter().cloned().map(SqlValue::Text).collect(),
                _ => continue,
            };
            let aux = self.tables.list(record.entity, field.name)?;
            for (i, item) in items.into_iter().enumerate() {
                rows.push((
                    aux,
                    vec![SqlValue::Text(record.identifier.clone()), SqlValue::Integer(i as i64), item],
                ));
            }
        }
        Ok(rows)
    }

    /// Commit everything queued so far in one transaction
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        for (t, values) in self.pending.drain(..) {
            let mut stmt = tx.prepare_cached(&self.statements[t].insert)?;
            stmt.execute(params_from_iter(values))?;
        }
        tx.commit()?;
        self.written += self.buffered;
        tracing::debug!("Flushed batch of {} records ({} total)", self.buffered, self.written);
        self.buffered = 0;
        Ok(())
    }
}

impl RecordSink for SqliteWriter {
    fn write_record(&mut self, record: NodeRecord) -> Result<()> {
        let rows = self.rows(&record)?;
        self.pending.extend(rows);
        self.buffered += 1;
        if self.buffered >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}

// ========== Reader ==========

/// A row fetched from an entity table, waiting to be emitted
#[derive(Debug)]
struct PendingRow {
    table: usize,
    values: Vec<SqlValue>,
    parent: Option<ParentLink>,
    depth: usize,
}

/// Reads a store back as a preorder record stream.
///
/// Roots are loaded up front; children are queried lazily, one owner at a
/// time, when their parent is emitted.
pub struct SqliteReader {
    conn: Connection,
    registry: Arc<TypeRegistry>,
    schema: Schema,
    statements: Vec<Statements>,
    tables: TableIndex,
    stack: Vec<PendingRow>,
    started: bool,
}

impl SqliteReader {
    pub fn open(path: &Path, registry: Arc<TypeRegistry>) -> Result<Self> {
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Self::from_connection(conn, registry)
    }

    /// Read from an existing connection. The stored fingerprint must match
    /// the schema derived from `registry`.
    pub fn from_connection(conn: Connection, registry: Arc<TypeRegistry>) -> Result<Self> {
        let schema = Schema::derive(&registry);
        let expected = schema.fingerprint();
        match stored_fingerprint(&conn)? {
            Some(found) if found == expected => {}
            found => {
                return Err(Error::SchemaMismatch {
                    expected,
                    found: found.unwrap_or_else(|| "none".to_string()),
                });
            }
        }
        Ok(Self {
            conn,
            registry,
            statements: statements(&schema),
            tables: TableIndex::new(&schema),
            schema,
            stack: Vec::new(),
            started: false,
        })
    }

    fn fetch<P: rusqlite::Params>(&self, sql: &str, width: usize, params: P) -> Result<Vec<Vec<SqlValue>>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, |row| (0..width).map(|i| row.get::<_, SqlValue>(i)).collect())?
            .collect::<rusqlite::Result<Vec<Vec<SqlValue>>>>()?;
        Ok(rows)
    }

    fn load_roots(&mut self) -> Result<()> {
        let mut roots: Vec<(i64, PendingRow)> = Vec::new();
        for &root in self.registry.roots() {
            let t = self.tables.entity(root)?;
            let table = &self.schema.tables()[t];
            let order_at = column_position(table, |s| matches!(s, ColumnSource::Order))?;
            for values in self.fetch(&self.statements[t].select_roots, table.columns.len(), [])? {
                let order = match values[order_at] {
                    SqlValue::Integer(i) => i,
                    _ => 0,
                };
                roots.push((order, PendingRow { table: t, values, parent: None, depth: 0 }));
            }
        }
        // stable: equal orders keep root type declaration order
        roots.sort_by_key(|(order, _)| *order);
        tracing::debug!("Loaded {} root rows", roots.len());
        self.stack = roots.into_iter().rev().map(|(_, row)| row).collect();
        Ok(())
    }

    fn record(&mut self, row: PendingRow) -> Result<NodeRecord> {
        let table = &self.schema.tables()[row.table];
        let entity = self.registry.require(table.entity)?.entity;

        let mut identifier = String::new();
        let mut order = 0;
        let mut inline: HashMap<&str, SqlValue> = HashMap::new();
        for (column, value) in table.columns.iter().zip(row.values) {
            match (column.source, value) {
                (ColumnSource::Identifier, SqlValue::Text(id)) => identifier = id,
                (ColumnSource::Order, SqlValue::Integer(i)) => order = i,
                (ColumnSource::Attribute { .. } | ColumnSource::Reference { .. }, value) => {
                    inline.insert(column.name.as_str(), value);
                }
                _ => {}
            }
        }
        if identifier.is_empty() {
            return Err(Error::schema(format!("Row of {} without identifier", table.name)));
        }

        let mut fields = Vec::new();
        for field in entity.persistent_fields() {
            let value = match (field.role, field.multiplicity) {
                (FieldRole::Children, _) => continue,
                (FieldRole::Attribute, Multiplicity::One) => {
                    let kind = field.scalar.unwrap_or(ScalarKind::Text);
                    let raw = inline.remove(field.name).unwrap_or(SqlValue::Null);
                    FieldValue::Scalar(scalar(entity.name, &identifier, field.name, kind, raw)?)
                }
                (FieldRole::Reference, Multiplicity::One) => {
                    FieldValue::Reference(match inline.remove(field.name) {
                        Some(SqlValue::Text(id)) => RefValue::Target(id),
                        Some(SqlValue::Null) | None => RefValue::Absent,
                        Some(other) => {
                            return Err(Error::InvalidValue {
                                entity: entity.name.to_string(),
                                identifier,
                                field: field.name.to_string(),
                                kind: ScalarKind::Text,
                                value: format!("{:?}", other),
                            });
                        }
                    })
                }
                (FieldRole::Attribute, Multiplicity::Many) => {
                    let kind = field.scalar.unwrap_or(ScalarKind::Text);
                    let t = self.tables.list(entity.name, field.name)?;
                    let mut values = Vec::new();
                    for mut item in self.fetch(&self.statements[t].select_items, 1, [&identifier])? {
                        let raw = item.pop().unwrap_or(SqlValue::Null);
                        if let Some(v) = scalar(entity.name, &identifier, field.name, kind, raw)? {
                            values.push(v);
                        }
                    }
                    FieldValue::Scalars(values)
                }
                (FieldRole::Reference, Multiplicity::Many) => {
                    let t = self.tables.list(entity.name, field.name)?;
                    let ids = self
                        .fetch(&self.statements[t].select_items, 1, [&identifier])?
                        .into_iter()
                        .filter_map(|mut item| match item.pop() {
                            Some(SqlValue::Text(id)) => Some(id),
                            _ => None,
                        })
                        .collect();
                    FieldValue::References(ids)
                }
                (FieldRole::Transient, _) => continue,
            };
            fields.push(FieldRecord { name: field.name, value });
        }

        // Queue owned children, first field first
        let mut children = Vec::new();
        for link in &table.children {
            let t = self.tables.entity(link.entity)?;
            let width = self.schema.tables()[t].columns.len();
            for values in self.fetch(&self.statements[t].select_children, width, params![identifier, link.field])? {
                children.push(PendingRow {
                    table: t,
                    values,
                    parent: Some(ParentLink {
                        identifier: identifier.clone(),
                        field: link.field,
                    }),
                    depth: row.depth + 1,
                });
            }
        }
        self.stack.extend(children.into_iter().rev());

        Ok(NodeRecord {
            entity: entity.name,
            identifier,
            parent: row.parent,
            order,
            depth: row.depth,
            fields,
        })
    }
}

impl RecordSource for SqliteReader {
    fn next_record(&mut self) -> Result<Option<NodeRecord>> {
        if !self.started {
            self.started = true;
            self.load_roots()?;
        }
        match self.stack.pop() {
            Some(row) => self.record(row).map(Some),
            None => Ok(None),
        }
    }
}

fn column_position(table: &crate::schema::TableDef, pick: impl Fn(ColumnSource) -> bool) -> Result<usize> {
    table
        .columns
        .iter()
        .position(|c| pick(c.source))
        .ok_or_else(|| Error::schema(format!("Table {} lacks a required column", table.name)))
}

fn scalar(entity: &str, identifier: &str, field: &str, kind: ScalarKind, raw: SqlValue) -> Result<Option<Value>> {
    Value::from_sql(kind, raw).map_err(|value| Error::InvalidValue {
        entity: entity.to_string(),
        identifier: identifier.to_string(),
        field: field.to_string(),
        kind,
        value,
    })
}
