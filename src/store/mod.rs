//! Store backends - where record streams come from and go to
//!
//! Two representations sit behind the [`RecordSource`] / [`RecordSink`]
//! seam:
//! - SQLite: one table per entity type plus list tables, see [`crate::schema`]
//! - XML: one nested document under a `<lexbridge>` element

pub mod sqlite;
pub mod xml;

pub use sqlite::{SqliteReader, SqliteWriter};
pub use xml::{XmlReader, XmlWriter};

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::Result;
use crate::registry::TypeRegistry;
use crate::stream::{RecordSink, RecordSource};

/// Storage backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Xml,
}

impl Backend {
    /// Pick a backend from a file extension: `.xml` is a document,
    /// anything else a SQLite database
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => Backend::Xml,
            _ => Backend::Sqlite,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Xml => "xml",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(Backend::Sqlite),
            "xml" => Ok(Backend::Xml),
            other => Err(format!("unknown backend '{}' (expected sqlite or xml)", other)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open a stored representation for reading
pub fn open_source(
    backend: Backend,
    path: &Path,
    registry: Arc<TypeRegistry>,
) -> Result<Box<dyn RecordSource + Send>> {
    tracing::debug!("Opening {} source at {}", backend, path.display());
    Ok(match backend {
        Backend::Sqlite => Box::new(SqliteReader::open(path, registry)?),
        Backend::Xml => Box::new(XmlReader::open(path, registry)?),
    })
}

/// Create a stored representation for writing
pub fn create_sink(
    backend: Backend,
    path: &Path,
    registry: Arc<TypeRegistry>,
    batch_size: usize,
) -> Result<Box<dyn RecordSink>> {
    tracing::debug!("Creating {} sink at {}", backend, path.display());
    Ok(match backend {
        Backend::Sqlite => Box::new(SqliteWriter::open(path, &registry, batch_size)?),
        Backend::Xml => Box::new(XmlWriter::create(path, registry)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_path() {
        assert_eq!(Backend::from_path(Path::new("out/lexicon.XML")), Backend::Xml);
        assert_eq!(Backend::from_path(Path::new("lexicon.db")), Backend::Sqlite);
        assert_eq!(Backend::from_path(Path::new("lexicon")), Backend::Sqlite);
        assert_eq!("XML".parse::<Backend>(), Ok(Backend::Xml));
        assert!("postgres".parse::<Backend>().is_err());
    }
}
