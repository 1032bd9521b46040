//! Scalar values - the leaves of every entity
//!
//! Attribute fields hold one of five scalar kinds:
//! - `Text`: free string
//! - `Integer`: signed 64-bit
//! - `Float`: IEEE double
//! - `Boolean`
//! - `Date`: calendar date, ISO-8601 (`YYYY-MM-DD`)

use crate::Error;
use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar kinds an attribute may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
}

impl ScalarKind {
    /// Get the string representation of the scalar kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Date => "date",
        }
    }

    /// SQLite column type used to store this kind
    pub fn sql_type(&self) -> &'static str {
        match self {
            ScalarKind::Text | ScalarKind::Date => "TEXT",
            ScalarKind::Integer | ScalarKind::Boolean => "INTEGER",
            ScalarKind::Float => "REAL",
        }
    }

    /// Get all scalar kinds
    pub fn all() -> &'static [ScalarKind] {
        &[
            ScalarKind::Text,
            ScalarKind::Integer,
            ScalarKind::Float,
            ScalarKind::Boolean,
            ScalarKind::Date,
        ]
    }
}

impl FromStr for ScalarKind {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "string" | "str" => Ok(ScalarKind::Text),
            "integer" | "int" | "long" => Ok(ScalarKind::Integer),
            "float" | "double" | "real" => Ok(ScalarKind::Float),
            "boolean" | "bool" => Ok(ScalarKind::Boolean),
            "date" => Ok(ScalarKind::Date),
            _ => Err(Error::schema(format!("Unknown scalar kind: {}", s))),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            Value::Text(_) => ScalarKind::Text,
            Value::Integer(_) => ScalarKind::Integer,
            Value::Float(_) => ScalarKind::Float,
            Value::Boolean(_) => ScalarKind::Boolean,
            Value::Date(_) => ScalarKind::Date,
        }
    }

    /// Whether every representation can hold this value. SQLite turns a NaN
    /// REAL into NULL, so floats must be finite.
    pub fn is_storable(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    /// Parse the lexical form written by [`Value::to_text`].
    ///
    /// Returns `None` when `raw` is not a valid literal of `kind`; callers
    /// attach entity and field context to the error.
    pub fn parse(kind: ScalarKind, raw: &str) -> Option<Self> {
        match kind {
            ScalarKind::Text => Some(Value::Text(raw.to_string())),
            ScalarKind::Integer => raw.trim().parse().ok().map(Value::Integer),
            ScalarKind::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            ScalarKind::Boolean => match raw.trim() {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            ScalarKind::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .map(Value::Date),
        }
    }

    /// Lexical form used in documents. Floats use the shortest
    /// representation that parses back to the same bits.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Convert to an owned SQLite value
    pub fn to_sql(&self) -> SqlValue {
        match self {
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Integer(i) => SqlValue::Integer(*i),
            Value::Float(f) => SqlValue::Real(*f),
            Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
            Value::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Convert a SQLite column value back into a scalar of `kind`.
    ///
    /// `Ok(None)` for SQL NULL, `Err(raw)` with a printable form of the
    /// column when it does not fit the declared kind.
    pub fn from_sql(kind: ScalarKind, sql: SqlValue) -> std::result::Result<Option<Self>, String> {
        match (kind, sql) {
            (_, SqlValue::Null) => Ok(None),
            (ScalarKind::Text, SqlValue::Text(s)) => Ok(Some(Value::Text(s))),
            (ScalarKind::Integer, SqlValue::Integer(i)) => Ok(Some(Value::Integer(i))),
            (ScalarKind::Float, SqlValue::Real(f)) if f.is_finite() => Ok(Some(Value::Float(f))),
            (ScalarKind::Float, SqlValue::Integer(i)) => Ok(Some(Value::Float(i as f64))),
            (ScalarKind::Boolean, SqlValue::Integer(i)) => Ok(Some(Value::Boolean(i != 0))),
            (ScalarKind::Date, SqlValue::Text(s)) => Value::parse(ScalarKind::Date, &s)
                .map(Some)
                .ok_or(s),
            (_, other) => Err(format!("{:?}", other)),
        }
    }

    /// JSON form used by graph snapshots
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kind_roundtrip() {
        for kind in ScalarKind::all() {
            let parsed: ScalarKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_scalar_kind_aliases() {
        assert_eq!(ScalarKind::from_str("string").unwrap(), ScalarKind::Text);
        assert_eq!(ScalarKind::from_str("double").unwrap(), ScalarKind::Float);
        assert!(ScalarKind::from_str("blob").is_err());
    }

    #[test]
    fn test_lexical_forms() {
        let date = NaiveDate::from_ymd_opt(2008, 2, 29).unwrap();
        let samples = [
            Value::text("run"),
            Value::Integer(-42),
            Value::Float(0.1),
            Value::Boolean(true),
            Value::Date(date),
        ];
        for value in samples {
            let parsed = Value::parse(value.kind(), &value.to_text()).unwrap();
            assert_eq!(parsed, value);
        }
        assert_eq!(Value::Date(date).to_text(), "2008-02-29");
    }

    #[test]
    fn test_rejects_bad_literals() {
        assert!(Value::parse(ScalarKind::Integer, "twelve").is_none());
        assert!(Value::parse(ScalarKind::Boolean, "yes").is_none());
        assert!(Value::parse(ScalarKind::Date, "2008-02-30").is_none());
        assert!(Value::parse(ScalarKind::Float, "NaN").is_none());
        assert!(Value::parse(ScalarKind::Float, "inf").is_none());
        assert!(!Value::Float(f64::NEG_INFINITY).is_storable());
        assert!(Value::Float(-0.5).is_storable());
    }

    #[test]
    fn test_sql_conversion() {
        let flag = Value::Boolean(false);
        assert_eq!(flag.to_sql(), SqlValue::Integer(0));
        assert_eq!(
            Value::from_sql(ScalarKind::Boolean, SqlValue::Integer(0)),
            Ok(Some(Value::Boolean(false)))
        );
        assert_eq!(Value::from_sql(ScalarKind::Text, SqlValue::Null), Ok(None));
        assert!(Value::from_sql(ScalarKind::Integer, SqlValue::Text("x".into())).is_err());
        assert!(Value::from_sql(ScalarKind::Float, SqlValue::Real(f64::INFINITY)).is_err());
    }
}
