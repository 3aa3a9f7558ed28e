//! Semantic type resolution.
//!
//! Attributes declare semantic types ("string", "dateTime", "objectid", ...)
//! that the type map translates, aliases included, into the physical column
//! types the dialect layer renders. The map is built once and shared by
//! reference; an unknown name is a per-column condition the table build
//! recovers from, never a fatal one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Physical column types the dialect layer renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Variable-length string.
    String,
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInteger,
    /// Unbounded text.
    Text,
    /// Floating point.
    Float,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Date and time.
    DateTime,
    /// Time only.
    Time,
    /// Timestamp.
    Timestamp,
    /// Binary data.
    Binary,
    /// Enumerated string.
    Enum,
    /// JSON document.
    Json,
    /// Binary JSON document.
    Jsonb,
    /// UUID.
    Uuid,
}

/// Immutable semantic-type lookup, constructed once and passed by reference.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    map: HashMap<&'static str, ColumnType>,
}

impl TypeMapper {
    /// Builds the full vocabulary, legacy aliases included.
    #[must_use]
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert("string", ColumnType::String);
        map.insert("alphanumeric", ColumnType::String);
        map.insert("alphanumericdashed", ColumnType::String);
        map.insert("email", ColumnType::String);
        map.insert("number", ColumnType::Integer);
        map.insert("integer", ColumnType::Integer);
        map.insert("bigInteger", ColumnType::BigInteger);
        map.insert("text", ColumnType::Text);
        map.insert("mediumtext", ColumnType::Text);
        map.insert("longtext", ColumnType::Text);
        map.insert("float", ColumnType::Float);
        map.insert("decimal", ColumnType::Decimal);
        map.insert("boolean", ColumnType::Boolean);
        map.insert("date", ColumnType::Date);
        map.insert("dateTime", ColumnType::DateTime);
        map.insert("datetime", ColumnType::DateTime);
        map.insert("time", ColumnType::Time);
        map.insert("timestamp", ColumnType::Timestamp);
        map.insert("timeStamp", ColumnType::Timestamp);
        map.insert("binary", ColumnType::Binary);
        map.insert("enum", ColumnType::Enum);
        map.insert("json", ColumnType::Json);
        map.insert("jsonb", ColumnType::Jsonb);
        map.insert("uuid", ColumnType::Uuid);
        map.insert("objectid", ColumnType::Uuid);
        // Relation scalars: a `model` attribute stores the target's key,
        // a `collection` not resolved to a join table stores inline JSON.
        map.insert("model", ColumnType::String);
        map.insert("collection", ColumnType::Json);
        map.insert("array", ColumnType::Json);
        Self { map }
    }

    /// Resolves a semantic type name to its physical column type.
    ///
    /// # Errors
    /// [`SyncError::UnknownType`] for names outside the vocabulary; callers
    /// treat this as a per-column condition and keep building.
    pub fn resolve(&self, attribute: &str, type_name: &str) -> Result<ColumnType> {
        self.map
            .get(type_name)
            .copied()
            .ok_or_else(|| SyncError::UnknownType {
                attribute: attribute.to_string(),
                type_name: type_name.to_string(),
            })
    }

    /// Whether a name is in the vocabulary.
    #[must_use]
    pub fn knows(&self, type_name: &str) -> bool {
        self.map.contains_key(type_name)
    }
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::new()
    }
}
