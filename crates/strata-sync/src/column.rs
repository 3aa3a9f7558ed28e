//! Column specifications and modifier application.
//!
//! A [`ColumnSpec`] is the fully resolved description of one column, ready
//! for dialect rendering. The [`ModifierApplier`] folds declared modifiers
//! into specs through an immutable dispatch map; unique constraints are not
//! applied directly but deferred into a per-table batch and flushed once
//! every column has been visited.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use strata_model::attribute::{normalize_modifier, ModifierValue};

use crate::error::{Result, SyncError};
use crate::typemap::ColumnType;

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// SQL expression (e.g. "CURRENT_TIMESTAMP").
    Expression(String),
}

impl DefaultValue {
    /// Builds a default from a raw declared JSON value.
    ///
    /// Arrays and objects are stored as their JSON text, matching how a
    /// json-typed column would hold them.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or(0.0)),
                Self::Integer,
            ),
            Value::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }

    /// Returns the SQL literal for this default.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// Foreign-key reference accumulated from `references`/`inTable` modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table (from `inTable`, or the dotted `references` form).
    pub table: Option<String>,
    /// Referenced column.
    pub column: Option<String>,
    /// ON DELETE action.
    pub on_delete: Option<String>,
    /// ON UPDATE action.
    pub on_update: Option<String>,
}

impl ForeignKeyRef {
    /// True when both sides of the reference are known.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.table.is_some() && self.column.is_some()
    }
}

/// Column position within its table (MySQL-style; SQLite ignores it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// First column in the table.
    First,
    /// Directly after the named column.
    After(String),
}

/// Fully specified column, ready for dialect rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Physical type.
    pub column_type: ColumnType,
    /// Whether NULL values are allowed.
    pub nullable: bool,
    /// Whether this column is the primary key.
    pub primary: bool,
    /// Whether the primary key auto-increments.
    pub auto_increment: bool,
    /// Single-column unique constraint. Set only by the single-column build
    /// path; whole-table builds batch unique columns into one table-level
    /// constraint instead.
    pub unique: bool,
    /// Whether a plain index is requested.
    pub index: bool,
    /// Whether the numeric type is unsigned (SQLite ignores it).
    pub unsigned: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Foreign-key reference.
    pub references: Option<ForeignKeyRef>,
    /// Position hint.
    pub position: Option<Position>,
    /// Column comment (SQLite ignores it).
    pub comment: Option<String>,
    /// Collation.
    pub collation: Option<String>,
}

impl ColumnSpec {
    /// Creates a column with the defaults every declaration starts from.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary: false,
            auto_increment: false,
            unique: false,
            index: false,
            unsigned: false,
            default: None,
            references: None,
            position: None,
            comment: None,
            collation: None,
        }
    }

    /// Creates the auto-incrementing integer primary key injected into
    /// tables whose schema does not declare one.
    #[must_use]
    pub fn auto_primary(name: impl Into<String>) -> Self {
        let mut spec = Self::new(name, ColumnType::Integer);
        spec.primary = true;
        spec.nullable = false;
        spec.auto_increment = true;
        spec
    }

    fn reference_mut(&mut self) -> &mut ForeignKeyRef {
        self.references.get_or_insert_with(ForeignKeyRef::default)
    }
}

/// Modifier vocabulary the applier dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModifierKind {
    Index,
    Primary,
    Unique,
    References,
    InTable,
    OnDelete,
    OnUpdate,
    DefaultTo,
    Unsigned,
    NotNullable,
    Nullable,
    First,
    After,
    Comment,
    Collate,
    /// Relation markers are structural, not column modifiers; they are
    /// accepted and ignored.
    Structural,
}

/// Applies declared modifiers to column specs.
///
/// The dispatch map is immutable and built once per table build. Unique
/// constraints are deferred: the column joins a batch that [`finish`]
/// flushes as a single composite constraint, dropping any column that ended
/// up as the primary key (a primary key is already unique).
///
/// [`finish`]: ModifierApplier::finish
#[derive(Debug)]
pub struct ModifierApplier {
    kinds: HashMap<&'static str, ModifierKind>,
    deferred_unique: Vec<String>,
}

impl ModifierApplier {
    /// Builds the dispatch map for one table build.
    #[must_use]
    pub fn new() -> Self {
        let mut kinds = HashMap::new();
        kinds.insert("index", ModifierKind::Index);
        kinds.insert("primary", ModifierKind::Primary);
        kinds.insert("unique", ModifierKind::Unique);
        kinds.insert("references", ModifierKind::References);
        kinds.insert("inTable", ModifierKind::InTable);
        kinds.insert("onDelete", ModifierKind::OnDelete);
        kinds.insert("onUpdate", ModifierKind::OnUpdate);
        kinds.insert("defaultTo", ModifierKind::DefaultTo);
        kinds.insert("unsigned", ModifierKind::Unsigned);
        kinds.insert("notNullable", ModifierKind::NotNullable);
        kinds.insert("nullable", ModifierKind::Nullable);
        kinds.insert("first", ModifierKind::First);
        kinds.insert("after", ModifierKind::After);
        kinds.insert("comment", ModifierKind::Comment);
        kinds.insert("collate", ModifierKind::Collate);
        kinds.insert("model", ModifierKind::Structural);
        kinds.insert("collection", ModifierKind::Structural);
        kinds.insert("via", ModifierKind::Structural);
        kinds.insert("dominant", ModifierKind::Structural);
        Self {
            kinds,
            deferred_unique: Vec::new(),
        }
    }

    /// Applies one modifier to a column spec.
    ///
    /// Legacy aliases are re-normalized on entry, so the applier accepts
    /// both canonical and legacy spellings. Application is idempotent:
    /// repeating a modifier leaves the spec unchanged, and a repeated
    /// `unique` joins the batch once.
    ///
    /// # Errors
    /// [`SyncError::UnknownModifier`] for names outside the vocabulary; the
    /// caller logs, skips, and continues with the remaining modifiers.
    pub fn apply(&mut self, spec: &mut ColumnSpec, modifier: &ModifierValue) -> Result<()> {
        let modifier = normalize_modifier(&modifier.name, &modifier.value);
        let Some(kind) = self.kinds.get(modifier.name.as_str()) else {
            return Err(SyncError::UnknownModifier {
                attribute: spec.name.clone(),
                modifier: modifier.name,
            });
        };
        match kind {
            ModifierKind::Index => spec.index = true,
            ModifierKind::Primary => {
                spec.primary = true;
                spec.nullable = false;
            }
            ModifierKind::Unique => {
                if !self.deferred_unique.contains(&spec.name) {
                    self.deferred_unique.push(spec.name.clone());
                }
            }
            ModifierKind::References => {
                let target = string_value(&modifier.value);
                let reference = spec.reference_mut();
                // the dotted "table.column" shorthand is accepted too
                if let Some((table, column)) = target.split_once('.') {
                    reference.table = Some(table.to_string());
                    reference.column = Some(column.to_string());
                } else {
                    reference.column = Some(target);
                }
            }
            ModifierKind::InTable => {
                spec.reference_mut().table = Some(string_value(&modifier.value));
            }
            ModifierKind::OnDelete => {
                spec.reference_mut().on_delete = Some(string_value(&modifier.value));
            }
            ModifierKind::OnUpdate => {
                spec.reference_mut().on_update = Some(string_value(&modifier.value));
            }
            ModifierKind::DefaultTo => {
                spec.default = Some(DefaultValue::from_json(&modifier.value));
            }
            ModifierKind::Unsigned => spec.unsigned = true,
            ModifierKind::NotNullable => spec.nullable = false,
            ModifierKind::Nullable => spec.nullable = true,
            ModifierKind::First => spec.position = Some(Position::First),
            ModifierKind::After => {
                spec.position = Some(Position::After(string_value(&modifier.value)));
            }
            ModifierKind::Comment => spec.comment = Some(string_value(&modifier.value)),
            ModifierKind::Collate => spec.collation = Some(string_value(&modifier.value)),
            ModifierKind::Structural => {}
        }
        Ok(())
    }

    /// Drains the unique batch into the composite constraint for the table.
    ///
    /// Columns that ended up as the primary key are dropped from the batch;
    /// the constraint would be redundant.
    pub fn finish(&mut self, columns: &[ColumnSpec]) -> Vec<String> {
        let batch = std::mem::take(&mut self.deferred_unique);
        batch
            .into_iter()
            .filter(|name| {
                columns
                    .iter()
                    .find(|c| &c.name == name)
                    .map_or(true, |c| !c.primary)
            })
            .collect()
    }
}

impl Default for ModifierApplier {
    fn default() -> Self {
        Self::new()
    }
}

fn string_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
