//! Model definitions and the model registry.
//!
//! `RawModel` mirrors the JSON declaration shape; [`ModelDefinition`] is the
//! normalized form the build pipeline consumes. Normalization fills in the
//! defaults the runtime always applied: the identity is the lowercased model
//! name, the table name defaults to the identity, and the id attribute
//! defaults to `id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::{Attribute, RawAttribute};
use crate::error::{DefinitionError, Result};

/// Table synchronization mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrateMode {
    /// Leave existing tables untouched.
    #[default]
    None,
    /// Drop and recreate tables on every run.
    Drop,
    /// Create missing tables and add missing columns.
    Alter,
}

impl MigrateMode {
    /// The selector string for this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Drop => "drop",
            Self::Alter => "alter",
        }
    }
}

impl fmt::Display for MigrateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrateMode {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "drop" => Ok(Self::Drop),
            "alter" => Ok(Self::Alter),
            other => Err(DefinitionError::UnknownMode(other.to_string())),
        }
    }
}

/// Raw model declaration as loaded from configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawModel {
    /// Physical table name override.
    pub table_name: Option<String>,
    /// Primary-key attribute name override.
    pub id_attribute: Option<String>,
    /// Store this model is bound to.
    pub store: Option<String>,
    /// Per-model migrate override.
    pub migrate: Option<MigrateMode>,
    /// Attribute declarations, in order.
    pub schema: serde_json::Map<String, Value>,
}

impl RawModel {
    /// Normalizes this declaration into a [`ModelDefinition`].
    ///
    /// # Errors
    /// Fails on an empty name, an unparsable attribute, or a collection
    /// attribute without `via`.
    pub fn normalize(self, name: &str) -> Result<ModelDefinition> {
        if name.trim().is_empty() {
            return Err(DefinitionError::EmptyModelName);
        }
        let identity = name.to_lowercase();
        let table_name = self.table_name.unwrap_or_else(|| identity.clone());
        let id_attribute = self.id_attribute.unwrap_or_else(|| "id".to_string());

        let mut attributes = Vec::with_capacity(self.schema.len());
        for (attr_name, value) in self.schema {
            let raw: RawAttribute = serde_json::from_value(value)?;
            let kind = raw.normalize(name, &attr_name)?;
            attributes.push(Attribute {
                name: attr_name,
                kind,
            });
        }

        Ok(ModelDefinition {
            name: name.to_string(),
            identity,
            table_name,
            id_attribute,
            store: self.store,
            migrate: self.migrate,
            attributes,
        })
    }
}

/// Normalized model definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Declared model name.
    pub name: String,
    /// Lowercased lookup identity.
    pub identity: String,
    /// Physical table name.
    pub table_name: String,
    /// Primary-key attribute name.
    pub id_attribute: String,
    /// Store binding, when the model names one.
    pub store: Option<String>,
    /// Per-model migrate override.
    pub migrate: Option<MigrateMode>,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
}

impl ModelDefinition {
    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether the schema declares the primary-key attribute itself.
    #[must_use]
    pub fn declares_id(&self) -> bool {
        self.attribute(&self.id_attribute).is_some()
    }

    /// Effective migrate mode given the configured global mode.
    #[must_use]
    pub fn effective_mode(&self, global: MigrateMode) -> MigrateMode {
        self.migrate.unwrap_or(global)
    }
}

/// Immutable registry of normalized models, built once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSet {
    models: Vec<ModelDefinition>,
}

impl ModelSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw declarations, normalizing each.
    ///
    /// # Errors
    /// Any normalization failure, or a duplicate identity.
    pub fn from_raw(raw: impl IntoIterator<Item = (String, RawModel)>) -> Result<Self> {
        let mut set = Self::new();
        for (name, model) in raw {
            set.insert(model.normalize(&name)?)?;
        }
        Ok(set)
    }

    /// Parses a JSON object of model declarations keyed by model name.
    ///
    /// # Errors
    /// Invalid JSON or any normalization failure.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: serde_json::Map<String, Value> = serde_json::from_str(json)?;
        let mut set = Self::new();
        for (name, value) in raw {
            let model: RawModel = serde_json::from_value(value)?;
            set.insert(model.normalize(&name)?)?;
        }
        Ok(set)
    }

    /// Inserts a normalized model.
    ///
    /// # Errors
    /// [`DefinitionError::DuplicateModel`] when the identity is taken.
    pub fn insert(&mut self, model: ModelDefinition) -> Result<()> {
        if self.get(&model.identity).is_some() {
            return Err(DefinitionError::DuplicateModel(model.identity));
        }
        self.models.push(model);
        Ok(())
    }

    /// Looks up a model by identity, case-insensitively.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&ModelDefinition> {
        let identity = identity.to_lowercase();
        self.models.iter().find(|m| m.identity == identity)
    }

    /// The target model's attribute named `via`, when both exist.
    ///
    /// This is the reciprocal lookup behind many-to-many detection: a
    /// collection attribute resolves to a join table only when the other
    /// side declares a matching collection back.
    #[must_use]
    pub fn reciprocal(&self, target: &str, via: &str) -> Option<&Attribute> {
        self.get(target).and_then(|model| model.attribute(via))
    }

    /// Iterates models in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.iter()
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True when no models are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
