//! Runtime configuration.
//!
//! One JSON document configures the whole run: named stores, model-level
//! defaults, and the schema declarations themselves. Validation is a
//! pre-flight check; it catches dangling store references before any pool
//! is opened.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{debug, warn};

use strata_model::definition::{MigrateMode, ModelSet, RawModel};

use crate::error::{Result, SyncError};
use crate::sqlite::SqliteHandle;

/// One named store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Dialect name; only `sqlite` ships.
    pub dialect: String,
    /// File path for file-backed storage.
    pub storage: Option<String>,
    /// Full connection URL; wins over `storage`.
    pub url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dialect: "sqlite".to_string(),
            storage: None,
            url: None,
        }
    }
}

impl StoreConfig {
    /// The connection URL this store resolves to.
    ///
    /// An explicit `url` wins; a `storage` path becomes a file-backed
    /// SQLite URL created on demand; neither means in-memory.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if let Some(ref url) = self.url {
            return url.clone();
        }
        match &self.storage {
            Some(path) => format!("sqlite://{path}?mode=rwc"),
            None => "sqlite::memory:".to_string(),
        }
    }
}

/// Defaults applied across models.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelDefaults {
    /// Store models fall back to when they name none.
    pub default_store: Option<String>,
    /// Global migrate mode for models without their own.
    pub migrate: MigrateMode,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Named stores.
    pub stores: HashMap<String, StoreConfig>,
    /// Model-level defaults.
    pub models: ModelDefaults,
    /// Raw model declarations keyed by model name, in declaration order.
    pub schema: serde_json::Map<String, Value>,
}

impl AppConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    /// Invalid JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    /// I/O failure or invalid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Normalizes the declared schema into a model registry.
    ///
    /// # Errors
    /// Any declaration that fails normalization.
    pub fn model_set(&self) -> Result<ModelSet> {
        let mut set = ModelSet::new();
        for (name, value) in &self.schema {
            let raw: RawModel = serde_json::from_value(value.clone())?;
            set.insert(raw.normalize(name)?)?;
        }
        Ok(set)
    }

    /// Pre-flight validation of store references.
    ///
    /// Empty `stores` is only a warning; every model will be skipped at run
    /// time, which may be intentional in a dry configuration.
    ///
    /// # Errors
    /// A `defaultStore` or per-model `store` naming a store that is not
    /// configured.
    pub fn validate(&self) -> Result<()> {
        if self.stores.is_empty() {
            warn!("no stores configured, every model will be skipped");
        }
        if let Some(ref default) = self.models.default_store {
            if !self.stores.contains_key(default) {
                return Err(SyncError::InvalidConfig(format!(
                    "defaultStore '{default}' is not a configured store"
                )));
            }
        }
        for (name, value) in &self.schema {
            if let Some(store) = value.get("store").and_then(Value::as_str) {
                if !self.stores.contains_key(store) {
                    return Err(SyncError::UnresolvedConnection {
                        model: name.clone(),
                        store: Some(store.to_string()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Opens a connection handle for every configured store.
    ///
    /// # Errors
    /// An unsupported dialect or a connection failure.
    pub async fn connect_all(&self) -> Result<HashMap<String, SqliteHandle>> {
        let mut connections = HashMap::with_capacity(self.stores.len());
        for (name, store) in &self.stores {
            debug!(store = %name, dialect = %store.dialect, "connecting");
            connections.insert(name.clone(), connect(store).await?);
        }
        Ok(connections)
    }
}

/// Opens a pooled connection for one store.
///
/// # Errors
/// [`SyncError::UnsupportedDialect`] for anything but `sqlite`, or a
/// connection failure.
pub async fn connect(store: &StoreConfig) -> Result<SqliteHandle> {
    if store.dialect != "sqlite" {
        return Err(SyncError::UnsupportedDialect(store.dialect.clone()));
    }
    let url = store.connection_url();
    // every pooled connection to :memory: opens its own empty database,
    // so memory stores are pinned to a single connection
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await?;
    Ok(SqliteHandle::new(pool))
}
