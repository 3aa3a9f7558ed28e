//! Error types for the synchronization engine.

use strata_model::error::DefinitionError;

/// Errors that can occur while building plans or synchronizing tables.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// An attribute declared a semantic type the type map does not know.
    #[error("Attribute '{attribute}' has unknown semantic type '{type_name}'")]
    UnknownType {
        /// The attribute carrying the type.
        attribute: String,
        /// The unrecognized type name.
        type_name: String,
    },

    /// An attribute carried a modifier the dispatch map does not know.
    #[error("Attribute '{attribute}' has unknown modifier '{modifier}'")]
    UnknownModifier {
        /// The attribute carrying the modifier.
        attribute: String,
        /// The unrecognized modifier name.
        modifier: String,
    },

    /// A relation points at a model that is not registered.
    #[error("Attribute '{attribute}' targets unknown model '{model}'")]
    UnknownTarget {
        /// The relation attribute.
        attribute: String,
        /// The missing target identity.
        model: String,
    },

    /// A column operation named an attribute the model does not declare.
    #[error("Model '{model}' has no attribute '{attribute}'")]
    UnknownAttribute {
        /// The model that was asked.
        model: String,
        /// The missing attribute.
        attribute: String,
    },

    /// A model's store binding matched no configured connection.
    #[error("No connection available for model '{model}'")]
    UnresolvedConnection {
        /// The model without a connection.
        model: String,
        /// The store it asked for, if it named one.
        store: Option<String>,
    },

    /// The same join table would be created twice within one build.
    #[error("Join table '{0}' would be created more than once")]
    DuplicateJoinTable(String),

    /// Database error while executing schema statements.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Model declarations failed to normalize.
    #[error("Model definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// A store declared a dialect this build does not support.
    #[error("Unsupported dialect '{0}' (supported: sqlite)")]
    UnsupportedDialect(String),

    /// Configuration is structurally invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (reading configuration).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
