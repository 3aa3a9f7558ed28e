//! Error types for model normalization.

/// Errors raised while normalizing raw model declarations.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// Two declarations normalize to the same identity.
    #[error("Duplicate model identity '{0}'")]
    DuplicateModel(String),

    /// A model was declared with an empty name.
    #[error("Model names must not be empty")]
    EmptyModelName,

    /// A collection attribute did not name its reciprocal attribute.
    #[error("Attribute '{attribute}' on model '{model}' declares a collection without 'via'")]
    MissingVia {
        /// Model carrying the attribute.
        model: String,
        /// The offending attribute.
        attribute: String,
    },

    /// A migrate mode string was not one of the known selectors.
    #[error("Unknown migrate mode '{0}' (expected none, drop, or alter)")]
    UnknownMode(String),

    /// A raw declaration could not be parsed.
    #[error("Failed to parse model declarations: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for model normalization.
pub type Result<T> = std::result::Result<T, DefinitionError>;
