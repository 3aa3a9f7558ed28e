//! Declarative model definitions for the strata schema synchronizer.
//!
//! Models are declared as data (JSON-shaped maps of attributes), not Rust
//! types. This crate normalizes those declarations into the explicit form
//! the synchronization engine consumes:
//!
//! - **Attributes** - a tagged union separating plain columns from to-one
//!   and to-many relations, built once so later stages match exhaustively
//! - **Modifiers** - declaration-order modifier lists with the legacy
//!   aliases (`allowNull`, `required`, `primaryKey`) rewritten up front
//! - **Models** - definitions with identity, table name, and id-attribute
//!   defaults filled in, collected into an immutable [`ModelSet`]
//!
//! # Example
//!
//! ```rust
//! use strata_model::prelude::*;
//!
//! let models = ModelSet::from_json(r#"{
//!     "User": {
//!         "schema": {
//!             "name": { "type": "string", "allowNull": false },
//!             "age": "integer"
//!         }
//!     }
//! }"#).unwrap();
//!
//! let user = models.get("user").unwrap();
//! assert_eq!(user.table_name, "user");
//! assert_eq!(user.attributes.len(), 2);
//! ```
//!
//! [`ModelSet`]: definition::ModelSet

pub mod attribute;
pub mod definition;
pub mod error;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::attribute::{
        normalize_modifier, Attribute, AttributeKind, ModifierValue, RawAttribute,
        ScalarAttribute, ToManyRelation, ToOneRelation,
    };
    pub use crate::definition::{MigrateMode, ModelDefinition, ModelSet, RawModel};
    pub use crate::error::{DefinitionError, Result};
}
