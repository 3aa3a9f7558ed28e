//! Schema-driven table synchronization for declarative entity models.
//!
//! `strata-sync` takes the normalized model definitions from
//! [`strata_model`] and makes a live database match them, where:
//! - Semantic attribute types resolve to physical column types through one
//!   immutable type map
//! - Relations become foreign-key columns or shared join tables, derived
//!   deterministically so both sides agree without coordinating
//! - A bad column is reported and skipped, never fatal to its table
//!
//! # Architecture
//!
//! The pipeline consists of several components:
//!
//! - **TypeMapper** - Resolves semantic type names (`string`, `dateTime`,
//!   `objectid`, ...) to physical column types
//! - **ModifierApplier** - Folds declared modifiers into column specs,
//!   batching unique constraints per table
//! - **RelationResolver** - Classifies to-one/to-many attributes and
//!   derives join tables
//! - **TableBuilder** - Assembles complete table plans, pure of any I/O
//! - **SchemaSynchronizer** - Applies plans to a store in force or
//!   incremental mode
//! - **MigrationOrchestrator** - Fans syncs out across stores and joins on
//!   the batch
//! - **Dialect** - Database-specific SQL generation
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_sync::prelude::*;
//!
//! let config = AppConfig::load("strata.json")?;
//! config.validate()?;
//!
//! let models = config.model_set()?;
//! let connections = config.connect_all().await?;
//!
//! let result = MigrationOrchestrator::new(&connections, &models)
//!     .with_default_store(config.models.default_store.as_deref())
//!     .run(config.models.migrate)
//!     .await;
//! assert!(result.is_success());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Validate the configuration and model definitions
//! strata-sync check
//!
//! # Print the SQL each table build would execute
//! strata-sync plan
//!
//! # Synchronize every model against its store
//! strata-sync sync
//!
//! # Force drop-and-recreate regardless of configured modes
//! strata-sync sync --mode drop
//! ```

pub mod column;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod orchestrator;
pub mod relation;
pub mod sqlite;
pub mod sync;
pub mod table;
pub mod typemap;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::column::{ColumnSpec, DefaultValue, ForeignKeyRef, ModifierApplier, Position};
    pub use crate::config::{connect, AppConfig, ModelDefaults, StoreConfig};
    pub use crate::connection::{ConnectionHandle, TableAlteration, TableLocks};
    pub use crate::dialect::{SqlDialect, SqliteDialect};
    pub use crate::error::{Result, SyncError};
    pub use crate::orchestrator::{
        AggregateResult, MigrationOrchestrator, PairFailure, SkippedModel,
    };
    pub use crate::relation::{
        foreign_key_column, join_table_name, JoinSide, JoinTableSpec, RelationDescriptor,
        RelationKind, RelationResolver,
    };
    pub use crate::sqlite::SqliteHandle;
    pub use crate::sync::{
        ColumnChange, JoinTableResult, SchemaSynchronizer, SyncMode, SyncResult, TableOutcome,
    };
    pub use crate::table::{
        BuildReport, ColumnFailure, TableBuild, TableBuilder, TablePlan, CREATED_AT, UPDATED_AT,
    };
    pub use crate::typemap::{ColumnType, TypeMapper};

    pub use strata_model::prelude::*;
}
