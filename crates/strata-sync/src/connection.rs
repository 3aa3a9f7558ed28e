//! Connection abstraction and per-table locks.
//!
//! The synchronizer talks to storage through [`ConnectionHandle`], a small
//! async surface a backend implements once. Check-then-act sequences on a
//! table are serialized through [`TableLocks`] so concurrent syncs of
//! models sharing a table cannot interleave between the existence probe
//! and the statement that acts on it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::column::ColumnSpec;
use crate::error::Result;
use crate::table::TablePlan;

/// A single change to an existing table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableAlteration {
    /// Add a column.
    AddColumn(ColumnSpec),
    /// Drop a column by name.
    DropColumn(String),
}

/// Async surface a storage backend provides to the synchronizer.
#[allow(async_fn_in_trait)]
pub trait ConnectionHandle {
    /// Whether the table exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Whether the column exists on the table.
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Creates the table unless it already exists. Returns whether it was
    /// created by this call.
    async fn create_table_if_absent(&self, plan: &TablePlan) -> Result<bool>;

    /// Applies alterations to an existing table, in order.
    async fn alter_table(&self, table: &str, alterations: &[TableAlteration]) -> Result<()>;

    /// Drops the table if present. Returns whether it existed.
    async fn drop_table_if_present(&self, table: &str) -> Result<bool>;
}

/// Registry of async locks keyed by `(store, table)`.
///
/// Locks are created on first use and live for the registry's lifetime; a
/// sync run touches a bounded set of tables, so the map stays small.
#[derive(Debug, Default)]
pub struct TableLocks {
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl TableLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding one table on one store.
    pub async fn for_table(&self, store: &str, table: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry((store.to_string(), table.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
