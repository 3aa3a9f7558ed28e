//! Schema synchronization against a live store.
//!
//! The synchronizer takes a built table plan and makes the store match it.
//! Force mode drops and recreates; incremental mode creates missing tables
//! and adds missing columns but never drops or rewrites anything that
//! already exists. Every check-then-act sequence runs under the table's
//! lock, so two models sharing a table cannot race between the existence
//! probe and the statement acting on it.

use tracing::{debug, info, warn};

use strata_model::definition::{MigrateMode, ModelDefinition};

use crate::connection::{ConnectionHandle, TableAlteration, TableLocks};
use crate::error::Result;
use crate::table::{BuildReport, TableBuild, TableBuilder, TablePlan};

/// How aggressively a table is brought in line with its plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Drop and recreate the table.
    Force,
    /// Create the table if absent, add missing columns, never destroy.
    Incremental,
    /// Leave the store untouched.
    Skip,
}

impl From<MigrateMode> for SyncMode {
    fn from(mode: MigrateMode) -> Self {
        match mode {
            MigrateMode::Drop => Self::Force,
            MigrateMode::Alter => Self::Incremental,
            MigrateMode::None => Self::Skip,
        }
    }
}

/// What happened to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    /// Did not exist, was created.
    Created,
    /// Existed, was dropped and created again.
    Recreated,
    /// Existed, reconciled column by column.
    Synced {
        /// Columns added by this run.
        added: Vec<String>,
        /// Columns already present.
        unchanged: Vec<String>,
    },
    /// Left untouched.
    Skipped,
}

/// Outcome for one join table owned by the synced model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTableResult {
    /// Join table name.
    pub table: String,
    /// What happened to it.
    pub outcome: TableOutcome,
}

/// Result of synchronizing one model.
#[derive(Debug)]
pub struct SyncResult {
    /// Model name.
    pub model: String,
    /// The model's table.
    pub table: String,
    /// Mode the sync ran under.
    pub mode: SyncMode,
    /// What happened to the model's table.
    pub outcome: TableOutcome,
    /// Outcomes for join tables this model owns.
    pub join_tables: Vec<JoinTableResult>,
    /// Per-column build failures carried through from the builder.
    pub report: BuildReport,
}

impl SyncResult {
    /// True when every column built cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }
}

/// What happened to a single column under an admin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnChange {
    /// Column was added.
    Added,
    /// Column was dropped and added back with its current spec.
    Recreated,
    /// Column was dropped.
    Removed,
    /// Nothing to do.
    Unchanged,
}

/// Synchronizes model tables on one store.
pub struct SchemaSynchronizer<'a, C> {
    connection: &'a C,
    store: &'a str,
    builder: TableBuilder<'a>,
    locks: &'a TableLocks,
}

impl<'a, C: ConnectionHandle> SchemaSynchronizer<'a, C> {
    /// Creates a synchronizer for one store.
    pub fn new(
        connection: &'a C,
        store: &'a str,
        builder: TableBuilder<'a>,
        locks: &'a TableLocks,
    ) -> Self {
        Self {
            connection,
            store,
            builder,
            locks,
        }
    }

    /// Synchronizes one model's table and any join tables it owns.
    ///
    /// A column that failed to build is reported, not fatal; the sync
    /// applies whatever did build. Database errors abort the sync.
    ///
    /// # Errors
    /// Any database failure while probing or applying statements.
    pub async fn sync(&self, model: &ModelDefinition, mode: SyncMode) -> Result<SyncResult> {
        if mode == SyncMode::Skip {
            debug!(model = %model.identity, store = %self.store, "left untouched by mode");
            return Ok(SyncResult {
                model: model.name.clone(),
                table: model.table_name.clone(),
                mode,
                outcome: TableOutcome::Skipped,
                join_tables: Vec::new(),
                report: BuildReport::default(),
            });
        }

        let TableBuild {
            plan,
            join_tables,
            report,
        } = self.builder.build(model);

        let outcome = self.apply_plan(&plan, mode).await?;

        let mut join_results = Vec::with_capacity(join_tables.len());
        for join in &join_tables {
            let outcome = self.apply_plan(join, mode).await?;
            join_results.push(JoinTableResult {
                table: join.table.clone(),
                outcome,
            });
        }

        info!(
            model = %model.identity,
            store = %self.store,
            table = %plan.table,
            outcome = ?outcome,
            join_tables = join_results.len(),
            "table synchronized"
        );

        Ok(SyncResult {
            model: model.name.clone(),
            table: plan.table,
            mode,
            outcome,
            join_tables: join_results,
            report,
        })
    }

    /// Adds the column for one attribute unless it already exists.
    ///
    /// # Errors
    /// Unknown attribute, column build failure, or a database failure.
    pub async fn add_column(
        &self,
        model: &ModelDefinition,
        attribute: &str,
    ) -> Result<ColumnChange> {
        let Some(spec) = self.builder.build_column(model, attribute)? else {
            debug!(model = %model.identity, attribute = %attribute, "no column on this table");
            return Ok(ColumnChange::Unchanged);
        };
        let lock = self.locks.for_table(self.store, &model.table_name).await;
        let _guard = lock.lock().await;

        if self
            .connection
            .column_exists(&model.table_name, &spec.name)
            .await?
        {
            return Ok(ColumnChange::Unchanged);
        }
        info!(table = %model.table_name, column = %spec.name, "adding column");
        self.connection
            .alter_table(&model.table_name, &[TableAlteration::AddColumn(spec)])
            .await?;
        Ok(ColumnChange::Added)
    }

    /// Rebuilds the column for one attribute from its current declaration.
    ///
    /// An existing column is dropped and added back, discarding its data;
    /// an absent one is simply added.
    ///
    /// # Errors
    /// Unknown attribute, column build failure, or a database failure.
    pub async fn alter_column(
        &self,
        model: &ModelDefinition,
        attribute: &str,
    ) -> Result<ColumnChange> {
        let Some(spec) = self.builder.build_column(model, attribute)? else {
            debug!(model = %model.identity, attribute = %attribute, "no column on this table");
            return Ok(ColumnChange::Unchanged);
        };
        let lock = self.locks.for_table(self.store, &model.table_name).await;
        let _guard = lock.lock().await;

        let name = spec.name.clone();
        if self
            .connection
            .column_exists(&model.table_name, &name)
            .await?
        {
            info!(table = %model.table_name, column = %name, "recreating column");
            self.connection
                .alter_table(
                    &model.table_name,
                    &[
                        TableAlteration::DropColumn(name),
                        TableAlteration::AddColumn(spec),
                    ],
                )
                .await?;
            Ok(ColumnChange::Recreated)
        } else {
            info!(table = %model.table_name, column = %name, "adding column");
            self.connection
                .alter_table(&model.table_name, &[TableAlteration::AddColumn(spec)])
                .await?;
            Ok(ColumnChange::Added)
        }
    }

    /// Drops a column by its physical name, if present.
    ///
    /// Takes the column name rather than an attribute name: removal usually
    /// runs after the attribute has already left the schema.
    ///
    /// # Errors
    /// Any database failure.
    pub async fn remove_column(
        &self,
        model: &ModelDefinition,
        column: &str,
    ) -> Result<ColumnChange> {
        let lock = self.locks.for_table(self.store, &model.table_name).await;
        let _guard = lock.lock().await;

        if !self
            .connection
            .column_exists(&model.table_name, column)
            .await?
        {
            return Ok(ColumnChange::Unchanged);
        }
        info!(table = %model.table_name, column = %column, "removing column");
        self.connection
            .alter_table(
                &model.table_name,
                &[TableAlteration::DropColumn(column.to_string())],
            )
            .await?;
        Ok(ColumnChange::Removed)
    }

    async fn apply_plan(&self, plan: &TablePlan, mode: SyncMode) -> Result<TableOutcome> {
        match mode {
            SyncMode::Force => self.force_table(plan).await,
            SyncMode::Incremental => self.reconcile_table(plan).await,
            SyncMode::Skip => Ok(TableOutcome::Skipped),
        }
    }

    async fn force_table(&self, plan: &TablePlan) -> Result<TableOutcome> {
        let lock = self.locks.for_table(self.store, &plan.table).await;
        let _guard = lock.lock().await;

        let dropped = self.connection.drop_table_if_present(&plan.table).await?;
        self.connection.create_table_if_absent(plan).await?;
        Ok(if dropped {
            TableOutcome::Recreated
        } else {
            TableOutcome::Created
        })
    }

    async fn reconcile_table(&self, plan: &TablePlan) -> Result<TableOutcome> {
        let lock = self.locks.for_table(self.store, &plan.table).await;
        let _guard = lock.lock().await;

        if self.connection.create_table_if_absent(plan).await? {
            return Ok(TableOutcome::Created);
        }

        let mut added = Vec::new();
        let mut unchanged = Vec::new();
        let mut alterations = Vec::new();
        for column in &plan.columns {
            if self
                .connection
                .column_exists(&plan.table, &column.name)
                .await?
            {
                unchanged.push(column.name.clone());
                continue;
            }
            if column.primary {
                // a primary key cannot be retrofitted onto a live table
                warn!(
                    table = %plan.table,
                    column = %column.name,
                    "existing table is missing its primary key, leaving as is"
                );
                continue;
            }
            added.push(column.name.clone());
            alterations.push(TableAlteration::AddColumn(column.clone()));
        }

        if !alterations.is_empty() {
            self.connection.alter_table(&plan.table, &alterations).await?;
        }
        Ok(TableOutcome::Synced { added, unchanged })
    }
}
