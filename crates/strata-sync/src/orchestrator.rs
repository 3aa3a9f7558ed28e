//! Migration orchestration across stores.
//!
//! The orchestrator fans one sync task out per model, resolves each model
//! to its store, and joins on the whole batch. A model whose store cannot
//! be resolved is skipped with a warning rather than failing the run; a
//! sync that errors is collected per pair so one bad model never hides the
//! others.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use strata_model::definition::{MigrateMode, ModelSet};

use crate::connection::{ConnectionHandle, TableLocks};
use crate::error::SyncError;
use crate::sync::{SchemaSynchronizer, SyncMode, SyncResult};
use crate::table::TableBuilder;
use crate::typemap::TypeMapper;

/// One (store, model) pair that failed to synchronize.
#[derive(Debug)]
pub struct PairFailure {
    /// Store the model was bound to.
    pub store: String,
    /// Model name.
    pub model: String,
    /// What went wrong.
    pub error: SyncError,
}

/// A model that never ran because its store could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedModel {
    /// Model name.
    pub model: String,
    /// The store it asked for, when it named one.
    pub store: Option<String>,
}

/// Aggregate outcome of one migration run.
#[derive(Debug)]
pub struct AggregateResult {
    /// Successful syncs, one per completed pair.
    pub completed: Vec<SyncResult>,
    /// Failed pairs.
    pub failures: Vec<PairFailure>,
    /// Models skipped for lack of a resolvable store.
    pub skipped: Vec<SkippedModel>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl AggregateResult {
    /// True when no pair failed. Skipped models do not fail a run.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs every model's sync against its resolved store.
pub struct MigrationOrchestrator<'a, C> {
    connections: &'a HashMap<String, C>,
    models: &'a ModelSet,
    default_store: Option<&'a str>,
}

impl<'a, C: ConnectionHandle> MigrationOrchestrator<'a, C> {
    /// Creates an orchestrator over the configured connections.
    pub fn new(connections: &'a HashMap<String, C>, models: &'a ModelSet) -> Self {
        Self {
            connections,
            models,
            default_store: None,
        }
    }

    /// Sets the store models fall back to when they name none.
    #[must_use]
    pub fn with_default_store(mut self, store: Option<&'a str>) -> Self {
        self.default_store = store;
        self
    }

    /// Synchronizes every model, concurrently, and joins on the batch.
    ///
    /// `global` is the mode models without their own `migrate` setting run
    /// under.
    pub async fn run(&self, global: MigrateMode) -> AggregateResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let types = TypeMapper::new();
        let locks = TableLocks::new();
        let builder = TableBuilder::new(&types, self.models);

        let mut skipped = Vec::new();
        let mut tasks = Vec::new();
        for model in self.models.iter() {
            let wanted = model.store.as_deref().or(self.default_store);
            let Some(store_name) = wanted else {
                warn!(model = %model.identity, "no store configured, skipping");
                skipped.push(SkippedModel {
                    model: model.name.clone(),
                    store: None,
                });
                continue;
            };
            let Some((store, connection)) = self.connections.get_key_value(store_name) else {
                warn!(
                    model = %model.identity,
                    store = %store_name,
                    "store is not configured, skipping"
                );
                skipped.push(SkippedModel {
                    model: model.name.clone(),
                    store: Some(store_name.to_string()),
                });
                continue;
            };

            let mode: SyncMode = model.effective_mode(global).into();
            let locks_ref = &locks;
            tasks.push(async move {
                let sync = SchemaSynchronizer::new(connection, store.as_str(), builder, locks_ref);
                let result = sync.sync(model, mode).await;
                (store.as_str(), model.name.as_str(), result)
            });
        }

        let outcomes = join_all(tasks).await;

        let mut completed = Vec::new();
        let mut failures = Vec::new();
        for (store, model, result) in outcomes {
            match result {
                Ok(result) => completed.push(result),
                Err(error) => {
                    warn!(
                        store = %store,
                        model = %model,
                        error = %error,
                        "model failed to synchronize"
                    );
                    failures.push(PairFailure {
                        store: store.to_string(),
                        model: model.to_string(),
                        error,
                    });
                }
            }
        }

        let elapsed = clock.elapsed();
        info!(
            completed = completed.len(),
            failed = failures.len(),
            skipped = skipped.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "migration run finished"
        );

        AggregateResult {
            completed,
            failures,
            skipped,
            started_at,
            elapsed,
        }
    }
}
