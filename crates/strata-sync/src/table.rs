//! Table plan construction.
//!
//! [`TableBuilder`] walks a model's attributes in declaration order and
//! produces a [`TableBuild`]: the main table plan, any join tables this
//! model owns, and a report of per-column failures. A bad column never
//! aborts the build; it is recorded and skipped so the rest of the table
//! still materializes.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use strata_model::attribute::{Attribute, AttributeKind};
use strata_model::definition::{ModelDefinition, ModelSet};

use crate::column::{ColumnSpec, ForeignKeyRef, ModifierApplier};
use crate::error::{Result, SyncError};
use crate::relation::{JoinTableSpec, RelationDescriptor, RelationKind, RelationResolver};
use crate::typemap::{ColumnType, TypeMapper};

/// Audit column recording row creation time.
pub const CREATED_AT: &str = "createdAt";
/// Audit column recording the last update time.
pub const UPDATED_AT: &str = "updatedAt";

/// Complete physical description of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePlan {
    /// Table name.
    pub table: String,
    /// Columns in build order.
    pub columns: Vec<ColumnSpec>,
    /// Columns covered by the table-level composite unique constraint.
    pub unique: Vec<String>,
}

impl TablePlan {
    /// Creates an empty plan for a table.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            unique: Vec::new(),
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    /// Whether a column with this name is planned.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column names in build order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// One column that failed to build.
#[derive(Debug)]
pub struct ColumnFailure {
    /// Attribute the column was derived from.
    pub attribute: String,
    /// What went wrong.
    pub error: SyncError,
}

/// Per-column failures collected during a build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Failures in encounter order.
    pub failures: Vec<ColumnFailure>,
}

impl BuildReport {
    /// True when every column built cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, attribute: &str, error: SyncError) {
        warn!(attribute = %attribute, error = %error, "column failed to build, skipping");
        self.failures.push(ColumnFailure {
            attribute: attribute.to_string(),
            error,
        });
    }
}

/// Outcome of building one model.
#[derive(Debug)]
pub struct TableBuild {
    /// The model's own table.
    pub plan: TablePlan,
    /// Join tables this model is the dominant side of.
    pub join_tables: Vec<TablePlan>,
    /// Per-column failures.
    pub report: BuildReport,
}

impl TableBuild {
    /// True when every column built cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }
}

/// Builds table plans from normalized model definitions.
///
/// The builder is pure: it never touches a connection, so a plan can be
/// inspected or printed without a database.
#[derive(Debug, Clone, Copy)]
pub struct TableBuilder<'a> {
    types: &'a TypeMapper,
    models: &'a ModelSet,
}

impl<'a> TableBuilder<'a> {
    /// Creates a builder over the type map and model registry.
    #[must_use]
    pub fn new(types: &'a TypeMapper, models: &'a ModelSet) -> Self {
        Self { types, models }
    }

    /// Builds the table plan for one model.
    ///
    /// When the schema does not declare its own id attribute, an
    /// auto-incrementing integer primary key is injected first. Attributes
    /// are visited in declaration order; failures land in the report and
    /// the build continues. Audit columns are appended last unless the
    /// schema declared them itself.
    #[must_use]
    pub fn build(&self, model: &ModelDefinition) -> TableBuild {
        let resolver = RelationResolver::new(self.models);
        let mut applier = ModifierApplier::new();
        let mut plan = TablePlan::new(&model.table_name);
        let mut join_tables: Vec<TablePlan> = Vec::new();
        let mut report = BuildReport::default();

        if !model.declares_id() {
            plan.columns.push(ColumnSpec::auto_primary(&model.id_attribute));
        }

        for attribute in &model.attributes {
            let relation = match resolver.classify(model, attribute) {
                Ok(relation) => relation,
                Err(error) => {
                    report.record(&attribute.name, error);
                    continue;
                }
            };

            match relation {
                None => {
                    if let Some(spec) =
                        self.scalar_column(attribute, &mut applier, &mut report)
                    {
                        plan.columns.push(spec);
                    }
                }
                Some(relation) => match relation.kind {
                    RelationKind::ToOne => {
                        let mut spec = self.to_one_spec(&relation);
                        if let AttributeKind::ToOne(to_one) = &attribute.kind {
                            for modifier in &to_one.modifiers {
                                if let Err(error) = applier.apply(&mut spec, modifier) {
                                    report.record(&attribute.name, error);
                                }
                            }
                        }
                        plan.columns.push(spec);
                    }
                    RelationKind::OneToMany => {
                        debug!(
                            attribute = %attribute.name,
                            target = %relation.target,
                            "one-to-many keyed on the far side, no column emitted"
                        );
                    }
                    RelationKind::ManyToMany => {
                        if relation.dominant {
                            match resolver.join_spec(model, &attribute.name, &relation) {
                                Ok(spec) => {
                                    if join_tables.iter().any(|t| t.table == spec.table) {
                                        report.record(
                                            &attribute.name,
                                            SyncError::DuplicateJoinTable(spec.table),
                                        );
                                    } else {
                                        join_tables.push(self.join_plan(&spec));
                                    }
                                }
                                Err(error) => report.record(&attribute.name, error),
                            }
                        } else {
                            debug!(
                                attribute = %attribute.name,
                                target = %relation.target,
                                "join table owned by the other side"
                            );
                        }
                    }
                },
            }
        }

        plan.unique = applier.finish(&plan.columns);
        append_audit_columns(&mut plan);

        TableBuild {
            plan,
            join_tables,
            report,
        }
    }

    /// Builds the column for a single attribute, strictly.
    ///
    /// Unlike [`build`], any failure propagates. Returns `None` for
    /// attributes that produce no column on this table. A deferred unique
    /// lands directly on the spec, since there is no table batch to join.
    ///
    /// [`build`]: TableBuilder::build
    ///
    /// # Errors
    /// [`SyncError::UnknownAttribute`] when the model has no such
    /// attribute, plus any type or modifier resolution failure.
    pub fn build_column(
        &self,
        model: &ModelDefinition,
        attribute_name: &str,
    ) -> Result<Option<ColumnSpec>> {
        let attribute =
            model
                .attribute(attribute_name)
                .ok_or_else(|| SyncError::UnknownAttribute {
                    model: model.name.clone(),
                    attribute: attribute_name.to_string(),
                })?;
        let resolver = RelationResolver::new(self.models);
        let mut applier = ModifierApplier::new();

        let Some(relation) = resolver.classify(model, attribute)? else {
            let AttributeKind::Scalar(scalar) = &attribute.kind else {
                return Ok(None);
            };
            let column_type = self.types.resolve(&attribute.name, &scalar.type_name)?;
            let mut spec = ColumnSpec::new(&attribute.name, column_type);
            for modifier in &scalar.modifiers {
                applier.apply(&mut spec, modifier)?;
            }
            finish_single(&mut applier, &mut spec);
            return Ok(Some(spec));
        };

        match relation.kind {
            RelationKind::ToOne => {
                let mut spec = self.to_one_spec(&relation);
                if let AttributeKind::ToOne(to_one) = &attribute.kind {
                    for modifier in &to_one.modifiers {
                        applier.apply(&mut spec, modifier)?;
                    }
                }
                finish_single(&mut applier, &mut spec);
                Ok(Some(spec))
            }
            RelationKind::OneToMany | RelationKind::ManyToMany => Ok(None),
        }
    }

    fn scalar_column(
        &self,
        attribute: &Attribute,
        applier: &mut ModifierApplier,
        report: &mut BuildReport,
    ) -> Option<ColumnSpec> {
        let AttributeKind::Scalar(scalar) = &attribute.kind else {
            return None;
        };
        let column_type = match self.types.resolve(&attribute.name, &scalar.type_name) {
            Ok(column_type) => column_type,
            Err(error) => {
                report.record(&attribute.name, error);
                return None;
            }
        };
        let mut spec = ColumnSpec::new(&attribute.name, column_type);
        for modifier in &scalar.modifiers {
            // a bad modifier is recorded but the column survives with the
            // rest applied
            if let Err(error) = applier.apply(&mut spec, modifier) {
                report.record(&attribute.name, error);
            }
        }
        Some(spec)
    }

    /// Foreign-key column for a to-one relation: string typed, named after
    /// the attribute, referencing the target's id attribute.
    fn to_one_spec(&self, relation: &RelationDescriptor) -> ColumnSpec {
        let mut spec = ColumnSpec::new(&relation.local_key, ColumnType::String);
        if let Some(target) = self.models.get(&relation.target) {
            spec.references = Some(ForeignKeyRef {
                table: Some(target.table_name.clone()),
                column: Some(relation.foreign_key.clone()),
                ..ForeignKeyRef::default()
            });
        }
        spec
    }

    fn join_plan(&self, spec: &JoinTableSpec) -> TablePlan {
        let mut plan = TablePlan::new(&spec.table);
        plan.columns.push(ColumnSpec::auto_primary("id"));
        for side in [&spec.left, &spec.right] {
            let mut column = ColumnSpec::new(&side.column, ColumnType::String);
            column.nullable = false;
            column.references = Some(ForeignKeyRef {
                table: Some(side.table.clone()),
                column: Some(side.references.clone()),
                ..ForeignKeyRef::default()
            });
            plan.columns.push(column);
        }
        // one row per linked pair
        plan.unique = vec![spec.left.column.clone(), spec.right.column.clone()];
        append_audit_columns(&mut plan);
        plan
    }
}

/// Flushes a single-column unique batch onto the spec itself.
fn finish_single(applier: &mut ModifierApplier, spec: &mut ColumnSpec) {
    let unique = applier.finish(std::slice::from_ref(spec));
    if unique.contains(&spec.name) {
        spec.unique = true;
    }
}

/// Appends `createdAt`/`updatedAt` unless the schema declared them.
fn append_audit_columns(plan: &mut TablePlan) {
    for name in [CREATED_AT, UPDATED_AT] {
        if !plan.has_column(name) {
            plan.columns.push(ColumnSpec::new(name, ColumnType::DateTime));
        }
    }
}
