//! Relation classification and join-table derivation.
//!
//! Every relation attribute resolves to one of three shapes. A to-one
//! attribute becomes a foreign-key column on its own table. A to-many
//! attribute whose reciprocal is itself a to-many becomes a join table,
//! built exactly once by the dominant side. Any other to-many is the far
//! end of a one-to-many and produces no column at all.

use tracing::{debug, warn};

use strata_model::attribute::{Attribute, AttributeKind, ToManyRelation};
use strata_model::definition::{ModelDefinition, ModelSet};

use crate::error::{Result, SyncError};

/// Shape of a resolved relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Foreign-key column on this table.
    ToOne,
    /// Far end of a one-to-many; the other side holds the key.
    OneToMany,
    /// Join table shared with the reciprocal side.
    ManyToMany,
}

/// Resolved relation attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Relation shape.
    pub kind: RelationKind,
    /// Target model identity.
    pub target: String,
    /// Key on this side: the foreign-key column name for to-one, our id
    /// attribute for one-to-many, our join-table column for many-to-many.
    pub local_key: String,
    /// Key on the far side: the referenced column for to-one, the column
    /// pointing back at us for one-to-many, the reciprocal attribute name
    /// for many-to-many.
    pub foreign_key: String,
    /// Whether this side builds the join table. Meaningful only for
    /// many-to-many.
    pub dominant: bool,
}

/// One side of a join table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSide {
    /// Column name inside the join table.
    pub column: String,
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub references: String,
}

/// Derived join table for a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTableSpec {
    /// Deterministic join-table name.
    pub table: String,
    /// Side owned by the model under build.
    pub left: JoinSide,
    /// Side owned by the target model.
    pub right: JoinSide,
}

/// Classifies relation attributes against the full model registry.
#[derive(Debug, Clone, Copy)]
pub struct RelationResolver<'a> {
    models: &'a ModelSet,
}

impl<'a> RelationResolver<'a> {
    /// Creates a resolver over the registry.
    #[must_use]
    pub fn new(models: &'a ModelSet) -> Self {
        Self { models }
    }

    /// Classifies one attribute.
    ///
    /// Returns `None` for scalars, which produce their column through the
    /// type map instead.
    ///
    /// # Errors
    /// [`SyncError::UnknownTarget`] when the named target model is not
    /// registered.
    pub fn classify(
        &self,
        model: &ModelDefinition,
        attribute: &Attribute,
    ) -> Result<Option<RelationDescriptor>> {
        match &attribute.kind {
            AttributeKind::Scalar(_) => Ok(None),
            AttributeKind::ToOne(relation) => {
                let target = self.target(&attribute.name, &relation.target)?;
                debug!(
                    model = %model.identity,
                    attribute = %attribute.name,
                    target = %target.identity,
                    "resolved to-one relation"
                );
                Ok(Some(RelationDescriptor {
                    kind: RelationKind::ToOne,
                    target: target.identity.clone(),
                    local_key: foreign_key_column(&attribute.name),
                    foreign_key: target.id_attribute.clone(),
                    dominant: false,
                }))
            }
            AttributeKind::ToMany(relation) => {
                self.classify_to_many(model, attribute, relation).map(Some)
            }
        }
    }

    /// Derives the join table for a many-to-many descriptor.
    ///
    /// The caller is expected to invoke this only on the dominant side;
    /// both sides would derive the identical spec.
    ///
    /// # Errors
    /// [`SyncError::UnknownTarget`] when the target model is not registered.
    pub fn join_spec(
        &self,
        model: &ModelDefinition,
        attribute_name: &str,
        relation: &RelationDescriptor,
    ) -> Result<JoinTableSpec> {
        let target = self.target(attribute_name, &relation.target)?;
        let via = relation.foreign_key.as_str();
        let table = join_table_name((&model.identity, attribute_name), (&target.identity, via));
        // a self-referential join needs two distinct column names, so the
        // far column falls back to the reciprocal attribute
        let right_column = if target.identity == model.identity {
            foreign_key_column(via)
        } else {
            foreign_key_column(&target.identity)
        };
        Ok(JoinTableSpec {
            table,
            left: JoinSide {
                column: foreign_key_column(&model.identity),
                table: model.table_name.clone(),
                references: model.id_attribute.clone(),
            },
            right: JoinSide {
                column: right_column,
                table: target.table_name.clone(),
                references: target.id_attribute.clone(),
            },
        })
    }

    fn classify_to_many(
        &self,
        model: &ModelDefinition,
        attribute: &Attribute,
        relation: &ToManyRelation,
    ) -> Result<RelationDescriptor> {
        let target = self.target(&attribute.name, &relation.target)?;
        let reciprocal = target.attribute(&relation.via);

        if let Some(AttributeKind::ToMany(theirs)) = reciprocal.map(|a| &a.kind) {
            let ours = (model.identity.as_str(), attribute.name.as_str());
            let far = (target.identity.as_str(), relation.via.as_str());
            let dominant = resolve_dominance(ours, far, relation.dominant, theirs.dominant);
            debug!(
                model = %model.identity,
                attribute = %attribute.name,
                target = %target.identity,
                dominant,
                "resolved many-to-many relation"
            );
            return Ok(RelationDescriptor {
                kind: RelationKind::ManyToMany,
                target: target.identity.clone(),
                local_key: foreign_key_column(&model.identity),
                foreign_key: relation.via.clone(),
                dominant,
            });
        }

        // the far side keys the pair: a to-one reciprocal already owns a
        // foreign-key column, anything else names the column directly
        let foreign_key = match reciprocal.map(|a| &a.kind) {
            Some(AttributeKind::ToOne(_)) => foreign_key_column(&relation.via),
            _ => relation.via.clone(),
        };
        debug!(
            model = %model.identity,
            attribute = %attribute.name,
            target = %target.identity,
            "resolved one-to-many relation"
        );
        Ok(RelationDescriptor {
            kind: RelationKind::OneToMany,
            target: target.identity.clone(),
            local_key: model.id_attribute.clone(),
            foreign_key,
            dominant: false,
        })
    }

    fn target(&self, attribute: &str, identity: &str) -> Result<&'a ModelDefinition> {
        self.models
            .get(identity)
            .ok_or_else(|| SyncError::UnknownTarget {
                attribute: attribute.to_string(),
                model: identity.to_string(),
            })
    }
}

/// Picks the join-table owner for a many-to-many pair.
///
/// An explicit `dominant` flag on exactly one side wins. Otherwise the
/// lexicographically smaller `(identity, attribute)` endpoint owns the
/// table, so both sides agree without coordinating.
fn resolve_dominance(
    ours: (&str, &str),
    theirs: (&str, &str),
    ours_flag: bool,
    theirs_flag: bool,
) -> bool {
    match (ours_flag, theirs_flag) {
        (true, false) => true,
        (false, true) => false,
        _ => {
            if ours == theirs {
                // self-referential pair, this side is the only side
                return true;
            }
            warn!(
                left = %format_args!("{}.{}", ours.0, ours.1),
                right = %format_args!("{}.{}", theirs.0, theirs.1),
                "ambiguous dominance, siding with the smaller endpoint"
            );
            ours < theirs
        }
    }
}

/// Deterministic join-table name for a pair of endpoints.
///
/// Endpoints are sorted before joining, so both sides derive the same name
/// regardless of which one asks.
#[must_use]
pub fn join_table_name(left: (&str, &str), right: (&str, &str)) -> String {
    let (first, second) = if left <= right {
        (left, right)
    } else {
        (right, left)
    };
    format!("{}_{}__{}_{}", first.0, first.1, second.0, second.1)
}

/// Foreign-key column name derived from an attribute or identity.
#[must_use]
pub fn foreign_key_column(source: &str) -> String {
    format!("{source}Id")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models(json: &str) -> ModelSet {
        ModelSet::from_json(json).expect("model set")
    }

    fn classify(set: &ModelSet, model: &str, attribute: &str) -> Result<Option<RelationDescriptor>> {
        let model = set.get(model).expect("model");
        let attribute = model.attribute(attribute).expect("attribute");
        RelationResolver::new(set).classify(model, attribute)
    }

    #[test]
    fn test_scalar_is_not_a_relation() {
        let set = models(r#"{ "User": { "schema": { "name": "string" } } }"#);
        assert!(classify(&set, "user", "name").expect("classified").is_none());
    }

    #[test]
    fn test_to_one_names_the_key_pair() {
        let set = models(
            r#"{
                "Post": { "schema": { "author": { "model": "user" } } },
                "User": { "idAttribute": "uid", "schema": { "uid": { "type": "integer", "primary": true } } }
            }"#,
        );
        let relation = classify(&set, "post", "author")
            .expect("classified")
            .expect("relation");

        assert_eq!(relation.kind, RelationKind::ToOne);
        assert_eq!(relation.target, "user");
        assert_eq!(relation.local_key, "authorId");
        assert_eq!(relation.foreign_key, "uid");
    }

    #[test]
    fn test_to_one_unknown_target() {
        let set = models(r#"{ "Post": { "schema": { "author": { "model": "ghost" } } } }"#);
        let err = classify(&set, "post", "author").expect_err("unknown target");
        assert!(
            matches!(err, SyncError::UnknownTarget { ref model, .. } if model == "ghost"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_reciprocal_collections_are_many_to_many() {
        let set = models(
            r#"{
                "User": { "schema": { "roles": { "collection": "role", "via": "users" } } },
                "Role": { "schema": { "users": { "collection": "user", "via": "roles" } } }
            }"#,
        );

        let user_side = classify(&set, "user", "roles")
            .expect("classified")
            .expect("relation");
        let role_side = classify(&set, "role", "users")
            .expect("classified")
            .expect("relation");

        assert_eq!(user_side.kind, RelationKind::ManyToMany);
        assert_eq!(role_side.kind, RelationKind::ManyToMany);
        // without flags the smaller endpoint owns the join table
        assert!(role_side.dominant);
        assert!(!user_side.dominant);
    }

    #[test]
    fn test_explicit_dominant_flag_wins() {
        let set = models(
            r#"{
                "User": { "schema": { "roles": { "collection": "role", "via": "users", "dominant": true } } },
                "Role": { "schema": { "users": { "collection": "user", "via": "roles" } } }
            }"#,
        );

        let user_side = classify(&set, "user", "roles")
            .expect("classified")
            .expect("relation");
        let role_side = classify(&set, "role", "users")
            .expect("classified")
            .expect("relation");

        assert!(user_side.dominant);
        assert!(!role_side.dominant);
    }

    #[test]
    fn test_collection_against_to_one_is_one_to_many() {
        let set = models(
            r#"{
                "User": { "schema": { "posts": { "collection": "post", "via": "author" } } },
                "Post": { "schema": { "author": { "model": "user" } } }
            }"#,
        );
        let relation = classify(&set, "user", "posts")
            .expect("classified")
            .expect("relation");

        assert_eq!(relation.kind, RelationKind::OneToMany);
        assert_eq!(relation.local_key, "id");
        assert_eq!(relation.foreign_key, "authorId");
    }

    #[test]
    fn test_collection_against_scalar_keeps_via_as_key() {
        let set = models(
            r#"{
                "User": { "schema": { "posts": { "collection": "post", "via": "ownerId" } } },
                "Post": { "schema": { "ownerId": "integer" } }
            }"#,
        );
        let relation = classify(&set, "user", "posts")
            .expect("classified")
            .expect("relation");

        assert_eq!(relation.kind, RelationKind::OneToMany);
        assert_eq!(relation.foreign_key, "ownerId");
    }

    #[test]
    fn test_collection_with_missing_reciprocal_attribute() {
        let set = models(
            r#"{
                "User": { "schema": { "posts": { "collection": "post", "via": "ghost" } } },
                "Post": { "schema": { "title": "string" } }
            }"#,
        );
        let relation = classify(&set, "user", "posts")
            .expect("classified")
            .expect("relation");

        assert_eq!(relation.kind, RelationKind::OneToMany);
        assert_eq!(relation.foreign_key, "ghost");
    }

    #[test]
    fn test_join_table_name_is_order_independent() {
        let forward = join_table_name(("user", "roles"), ("role", "users"));
        let backward = join_table_name(("role", "users"), ("user", "roles"));

        assert_eq!(forward, backward);
        assert_eq!(forward, "role_users__user_roles");
    }

    #[test]
    fn test_join_spec_sides() {
        let set = models(
            r#"{
                "User": { "tableName": "app_users", "schema": { "roles": { "collection": "role", "via": "users", "dominant": true } } },
                "Role": { "schema": { "users": { "collection": "user", "via": "roles" } } }
            }"#,
        );
        let user = set.get("user").expect("user");
        let attribute = user.attribute("roles").expect("roles");
        let resolver = RelationResolver::new(&set);
        let relation = resolver
            .classify(user, attribute)
            .expect("classified")
            .expect("relation");
        let join = resolver.join_spec(user, "roles", &relation).expect("join spec");

        assert_eq!(join.table, "role_users__user_roles");
        assert_eq!(join.left.column, "userId");
        assert_eq!(join.left.table, "app_users");
        assert_eq!(join.left.references, "id");
        assert_eq!(join.right.column, "roleId");
        assert_eq!(join.right.table, "role");
        assert_eq!(join.right.references, "id");
    }

    #[test]
    fn test_self_referential_join_columns_are_distinct() {
        let set = models(
            r#"{ "User": { "schema": { "friends": { "collection": "user", "via": "friends" } } } }"#,
        );
        let user = set.get("user").expect("user");
        let attribute = user.attribute("friends").expect("friends");
        let resolver = RelationResolver::new(&set);
        let relation = resolver
            .classify(user, attribute)
            .expect("classified")
            .expect("relation");

        assert!(relation.dominant);
        let join = resolver.join_spec(user, "friends", &relation).expect("join spec");
        assert_eq!(join.left.column, "userId");
        assert_eq!(join.right.column, "friendsId");
        assert_ne!(join.left.column, join.right.column);
    }
}
