#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;

use strata_model::definition::ModelSet;
use strata_sync::sqlite::SqliteHandle;

pub async fn memory_handle() -> SqliteHandle {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    SqliteHandle::new(pool)
}

pub fn models(json: &str) -> ModelSet {
    ModelSet::from_json(json).unwrap_or_else(|e| panic!("Failed to build models: {e:?}"))
}

/// User and Role linked by a reciprocal many-to-many, User dominant.
pub fn user_role_models() -> ModelSet {
    models(
        r#"{
            "User": {
                "schema": {
                    "name": { "type": "string", "required": true },
                    "email": { "type": "string", "unique": true },
                    "roles": { "collection": "role", "via": "users", "dominant": true }
                }
            },
            "Role": {
                "schema": {
                    "label": "string",
                    "users": { "collection": "user", "via": "roles" }
                }
            }
        }"#,
    )
}

/// User owning Posts through a plain one-to-many.
pub fn user_owned_posts() -> ModelSet {
    models(
        r#"{
            "User": {
                "schema": {
                    "name": "string",
                    "posts": { "collection": "post", "via": "author" }
                }
            },
            "Post": {
                "schema": {
                    "title": "string",
                    "author": { "model": "user" }
                }
            }
        }"#,
    )
}

/// Non-internal table names, sorted.
pub async fn table_names(handle: &SqliteHandle) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(handle.pool())
    .await
    .expect("Failed to list tables");
    rows.into_iter().map(|(name,)| name).collect()
}

/// Column names of one table, in physical order.
pub async fn column_names(handle: &SqliteHandle, table: &str) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(handle.pool())
        .await
        .expect("Failed to list columns");
    rows.into_iter().map(|(name,)| name).collect()
}

/// The CREATE TABLE statement SQLite recorded for a table.
pub async fn table_sql(handle: &SqliteHandle, table: &str) -> String {
    let row: (String,) =
        sqlx::query_as("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(handle.pool())
            .await
            .expect("Failed to read table SQL");
    row.0
}
