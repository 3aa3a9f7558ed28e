//! SQLite-backed connection handle.
//!
//! Probes go through `sqlite_master` and `pragma_table_info`; writes are
//! generated by the SQLite dialect and executed statement by statement.

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::connection::{ConnectionHandle, TableAlteration};
use crate::dialect::{SqlDialect, SqliteDialect};
use crate::error::Result;
use crate::table::TablePlan;

/// Connection handle over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteHandle {
    pool: SqlitePool,
    dialect: SqliteDialect,
}

impl SqliteHandle {
    /// Wraps a pool with the SQLite dialect.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dialect: SqliteDialect::new(),
        }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &SqliteDialect {
        &self.dialect
    }

    async fn execute_all(&self, statements: &[String]) -> Result<()> {
        for sql in statements {
            debug!(sql = %sql, "executing");
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl ConnectionHandle for SqliteHandle {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info(?) WHERE name = ?")
                .bind(table)
                .bind(column)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn create_table_if_absent(&self, plan: &TablePlan) -> Result<bool> {
        if self.table_exists(&plan.table).await? {
            return Ok(false);
        }
        self.execute_all(&self.dialect.create_table_sql(plan))
            .await?;
        Ok(true)
    }

    async fn alter_table(&self, table: &str, alterations: &[TableAlteration]) -> Result<()> {
        self.execute_all(&self.dialect.alter_table_sql(table, alterations))
            .await
    }

    async fn drop_table_if_present(&self, table: &str) -> Result<bool> {
        if !self.table_exists(table).await? {
            return Ok(false);
        }
        let sql = self.dialect.drop_table_sql(table);
        self.execute_all(std::slice::from_ref(&sql)).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnSpec;
    use crate::typemap::ColumnType;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn handle() -> SqliteHandle {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        SqliteHandle::new(pool)
    }

    fn user_plan() -> TablePlan {
        let mut name = ColumnSpec::new("name", ColumnType::String);
        name.nullable = false;
        TablePlan::new("user")
            .column(ColumnSpec::auto_primary("id"))
            .column(name)
    }

    #[tokio::test]
    async fn test_create_table_if_absent() {
        let handle = handle().await;

        assert!(handle.create_table_if_absent(&user_plan()).await.unwrap());
        assert!(handle.table_exists("user").await.unwrap());

        // second call is a no-op
        assert!(!handle.create_table_if_absent(&user_plan()).await.unwrap());
    }

    #[tokio::test]
    async fn test_column_exists() {
        let handle = handle().await;
        handle.create_table_if_absent(&user_plan()).await.unwrap();

        assert!(handle.column_exists("user", "name").await.unwrap());
        assert!(!handle.column_exists("user", "ghost").await.unwrap());
        assert!(!handle.column_exists("missing", "name").await.unwrap());
    }

    #[tokio::test]
    async fn test_alter_table_adds_column() {
        let handle = handle().await;
        handle.create_table_if_absent(&user_plan()).await.unwrap();

        let age = ColumnSpec::new("age", ColumnType::Integer);
        handle
            .alter_table("user", &[TableAlteration::AddColumn(age)])
            .await
            .unwrap();

        assert!(handle.column_exists("user", "age").await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_table_if_present() {
        let handle = handle().await;
        handle.create_table_if_absent(&user_plan()).await.unwrap();

        assert!(handle.drop_table_if_present("user").await.unwrap());
        assert!(!handle.table_exists("user").await.unwrap());
        assert!(!handle.drop_table_if_present("user").await.unwrap());
    }

    #[tokio::test]
    async fn test_indexed_column_creates_index() {
        let handle = handle().await;
        let mut email = ColumnSpec::new("email", ColumnType::String);
        email.index = true;
        let plan = TablePlan::new("user")
            .column(ColumnSpec::auto_primary("id"))
            .column(email);

        handle.create_table_if_absent(&plan).await.unwrap();

        let row: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_user_email'",
        )
        .fetch_optional(handle.pool())
        .await
        .unwrap();
        assert!(row.is_some());
    }
}
