//! Dialect-specific SQL generation.
//!
//! A dialect turns table plans and alterations into executable statements.
//! SQLite is the shipped dialect; its ALTER TABLE is narrow, so unique and
//! index markers on an added column are split out into separate index
//! statements rather than inlined.

use crate::column::ColumnSpec;
use crate::connection::TableAlteration;
use crate::table::TablePlan;
use crate::typemap::ColumnType;

/// Trait for database-specific SQL generation.
pub trait SqlDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the SQL type name for a column type.
    fn type_name(&self, column_type: ColumnType) -> &'static str;

    /// Statements creating a table, including any secondary indexes.
    fn create_table_sql(&self, plan: &TablePlan) -> Vec<String>;

    /// Statements applying alterations to an existing table, in order.
    fn alter_table_sql(&self, table: &str, alterations: &[TableAlteration]) -> Vec<String>;

    /// Statement dropping a table if it exists.
    fn drop_table_sql(&self, table: &str) -> String;

    /// Returns the auto-increment keyword for this dialect.
    fn auto_increment_keyword(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Generates column definition SQL.
    ///
    /// Position hints, comments, and unsignedness are rendered by dialects
    /// that support them; the default skips all three.
    fn column_definition(&self, column: &ColumnSpec) -> String {
        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.type_name(column.column_type).to_string(),
        ];

        if column.primary {
            parts.push("PRIMARY KEY".to_string());
            if column.auto_increment {
                parts.push(self.auto_increment_keyword().to_string());
            }
        }

        if !column.nullable && !column.primary {
            parts.push("NOT NULL".to_string());
        }

        if column.unique && !column.primary {
            parts.push("UNIQUE".to_string());
        }

        if let Some(ref default) = column.default {
            parts.push(format!("DEFAULT {}", default.to_sql()));
        }

        if let Some(ref collation) = column.collation {
            parts.push(format!("COLLATE {collation}"));
        }

        if let Some(ref reference) = column.references {
            if let (Some(table), Some(target)) = (&reference.table, &reference.column) {
                let mut clause = format!(
                    "REFERENCES {} ({})",
                    self.quote_identifier(table),
                    self.quote_identifier(target)
                );
                if let Some(ref action) = reference.on_delete {
                    clause.push_str(&format!(" ON DELETE {action}"));
                }
                if let Some(ref action) = reference.on_update {
                    clause.push_str(&format!(" ON UPDATE {action}"));
                }
                parts.push(clause);
            }
        }

        parts.join(" ")
    }
}

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn create_index_sql(&self, table: &str, columns: &[String], unique: bool) -> String {
        let name = format!("idx_{}_{}", table, columns.join("_"));
        let quoted: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_identifier(&name),
            self.quote_identifier(table),
            quoted.join(", ")
        )
    }
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_name(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer | ColumnType::BigInteger | ColumnType::Boolean => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Binary => "BLOB",
            ColumnType::String
            | ColumnType::Text
            | ColumnType::Enum
            | ColumnType::Uuid
            | ColumnType::Date
            | ColumnType::DateTime
            | ColumnType::Time
            | ColumnType::Timestamp
            | ColumnType::Json
            | ColumnType::Jsonb => "TEXT",
        }
    }

    fn create_table_sql(&self, plan: &TablePlan) -> Vec<String> {
        let mut sql = String::from("CREATE TABLE IF NOT EXISTS ");
        sql.push_str(&self.quote_identifier(&plan.table));
        sql.push_str(" (\n  ");

        let defs: Vec<String> = plan
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        sql.push_str(&defs.join(",\n  "));

        if !plan.unique.is_empty() {
            let quoted: Vec<String> = plan
                .unique
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect();
            sql.push_str(",\n  UNIQUE (");
            sql.push_str(&quoted.join(", "));
            sql.push(')');
        }

        sql.push_str("\n)");

        let mut statements = vec![sql];
        for column in plan.columns.iter().filter(|c| c.index) {
            statements.push(self.create_index_sql(
                &plan.table,
                std::slice::from_ref(&column.name),
                false,
            ));
        }
        statements
    }

    fn alter_table_sql(&self, table: &str, alterations: &[TableAlteration]) -> Vec<String> {
        let mut statements = Vec::new();
        for alteration in alterations {
            match alteration {
                TableAlteration::AddColumn(column) => {
                    // ADD COLUMN cannot carry UNIQUE or create an index, so
                    // both move into follow-up index statements
                    let mut inline = column.clone();
                    inline.unique = false;
                    inline.index = false;
                    statements.push(format!(
                        "ALTER TABLE {} ADD COLUMN {}",
                        self.quote_identifier(table),
                        self.column_definition(&inline)
                    ));
                    if column.unique {
                        statements.push(self.create_index_sql(
                            table,
                            std::slice::from_ref(&column.name),
                            true,
                        ));
                    }
                    if column.index {
                        statements.push(self.create_index_sql(
                            table,
                            std::slice::from_ref(&column.name),
                            false,
                        ));
                    }
                }
                TableAlteration::DropColumn(name) => {
                    statements.push(format!(
                        "ALTER TABLE {} DROP COLUMN {}",
                        self.quote_identifier(table),
                        self.quote_identifier(name)
                    ));
                }
            }
        }
        statements
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{DefaultValue, ForeignKeyRef};

    fn dialect() -> SqliteDialect {
        SqliteDialect::new()
    }

    fn plan() -> TablePlan {
        let mut name = ColumnSpec::new("name", ColumnType::String);
        name.nullable = false;
        TablePlan::new("user")
            .column(ColumnSpec::auto_primary("id"))
            .column(name)
    }

    #[test]
    fn test_create_table() {
        let sql = dialect().create_table_sql(&plan());
        assert_eq!(sql.len(), 1);
        assert!(sql[0].starts_with("CREATE TABLE IF NOT EXISTS \"user\""));
        assert!(sql[0].contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql[0].contains("\"name\" TEXT NOT NULL"));
    }

    #[test]
    fn test_create_table_with_composite_unique() {
        let mut plan = plan();
        plan.unique = vec!["email".to_string(), "handle".to_string()];

        let sql = dialect().create_table_sql(&plan);
        assert!(sql[0].contains("UNIQUE (\"email\", \"handle\")"));
    }

    #[test]
    fn test_indexed_column_gets_a_second_statement() {
        let mut email = ColumnSpec::new("email", ColumnType::String);
        email.index = true;
        let plan = TablePlan::new("user").column(email);

        let sql = dialect().create_table_sql(&plan);
        assert_eq!(sql.len(), 2);
        assert_eq!(
            sql[1],
            "CREATE INDEX IF NOT EXISTS \"idx_user_email\" ON \"user\" (\"email\")"
        );
    }

    #[test]
    fn test_add_column() {
        let column = ColumnSpec::new("age", ColumnType::Integer);
        let sql = dialect().alter_table_sql("user", &[TableAlteration::AddColumn(column)]);

        assert_eq!(sql, vec!["ALTER TABLE \"user\" ADD COLUMN \"age\" INTEGER"]);
    }

    #[test]
    fn test_add_unique_column_splits_into_index() {
        let mut column = ColumnSpec::new("email", ColumnType::String);
        column.unique = true;
        let sql = dialect().alter_table_sql("user", &[TableAlteration::AddColumn(column)]);

        assert_eq!(sql.len(), 2);
        assert!(
            !sql[0].contains("UNIQUE"),
            "inline UNIQUE is not valid in ADD COLUMN: {}",
            sql[0]
        );
        assert_eq!(
            sql[1],
            "CREATE UNIQUE INDEX IF NOT EXISTS \"idx_user_email\" ON \"user\" (\"email\")"
        );
    }

    #[test]
    fn test_drop_column() {
        let sql =
            dialect().alter_table_sql("user", &[TableAlteration::DropColumn("age".to_string())]);
        assert_eq!(sql, vec!["ALTER TABLE \"user\" DROP COLUMN \"age\""]);
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(dialect().drop_table_sql("user"), "DROP TABLE IF EXISTS \"user\"");
    }

    #[test]
    fn test_default_rendering() {
        let mut column = ColumnSpec::new("active", ColumnType::Boolean);
        column.default = Some(DefaultValue::Bool(true));

        let def = dialect().column_definition(&column);
        assert!(def.contains("DEFAULT 1"));
    }

    #[test]
    fn test_references_clause() {
        let mut column = ColumnSpec::new("authorId", ColumnType::String);
        column.references = Some(ForeignKeyRef {
            table: Some("user".to_string()),
            column: Some("id".to_string()),
            on_delete: Some("CASCADE".to_string()),
            on_update: None,
        });

        let def = dialect().column_definition(&column);
        assert!(def.contains("REFERENCES \"user\" (\"id\") ON DELETE CASCADE"));
    }

    #[test]
    fn test_incomplete_reference_is_not_rendered() {
        let mut column = ColumnSpec::new("authorId", ColumnType::String);
        column.references = Some(ForeignKeyRef {
            column: Some("id".to_string()),
            ..ForeignKeyRef::default()
        });

        let def = dialect().column_definition(&column);
        assert!(!def.contains("REFERENCES"));
    }

    #[test]
    fn test_type_names() {
        let d = dialect();
        assert_eq!(d.type_name(ColumnType::String), "TEXT");
        assert_eq!(d.type_name(ColumnType::BigInteger), "INTEGER");
        assert_eq!(d.type_name(ColumnType::Boolean), "INTEGER");
        assert_eq!(d.type_name(ColumnType::Float), "REAL");
        assert_eq!(d.type_name(ColumnType::Decimal), "NUMERIC");
        assert_eq!(d.type_name(ColumnType::Binary), "BLOB");
        assert_eq!(d.type_name(ColumnType::Json), "TEXT");
    }

    #[test]
    fn test_quoting_escapes_embedded_quotes() {
        assert_eq!(dialect().quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
