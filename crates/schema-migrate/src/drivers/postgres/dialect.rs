//! PostgreSQL dialect.
//!
//! Uses `"double quote"` identifiers, lowercase native types, the SQL
//! standard identity syntax and `COMMENT ON` for descriptions. The default
//! schema is `public`.

use crate::core::identifier::QuoteRules;
use crate::dialect::{base, Dialect, TypeMap};
use crate::error::Result;
use crate::model::{
    AlterColumnExpression, ColumnDefinition, DbType, IndexDefinition, InsertDataExpression,
    SystemMethod,
};

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    type_map: TypeMap,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        // varchar/char accept at most 10485760 characters; text is unbounded.
        const MAX_CHAR: u64 = 10_485_760;

        let mut map = TypeMap::new();
        map.set(DbType::AnsiStringFixedLength, "char(255)")
            .set_sized(DbType::AnsiStringFixedLength, "char($size)", MAX_CHAR)
            .set(DbType::AnsiString, "text")
            .set_sized(DbType::AnsiString, "varchar($size)", MAX_CHAR)
            .set(DbType::StringFixedLength, "char(255)")
            .set_sized(DbType::StringFixedLength, "char($size)", MAX_CHAR)
            .set(DbType::String, "text")
            .set_sized(DbType::String, "varchar($size)", MAX_CHAR)
            .set(DbType::Binary, "bytea")
            .set(DbType::Boolean, "boolean")
            .set(DbType::Byte, "smallint")
            .set(DbType::Currency, "money")
            .set(DbType::Date, "date")
            .set(DbType::DateTime, "timestamp")
            .set(DbType::DateTime2, "timestamp")
            .set(DbType::DateTimeOffset, "timestamptz")
            .set(DbType::Decimal, "decimal(19,5)")
            .set_sized(DbType::Decimal, "decimal($precision,$scale)", 1000)
            .set(DbType::Double, "float8")
            .set(DbType::Guid, "uuid")
            .set(DbType::Int16, "smallint")
            .set(DbType::Int32, "integer")
            .set(DbType::Int64, "bigint")
            .set(DbType::Single, "float4")
            .set(DbType::Time, "time")
            .set(DbType::Xml, "xml");
        Self { type_map: map }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "Postgres"
    }

    fn rules(&self) -> &QuoteRules {
        &QuoteRules::POSTGRES
    }

    fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    fn default_schema(&self) -> Option<&str> {
        Some("public")
    }

    fn system_method(&self, method: SystemMethod) -> Result<String> {
        match method {
            SystemMethod::NewGuid => Ok("gen_random_uuid()".to_string()),
            SystemMethod::NewSequentialId => Err(self
                .unsupported("sequential GUIDs are not available")
                .suggest("use NewGuid (gen_random_uuid())")),
            SystemMethod::CurrentDateTime => Ok("now()".to_string()),
            SystemMethod::CurrentUtcDateTime => Ok("(now() at time zone 'UTC')".to_string()),
            SystemMethod::CurrentDateTimeOffset => Ok("current_timestamp".to_string()),
            SystemMethod::CurrentUser => Ok("current_user".to_string()),
        }
    }

    fn column_identity(&self, column: &ColumnDefinition) -> Result<Option<String>> {
        let Some(identity) = column.identity else {
            return Ok(None);
        };
        let generated = if column.extensions.postgres.identity_always {
            "ALWAYS"
        } else {
            "BY DEFAULT"
        };
        let mut clause = format!("GENERATED {} AS IDENTITY", generated);
        if !identity.is_default() {
            clause.push_str(&format!(
                " (START WITH {} INCREMENT BY {})",
                identity.seed, identity.increment
            ));
        }
        Ok(Some(clause))
    }

    fn alter_column(&self, e: &AlterColumnExpression) -> Result<String> {
        let column = &e.column;
        if column.identity.is_some() {
            return Err(self
                .unsupported("ALTER COLUMN cannot add an identity")
                .suggest("use ALTER COLUMN ... ADD GENERATED AS IDENTITY through raw SQL"));
        }
        if column.primary_key {
            return Err(self
                .unsupported("ALTER COLUMN cannot add a primary key")
                .suggest("use a CreateConstraint expression"));
        }

        let name = self.quote_ident(&column.name);
        let mut native = self.column_type(column)?;
        if let Some(collation) = &column.collation {
            native.push_str(&format!(" COLLATE {}", collation));
        }
        let mut clauses = vec![
            format!("ALTER COLUMN {} TYPE {}", name, native),
            if column.is_nullable() {
                format!("ALTER COLUMN {} DROP NOT NULL", name)
            } else {
                format!("ALTER COLUMN {} SET NOT NULL", name)
            },
        ];
        if let Some(default) = &column.default {
            clauses.push(format!(
                "ALTER COLUMN {} SET DEFAULT {}",
                name,
                base::default_value(self, default)?
            ));
        }
        Ok(format!(
            "ALTER TABLE {} {};",
            self.qualify(e.schema.as_deref(), &e.table),
            clauses.join(", ")
        ))
    }

    fn create_index(&self, index: &IndexDefinition) -> Result<String> {
        if index.extensions.clustered.is_some() {
            return Err(self
                .unsupported("clustered indexes are not supported")
                .suggest("run CLUSTER on the table after creating the index"));
        }
        base::render_index(self, index, "", index.extensions.method.as_deref())
    }

    fn insert_data(&self, e: &InsertDataExpression) -> Result<String> {
        if !e.identity_insert {
            return base::insert_data(self, e);
        }
        let table = self.qualify(e.schema.as_deref(), &e.table);
        Ok(e.rows
            .iter()
            .map(|row| {
                let columns: Vec<&str> = row.iter().map(|(c, _)| c.as_str()).collect();
                let values: Vec<String> = row.iter().map(|(_, v)| self.format_value(v)).collect();
                format!(
                    "INSERT INTO {} ({}) OVERRIDING SYSTEM VALUE VALUES ({});",
                    table,
                    base::quoted_list(self, &columns),
                    values.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn index_exists_sql(&self, schema: Option<&str>, table: &str, name: &str) -> String {
        format!(
            "SELECT 1 FROM pg_catalog.pg_indexes WHERE {}tablename = {} AND indexname = {};",
            base::schema_predicate(self, schema, "schemaname"),
            self.rules().quote_string(table, false),
            self.rules().quote_string(name, false)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use crate::error::MigrateError;
    use crate::model::{
        AlterTableExpression, CreateColumnExpression, CreateTableExpression, DefaultValue,
        Direction, Expression, Identity, IndexColumn, RenameTableExpression,
    };

    fn dialect() -> PostgresDialect {
        PostgresDialect::new()
    }

    #[test]
    fn test_create_identity_primary_key_column() {
        let mut col = ColumnDefinition::new("ExampleId").with_type(DbType::Int64);
        col.primary_key = true;
        col.primary_key_name = Some("PK_Example".into());
        col.identity = Some(Identity::default());

        let sql = dialect()
            .generate(&Expression::CreateColumn(CreateColumnExpression {
                schema: None,
                table: "Example".into(),
                column: col,
            }))
            .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE \"public\".\"Example\" ADD COLUMN \"ExampleId\" bigint NOT NULL GENERATED BY DEFAULT AS IDENTITY CONSTRAINT \"PK_Example\" PRIMARY KEY;"
        );
    }

    #[test]
    fn test_identity_always_with_seed() {
        let mut col = ColumnDefinition::new("Id").with_type(DbType::Int32);
        col.identity = Some(Identity {
            seed: 100,
            increment: 5,
        });
        col.extensions.postgres.identity_always = true;
        assert_eq!(
            dialect().column_identity(&col).unwrap().unwrap(),
            "GENERATED ALWAYS AS IDENTITY (START WITH 100 INCREMENT BY 5)"
        );
    }

    #[test]
    fn test_create_table_with_comments() {
        let mut id = ColumnDefinition::new("id").with_type(DbType::Guid);
        id.primary_key = true;
        id.default = Some(DefaultValue::System(SystemMethod::NewGuid));
        let mut name = ColumnDefinition::new("name").with_type(DbType::String);
        name.size = Some(80);
        name.nullable = Some(true);
        name.description = Some("Display name".into());

        let sql = dialect()
            .generate(&Expression::CreateTable(CreateTableExpression {
                schema: None,
                table: "users".into(),
                description: Some("Users".into()),
                columns: vec![id, name],
            }))
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"users\" (\"id\" uuid NOT NULL DEFAULT gen_random_uuid(), \"name\" varchar(80) NULL, CONSTRAINT \"PK_users\" PRIMARY KEY (\"id\"));\n\
             COMMENT ON TABLE \"public\".\"users\" IS 'Users';\n\
             COMMENT ON COLUMN \"public\".\"users\".\"name\" IS 'Display name';"
        );
    }

    #[test]
    fn test_alter_table_clears_comment() {
        let sql = dialect()
            .generate(&Expression::AlterTable(AlterTableExpression {
                schema: None,
                table: "users".into(),
                description: None,
            }))
            .unwrap();
        assert_eq!(sql, "COMMENT ON TABLE \"public\".\"users\" IS NULL;");
    }

    #[test]
    fn test_alter_column_combines_clauses() {
        let mut col = ColumnDefinition::new("status").with_type(DbType::AnsiString);
        col.size = Some(20);
        col.default = Some(DefaultValue::Value(Value::from("new")));
        let sql = dialect()
            .generate(&Expression::AlterColumn(AlterColumnExpression {
                schema: None,
                table: "orders".into(),
                column: col,
            }))
            .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE \"public\".\"orders\" ALTER COLUMN \"status\" TYPE varchar(20), ALTER COLUMN \"status\" SET NOT NULL, ALTER COLUMN \"status\" SET DEFAULT 'new';"
        );
    }

    #[test]
    fn test_sequential_guid_is_capability_error() {
        let err = dialect().system_method(SystemMethod::NewSequentialId).unwrap_err();
        match err {
            MigrateError::Capability {
                dialect,
                suggestion,
                ..
            } => {
                assert_eq!(dialect, "Postgres");
                assert!(suggestion.unwrap().contains("gen_random_uuid"));
            }
            other => panic!("expected capability error, got {:?}", other),
        }
    }

    #[test]
    fn test_index_with_method_and_filter() {
        let mut index = IndexDefinition {
            table: "docs".into(),
            columns: vec![IndexColumn::new("body", Direction::Ascending)],
            ..Default::default()
        };
        index.extensions.method = Some("gin".into());
        index.extensions.filter = Some("\"deleted\" = false".into());
        let sql = dialect().generate(&Expression::CreateIndex(index)).unwrap();
        assert_eq!(
            sql,
            "CREATE INDEX \"IX_docs_body\" ON \"public\".\"docs\" USING gin (\"body\" ASC) WHERE \"deleted\" = false;"
        );
    }

    #[test]
    fn test_clustered_index_is_capability_error() {
        let mut index = IndexDefinition {
            table: "docs".into(),
            columns: vec![IndexColumn::new("id", Direction::Ascending)],
            ..Default::default()
        };
        index.extensions.clustered = Some(true);
        let err = dialect().generate(&Expression::CreateIndex(index)).unwrap_err();
        assert!(matches!(err, MigrateError::Capability { .. }));
        assert!(err.to_string().contains("CreateIndex IX_docs_id"));
    }

    #[test]
    fn test_delete_index_is_schema_qualified() {
        let index = IndexDefinition {
            name: Some("ix_old".into()),
            table: "docs".into(),
            ..Default::default()
        };
        assert_eq!(
            dialect().generate(&Expression::DeleteIndex(index)).unwrap(),
            "DROP INDEX \"public\".\"ix_old\";"
        );
    }

    #[test]
    fn test_rename_table() {
        let sql = dialect()
            .generate(&Expression::RenameTable(RenameTableExpression {
                schema: Some("app".into()),
                old_name: "a".into(),
                new_name: "b".into(),
            }))
            .unwrap();
        assert_eq!(sql, "ALTER TABLE \"app\".\"a\" RENAME TO \"b\";");
    }

    #[test]
    fn test_identity_insert_overrides_system_value() {
        let sql = dialect()
            .generate(&Expression::InsertData(InsertDataExpression {
                schema: None,
                table: "users".into(),
                rows: vec![vec![
                    ("id".into(), Value::I32(1)),
                    ("active".into(), Value::Bool(true)),
                ]],
                identity_insert: true,
            }))
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"users\" (\"id\", \"active\") OVERRIDING SYSTEM VALUE VALUES (1, true);"
        );
    }

    #[test]
    fn test_binary_literal() {
        assert_eq!(
            dialect().format_value(&Value::Bytes(vec![0xde, 0xad])),
            "'\\xdead'"
        );
    }

    #[test]
    fn test_index_exists_sql() {
        assert_eq!(
            dialect().index_exists_sql(None, "docs", "ix_docs"),
            "SELECT 1 FROM pg_catalog.pg_indexes WHERE schemaname = 'public' AND tablename = 'docs' AND indexname = 'ix_docs';"
        );
    }
}
