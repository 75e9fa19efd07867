//! SQL Server dialect (reference rule set).
//!
//! Differences from the base rules:
//! - `[bracket]` quoting, `N'...'` Unicode literals, default schema `dbo`
//! - named `DF_` default constraints and `IDENTITY(seed,increment)`
//! - dropping a column first drops its anonymous default constraint
//! - renames through `sp_rename`, descriptions through extended properties
//! - scripts are split into batches with `GO`

use crate::core::identifier::QuoteRules;
use crate::dialect::{base, Dialect, TypeMap};
use crate::error::Result;
use crate::model::conventions;
use crate::model::{
    AlterColumnExpression, AlterSchemaExpression, AlterTableExpression, ColumnDefinition,
    ConstraintDefinition, CreateColumnExpression, CreateTableExpression, DbType,
    DeleteColumnExpression, IndexDefinition, InsertDataExpression, RenameColumnExpression,
    RenameTableExpression, SystemMethod,
};

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone)]
pub struct MssqlDialect {
    type_map: TypeMap,
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MssqlDialect {
    /// Create a new SQL Server dialect instance.
    pub fn new() -> Self {
        let mut map = TypeMap::new();
        map.set(DbType::AnsiStringFixedLength, "CHAR(255)")
            .set_sized(DbType::AnsiStringFixedLength, "CHAR($size)", 8000)
            .set(DbType::AnsiString, "VARCHAR(255)")
            .set_sized(DbType::AnsiString, "VARCHAR($size)", 8000)
            .set_sized(DbType::AnsiString, "VARCHAR(MAX)", i32::MAX as u64)
            .set(DbType::StringFixedLength, "NCHAR(255)")
            .set_sized(DbType::StringFixedLength, "NCHAR($size)", 4000)
            .set(DbType::String, "NVARCHAR(255)")
            .set_sized(DbType::String, "NVARCHAR($size)", 4000)
            .set_sized(DbType::String, "NVARCHAR(MAX)", 1_073_741_823)
            .set(DbType::Binary, "VARBINARY(8000)")
            .set_sized(DbType::Binary, "VARBINARY($size)", 8000)
            .set_sized(DbType::Binary, "VARBINARY(MAX)", i32::MAX as u64)
            .set(DbType::Boolean, "BIT")
            .set(DbType::Byte, "TINYINT")
            .set(DbType::Currency, "MONEY")
            .set(DbType::Date, "DATE")
            .set(DbType::DateTime, "DATETIME")
            .set(DbType::DateTime2, "DATETIME2")
            .set(DbType::DateTimeOffset, "DATETIMEOFFSET")
            .set(DbType::Decimal, "DECIMAL(19,5)")
            .set_sized(DbType::Decimal, "DECIMAL($precision,$scale)", 38)
            .set(DbType::Double, "DOUBLE PRECISION")
            .set(DbType::Guid, "UNIQUEIDENTIFIER")
            .set(DbType::Int16, "SMALLINT")
            .set(DbType::Int32, "INT")
            .set(DbType::Int64, "BIGINT")
            .set(DbType::Single, "REAL")
            .set(DbType::Time, "TIME")
            .set(DbType::Xml, "XML");
        Self { type_map: map }
    }

    fn clustered_keyword(clustered: Option<bool>) -> &'static str {
        match clustered {
            Some(true) => " CLUSTERED",
            Some(false) => " NONCLUSTERED",
            None => "",
        }
    }

    fn literal(&self, s: &str) -> String {
        self.rules().quote_string(s, true)
    }

    /// `sp_addextendedproperty` for a table or one of its columns.
    fn add_description(
        &self,
        schema: Option<&str>,
        table: &str,
        column: Option<&str>,
        description: &str,
    ) -> String {
        format!(
            "EXEC sys.sp_addextendedproperty @name = N'MS_Description', @value = {}, {};",
            self.literal(description),
            self.property_target(schema, table, column)
        )
    }

    fn property_target(&self, schema: Option<&str>, table: &str, column: Option<&str>) -> String {
        let schema = schema.or(self.default_schema()).unwrap_or("dbo");
        let mut target = format!(
            "@level0type = N'SCHEMA', @level0name = {}, @level1type = N'TABLE', @level1name = {}",
            self.literal(schema),
            self.literal(table)
        );
        if let Some(column) = column {
            target.push_str(&format!(
                ", @level2type = N'COLUMN', @level2name = {}",
                self.literal(column)
            ));
        }
        target
    }

    /// Introspect and drop the anonymous default constraint of a column.
    fn drop_default_script(&self, table: &str, column: &str) -> String {
        let object = self.rules().quote_string(table, false);
        format!(
            "DECLARE @default sysname, @sql nvarchar(max);\n\
             \n\
             -- get name of default constraint\n\
             SELECT @default = name\n\
             FROM sys.default_constraints\n\
             WHERE parent_object_id = object_id({object})\n\
             AND type = 'D'\n\
             AND parent_column_id = (\n\
             SELECT column_id\n\
             FROM sys.columns\n\
             WHERE object_id = object_id({object})\n\
             AND name = {column}\n\
             );\n\
             \n\
             -- create alter table command to drop constraint as string and run it\n\
             SET @sql = {command} + QUOTENAME(@default);\n\
             EXEC sp_executesql @sql;",
            object = object,
            column = self.rules().quote_string(column, false),
            command = self.literal(&format!("ALTER TABLE {} DROP CONSTRAINT ", table)),
        )
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "SqlServer"
    }

    fn rules(&self) -> &QuoteRules {
        &QuoteRules::SQL_SERVER
    }

    fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    fn default_schema(&self) -> Option<&str> {
        Some("dbo")
    }

    fn batch_separator(&self) -> Option<&str> {
        Some("GO")
    }

    fn system_method(&self, method: SystemMethod) -> Result<String> {
        Ok(match method {
            SystemMethod::NewGuid => "NEWID()",
            SystemMethod::NewSequentialId => "NEWSEQUENTIALID()",
            SystemMethod::CurrentDateTime => "GETDATE()",
            SystemMethod::CurrentUtcDateTime => "GETUTCDATE()",
            SystemMethod::CurrentDateTimeOffset => "SYSDATETIMEOFFSET()",
            SystemMethod::CurrentUser => "CURRENT_USER",
        }
        .to_string())
    }

    fn column_default(&self, table: &str, column: &ColumnDefinition) -> Result<Option<String>> {
        match &column.default {
            Some(default) => Ok(Some(format!(
                "CONSTRAINT {} DEFAULT {}",
                self.quote_ident(&conventions::default_constraint_name(table, &column.name)),
                base::default_value(self, default)?
            ))),
            None => Ok(None),
        }
    }

    fn column_identity(&self, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .identity
            .map(|i| format!("IDENTITY({},{})", i.seed, i.increment)))
    }

    fn inline_primary_key(&self, table: &str, column: &ColumnDefinition) -> String {
        format!(
            "{}{}",
            base::inline_primary_key(self, table, column),
            Self::clustered_keyword(column.extensions.sql_server.primary_key_clustered)
        )
    }

    fn create_table(&self, e: &CreateTableExpression) -> Result<String> {
        let clustered = e
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .find_map(|c| c.extensions.sql_server.primary_key_clustered);
        let pk_keyword = format!("PRIMARY KEY{}", Self::clustered_keyword(clustered));
        let mut statements = vec![format!(
            "CREATE TABLE {} ({});",
            self.qualify(e.schema.as_deref(), &e.table),
            base::table_body(self, e, &pk_keyword)?
        )];
        if let Some(description) = &e.description {
            statements.push(self.add_description(e.schema.as_deref(), &e.table, None, description));
        }
        for column in &e.columns {
            if let Some(description) = &column.description {
                statements.push(self.add_description(
                    e.schema.as_deref(),
                    &e.table,
                    Some(&column.name),
                    description,
                ));
            }
        }
        Ok(statements.join("\n"))
    }

    fn alter_table(&self, e: &AlterTableExpression) -> Result<String> {
        let table = self.qualify(e.schema.as_deref(), &e.table);
        let target = self.property_target(e.schema.as_deref(), &e.table, None);
        let drop = format!(
            "IF EXISTS (SELECT 1 FROM sys.extended_properties WHERE major_id = OBJECT_ID({}) AND minor_id = 0 AND name = N'MS_Description')\n\
             EXEC sys.sp_dropextendedproperty @name = N'MS_Description', {};",
            self.literal(&table),
            target
        );
        match &e.description {
            Some(description) => Ok(format!(
                "{}\n{}",
                drop,
                self.add_description(e.schema.as_deref(), &e.table, None, description)
            )),
            None => Ok(drop),
        }
    }

    fn create_column(&self, e: &CreateColumnExpression) -> Result<String> {
        let mut sql = format!(
            "ALTER TABLE {} ADD {};",
            self.qualify(e.schema.as_deref(), &e.table),
            self.column_definition(&e.table, &e.column, true)?
        );
        if let Some(description) = &e.column.description {
            sql.push('\n');
            sql.push_str(&self.add_description(
                e.schema.as_deref(),
                &e.table,
                Some(&e.column.name),
                description,
            ));
        }
        Ok(sql)
    }

    fn alter_column(&self, e: &AlterColumnExpression) -> Result<String> {
        let column = &e.column;
        if column.identity.is_some() {
            return Err(self
                .unsupported("ALTER COLUMN cannot add an identity")
                .suggest("create a new identity column and copy the data"));
        }
        if column.primary_key {
            return Err(self
                .unsupported("ALTER COLUMN cannot add a primary key")
                .suggest("use a CreateConstraint expression"));
        }

        let table = self.qualify(e.schema.as_deref(), &e.table);
        let mut definition = vec![self.quote_ident(&column.name), self.column_type(column)?];
        if let Some(collation) = &column.collation {
            definition.push(format!("COLLATE {}", collation));
        }
        definition.push(if column.is_nullable() { "NULL" } else { "NOT NULL" }.to_string());
        let alter = format!("ALTER TABLE {} ALTER COLUMN {};", table, definition.join(" "));

        match &column.default {
            Some(default) => {
                let add_default = format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {};",
                    table,
                    self.quote_ident(&conventions::default_constraint_name(&e.table, &column.name)),
                    base::default_value(self, default)?,
                    self.quote_ident(&column.name)
                );
                Ok(format!(
                    "{}\n\n{}\n{}",
                    self.drop_default_script(&table, &column.name),
                    alter,
                    add_default
                ))
            }
            None => Ok(alter),
        }
    }

    fn delete_column(&self, e: &DeleteColumnExpression) -> Result<String> {
        let table = self.qualify(e.schema.as_deref(), &e.table);
        let batches = e
            .columns
            .iter()
            .map(|column| {
                format!(
                    "{}\n\n-- now we can finally drop column\nALTER TABLE {} DROP COLUMN {};",
                    self.drop_default_script(&table, column),
                    table,
                    self.quote_ident(column)
                )
            })
            .collect();
        Ok(self.join_batches(batches))
    }

    fn create_index(&self, index: &IndexDefinition) -> Result<String> {
        let ext = &index.extensions;
        if ext.clustered == Some(true) {
            if ext.filter.is_some() {
                return Err(self
                    .unsupported("a clustered index cannot have a filter predicate")
                    .suggest("create a filtered NONCLUSTERED index instead"));
            }
            if !ext.include.is_empty() {
                return Err(self
                    .unsupported("a clustered index cannot have included columns")
                    .suggest("create a NONCLUSTERED index with INCLUDE instead"));
            }
        }
        if ext.method.is_some() {
            return Err(self.unsupported("index access methods are not supported"));
        }
        let modifier = match ext.clustered {
            Some(true) => "CLUSTERED ",
            Some(false) => "NONCLUSTERED ",
            None => "",
        };
        base::render_index(self, index, modifier, None)
    }

    fn delete_index(&self, index: &IndexDefinition) -> Result<String> {
        Ok(format!(
            "DROP INDEX {} ON {};",
            self.quote_ident(&index.effective_name()),
            self.qualify(index.schema.as_deref(), &index.table)
        ))
    }

    fn create_constraint(&self, c: &ConstraintDefinition) -> Result<String> {
        base::create_constraint(self, c, Self::clustered_keyword(c.extensions.clustered))
    }

    fn rename_table(&self, e: &RenameTableExpression) -> Result<String> {
        Ok(format!(
            "EXEC sp_rename {}, {};",
            self.literal(&self.qualify(e.schema.as_deref(), &e.old_name)),
            self.literal(&e.new_name)
        ))
    }

    fn rename_column(&self, e: &RenameColumnExpression) -> Result<String> {
        let column = format!(
            "{}.{}",
            self.qualify(e.schema.as_deref(), &e.table),
            self.quote_ident(&e.old_name)
        );
        Ok(format!(
            "EXEC sp_rename {}, {}, N'COLUMN';",
            self.literal(&column),
            self.literal(&e.new_name)
        ))
    }

    fn alter_schema(&self, e: &AlterSchemaExpression) -> Result<String> {
        Ok(format!(
            "ALTER SCHEMA {} TRANSFER {};",
            self.quote_ident(&e.destination_schema),
            self.qualify(e.source_schema.as_deref(), &e.table)
        ))
    }

    fn insert_data(&self, e: &InsertDataExpression) -> Result<String> {
        let mut statements = base::insert_rows(self, e);
        if e.identity_insert {
            let table = self.qualify(e.schema.as_deref(), &e.table);
            statements.insert(0, format!("SET IDENTITY_INSERT {} ON;", table));
            statements.push(format!("SET IDENTITY_INSERT {} OFF;", table));
        }
        Ok(statements.join("\n"))
    }

    fn schema_exists_sql(&self, schema: &str) -> String {
        format!("SELECT 1 FROM sys.schemas WHERE name = {};", self.literal(schema))
    }

    fn index_exists_sql(&self, schema: Option<&str>, table: &str, name: &str) -> String {
        format!(
            "SELECT 1 FROM sys.indexes WHERE name = {} AND object_id = OBJECT_ID({});",
            self.literal(name),
            self.literal(&self.qualify(schema, table))
        )
    }

    fn default_value_exists_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        default_value: &str,
    ) -> String {
        format!(
            "SELECT 1 FROM sys.default_constraints dc \
             JOIN sys.columns c ON c.object_id = dc.parent_object_id AND c.column_id = dc.parent_column_id \
             WHERE dc.parent_object_id = OBJECT_ID({}) AND c.name = {} AND dc.definition LIKE {};",
            self.literal(&self.qualify(schema, table)),
            self.literal(column),
            self.literal(&format!("%{}%", default_value))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use crate::error::MigrateError;
    use crate::model::{
        ColumnType, DefaultValue, Direction, Expression, ForeignKeyDefinition, ForeignKeyRule,
        Identity, IndexColumn, SequenceDefinition, UpdateDataExpression,
    };

    fn dialect() -> MssqlDialect {
        MssqlDialect::new()
    }

    fn column(name: &str, db_type: DbType) -> ColumnDefinition {
        ColumnDefinition::new(name).with_type(db_type)
    }

    fn create_column(table: &str, column: ColumnDefinition) -> Expression {
        Expression::CreateColumn(CreateColumnExpression {
            schema: None,
            table: table.into(),
            column,
        })
    }

    // =========================================================================
    // Column tests
    // =========================================================================

    #[test]
    fn test_create_identity_primary_key_column() {
        let mut col = column("ExampleId", DbType::Int64);
        col.primary_key = true;
        col.primary_key_name = Some("PK_Example".into());
        col.identity = Some(Identity::default());

        let sql = dialect().generate(&create_column("Example", col)).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE [dbo].[Example] ADD [ExampleId] BIGINT NOT NULL IDENTITY(1,1) CONSTRAINT [PK_Example] PRIMARY KEY;"
        );
    }

    #[test]
    fn test_create_column_with_default_and_collation() {
        let mut col = column("Name", DbType::String);
        col.size = Some(100);
        col.nullable = Some(true);
        col.collation = Some("Latin1_General_CI_AS".into());
        col.default = Some(DefaultValue::Value(Value::from("n/a")));

        let sql = dialect().generate(&create_column("Users", col)).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE [dbo].[Users] ADD [Name] NVARCHAR(100) COLLATE Latin1_General_CI_AS NULL CONSTRAINT [DF_Users_Name] DEFAULT N'n/a';"
        );
    }

    #[test]
    fn test_system_method_defaults() {
        let mut col = column("Created", DbType::DateTime);
        col.default = Some(DefaultValue::System(SystemMethod::CurrentUtcDateTime));
        let sql = dialect().generate(&create_column("Users", col)).unwrap();
        assert!(sql.ends_with("[Created] DATETIME NOT NULL CONSTRAINT [DF_Users_Created] DEFAULT GETUTCDATE();"));
    }

    #[test]
    fn test_custom_type_passes_through() {
        let mut col = ColumnDefinition::new("Geo");
        col.column_type = Some(ColumnType::Custom("GEOGRAPHY".into()));
        col.nullable = Some(true);
        let sql = dialect().generate(&create_column("Places", col)).unwrap();
        assert_eq!(sql, "ALTER TABLE [dbo].[Places] ADD [Geo] GEOGRAPHY NULL;");
    }

    #[test]
    fn test_string_size_boundaries() {
        let d = dialect();
        let mut col = column("Body", DbType::String);
        col.size = Some(4000);
        assert_eq!(d.column_type(&col).unwrap(), "NVARCHAR(4000)");
        col.size = Some(4001);
        assert_eq!(d.column_type(&col).unwrap(), "NVARCHAR(MAX)");
        col.size = None;
        assert_eq!(d.column_type(&col).unwrap(), "NVARCHAR(255)");
    }

    #[test]
    fn test_decimal_precision_above_38_is_capability_error() {
        let mut col = column("Amount", DbType::Decimal);
        col.precision = Some(39);
        col.scale = Some(2);
        let err = dialect().generate(&create_column("Orders", col)).unwrap_err();
        match err {
            MigrateError::Capability {
                dialect,
                expression,
                message,
                suggestion,
                ..
            } => {
                assert_eq!(dialect, "SqlServer");
                assert_eq!(expression, "CreateColumn Orders.Amount");
                assert!(message.contains("precision 39"));
                assert!(suggestion.unwrap().contains("38"));
            }
            other => panic!("expected capability error, got {:?}", other),
        }
    }

    #[test]
    fn test_alter_column_with_default_drops_existing_default() {
        let mut col = column("Status", DbType::Int32);
        col.default = Some(DefaultValue::Value(Value::I32(0)));
        let sql = dialect()
            .generate(&Expression::AlterColumn(AlterColumnExpression {
                schema: None,
                table: "Orders".into(),
                column: col,
            }))
            .unwrap();
        assert!(sql.starts_with("DECLARE @default sysname, @sql nvarchar(max);"));
        assert!(sql.contains("ALTER TABLE [dbo].[Orders] ALTER COLUMN [Status] INT NOT NULL;"));
        assert!(sql.ends_with(
            "ALTER TABLE [dbo].[Orders] ADD CONSTRAINT [DF_Orders_Status] DEFAULT 0 FOR [Status];"
        ));
    }

    #[test]
    fn test_alter_column_identity_is_capability_error() {
        let mut col = column("Id", DbType::Int32);
        col.identity = Some(Identity::default());
        let err = dialect()
            .generate(&Expression::AlterColumn(AlterColumnExpression {
                schema: None,
                table: "T".into(),
                column: col,
            }))
            .unwrap_err();
        assert!(matches!(err, MigrateError::Capability { .. }));
    }

    #[test]
    fn test_delete_column_drops_default_constraint_first() {
        let sql = dialect()
            .generate(&Expression::DeleteColumn(DeleteColumnExpression {
                schema: None,
                table: "Users".into(),
                columns: vec!["Name".into()],
            }))
            .unwrap();
        let expected = "DECLARE @default sysname, @sql nvarchar(max);\n\
\n\
-- get name of default constraint\n\
SELECT @default = name\n\
FROM sys.default_constraints\n\
WHERE parent_object_id = object_id('[dbo].[Users]')\n\
AND type = 'D'\n\
AND parent_column_id = (\n\
SELECT column_id\n\
FROM sys.columns\n\
WHERE object_id = object_id('[dbo].[Users]')\n\
AND name = 'Name'\n\
);\n\
\n\
-- create alter table command to drop constraint as string and run it\n\
SET @sql = N'ALTER TABLE [dbo].[Users] DROP CONSTRAINT ' + QUOTENAME(@default);\n\
EXEC sp_executesql @sql;\n\
\n\
-- now we can finally drop column\n\
ALTER TABLE [dbo].[Users] DROP COLUMN [Name];";
        assert_eq!(sql, expected);
    }

    #[test]
    fn test_delete_multiple_columns_separated_by_go() {
        let sql = dialect()
            .generate(&Expression::DeleteColumn(DeleteColumnExpression {
                schema: None,
                table: "Users".into(),
                columns: vec!["A".into(), "B".into()],
            }))
            .unwrap();
        let batches: Vec<&str> = sql.split("\nGO\n").collect();
        assert_eq!(batches.len(), 2);
        assert!(batches[0].ends_with("DROP COLUMN [A];"));
        assert!(batches[1].ends_with("DROP COLUMN [B];"));
    }

    // =========================================================================
    // Table tests
    // =========================================================================

    #[test]
    fn test_create_table_with_primary_key_constraint() {
        let mut id = column("Id", DbType::Int32);
        id.primary_key = true;
        id.identity = Some(Identity::default());
        let mut name = column("Name", DbType::String);
        name.size = Some(50);

        let sql = dialect()
            .generate(&Expression::CreateTable(CreateTableExpression {
                schema: None,
                table: "Users".into(),
                description: None,
                columns: vec![id, name],
            }))
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE [dbo].[Users] ([Id] INT NOT NULL IDENTITY(1,1), [Name] NVARCHAR(50) NOT NULL, CONSTRAINT [PK_Users] PRIMARY KEY ([Id]));"
        );
    }

    #[test]
    fn test_create_table_clustered_key_and_description() {
        let mut id = column("Id", DbType::Guid);
        id.primary_key = true;
        id.extensions.sql_server.primary_key_clustered = Some(false);
        id.default = Some(DefaultValue::System(SystemMethod::NewSequentialId));

        let sql = dialect()
            .generate(&Expression::CreateTable(CreateTableExpression {
                schema: Some("app".into()),
                table: "Docs".into(),
                description: Some("Documents".into()),
                columns: vec![id],
            }))
            .unwrap();
        assert!(sql.starts_with(
            "CREATE TABLE [app].[Docs] ([Id] UNIQUEIDENTIFIER NOT NULL CONSTRAINT [DF_Docs_Id] DEFAULT NEWSEQUENTIALID(), CONSTRAINT [PK_Docs] PRIMARY KEY NONCLUSTERED ([Id]));"
        ));
        assert!(sql.ends_with(
            "EXEC sys.sp_addextendedproperty @name = N'MS_Description', @value = N'Documents', @level0type = N'SCHEMA', @level0name = N'app', @level1type = N'TABLE', @level1name = N'Docs';"
        ));
    }

    #[test]
    fn test_delete_table() {
        let sql = dialect()
            .generate(&Expression::DeleteTable(crate::model::DeleteTableExpression {
                schema: None,
                table: "Users".into(),
            }))
            .unwrap();
        assert_eq!(sql, "DROP TABLE [dbo].[Users];");
    }

    #[test]
    fn test_rename_table_and_column() {
        let d = dialect();
        let table = d
            .generate(&Expression::RenameTable(RenameTableExpression {
                schema: None,
                old_name: "Old".into(),
                new_name: "New".into(),
            }))
            .unwrap();
        assert_eq!(table, "EXEC sp_rename N'[dbo].[Old]', N'New';");

        let column = d
            .generate(&Expression::RenameColumn(RenameColumnExpression {
                schema: None,
                table: "T".into(),
                old_name: "A".into(),
                new_name: "B".into(),
            }))
            .unwrap();
        assert_eq!(column, "EXEC sp_rename N'[dbo].[T].[A]', N'B', N'COLUMN';");
    }

    #[test]
    fn test_alter_schema_transfer() {
        let sql = dialect()
            .generate(&Expression::AlterSchema(AlterSchemaExpression {
                source_schema: None,
                table: "Users".into(),
                destination_schema: "archive".into(),
            }))
            .unwrap();
        assert_eq!(sql, "ALTER SCHEMA [archive] TRANSFER [dbo].[Users];");
    }

    // =========================================================================
    // Index and constraint tests
    // =========================================================================

    fn index(columns: &[(&str, Direction)]) -> IndexDefinition {
        IndexDefinition {
            table: "Users".into(),
            columns: columns
                .iter()
                .map(|(n, d)| IndexColumn::new(*n, *d))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_index_default_name() {
        let sql = dialect()
            .generate(&Expression::CreateIndex(index(&[
                ("Last", Direction::Ascending),
                ("First", Direction::Descending),
            ])))
            .unwrap();
        assert_eq!(
            sql,
            "CREATE INDEX [IX_Users_Last_First] ON [dbo].[Users] ([Last] ASC, [First] DESC);"
        );
    }

    #[test]
    fn test_create_filtered_nonclustered_index_with_include() {
        let mut idx = index(&[("Email", Direction::Ascending)]);
        idx.name = Some("IX_Active_Email".into());
        idx.unique = true;
        idx.extensions.clustered = Some(false);
        idx.extensions.include = vec!["Name".into()];
        idx.extensions.filter = Some("[Deleted] = 0".into());
        let sql = dialect().generate(&Expression::CreateIndex(idx)).unwrap();
        assert_eq!(
            sql,
            "CREATE UNIQUE NONCLUSTERED INDEX [IX_Active_Email] ON [dbo].[Users] ([Email] ASC) INCLUDE ([Name]) WHERE [Deleted] = 0;"
        );
    }

    #[test]
    fn test_clustered_filtered_index_is_capability_error() {
        let mut idx = index(&[("Email", Direction::Ascending)]);
        idx.extensions.clustered = Some(true);
        idx.extensions.filter = Some("[Deleted] = 0".into());
        let err = dialect().generate(&Expression::CreateIndex(idx)).unwrap_err();
        match err {
            MigrateError::Capability { suggestion, message, .. } => {
                assert!(message.contains("filter"));
                assert!(suggestion.unwrap().contains("NONCLUSTERED"));
            }
            other => panic!("expected capability error, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_index() {
        let mut idx = index(&[]);
        idx.name = Some("IX_Old".into());
        let sql = dialect().generate(&Expression::DeleteIndex(idx)).unwrap();
        assert_eq!(sql, "DROP INDEX [IX_Old] ON [dbo].[Users];");
    }

    #[test]
    fn test_create_clustered_primary_key_constraint() {
        let mut pk = ConstraintDefinition::new(crate::model::ConstraintKind::PrimaryKey, "Orders");
        pk.columns = vec!["Id".into(), "Line".into()];
        pk.extensions.clustered = Some(true);
        let sql = dialect().generate(&Expression::CreateConstraint(pk)).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE [dbo].[Orders] ADD CONSTRAINT [PK_Orders_Id_Line] PRIMARY KEY CLUSTERED ([Id], [Line]);"
        );
    }

    #[test]
    fn test_foreign_key_with_rules() {
        let fk = ForeignKeyDefinition {
            foreign_table: "Orders".into(),
            foreign_columns: vec!["CustomerId".into()],
            primary_table: "Customers".into(),
            primary_columns: vec!["Id".into()],
            on_delete: ForeignKeyRule::Cascade,
            on_update: ForeignKeyRule::None,
            ..Default::default()
        };
        let d = dialect();
        assert_eq!(
            d.generate(&Expression::CreateForeignKey(fk.clone())).unwrap(),
            "ALTER TABLE [dbo].[Orders] ADD CONSTRAINT [FK_Orders_CustomerId_Customers_Id] FOREIGN KEY ([CustomerId]) REFERENCES [dbo].[Customers] ([Id]) ON DELETE CASCADE;"
        );
        assert_eq!(
            d.generate(&Expression::DeleteForeignKey(fk)).unwrap(),
            "ALTER TABLE [dbo].[Orders] DROP CONSTRAINT [FK_Orders_CustomerId_Customers_Id];"
        );
    }

    // =========================================================================
    // Sequence and data tests
    // =========================================================================

    #[test]
    fn test_create_sequence() {
        let seq = SequenceDefinition {
            name: "OrderNumbers".into(),
            increment: Some(1),
            min_value: Some(1),
            max_value: Some(999999),
            start_with: Some(1000),
            cache: Some(10),
            cycle: true,
            ..Default::default()
        };
        let sql = dialect().generate(&Expression::CreateSequence(seq)).unwrap();
        assert_eq!(
            sql,
            "CREATE SEQUENCE [dbo].[OrderNumbers] INCREMENT BY 1 MINVALUE 1 MAXVALUE 999999 START WITH 1000 CACHE 10 CYCLE;"
        );
    }

    #[test]
    fn test_insert_with_identity_insert() {
        let sql = dialect()
            .generate(&Expression::InsertData(InsertDataExpression {
                schema: None,
                table: "Users".into(),
                rows: vec![
                    vec![("Id".into(), Value::I32(1)), ("Name".into(), Value::from("Ann"))],
                    vec![("Id".into(), Value::I32(2)), ("Name".into(), Value::Null)],
                ],
                identity_insert: true,
            }))
            .unwrap();
        assert_eq!(
            sql,
            "SET IDENTITY_INSERT [dbo].[Users] ON;\n\
             INSERT INTO [dbo].[Users] ([Id], [Name]) VALUES (1, N'Ann');\n\
             INSERT INTO [dbo].[Users] ([Id], [Name]) VALUES (2, NULL);\n\
             SET IDENTITY_INSERT [dbo].[Users] OFF;"
        );
    }

    #[test]
    fn test_update_where_null_and_all_rows() {
        let d = dialect();
        let sql = d
            .generate(&Expression::UpdateData(UpdateDataExpression {
                schema: None,
                table: "Users".into(),
                set: vec![("Active".into(), Value::Bool(true))],
                filter: vec![("DeletedOn".into(), Value::Null)],
                all_rows: false,
            }))
            .unwrap();
        assert_eq!(sql, "UPDATE [dbo].[Users] SET [Active] = 1 WHERE [DeletedOn] IS NULL;");

        let sql = d
            .generate(&Expression::UpdateData(UpdateDataExpression {
                schema: None,
                table: "Users".into(),
                set: vec![("Active".into(), Value::Bool(false))],
                filter: Vec::new(),
                all_rows: true,
            }))
            .unwrap();
        assert_eq!(sql, "UPDATE [dbo].[Users] SET [Active] = 0 WHERE 1 = 1;");
    }

    #[test]
    fn test_index_exists_sql() {
        assert_eq!(
            dialect().index_exists_sql(None, "Users", "IX_Users_Name"),
            "SELECT 1 FROM sys.indexes WHERE name = N'IX_Users_Name' AND object_id = OBJECT_ID(N'[dbo].[Users]');"
        );
    }
}
