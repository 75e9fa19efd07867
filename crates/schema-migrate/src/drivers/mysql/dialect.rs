//! MySQL dialect.
//!
//! MySQL has no schemas inside a database and no sequences, so those
//! expressions are capability errors. Identities become `AUTO_INCREMENT`,
//! descriptions become inline `COMMENT` clauses, and long strings graduate
//! to the `TEXT` family.

use crate::core::identifier::QuoteRules;
use crate::dialect::{base, Dialect, TypeMap};
use crate::error::Result;
use crate::model::{
    AlterColumnExpression, AlterSchemaExpression, AlterTableExpression, ColumnDefinition,
    ConstraintDefinition, ConstraintKind, CreateColumnExpression, CreateSchemaExpression,
    CreateTableExpression, DbType, DeleteSchemaExpression, DeleteSequenceExpression,
    ForeignKeyDefinition, IndexDefinition, RenameTableExpression, SequenceDefinition,
    SystemMethod,
};

const TEXT: u64 = 65_535;
const MEDIUM_TEXT: u64 = 16_777_215;
const LONG_TEXT: u64 = 4_294_967_295;

/// MySQL dialect implementation.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    type_map: TypeMap,
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        let mut map = TypeMap::new();
        for string_type in [DbType::AnsiString, DbType::String] {
            map.set(string_type, "VARCHAR(255)")
                .set_sized(string_type, "VARCHAR($size)", 255)
                .set_sized(string_type, "TEXT", TEXT)
                .set_sized(string_type, "MEDIUMTEXT", MEDIUM_TEXT)
                .set_sized(string_type, "LONGTEXT", LONG_TEXT);
        }
        for fixed_type in [DbType::AnsiStringFixedLength, DbType::StringFixedLength] {
            map.set(fixed_type, "CHAR(255)")
                .set_sized(fixed_type, "CHAR($size)", 255);
        }
        map.set(DbType::Binary, "LONGBLOB")
            .set_sized(DbType::Binary, "TINYBLOB", 255)
            .set_sized(DbType::Binary, "BLOB", TEXT)
            .set_sized(DbType::Binary, "MEDIUMBLOB", MEDIUM_TEXT)
            .set_sized(DbType::Binary, "LONGBLOB", LONG_TEXT)
            .set(DbType::Boolean, "TINYINT(1)")
            .set(DbType::Byte, "TINYINT UNSIGNED")
            .set(DbType::Currency, "DECIMAL(19,4)")
            .set(DbType::Date, "DATE")
            .set(DbType::DateTime, "DATETIME")
            .set(DbType::DateTime2, "DATETIME(6)")
            .set(DbType::DateTimeOffset, "TIMESTAMP")
            .set(DbType::Decimal, "DECIMAL(19,5)")
            .set_sized(DbType::Decimal, "DECIMAL($precision,$scale)", 65)
            .set(DbType::Double, "DOUBLE")
            .set(DbType::Guid, "CHAR(36)")
            .set(DbType::Int16, "SMALLINT")
            .set(DbType::Int32, "INTEGER")
            .set(DbType::Int64, "BIGINT")
            .set(DbType::Single, "FLOAT")
            .set(DbType::Time, "TIME")
            .set(DbType::Xml, "LONGTEXT");
        Self { type_map: map }
    }

    fn comment(&self, text: &str) -> String {
        self.rules().quote_string(text, false)
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "MySql"
    }

    fn rules(&self) -> &QuoteRules {
        &QuoteRules::MYSQL
    }

    fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    fn system_method(&self, method: SystemMethod) -> Result<String> {
        match method {
            SystemMethod::NewGuid => Ok("(UUID())".to_string()),
            SystemMethod::NewSequentialId => Err(self
                .unsupported("sequential GUIDs are not available")
                .suggest("use NewGuid (UUID())")),
            SystemMethod::CurrentDateTime | SystemMethod::CurrentDateTimeOffset => {
                Ok("CURRENT_TIMESTAMP".to_string())
            }
            SystemMethod::CurrentUtcDateTime => Ok("(UTC_TIMESTAMP())".to_string()),
            SystemMethod::CurrentUser => Ok("(CURRENT_USER())".to_string()),
        }
    }

    fn column_identity(&self, column: &ColumnDefinition) -> Result<Option<String>> {
        match column.identity {
            Some(identity) if !identity.is_default() => Err(self
                .unsupported("AUTO_INCREMENT columns cannot set a seed or increment")
                .suggest("set the table AUTO_INCREMENT start through raw SQL")),
            Some(_) => Ok(Some("AUTO_INCREMENT".to_string())),
            None => Ok(None),
        }
    }

    fn inline_primary_key(&self, _table: &str, _column: &ColumnDefinition) -> String {
        "PRIMARY KEY".to_string()
    }

    fn column_definition(
        &self,
        table: &str,
        column: &ColumnDefinition,
        inline_pk: bool,
    ) -> Result<String> {
        let mut definition = base::column_definition(self, table, column, inline_pk)?;
        if let Some(description) = &column.description {
            definition.push_str(&format!(" COMMENT {}", self.comment(description)));
        }
        Ok(definition)
    }

    fn create_schema(&self, _e: &CreateSchemaExpression) -> Result<String> {
        Err(self
            .unsupported("schemas are not supported")
            .suggest("create a separate database through raw SQL"))
    }

    fn delete_schema(&self, _e: &DeleteSchemaExpression) -> Result<String> {
        Err(self.unsupported("schemas are not supported"))
    }

    fn alter_schema(&self, _e: &AlterSchemaExpression) -> Result<String> {
        Err(self
            .unsupported("schemas are not supported")
            .suggest("use RENAME TABLE db1.t TO db2.t through raw SQL"))
    }

    fn create_table(&self, e: &CreateTableExpression) -> Result<String> {
        let mut sql = format!(
            "CREATE TABLE {} ({})",
            self.qualify(e.schema.as_deref(), &e.table),
            base::table_body(self, e, "PRIMARY KEY")?
        );
        if let Some(description) = &e.description {
            sql.push_str(&format!(" COMMENT = {}", self.comment(description)));
        }
        sql.push(';');
        Ok(sql)
    }

    fn alter_table(&self, e: &AlterTableExpression) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} COMMENT = {};",
            self.qualify(e.schema.as_deref(), &e.table),
            self.comment(e.description.as_deref().unwrap_or(""))
        ))
    }

    fn create_column(&self, e: &CreateColumnExpression) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.qualify(e.schema.as_deref(), &e.table),
            self.column_definition(&e.table, &e.column, true)?
        ))
    }

    fn alter_column(&self, e: &AlterColumnExpression) -> Result<String> {
        if e.column.primary_key {
            return Err(self
                .unsupported("MODIFY COLUMN cannot add a primary key")
                .suggest("use a CreateConstraint expression"));
        }
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {};",
            self.qualify(e.schema.as_deref(), &e.table),
            self.column_definition(&e.table, &e.column, false)?
        ))
    }

    fn delete_foreign_key(&self, fk: &ForeignKeyDefinition) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {};",
            self.qualify(fk.foreign_schema.as_deref(), &fk.foreign_table),
            self.quote_ident(&fk.effective_name())
        ))
    }

    fn create_index(&self, index: &IndexDefinition) -> Result<String> {
        if index.extensions.filter.is_some() {
            return Err(self
                .unsupported("filtered indexes are not supported")
                .suggest("index a generated column instead"));
        }
        if !index.extensions.include.is_empty() {
            return Err(self
                .unsupported("included columns are not supported")
                .suggest("add the columns to the index key"));
        }
        base::create_index(self, index, "")
    }

    fn delete_index(&self, index: &IndexDefinition) -> Result<String> {
        Ok(format!(
            "DROP INDEX {} ON {};",
            self.quote_ident(&index.effective_name()),
            self.qualify(index.schema.as_deref(), &index.table)
        ))
    }

    fn create_constraint(&self, c: &ConstraintDefinition) -> Result<String> {
        if c.extensions.clustered.is_some() {
            return Err(self
                .unsupported("clustered constraints are not supported")
                .suggest("omit the clustered option; InnoDB clusters on the primary key"));
        }
        base::create_constraint(self, c, "")
    }

    fn delete_constraint(&self, c: &ConstraintDefinition) -> Result<String> {
        let table = self.qualify(c.schema.as_deref(), &c.table);
        Ok(match c.kind {
            ConstraintKind::PrimaryKey => format!("ALTER TABLE {} DROP PRIMARY KEY;", table),
            ConstraintKind::Unique => format!(
                "ALTER TABLE {} DROP INDEX {};",
                table,
                self.quote_ident(&c.effective_name())
            ),
        })
    }

    fn rename_table(&self, e: &RenameTableExpression) -> Result<String> {
        Ok(format!(
            "RENAME TABLE {} TO {};",
            self.qualify(e.schema.as_deref(), &e.old_name),
            self.qualify(e.schema.as_deref(), &e.new_name)
        ))
    }

    fn create_sequence(&self, _s: &SequenceDefinition) -> Result<String> {
        Err(self
            .unsupported("sequences are not supported")
            .suggest("use an AUTO_INCREMENT column"))
    }

    fn delete_sequence(&self, _e: &DeleteSequenceExpression) -> Result<String> {
        Err(self.unsupported("sequences are not supported"))
    }

    fn index_exists_sql(&self, schema: Option<&str>, table: &str, name: &str) -> String {
        let schema = match schema {
            Some(schema) => self.rules().quote_string(schema, false),
            None => "DATABASE()".to_string(),
        };
        format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.STATISTICS WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} AND INDEX_NAME = {} LIMIT 1;",
            schema,
            self.rules().quote_string(table, false),
            self.rules().quote_string(name, false)
        )
    }
}
