//! SQL generation: the [`Dialect`] capability trait.
//!
//! Every rule has a default implementation in [`base`] shared by all
//! dialects. A dialect implements the few required methods (name, quoting
//! rules, type map, system methods) and overrides only the rules where its
//! SQL differs. Overrides can delegate back to the `base` function for the
//! parts they keep.
//!
//! [`Dialect::generate`] is the single dispatch point from an [`Expression`]
//! to SQL text. Output is a pure function of the expression.

pub mod base;
pub mod typemap;

pub use typemap::TypeMap;

use crate::core::identifier::QuoteRules;
use crate::core::value::Value;
use crate::error::{MigrateError, Result};
use crate::model::{
    AlterColumnExpression, AlterSchemaExpression, AlterTableExpression, ColumnDefinition,
    ConstraintDefinition, CreateColumnExpression, CreateSchemaExpression, CreateTableExpression,
    DeleteColumnExpression, DeleteDataExpression, DeleteSchemaExpression,
    DeleteSequenceExpression, DeleteTableExpression, Expression, ForeignKeyDefinition,
    IndexDefinition, InsertDataExpression, RawOperation, RenameColumnExpression,
    RenameTableExpression, SequenceDefinition, SystemMethod, UpdateDataExpression,
};

/// SQL syntax strategy for one database engine.
pub trait Dialect: Send + Sync {
    /// Dialect name used in error messages (e.g. "SqlServer").
    fn name(&self) -> &str;

    /// Identifier quoting and literal formatting rules.
    fn rules(&self) -> &QuoteRules;

    /// Logical → native type table.
    fn type_map(&self) -> &TypeMap;

    /// Native function for a system-method default.
    fn system_method(&self, method: SystemMethod) -> Result<String>;

    /// Schema used when an expression names none.
    fn default_schema(&self) -> Option<&str> {
        None
    }

    /// Line that separates batches inside a multi-statement script.
    fn batch_separator(&self) -> Option<&str> {
        None
    }

    // =========================================================================
    // Quoting and formatting
    // =========================================================================

    fn quote_ident(&self, name: &str) -> String {
        self.rules().quote_ident(name)
    }

    /// Schema-qualified, quoted name, falling back to the default schema.
    fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        self.rules().qualify(schema.or(self.default_schema()), name)
    }

    fn format_value(&self, value: &Value) -> String {
        self.rules().format_value(value)
    }

    /// Join statements of a script, inserting the batch separator if any.
    fn join_batches(&self, batches: Vec<String>) -> String {
        match self.batch_separator() {
            Some(sep) => batches.join(&format!("\n{}\n", sep)),
            None => batches.join("\n"),
        }
    }

    // =========================================================================
    // Column rules
    // =========================================================================

    fn column_type(&self, column: &ColumnDefinition) -> Result<String> {
        base::column_type(self, column)
    }

    /// ` DEFAULT ...` clause, if the column declares a default.
    fn column_default(&self, table: &str, column: &ColumnDefinition) -> Result<Option<String>> {
        base::column_default(self, table, column)
    }

    /// Identity clause, if the column is an identity.
    fn column_identity(&self, column: &ColumnDefinition) -> Result<Option<String>>;

    /// Primary key declared inline on a column.
    fn inline_primary_key(&self, table: &str, column: &ColumnDefinition) -> String {
        base::inline_primary_key(self, table, column)
    }

    /// Full column definition. `inline_pk` is false inside `CREATE TABLE`,
    /// where primary keys become a table constraint.
    fn column_definition(
        &self,
        table: &str,
        column: &ColumnDefinition,
        inline_pk: bool,
    ) -> Result<String> {
        base::column_definition(self, table, column, inline_pk)
    }

    // =========================================================================
    // Expression rules
    // =========================================================================

    fn create_schema(&self, e: &CreateSchemaExpression) -> Result<String> {
        Ok(format!("CREATE SCHEMA {};", self.quote_ident(&e.name)))
    }

    fn delete_schema(&self, e: &DeleteSchemaExpression) -> Result<String> {
        Ok(format!("DROP SCHEMA {};", self.quote_ident(&e.name)))
    }

    fn alter_schema(&self, e: &AlterSchemaExpression) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} SET SCHEMA {};",
            self.qualify(e.source_schema.as_deref(), &e.table),
            self.quote_ident(&e.destination_schema)
        ))
    }

    fn create_table(&self, e: &CreateTableExpression) -> Result<String> {
        base::create_table(self, e)
    }

    fn delete_table(&self, e: &DeleteTableExpression) -> Result<String> {
        Ok(format!("DROP TABLE {};", self.qualify(e.schema.as_deref(), &e.table)))
    }

    fn alter_table(&self, e: &AlterTableExpression) -> Result<String> {
        base::alter_table(self, e)
    }

    fn create_column(&self, e: &CreateColumnExpression) -> Result<String> {
        base::create_column(self, e, "ADD COLUMN")
    }

    fn alter_column(&self, e: &AlterColumnExpression) -> Result<String>;

    fn delete_column(&self, e: &DeleteColumnExpression) -> Result<String> {
        base::delete_column(self, e)
    }

    fn create_foreign_key(&self, fk: &ForeignKeyDefinition) -> Result<String> {
        base::create_foreign_key(self, fk)
    }

    fn delete_foreign_key(&self, fk: &ForeignKeyDefinition) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {};",
            self.qualify(fk.foreign_schema.as_deref(), &fk.foreign_table),
            self.quote_ident(&fk.effective_name())
        ))
    }

    fn create_index(&self, index: &IndexDefinition) -> Result<String> {
        base::create_index(self, index, "")
    }

    fn delete_index(&self, index: &IndexDefinition) -> Result<String> {
        Ok(format!(
            "DROP INDEX {};",
            self.qualify(index.schema.as_deref(), &index.effective_name())
        ))
    }

    fn create_constraint(&self, c: &ConstraintDefinition) -> Result<String> {
        base::create_constraint(self, c, "")
    }

    fn delete_constraint(&self, c: &ConstraintDefinition) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {};",
            self.qualify(c.schema.as_deref(), &c.table),
            self.quote_ident(&c.effective_name())
        ))
    }

    fn rename_table(&self, e: &RenameTableExpression) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME TO {};",
            self.qualify(e.schema.as_deref(), &e.old_name),
            self.quote_ident(&e.new_name)
        ))
    }

    fn rename_column(&self, e: &RenameColumnExpression) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};",
            self.qualify(e.schema.as_deref(), &e.table),
            self.quote_ident(&e.old_name),
            self.quote_ident(&e.new_name)
        ))
    }

    fn create_sequence(&self, s: &SequenceDefinition) -> Result<String> {
        base::create_sequence(self, s)
    }

    fn delete_sequence(&self, e: &DeleteSequenceExpression) -> Result<String> {
        Ok(format!("DROP SEQUENCE {};", self.qualify(e.schema.as_deref(), &e.name)))
    }

    fn insert_data(&self, e: &InsertDataExpression) -> Result<String> {
        base::insert_data(self, e)
    }

    fn update_data(&self, e: &UpdateDataExpression) -> Result<String> {
        base::update_data(self, e)
    }

    fn delete_data(&self, e: &DeleteDataExpression) -> Result<String> {
        base::delete_data(self, e)
    }

    // =========================================================================
    // Introspection queries (each returns one row when the object exists)
    // =========================================================================

    fn schema_exists_sql(&self, schema: &str) -> String {
        format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = {};",
            self.rules().quote_string(schema, false)
        )
    }

    fn table_exists_sql(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.TABLES WHERE {}TABLE_NAME = {};",
            base::schema_predicate(self, schema, "TABLE_SCHEMA"),
            self.rules().quote_string(table, false)
        )
    }

    fn column_exists_sql(&self, schema: Option<&str>, table: &str, column: &str) -> String {
        format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.COLUMNS WHERE {}TABLE_NAME = {} AND COLUMN_NAME = {};",
            base::schema_predicate(self, schema, "TABLE_SCHEMA"),
            self.rules().quote_string(table, false),
            self.rules().quote_string(column, false)
        )
    }

    fn constraint_exists_sql(&self, schema: Option<&str>, table: &str, name: &str) -> String {
        format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS WHERE {}TABLE_NAME = {} AND CONSTRAINT_NAME = {};",
            base::schema_predicate(self, schema, "CONSTRAINT_SCHEMA"),
            self.rules().quote_string(table, false),
            self.rules().quote_string(name, false)
        )
    }

    fn index_exists_sql(&self, schema: Option<&str>, table: &str, name: &str) -> String;

    fn sequence_exists_sql(&self, schema: Option<&str>, name: &str) -> String {
        format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.SEQUENCES WHERE {}SEQUENCE_NAME = {};",
            base::schema_predicate(self, schema, "SEQUENCE_SCHEMA"),
            self.rules().quote_string(name, false)
        )
    }

    /// Matches when the column's default contains `default_value`.
    fn default_value_exists_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        default_value: &str,
    ) -> String {
        format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.COLUMNS WHERE {}TABLE_NAME = {} AND COLUMN_NAME = {} AND COLUMN_DEFAULT LIKE {};",
            base::schema_predicate(self, schema, "TABLE_SCHEMA"),
            self.rules().quote_string(table, false),
            self.rules().quote_string(column, false),
            self.rules().quote_string(&format!("%{}%", default_value), false)
        )
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Generate SQL for one expression.
    ///
    /// Capability errors are stamped with the expression's description.
    fn generate(&self, expression: &Expression) -> Result<String> {
        let sql = match expression {
            Expression::CreateSchema(e) => self.create_schema(e),
            Expression::DeleteSchema(e) => self.delete_schema(e),
            Expression::AlterSchema(e) => self.alter_schema(e),
            Expression::CreateTable(e) => self.create_table(e),
            Expression::DeleteTable(e) => self.delete_table(e),
            Expression::AlterTable(e) => self.alter_table(e),
            Expression::CreateColumn(e) => self.create_column(e),
            Expression::AlterColumn(e) => self.alter_column(e),
            Expression::DeleteColumn(e) => self.delete_column(e),
            Expression::CreateForeignKey(fk) => self.create_foreign_key(fk),
            Expression::DeleteForeignKey(fk) => self.delete_foreign_key(fk),
            Expression::CreateIndex(index) => self.create_index(index),
            Expression::DeleteIndex(index) => self.delete_index(index),
            Expression::CreateConstraint(c) => self.create_constraint(c),
            Expression::DeleteConstraint(c) => self.delete_constraint(c),
            Expression::RenameTable(e) => self.rename_table(e),
            Expression::RenameColumn(e) => self.rename_column(e),
            Expression::CreateSequence(s) => self.create_sequence(s),
            Expression::DeleteSequence(e) => self.delete_sequence(e),
            Expression::InsertData(e) => self.insert_data(e),
            Expression::UpdateData(e) => self.update_data(e),
            Expression::DeleteData(e) => self.delete_data(e),
            Expression::PerformRawOperation(RawOperation::Sql(sql)) => Ok(sql.clone()),
            Expression::PerformRawOperation(RawOperation::Callback(cb)) => {
                Ok(format!("-- callback: {}", cb.description))
            }
        };
        sql.map_err(|e| e.describing(expression.to_string()))
    }

    /// Capability error for this dialect.
    fn unsupported(&self, message: &str) -> MigrateError {
        MigrateError::capability(self.name(), message)
    }
}
