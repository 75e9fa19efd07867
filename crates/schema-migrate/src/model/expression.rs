//! The expression model: one variant per atomic schema or data change.
//!
//! Expressions are built by a migration's `up`/`down` through the builders in
//! [`crate::builder`], validated, turned into SQL by a
//! [`Dialect`](crate::dialect::Dialect), and dropped once executed.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::column::ColumnDefinition;
use super::definitions::{
    ConstraintDefinition, ForeignKeyDefinition, IndexDefinition, SequenceDefinition,
};
use crate::core::identifier::{validate_identifier, validate_predicate};
use crate::core::value::Value;
use crate::error::{MigrateError, Result};
use crate::processor::Processor;

/// One row of column/value pairs.
pub type DataRow = Vec<(String, Value)>;

/// Signature of a raw operation run directly against the processor.
pub type RawCallbackFn =
    dyn for<'a> Fn(&'a dyn Processor) -> BoxFuture<'a, Result<()>> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSchemaExpression {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSchemaExpression {
    pub name: String,
}

/// Moves a table from one schema to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterSchemaExpression {
    pub source_schema: Option<String>,
    pub table: String,
    pub destination_schema: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableExpression {
    pub schema: Option<String>,
    pub table: String,
    pub description: Option<String>,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTableExpression {
    pub schema: Option<String>,
    pub table: String,
}

/// Changes table-level properties (its description).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTableExpression {
    pub schema: Option<String>,
    pub table: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateColumnExpression {
    pub schema: Option<String>,
    pub table: String,
    pub column: ColumnDefinition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterColumnExpression {
    pub schema: Option<String>,
    pub table: String,
    pub column: ColumnDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteColumnExpression {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTableExpression {
    pub schema: Option<String>,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameColumnExpression {
    pub schema: Option<String>,
    pub table: String,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSequenceExpression {
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertDataExpression {
    pub schema: Option<String>,
    pub table: String,
    pub rows: Vec<DataRow>,
    /// SQL Server: wrap the inserts in `SET IDENTITY_INSERT ... ON/OFF`.
    pub identity_insert: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDataExpression {
    pub schema: Option<String>,
    pub table: String,
    pub set: DataRow,
    pub filter: DataRow,
    pub all_rows: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteDataExpression {
    pub schema: Option<String>,
    pub table: String,
    /// Each row is one `WHERE` clause of AND-ed column predicates.
    pub rows: Vec<DataRow>,
    pub all_rows: bool,
}

/// A callback invoked with the live processor.
#[derive(Clone)]
pub struct RawCallback {
    pub description: String,
    callback: Arc<RawCallbackFn>,
}

impl RawCallback {
    pub fn new<F>(description: impl Into<String>, callback: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Processor) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn call<'a>(&self, processor: &'a dyn Processor) -> BoxFuture<'a, Result<()>> {
        (self.callback)(processor)
    }
}

impl fmt::Debug for RawCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCallback")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl PartialEq for RawCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

/// Work that bypasses SQL generation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOperation {
    /// SQL sent to the processor verbatim.
    Sql(String),
    /// Arbitrary connection-level work; not guaranteed to roll back.
    Callback(RawCallback),
}

/// One atomic schema or data change.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    CreateSchema(CreateSchemaExpression),
    DeleteSchema(DeleteSchemaExpression),
    AlterSchema(AlterSchemaExpression),
    CreateTable(CreateTableExpression),
    DeleteTable(DeleteTableExpression),
    AlterTable(AlterTableExpression),
    CreateColumn(CreateColumnExpression),
    AlterColumn(AlterColumnExpression),
    DeleteColumn(DeleteColumnExpression),
    CreateForeignKey(ForeignKeyDefinition),
    DeleteForeignKey(ForeignKeyDefinition),
    CreateIndex(IndexDefinition),
    DeleteIndex(IndexDefinition),
    CreateConstraint(ConstraintDefinition),
    DeleteConstraint(ConstraintDefinition),
    RenameTable(RenameTableExpression),
    RenameColumn(RenameColumnExpression),
    CreateSequence(SequenceDefinition),
    DeleteSequence(DeleteSequenceExpression),
    InsertData(InsertDataExpression),
    UpdateData(UpdateDataExpression),
    DeleteData(DeleteDataExpression),
    PerformRawOperation(RawOperation),
}

fn check_name(problems: &mut Vec<String>, what: &str, name: &str) {
    if let Err(e) = validate_identifier(name) {
        problems.push(format!("{}: {}", what, e));
    }
}

fn check_optional_schema(problems: &mut Vec<String>, schema: &Option<String>) {
    if let Some(schema) = schema {
        check_name(problems, "schema", schema);
    }
}

fn check_columns<S: AsRef<str>>(problems: &mut Vec<String>, what: &str, columns: &[S]) {
    if columns.is_empty() {
        problems.push(format!("{} requires at least one column", what));
    }
    for column in columns {
        check_name(problems, what, column.as_ref());
    }
}

fn check_rows(problems: &mut Vec<String>, rows: &[DataRow]) {
    for (i, row) in rows.iter().enumerate() {
        if row.is_empty() {
            problems.push(format!("row {} has no values", i + 1));
        }
        for (column, _) in row {
            check_name(problems, "data column", column);
        }
    }
}

impl Expression {
    /// Every structural problem, empty when the expression is valid.
    pub fn problems(&self) -> Vec<String> {
        let mut p = Vec::new();
        match self {
            Expression::CreateSchema(e) => check_name(&mut p, "schema", &e.name),
            Expression::DeleteSchema(e) => check_name(&mut p, "schema", &e.name),
            Expression::AlterSchema(e) => {
                check_optional_schema(&mut p, &e.source_schema);
                check_name(&mut p, "table", &e.table);
                check_name(&mut p, "destination schema", &e.destination_schema);
            }
            Expression::CreateTable(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
                if e.columns.is_empty() {
                    p.push("table requires at least one column".to_string());
                }
                let mut seen = HashSet::new();
                for column in &e.columns {
                    if !seen.insert(column.name.to_lowercase()) {
                        p.push(format!("duplicate column '{}'", column.name));
                    }
                    p.extend(column.problems());
                }
            }
            Expression::DeleteTable(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
            }
            Expression::AlterTable(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
            }
            Expression::CreateColumn(CreateColumnExpression { schema, table, column })
            | Expression::AlterColumn(AlterColumnExpression { schema, table, column }) => {
                check_optional_schema(&mut p, schema);
                check_name(&mut p, "table", table);
                p.extend(column.problems());
            }
            Expression::DeleteColumn(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
                check_columns(&mut p, "column", &e.columns);
            }
            Expression::CreateForeignKey(fk) => {
                check_optional_schema(&mut p, &fk.foreign_schema);
                check_optional_schema(&mut p, &fk.primary_schema);
                check_name(&mut p, "foreign table", &fk.foreign_table);
                check_name(&mut p, "primary table", &fk.primary_table);
                check_columns(&mut p, "foreign column", &fk.foreign_columns);
                check_columns(&mut p, "primary column", &fk.primary_columns);
                if fk.foreign_columns.len() != fk.primary_columns.len() {
                    p.push(format!(
                        "foreign key has {} foreign column(s) but {} primary column(s)",
                        fk.foreign_columns.len(),
                        fk.primary_columns.len()
                    ));
                }
            }
            Expression::DeleteForeignKey(fk) => {
                check_optional_schema(&mut p, &fk.foreign_schema);
                check_name(&mut p, "foreign table", &fk.foreign_table);
                if fk.name.is_none() && fk.foreign_columns.is_empty() {
                    p.push("foreign key name is required".to_string());
                }
            }
            Expression::CreateIndex(index) => {
                check_optional_schema(&mut p, &index.schema);
                check_name(&mut p, "table", &index.table);
                let names: Vec<&str> = index.columns.iter().map(|c| c.name.as_str()).collect();
                check_columns(&mut p, "index column", &names);
                for include in &index.extensions.include {
                    check_name(&mut p, "included column", include);
                }
                if let Some(filter) = &index.extensions.filter {
                    if let Err(e) = validate_predicate(filter) {
                        p.push(format!("index filter: {}", e));
                    }
                }
            }
            Expression::DeleteIndex(index) => {
                check_optional_schema(&mut p, &index.schema);
                check_name(&mut p, "table", &index.table);
                if index.name.is_none() && index.columns.is_empty() {
                    p.push("index name is required".to_string());
                }
            }
            Expression::CreateConstraint(c) => {
                check_optional_schema(&mut p, &c.schema);
                check_name(&mut p, "table", &c.table);
                check_columns(&mut p, "constraint column", &c.columns);
            }
            Expression::DeleteConstraint(c) => {
                check_optional_schema(&mut p, &c.schema);
                check_name(&mut p, "table", &c.table);
                if c.name.is_none() && c.columns.is_empty() {
                    p.push("constraint name is required".to_string());
                }
            }
            Expression::RenameTable(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "old table name", &e.old_name);
                check_name(&mut p, "new table name", &e.new_name);
            }
            Expression::RenameColumn(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
                check_name(&mut p, "old column name", &e.old_name);
                check_name(&mut p, "new column name", &e.new_name);
            }
            Expression::CreateSequence(s) => {
                check_optional_schema(&mut p, &s.schema);
                check_name(&mut p, "sequence", &s.name);
                if s.increment == Some(0) {
                    p.push("sequence increment cannot be 0".to_string());
                }
                if let (Some(min), Some(max)) = (s.min_value, s.max_value) {
                    if min > max {
                        p.push(format!("sequence min value {} exceeds max value {}", min, max));
                    }
                }
            }
            Expression::DeleteSequence(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "sequence", &e.name);
            }
            Expression::InsertData(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
                if e.rows.is_empty() {
                    p.push("insert requires at least one row".to_string());
                }
                check_rows(&mut p, &e.rows);
            }
            Expression::UpdateData(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
                if e.set.is_empty() {
                    p.push("update requires at least one column to set".to_string());
                }
                if e.filter.is_empty() && !e.all_rows {
                    p.push("update requires a WHERE row or all_rows()".to_string());
                }
                check_rows(&mut p, std::slice::from_ref(&e.set));
            }
            Expression::DeleteData(e) => {
                check_optional_schema(&mut p, &e.schema);
                check_name(&mut p, "table", &e.table);
                if e.rows.is_empty() && !e.all_rows {
                    p.push("delete requires at least one row or all_rows()".to_string());
                }
                check_rows(&mut p, &e.rows);
            }
            Expression::PerformRawOperation(RawOperation::Sql(sql)) => {
                if sql.trim().is_empty() {
                    p.push("raw SQL is empty".to_string());
                }
            }
            Expression::PerformRawOperation(RawOperation::Callback(_)) => {}
        }
        p
    }

    /// Validate, reporting every problem in one error.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(MigrateError::validation(self.to_string(), problems.join("; ")))
        }
    }

    /// The inverse expression, when this kind declares one.
    pub fn reverse(&self) -> Option<Expression> {
        let reversed = match self {
            Expression::CreateTable(e) => Expression::DeleteTable(DeleteTableExpression {
                schema: e.schema.clone(),
                table: e.table.clone(),
            }),
            Expression::CreateColumn(e) => Expression::DeleteColumn(DeleteColumnExpression {
                schema: e.schema.clone(),
                table: e.table.clone(),
                columns: vec![e.column.name.clone()],
            }),
            Expression::CreateIndex(index) => Expression::DeleteIndex(IndexDefinition {
                name: Some(index.effective_name()),
                ..index.clone()
            }),
            Expression::CreateConstraint(c) => Expression::DeleteConstraint(ConstraintDefinition {
                name: Some(c.effective_name()),
                ..c.clone()
            }),
            Expression::CreateForeignKey(fk) => Expression::DeleteForeignKey(ForeignKeyDefinition {
                name: Some(fk.effective_name()),
                ..fk.clone()
            }),
            Expression::CreateSchema(e) => Expression::DeleteSchema(DeleteSchemaExpression {
                name: e.name.clone(),
            }),
            Expression::CreateSequence(s) => Expression::DeleteSequence(DeleteSequenceExpression {
                schema: s.schema.clone(),
                name: s.name.clone(),
            }),
            Expression::RenameTable(e) => Expression::RenameTable(RenameTableExpression {
                schema: e.schema.clone(),
                old_name: e.new_name.clone(),
                new_name: e.old_name.clone(),
            }),
            Expression::RenameColumn(e) => Expression::RenameColumn(RenameColumnExpression {
                schema: e.schema.clone(),
                table: e.table.clone(),
                old_name: e.new_name.clone(),
                new_name: e.old_name.clone(),
            }),
            Expression::AlterSchema(e) => {
                let source = e.source_schema.clone()?;
                Expression::AlterSchema(AlterSchemaExpression {
                    source_schema: Some(e.destination_schema.clone()),
                    table: e.table.clone(),
                    destination_schema: source,
                })
            }
            _ => return None,
        };
        Some(reversed)
    }

    /// Variant name, e.g. `CreateTable`.
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::CreateSchema(_) => "CreateSchema",
            Expression::DeleteSchema(_) => "DeleteSchema",
            Expression::AlterSchema(_) => "AlterSchema",
            Expression::CreateTable(_) => "CreateTable",
            Expression::DeleteTable(_) => "DeleteTable",
            Expression::AlterTable(_) => "AlterTable",
            Expression::CreateColumn(_) => "CreateColumn",
            Expression::AlterColumn(_) => "AlterColumn",
            Expression::DeleteColumn(_) => "DeleteColumn",
            Expression::CreateForeignKey(_) => "CreateForeignKey",
            Expression::DeleteForeignKey(_) => "DeleteForeignKey",
            Expression::CreateIndex(_) => "CreateIndex",
            Expression::DeleteIndex(_) => "DeleteIndex",
            Expression::CreateConstraint(_) => "CreateConstraint",
            Expression::DeleteConstraint(_) => "DeleteConstraint",
            Expression::RenameTable(_) => "RenameTable",
            Expression::RenameColumn(_) => "RenameColumn",
            Expression::CreateSequence(_) => "CreateSequence",
            Expression::DeleteSequence(_) => "DeleteSequence",
            Expression::InsertData(_) => "InsertData",
            Expression::UpdateData(_) => "UpdateData",
            Expression::DeleteData(_) => "DeleteData",
            Expression::PerformRawOperation(_) => "PerformRawOperation",
        }
    }
}

fn qualified(schema: &Option<String>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", schema, name),
        None => name.to_string(),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.kind())?;
        match self {
            Expression::CreateSchema(e) => write!(f, "{}", e.name),
            Expression::DeleteSchema(e) => write!(f, "{}", e.name),
            Expression::AlterSchema(e) => write!(
                f,
                "{} -> {}",
                qualified(&e.source_schema, &e.table),
                e.destination_schema
            ),
            Expression::CreateTable(e) => write!(f, "{}", qualified(&e.schema, &e.table)),
            Expression::DeleteTable(e) => write!(f, "{}", qualified(&e.schema, &e.table)),
            Expression::AlterTable(e) => write!(f, "{}", qualified(&e.schema, &e.table)),
            Expression::CreateColumn(e) => {
                write!(f, "{}.{}", qualified(&e.schema, &e.table), e.column.name)
            }
            Expression::AlterColumn(e) => {
                write!(f, "{}.{}", qualified(&e.schema, &e.table), e.column.name)
            }
            Expression::DeleteColumn(e) => write!(
                f,
                "{}.{}",
                qualified(&e.schema, &e.table),
                e.columns.join(",")
            ),
            Expression::CreateForeignKey(fk) | Expression::DeleteForeignKey(fk) => {
                write!(f, "{}", fk.effective_name())
            }
            Expression::CreateIndex(index) | Expression::DeleteIndex(index) => write!(
                f,
                "{} on {}",
                index.effective_name(),
                qualified(&index.schema, &index.table)
            ),
            Expression::CreateConstraint(c) | Expression::DeleteConstraint(c) => write!(
                f,
                "{} on {}",
                c.effective_name(),
                qualified(&c.schema, &c.table)
            ),
            Expression::RenameTable(e) => write!(
                f,
                "{} -> {}",
                qualified(&e.schema, &e.old_name),
                e.new_name
            ),
            Expression::RenameColumn(e) => write!(
                f,
                "{}.{} -> {}",
                qualified(&e.schema, &e.table),
                e.old_name,
                e.new_name
            ),
            Expression::CreateSequence(s) => write!(f, "{}", qualified(&s.schema, &s.name)),
            Expression::DeleteSequence(e) => write!(f, "{}", qualified(&e.schema, &e.name)),
            Expression::InsertData(e) => write!(
                f,
                "{} ({} row(s))",
                qualified(&e.schema, &e.table),
                e.rows.len()
            ),
            Expression::UpdateData(e) => write!(f, "{}", qualified(&e.schema, &e.table)),
            Expression::DeleteData(e) => write!(f, "{}", qualified(&e.schema, &e.table)),
            Expression::PerformRawOperation(RawOperation::Sql(sql)) => {
                let first_line = sql.lines().next().unwrap_or_default();
                let short: String = first_line.chars().take(60).collect();
                if short.len() < first_line.len() {
                    write!(f, "{}...", short)
                } else {
                    write!(f, "{}", short)
                }
            }
            Expression::PerformRawOperation(RawOperation::Callback(cb)) => {
                write!(f, "{}", cb.description)
            }
        }
    }
}
