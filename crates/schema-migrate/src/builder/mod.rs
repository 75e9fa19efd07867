//! Fluent builders that record a migration's expressions.
//!
//! A migration's `up`/`down` receives a [`MigrationContext`] and declares its
//! changes through the entry points below. Every call that starts an
//! operation appends its [`Expression`] immediately; the chained calls that
//! follow complete it in place.
//!
//! ```
//! use schema_migrate::builder::MigrationContext;
//!
//! let mut ctx = MigrationContext::new("SqlServer");
//! ctx.create()
//!     .table("Users")
//!     .with_column("Id").as_int64().primary_key().identity()
//!     .with_column("Email").as_string_sized(255).not_nullable().unique();
//! ctx.insert().into_table("Users").row([("Email", "a@example.com".into())]);
//! assert_eq!(ctx.expressions().len(), 2);
//! ```
//!
//! Column builders are typestate: after `with_column(name)` only type calls
//! compile, after a type only column options or the next column.

mod alter;
mod column;
mod create;
mod data;
mod delete;
mod execute;
mod rename;

pub use alter::{AlterBuilder, AlterColumnBuilder, AlterTableBuilder};
pub use column::{ColumnOptionStage, ColumnTypeStage, ForAlterTable, ForColumn, ForTable};
pub use create::{
    ConstraintBuilder, ConstraintColumnsStage, CreateBuilder, CreateColumnBuilder,
    CreateTableBuilder, ForeignKeyBuilder, ForeignKeyFromStage, ForeignKeyRulesStage,
    ForeignKeyToStage, IndexBuilder, IndexTableStage, SequenceBuilder,
};
pub use data::{
    DeleteDataBuilder, DeleteDataTableBuilder, InsertBuilder, InsertDataBuilder, UpdateBuilder,
    UpdateSetStage, UpdateTableBuilder,
};
pub use delete::{
    DeleteBuilder, DeleteColumnBuilder, DeleteConstraintBuilder, DeleteForeignKeyBuilder,
    DeleteIndexBuilder, SchemaScope,
};
pub use execute::ExecuteBuilder;
pub use rename::{RenameBuilder, RenameColumnBuilder, RenameTableBuilder};

use column::ColumnSlot;

use crate::core::value::Value;
use crate::drivers::DialectImpl;
use crate::model::{ColumnDefinition, DataRow, Expression};

/// Expressions recorded by one `up` or `down` call.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    database: String,
    expressions: Vec<Expression>,
}

impl MigrationContext {
    /// Empty context for the named dialect (`SqlServer`, `Postgres`, `MySql`).
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            expressions: Vec::new(),
        }
    }

    /// Name of the dialect the expressions are built for.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn into_expressions(self) -> Vec<Expression> {
        self.expressions
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Append a prebuilt expression, returning its position.
    pub fn push(&mut self, expression: Expression) -> usize {
        self.expressions.push(expression);
        self.expressions.len() - 1
    }

    /// Record `build` only when the target dialect matches one of `databases`.
    ///
    /// Names accept the same aliases as the `connection.type` setting.
    pub fn if_database<F>(&mut self, databases: &[&str], build: F)
    where
        F: FnOnce(&mut MigrationContext),
    {
        let matches = databases.iter().any(|name| {
            name.eq_ignore_ascii_case(&self.database)
                || DialectImpl::from_db_type(name)
                    .map(|d| d.name().eq_ignore_ascii_case(&self.database))
                    .unwrap_or(false)
        });
        if matches {
            build(self);
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    pub fn create(&mut self) -> CreateBuilder<'_> {
        CreateBuilder::new(self)
    }

    pub fn alter(&mut self) -> AlterBuilder<'_> {
        AlterBuilder::new(self)
    }

    pub fn delete(&mut self) -> DeleteBuilder<'_> {
        DeleteBuilder::new(self)
    }

    pub fn rename(&mut self) -> RenameBuilder<'_> {
        RenameBuilder::new(self)
    }

    pub fn insert(&mut self) -> InsertBuilder<'_> {
        InsertBuilder::new(self)
    }

    pub fn update(&mut self) -> UpdateBuilder<'_> {
        UpdateBuilder::new(self)
    }

    pub fn delete_data(&mut self) -> DeleteDataBuilder<'_> {
        DeleteDataBuilder::new(self)
    }

    pub fn execute(&mut self) -> ExecuteBuilder<'_> {
        ExecuteBuilder::new(self)
    }

    // =========================================================================
    // In-place access for builders
    // =========================================================================

    pub(crate) fn expression_mut(&mut self, index: usize) -> Option<&mut Expression> {
        self.expressions.get_mut(index)
    }

    pub(crate) fn column_mut(&mut self, slot: ColumnSlot) -> Option<&mut ColumnDefinition> {
        match (slot, self.expressions.get_mut(slot.expression())?) {
            (ColumnSlot::TableColumn { column, .. }, Expression::CreateTable(e)) => {
                e.columns.get_mut(column)
            }
            (ColumnSlot::Single { .. }, Expression::CreateColumn(e)) => Some(&mut e.column),
            (ColumnSlot::Single { .. }, Expression::AlterColumn(e)) => Some(&mut e.column),
            _ => None,
        }
    }

    /// Schema and table owning the column in `slot`.
    pub(crate) fn column_host(&self, slot: ColumnSlot) -> Option<(Option<String>, String)> {
        match self.expressions.get(slot.expression())? {
            Expression::CreateTable(e) => Some((e.schema.clone(), e.table.clone())),
            Expression::CreateColumn(e) => Some((e.schema.clone(), e.table.clone())),
            Expression::AlterColumn(e) => Some((e.schema.clone(), e.table.clone())),
            _ => None,
        }
    }
}

/// Collect `(column, value)` pairs into a data row.
pub(crate) fn data_row<I, K>(row: I) -> DataRow
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    row.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
