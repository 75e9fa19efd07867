//! `rename()` statements.

use super::delete::SchemaScope;
use super::MigrationContext;
use crate::model::{Expression, RenameColumnExpression, RenameTableExpression};

pub struct RenameBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> RenameBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    pub fn table(self, old_name: impl Into<String>) -> RenameTableBuilder<'a> {
        let expression = self.ctx.push(Expression::RenameTable(RenameTableExpression {
            schema: None,
            old_name: old_name.into(),
            new_name: String::new(),
        }));
        RenameTableBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn column(self, old_name: impl Into<String>) -> RenameColumnBuilder<'a> {
        let expression = self.ctx.push(Expression::RenameColumn(RenameColumnExpression {
            schema: None,
            table: String::new(),
            old_name: old_name.into(),
            new_name: String::new(),
        }));
        RenameColumnBuilder {
            ctx: self.ctx,
            expression,
        }
    }
}

pub struct RenameTableBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> RenameTableBuilder<'a> {
    pub fn to(self, new_name: impl Into<String>) -> SchemaScope<'a> {
        if let Some(Expression::RenameTable(e)) = self.ctx.expression_mut(self.expression) {
            e.new_name = new_name.into();
        }
        SchemaScope::new(self.ctx, self.expression)
    }
}

pub struct RenameColumnBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> RenameColumnBuilder<'a> {
    pub fn on_table(self, table: impl Into<String>) -> Self {
        if let Some(Expression::RenameColumn(e)) = self.ctx.expression_mut(self.expression) {
            e.table = table.into();
        }
        self
    }

    pub fn to(self, new_name: impl Into<String>) -> SchemaScope<'a> {
        if let Some(Expression::RenameColumn(e)) = self.ctx.expression_mut(self.expression) {
            e.new_name = new_name.into();
        }
        SchemaScope::new(self.ctx, self.expression)
    }
}
