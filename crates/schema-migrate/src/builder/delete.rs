//! `delete()` statements for schema objects.

use super::MigrationContext;
use crate::model::{
    ConstraintDefinition, ConstraintKind, DeleteColumnExpression, DeleteSchemaExpression,
    DeleteSequenceExpression, DeleteTableExpression, Expression, ForeignKeyDefinition,
    IndexDefinition,
};

pub struct DeleteBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> DeleteBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    pub fn table(self, name: impl Into<String>) -> SchemaScope<'a> {
        let expression = self.ctx.push(Expression::DeleteTable(DeleteTableExpression {
            schema: None,
            table: name.into(),
        }));
        SchemaScope {
            ctx: self.ctx,
            expression,
        }
    }

    /// Drop one or more columns of a table.
    pub fn column(self, name: impl Into<String>) -> DeleteColumnBuilder<'a> {
        let expression = self.ctx.push(Expression::DeleteColumn(DeleteColumnExpression {
            schema: None,
            table: String::new(),
            columns: vec![name.into()],
        }));
        DeleteColumnBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn foreign_key(self, name: impl Into<String>) -> DeleteForeignKeyBuilder<'a> {
        let expression = self
            .ctx
            .push(Expression::DeleteForeignKey(ForeignKeyDefinition {
                name: Some(name.into()),
                ..Default::default()
            }));
        DeleteForeignKeyBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn index(self, name: impl Into<String>) -> DeleteIndexBuilder<'a> {
        let expression = self.ctx.push(Expression::DeleteIndex(IndexDefinition {
            name: Some(name.into()),
            ..Default::default()
        }));
        DeleteIndexBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn primary_key(self, name: impl Into<String>) -> DeleteConstraintBuilder<'a> {
        self.constraint(ConstraintKind::PrimaryKey, name.into())
    }

    pub fn unique_constraint(self, name: impl Into<String>) -> DeleteConstraintBuilder<'a> {
        self.constraint(ConstraintKind::Unique, name.into())
    }

    fn constraint(self, kind: ConstraintKind, name: String) -> DeleteConstraintBuilder<'a> {
        let mut constraint = ConstraintDefinition::new(kind, "");
        constraint.name = Some(name);
        let expression = self.ctx.push(Expression::DeleteConstraint(constraint));
        DeleteConstraintBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn schema(self, name: impl Into<String>) {
        self.ctx
            .push(Expression::DeleteSchema(DeleteSchemaExpression { name: name.into() }));
    }

    pub fn sequence(self, name: impl Into<String>) -> SchemaScope<'a> {
        let expression = self
            .ctx
            .push(Expression::DeleteSequence(DeleteSequenceExpression {
                schema: None,
                name: name.into(),
            }));
        SchemaScope {
            ctx: self.ctx,
            expression,
        }
    }
}

/// Optional schema for the statement just recorded.
pub struct SchemaScope<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> SchemaScope<'a> {
    pub fn in_schema(self, schema: impl Into<String>) {
        let schema = Some(schema.into());
        match self.ctx.expression_mut(self.expression) {
            Some(Expression::DeleteTable(e)) => e.schema = schema,
            Some(Expression::DeleteColumn(e)) => e.schema = schema,
            Some(Expression::DeleteSequence(e)) => e.schema = schema,
            Some(Expression::DeleteForeignKey(fk)) => fk.foreign_schema = schema,
            Some(Expression::DeleteIndex(index)) => index.schema = schema,
            Some(Expression::DeleteConstraint(c)) => c.schema = schema,
            Some(Expression::RenameTable(e)) => e.schema = schema,
            Some(Expression::RenameColumn(e)) => e.schema = schema,
            Some(Expression::InsertData(e)) => e.schema = schema,
            _ => {}
        }
    }

    pub(crate) fn new(ctx: &'a mut MigrationContext, expression: usize) -> Self {
        Self { ctx, expression }
    }
}

pub struct DeleteColumnBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> DeleteColumnBuilder<'a> {
    /// Another column dropped by the same statement.
    pub fn column(self, name: impl Into<String>) -> Self {
        if let Some(Expression::DeleteColumn(e)) = self.ctx.expression_mut(self.expression) {
            e.columns.push(name.into());
        }
        self
    }

    pub fn from_table(self, table: impl Into<String>) -> SchemaScope<'a> {
        if let Some(Expression::DeleteColumn(e)) = self.ctx.expression_mut(self.expression) {
            e.table = table.into();
        }
        SchemaScope::new(self.ctx, self.expression)
    }
}

pub struct DeleteForeignKeyBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> DeleteForeignKeyBuilder<'a> {
    pub fn on_table(self, table: impl Into<String>) -> SchemaScope<'a> {
        if let Some(Expression::DeleteForeignKey(fk)) = self.ctx.expression_mut(self.expression)
        {
            fk.foreign_table = table.into();
        }
        SchemaScope::new(self.ctx, self.expression)
    }
}

pub struct DeleteIndexBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> DeleteIndexBuilder<'a> {
    pub fn on_table(self, table: impl Into<String>) -> SchemaScope<'a> {
        if let Some(Expression::DeleteIndex(index)) = self.ctx.expression_mut(self.expression) {
            index.table = table.into();
        }
        SchemaScope::new(self.ctx, self.expression)
    }
}

pub struct DeleteConstraintBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> DeleteConstraintBuilder<'a> {
    pub fn from_table(self, table: impl Into<String>) -> SchemaScope<'a> {
        if let Some(Expression::DeleteConstraint(c)) = self.ctx.expression_mut(self.expression) {
            c.table = table.into();
        }
        SchemaScope::new(self.ctx, self.expression)
    }
}
