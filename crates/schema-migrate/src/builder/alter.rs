//! `alter()` statements: table descriptions, schema moves, added and altered columns.

use super::column::{ColumnSlot, ColumnTypeStage, ForAlterTable, ForColumn};
use super::MigrationContext;
use crate::model::{
    AlterColumnExpression, AlterSchemaExpression, AlterTableExpression, ColumnDefinition,
    CreateColumnExpression, Expression,
};

pub struct AlterBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> AlterBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    /// Handle on an existing table; records nothing until an operation is chosen.
    pub fn table(self, name: impl Into<String>) -> AlterTableBuilder<'a> {
        AlterTableBuilder::new(self.ctx, None, name.into())
    }

    /// Redefine one column. The full definition is replaced.
    pub fn column(self, name: impl Into<String>) -> AlterColumnBuilder<'a> {
        let expression = self.ctx.push(Expression::AlterColumn(AlterColumnExpression {
            schema: None,
            table: String::new(),
            column: ColumnDefinition::new(name),
        }));
        AlterColumnBuilder {
            ctx: self.ctx,
            expression,
        }
    }
}

pub struct AlterTableBuilder<'a> {
    ctx: &'a mut MigrationContext,
    schema: Option<String>,
    table: String,
}

impl<'a> AlterTableBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext, schema: Option<String>, table: String) -> Self {
        Self { ctx, schema, table }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the table description (comment or extended property).
    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.ctx.push(Expression::AlterTable(AlterTableExpression {
            schema: self.schema.clone(),
            table: self.table.clone(),
            description: Some(description.into()),
        }));
        self
    }

    /// Move the table into `destination` schema.
    pub fn to_schema(self, destination: impl Into<String>) {
        self.ctx.push(Expression::AlterSchema(AlterSchemaExpression {
            source_schema: self.schema,
            table: self.table,
            destination_schema: destination.into(),
        }));
    }

    pub fn add_column(self, name: impl Into<String>) -> ColumnTypeStage<'a, ForAlterTable> {
        let mut column = ColumnDefinition::new(name);
        column.table_name = self.table.clone();
        let expression = self.ctx.push(Expression::CreateColumn(CreateColumnExpression {
            schema: self.schema,
            table: self.table,
            column,
        }));
        ColumnTypeStage::new(self.ctx, ColumnSlot::Single { expression })
    }

    pub fn alter_column(self, name: impl Into<String>) -> ColumnTypeStage<'a, ForAlterTable> {
        let mut column = ColumnDefinition::new(name);
        column.table_name = self.table.clone();
        let expression = self.ctx.push(Expression::AlterColumn(AlterColumnExpression {
            schema: self.schema,
            table: self.table,
            column,
        }));
        ColumnTypeStage::new(self.ctx, ColumnSlot::Single { expression })
    }
}

pub struct AlterColumnBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> AlterColumnBuilder<'a> {
    pub fn on_table(self, table: impl Into<String>) -> ColumnTypeStage<'a, ForColumn> {
        let table = table.into();
        if let Some(Expression::AlterColumn(e)) = self.ctx.expression_mut(self.expression) {
            e.column.table_name = table.clone();
            e.table = table;
        }
        ColumnTypeStage::new(
            self.ctx,
            ColumnSlot::Single {
                expression: self.expression,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::MigrationContext;
    use crate::model::Expression;

    #[test]
    fn test_table_handle_records_nothing_alone() {
        let mut ctx = MigrationContext::new("SqlServer");
        let _ = ctx.alter().table("Users").in_schema("app");
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_description_and_schema_move() {
        let mut ctx = MigrationContext::new("SqlServer");
        ctx.alter().table("Users").with_description("Registered users");
        ctx.alter().table("Users").in_schema("dbo").to_schema("archive");

        match &ctx.expressions()[0] {
            Expression::AlterTable(e) => {
                assert_eq!(e.description.as_deref(), Some("Registered users"))
            }
            other => panic!("unexpected {:?}", other),
        }
        match &ctx.expressions()[1] {
            Expression::AlterSchema(e) => {
                assert_eq!(e.source_schema.as_deref(), Some("dbo"));
                assert_eq!(e.destination_schema, "archive");
                assert!(ctx.expressions()[1].reverse().is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
