//! `create()` statements: tables, columns, indexes, keys, schemas, sequences.

use super::column::{ColumnSlot, ColumnTypeStage, ForColumn, ForTable};
use super::MigrationContext;
use crate::model::{
    ColumnDefinition, ConstraintDefinition, ConstraintKind, CreateColumnExpression,
    CreateSchemaExpression, CreateTableExpression, Direction, Expression, ForeignKeyDefinition,
    ForeignKeyRule, IndexColumn, IndexDefinition, SequenceDefinition,
};

pub struct CreateBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> CreateBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    pub fn table(self, name: impl Into<String>) -> CreateTableBuilder<'a> {
        let expression = self.ctx.push(Expression::CreateTable(CreateTableExpression {
            schema: None,
            table: name.into(),
            description: None,
            columns: Vec::new(),
        }));
        CreateTableBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    /// Add one column to an existing table.
    pub fn column(self, name: impl Into<String>) -> CreateColumnBuilder<'a> {
        let expression = self.ctx.push(Expression::CreateColumn(CreateColumnExpression {
            schema: None,
            table: String::new(),
            column: ColumnDefinition::new(name),
        }));
        CreateColumnBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn schema(self, name: impl Into<String>) {
        self.ctx
            .push(Expression::CreateSchema(CreateSchemaExpression { name: name.into() }));
    }

    pub fn index(self) -> IndexTableStage<'a> {
        let expression = self.ctx.push(Expression::CreateIndex(IndexDefinition::default()));
        IndexTableStage {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn foreign_key(self) -> ForeignKeyBuilder<'a> {
        let expression = self
            .ctx
            .push(Expression::CreateForeignKey(ForeignKeyDefinition::default()));
        ForeignKeyBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn primary_key(self) -> ConstraintBuilder<'a> {
        self.constraint(ConstraintKind::PrimaryKey)
    }

    pub fn unique_constraint(self) -> ConstraintBuilder<'a> {
        self.constraint(ConstraintKind::Unique)
    }

    fn constraint(self, kind: ConstraintKind) -> ConstraintBuilder<'a> {
        let expression = self
            .ctx
            .push(Expression::CreateConstraint(ConstraintDefinition::new(kind, "")));
        ConstraintBuilder {
            ctx: self.ctx,
            expression,
        }
    }

    pub fn sequence(self, name: impl Into<String>) -> SequenceBuilder<'a> {
        let expression = self.ctx.push(Expression::CreateSequence(SequenceDefinition {
            name: name.into(),
            ..Default::default()
        }));
        SequenceBuilder {
            ctx: self.ctx,
            expression,
        }
    }
}

// =============================================================================
// Tables and columns
// =============================================================================

pub struct CreateTableBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> CreateTableBuilder<'a> {
    fn update(self, apply: impl FnOnce(&mut CreateTableExpression)) -> Self {
        if let Some(Expression::CreateTable(e)) = self.ctx.expression_mut(self.expression) {
            apply(e);
        }
        self
    }

    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.update(|e| e.schema = Some(schema))
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.update(|e| e.description = Some(description))
    }

    pub fn with_column(self, name: impl Into<String>) -> ColumnTypeStage<'a, ForTable> {
        let name = name.into();
        let mut column_index = 0;
        if let Some(Expression::CreateTable(e)) = self.ctx.expression_mut(self.expression) {
            let mut column = ColumnDefinition::new(name);
            column.table_name = e.table.clone();
            e.columns.push(column);
            column_index = e.columns.len() - 1;
        }
        ColumnTypeStage::new(
            self.ctx,
            ColumnSlot::TableColumn {
                expression: self.expression,
                column: column_index,
            },
        )
    }
}

pub struct CreateColumnBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> CreateColumnBuilder<'a> {
    pub fn on_table(self, table: impl Into<String>) -> ColumnTypeStage<'a, ForColumn> {
        let table = table.into();
        if let Some(Expression::CreateColumn(e)) = self.ctx.expression_mut(self.expression) {
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

// =============================================================================
// Indexes
// =============================================================================

pub struct IndexTableStage<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> IndexTableStage<'a> {
    pub fn named(self, name: impl Into<String>) -> Self {
        if let Some(Expression::CreateIndex(index)) = self.ctx.expression_mut(self.expression) {
            index.name = Some(name.into());
        }
        self
    }

    pub fn on_table(self, table: impl Into<String>) -> IndexBuilder<'a> {
        if let Some(Expression::CreateIndex(index)) = self.ctx.expression_mut(self.expression) {
            index.table = table.into();
        }
        IndexBuilder {
            ctx: self.ctx,
            expression: self.expression,
        }
    }
}

pub struct IndexBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> IndexBuilder<'a> {
    fn update(self, apply: impl FnOnce(&mut IndexDefinition)) -> Self {
        if let Some(Expression::CreateIndex(index)) = self.ctx.expression_mut(self.expression) {
            apply(index);
        }
        self
    }

    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.update(|i| i.schema = Some(schema))
    }

    pub fn on_column(self, column: impl Into<String>) -> Self {
        let column = IndexColumn::new(column, Direction::Ascending);
        self.update(|i| i.columns.push(column))
    }

    pub fn on_column_descending(self, column: impl Into<String>) -> Self {
        let column = IndexColumn::new(column, Direction::Descending);
        self.update(|i| i.columns.push(column))
    }

    pub fn unique(self) -> Self {
        self.update(|i| i.unique = true)
    }

    /// SQL Server: `CLUSTERED` / `NONCLUSTERED`.
    pub fn clustered(self, clustered: bool) -> Self {
        self.update(|i| i.extensions.clustered = Some(clustered))
    }

    /// Covering column (`INCLUDE`).
    pub fn include(self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.update(|i| i.extensions.include.push(column))
    }

    /// Filter predicate spliced after `WHERE`.
    pub fn filter(self, predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        self.update(|i| i.extensions.filter = Some(predicate))
    }

    /// PostgreSQL access method, e.g. `gin`.
    pub fn using(self, method: impl Into<String>) -> Self {
        let method = method.into();
        self.update(|i| i.extensions.method = Some(method))
    }
}

// =============================================================================
// Foreign keys
// =============================================================================

pub struct ForeignKeyBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

fn update_fk(
    ctx: &mut MigrationContext,
    expression: usize,
    apply: impl FnOnce(&mut ForeignKeyDefinition),
) {
    if let Some(Expression::CreateForeignKey(fk)) = ctx.expression_mut(expression) {
        apply(fk);
    }
}

impl<'a> ForeignKeyBuilder<'a> {
    pub fn named(self, name: impl Into<String>) -> Self {
        let name = name.into();
        update_fk(self.ctx, self.expression, |fk| fk.name = Some(name));
        self
    }

    /// Table holding the referencing columns.
    pub fn from_table(self, table: impl Into<String>) -> ForeignKeyFromStage<'a> {
        let table = table.into();
        update_fk(self.ctx, self.expression, |fk| fk.foreign_table = table);
        ForeignKeyFromStage {
            ctx: self.ctx,
            expression: self.expression,
        }
    }
}

pub struct ForeignKeyFromStage<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> ForeignKeyFromStage<'a> {
    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        update_fk(self.ctx, self.expression, |fk| fk.foreign_schema = Some(schema));
        self
    }

    pub fn foreign_column(self, column: impl Into<String>) -> Self {
        let column = column.into();
        update_fk(self.ctx, self.expression, |fk| fk.foreign_columns.push(column));
        self
    }

    pub fn foreign_columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        update_fk(self.ctx, self.expression, |fk| fk.foreign_columns.extend(columns));
        self
    }

    /// Referenced table.
    pub fn to_table(self, table: impl Into<String>) -> ForeignKeyToStage<'a> {
        let table = table.into();
        update_fk(self.ctx, self.expression, |fk| fk.primary_table = table);
        ForeignKeyToStage {
            ctx: self.ctx,
            expression: self.expression,
        }
    }
}

pub struct ForeignKeyToStage<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> ForeignKeyToStage<'a> {
    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        update_fk(self.ctx, self.expression, |fk| fk.primary_schema = Some(schema));
        self
    }

    pub fn primary_column(self, column: impl Into<String>) -> ForeignKeyRulesStage<'a> {
        let column = column.into();
        update_fk(self.ctx, self.expression, |fk| fk.primary_columns.push(column));
        ForeignKeyRulesStage {
            ctx: self.ctx,
            expression: self.expression,
        }
    }

    pub fn primary_columns<I, S>(self, columns: I) -> ForeignKeyRulesStage<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        update_fk(self.ctx, self.expression, |fk| fk.primary_columns.extend(columns));
        ForeignKeyRulesStage {
            ctx: self.ctx,
            expression: self.expression,
        }
    }
}

pub struct ForeignKeyRulesStage<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> ForeignKeyRulesStage<'a> {
    pub fn on_delete(self, rule: ForeignKeyRule) -> Self {
        update_fk(self.ctx, self.expression, |fk| fk.on_delete = rule);
        self
    }

    pub fn on_update(self, rule: ForeignKeyRule) -> Self {
        update_fk(self.ctx, self.expression, |fk| fk.on_update = rule);
        self
    }

    pub fn on_delete_or_update(self, rule: ForeignKeyRule) -> Self {
        self.on_delete(rule).on_update(rule)
    }
}

// =============================================================================
// Primary key and unique constraints
// =============================================================================

pub struct ConstraintBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

fn update_constraint(
    ctx: &mut MigrationContext,
    expression: usize,
    apply: impl FnOnce(&mut ConstraintDefinition),
) {
    if let Some(Expression::CreateConstraint(c)) = ctx.expression_mut(expression) {
        apply(c);
    }
}

impl<'a> ConstraintBuilder<'a> {
    pub fn named(self, name: impl Into<String>) -> Self {
        let name = name.into();
        update_constraint(self.ctx, self.expression, |c| c.name = Some(name));
        self
    }

    pub fn on_table(self, table: impl Into<String>) -> ConstraintColumnsStage<'a> {
        let table = table.into();
        update_constraint(self.ctx, self.expression, |c| c.table = table);
        ConstraintColumnsStage {
            ctx: self.ctx,
            expression: self.expression,
        }
    }
}

pub struct ConstraintColumnsStage<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> ConstraintColumnsStage<'a> {
    pub fn with_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        update_constraint(self.ctx, self.expression, |c| c.schema = Some(schema));
        self
    }

    pub fn column(self, column: impl Into<String>) -> Self {
        let column = column.into();
        update_constraint(self.ctx, self.expression, |c| c.columns.push(column));
        self
    }

    pub fn columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        update_constraint(self.ctx, self.expression, |c| c.columns.extend(columns));
        self
    }

    /// SQL Server: `CLUSTERED` / `NONCLUSTERED`.
    pub fn clustered(self, clustered: bool) -> Self {
        update_constraint(self.ctx, self.expression, |c| {
            c.extensions.clustered = Some(clustered)
        });
        self
    }
}

// =============================================================================
// Sequences
// =============================================================================

pub struct SequenceBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> SequenceBuilder<'a> {
    fn update(self, apply: impl FnOnce(&mut SequenceDefinition)) -> Self {
        if let Some(Expression::CreateSequence(s)) = self.ctx.expression_mut(self.expression) {
            apply(s);
        }
        self
    }

    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.update(|s| s.schema = Some(schema))
    }

    pub fn increment_by(self, increment: i64) -> Self {
        self.update(|s| s.increment = Some(increment))
    }

    pub fn min_value(self, value: i64) -> Self {
        self.update(|s| s.min_value = Some(value))
    }

    pub fn max_value(self, value: i64) -> Self {
        self.update(|s| s.max_value = Some(value))
    }

    pub fn start_with(self, value: i64) -> Self {
        self.update(|s| s.start_with = Some(value))
    }

    pub fn cache(self, size: i64) -> Self {
        self.update(|s| s.cache = Some(size))
    }

    pub fn cycle(self) -> Self {
        self.update(|s| s.cycle = true)
    }
}
