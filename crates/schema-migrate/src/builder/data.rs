//! Data statements: `insert()`, `update()`, `delete_data()`.

use super::{data_row, MigrationContext};
use crate::core::value::Value;
use crate::model::{DeleteDataExpression, Expression, InsertDataExpression, UpdateDataExpression};

// =============================================================================
// Insert
// =============================================================================

pub struct InsertBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> InsertBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    pub fn into_table(self, table: impl Into<String>) -> InsertDataBuilder<'a> {
        let expression = self.ctx.push(Expression::InsertData(InsertDataExpression {
            schema: None,
            table: table.into(),
            rows: Vec::new(),
            identity_insert: false,
        }));
        InsertDataBuilder {
            ctx: self.ctx,
            expression,
        }
    }
}

pub struct InsertDataBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> InsertDataBuilder<'a> {
    fn update(self, apply: impl FnOnce(&mut InsertDataExpression)) -> Self {
        if let Some(Expression::InsertData(e)) = self.ctx.expression_mut(self.expression) {
            apply(e);
        }
        self
    }

    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.update(|e| e.schema = Some(schema))
    }

    /// One row of `(column, value)` pairs.
    pub fn row<I, K>(self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let row = data_row(row);
        self.update(|e| e.rows.push(row))
    }

    /// SQL Server: allow explicit values for identity columns.
    pub fn with_identity_insert(self) -> Self {
        self.update(|e| e.identity_insert = true)
    }
}

// =============================================================================
// Update
// =============================================================================

pub struct UpdateBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> UpdateBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    pub fn table(self, table: impl Into<String>) -> UpdateTableBuilder<'a> {
        let expression = self.ctx.push(Expression::UpdateData(UpdateDataExpression {
            schema: None,
            table: table.into(),
            set: Vec::new(),
            filter: Vec::new(),
            all_rows: false,
        }));
        UpdateTableBuilder {
            ctx: self.ctx,
            expression,
        }
    }
}

fn update_data(
    ctx: &mut MigrationContext,
    expression: usize,
    apply: impl FnOnce(&mut UpdateDataExpression),
) {
    if let Some(Expression::UpdateData(e)) = ctx.expression_mut(expression) {
        apply(e);
    }
}

pub struct UpdateTableBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> UpdateTableBuilder<'a> {
    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        update_data(self.ctx, self.expression, |e| e.schema = Some(schema));
        self
    }

    /// Columns to assign.
    pub fn set<I, K>(self, values: I) -> UpdateSetStage<'a>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let set = data_row(values);
        update_data(self.ctx, self.expression, |e| e.set = set);
        UpdateSetStage {
            ctx: self.ctx,
            expression: self.expression,
        }
    }
}

/// Chooses the rows an update touches.
pub struct UpdateSetStage<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> UpdateSetStage<'a> {
    /// Rows whose columns equal every given value (`IS NULL` for nulls).
    pub fn matching<I, K>(self, filter: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let filter = data_row(filter);
        update_data(self.ctx, self.expression, |e| e.filter = filter);
    }

    pub fn all_rows(self) {
        update_data(self.ctx, self.expression, |e| e.all_rows = true);
    }
}

// =============================================================================
// Delete data
// =============================================================================

pub struct DeleteDataBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> DeleteDataBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    pub fn from_table(self, table: impl Into<String>) -> DeleteDataTableBuilder<'a> {
        let expression = self.ctx.push(Expression::DeleteData(DeleteDataExpression {
            schema: None,
            table: table.into(),
            rows: Vec::new(),
            all_rows: false,
        }));
        DeleteDataTableBuilder {
            ctx: self.ctx,
            expression,
        }
    }
}

pub struct DeleteDataTableBuilder<'a> {
    ctx: &'a mut MigrationContext,
    expression: usize,
}

impl<'a> DeleteDataTableBuilder<'a> {
    fn update(self, apply: impl FnOnce(&mut DeleteDataExpression)) -> Self {
        if let Some(Expression::DeleteData(e)) = self.ctx.expression_mut(self.expression) {
            apply(e);
        }
        self
    }

    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.update(|e| e.schema = Some(schema))
    }

    /// Delete rows matching every `(column, value)` pair.
    pub fn row<I, K>(self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let row = data_row(row);
        self.update(|e| e.rows.push(row))
    }

    /// Delete rows where `column` is NULL.
    pub fn is_null(self, column: impl Into<String>) -> Self {
        let row = vec![(column.into(), Value::Null)];
        self.update(|e| e.rows.push(row))
    }

    pub fn all_rows(self) -> Self {
        self.update(|e| e.all_rows = true)
    }
}

#[cfg(test)]
mod tests {
    use super::super::MigrationContext;
    use crate::core::value::Value;
    use crate::model::Expression;

    #[test]
    fn test_insert_rows_keep_order() {
        let mut ctx = MigrationContext::new("SqlServer");
        ctx.insert()
            .into_table("Users")
            .with_identity_insert()
            .row([("Id", Value::from(1)), ("Name", "Ada".into())])
            .row([("Id", Value::from(2)), ("Name", "Linus".into())]);

        match &ctx.expressions()[0] {
            Expression::InsertData(e) => {
                assert!(e.identity_insert);
                assert_eq!(e.rows.len(), 2);
                assert_eq!(e.rows[1][1], ("Name".to_string(), Value::from("Linus")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_update_requires_rows_or_all_rows() {
        let mut ctx = MigrationContext::new("SqlServer");
        let _ = ctx.update().table("Users").set([("Active", Value::from(false))]);
        assert!(ctx.expressions()[0].validate().is_err());

        ctx.update()
            .table("Users")
            .set([("Active", Value::from(true))])
            .matching([("Id", Value::from(1))]);
        ctx.update()
            .table("Users")
            .set([("Active", Value::from(true))])
            .all_rows();
        assert!(ctx.expressions()[1].validate().is_ok());
        assert!(ctx.expressions()[2].validate().is_ok());
    }

    #[test]
    fn test_delete_data_is_null_row() {
        let mut ctx = MigrationContext::new("SqlServer");
        ctx.delete_data().from_table("Users").is_null("Email");

        match &ctx.expressions()[0] {
            Expression::DeleteData(e) => {
                assert_eq!(e.rows, vec![vec![("Email".to_string(), Value::Null)]]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
