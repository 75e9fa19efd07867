//! Typestate column builders shared by table and column statements.
//!
//! A column is first in [`ColumnTypeStage`], where only type calls are
//! available, then in [`ColumnOptionStage`]. The marker parameter decides
//! what may follow the options: another column of the same table
//! ([`ForTable`]), another add/alter on an altered table ([`ForAlterTable`]),
//! or nothing ([`ForColumn`]).

use std::marker::PhantomData;

use super::alter::AlterTableBuilder;
use super::MigrationContext;
use crate::core::value::Value;
use crate::model::{
    ColumnDefinition, ColumnType, DbType, DefaultValue, Direction, Expression,
    ForeignKeyDefinition, ForeignKeyRule, Identity, IndexColumn, IndexDefinition, SystemMethod,
};

/// Column of a `create().table(..)` statement.
pub struct ForTable;

/// Column added or altered through `alter().table(..)`.
pub struct ForAlterTable;

/// Standalone `create().column(..)` / `alter().column(..)`.
pub struct ForColumn;

/// Where the column being built lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnSlot {
    TableColumn { expression: usize, column: usize },
    Single { expression: usize },
}

impl ColumnSlot {
    pub(crate) fn expression(&self) -> usize {
        match self {
            ColumnSlot::TableColumn { expression, .. } | ColumnSlot::Single { expression } => {
                *expression
            }
        }
    }
}

/// A column awaiting its type.
pub struct ColumnTypeStage<'a, P> {
    ctx: &'a mut MigrationContext,
    slot: ColumnSlot,
    _marker: PhantomData<P>,
}

/// A typed column accepting options.
pub struct ColumnOptionStage<'a, P> {
    ctx: &'a mut MigrationContext,
    slot: ColumnSlot,
    foreign_key: Option<usize>,
    _marker: PhantomData<P>,
}

impl<'a, P> ColumnTypeStage<'a, P> {
    pub(crate) fn new(ctx: &'a mut MigrationContext, slot: ColumnSlot) -> Self {
        Self {
            ctx,
            slot,
            _marker: PhantomData,
        }
    }

    fn typed(
        self,
        column_type: ColumnType,
        size: Option<u32>,
        precision: Option<u8>,
        scale: Option<u8>,
    ) -> ColumnOptionStage<'a, P> {
        if let Some(column) = self.ctx.column_mut(self.slot) {
            column.column_type = Some(column_type);
            column.size = size;
            column.precision = precision;
            column.scale = scale;
        }
        ColumnOptionStage {
            ctx: self.ctx,
            slot: self.slot,
            foreign_key: None,
            _marker: PhantomData,
        }
    }

    fn db(self, db_type: DbType, size: Option<u32>) -> ColumnOptionStage<'a, P> {
        self.typed(ColumnType::Db(db_type), size, None, None)
    }

    /// Any portable type, with the dialect's default size.
    pub fn as_type(self, db_type: DbType) -> ColumnOptionStage<'a, P> {
        self.db(db_type, None)
    }

    /// Native type text passed through verbatim.
    pub fn as_custom(self, native_type: impl Into<String>) -> ColumnOptionStage<'a, P> {
        self.typed(ColumnType::Custom(native_type.into()), None, None, None)
    }

    pub fn as_ansi_string(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::AnsiString, None)
    }

    pub fn as_ansi_string_sized(self, size: u32) -> ColumnOptionStage<'a, P> {
        self.db(DbType::AnsiString, Some(size))
    }

    pub fn as_fixed_length_ansi_string(self, size: u32) -> ColumnOptionStage<'a, P> {
        self.db(DbType::AnsiStringFixedLength, Some(size))
    }

    pub fn as_string(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::String, None)
    }

    pub fn as_string_sized(self, size: u32) -> ColumnOptionStage<'a, P> {
        self.db(DbType::String, Some(size))
    }

    pub fn as_fixed_length_string(self, size: u32) -> ColumnOptionStage<'a, P> {
        self.db(DbType::StringFixedLength, Some(size))
    }

    pub fn as_binary(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Binary, None)
    }

    pub fn as_binary_sized(self, size: u32) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Binary, Some(size))
    }

    pub fn as_boolean(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Boolean, None)
    }

    pub fn as_byte(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Byte, None)
    }

    pub fn as_currency(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Currency, None)
    }

    pub fn as_date(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Date, None)
    }

    pub fn as_date_time(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::DateTime, None)
    }

    pub fn as_date_time2(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::DateTime2, None)
    }

    pub fn as_date_time_offset(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::DateTimeOffset, None)
    }

    pub fn as_decimal(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Decimal, None)
    }

    pub fn as_decimal_with(self, precision: u8, scale: u8) -> ColumnOptionStage<'a, P> {
        self.typed(
            ColumnType::Db(DbType::Decimal),
            None,
            Some(precision),
            Some(scale),
        )
    }

    pub fn as_double(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Double, None)
    }

    pub fn as_float(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Single, None)
    }

    pub fn as_guid(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Guid, None)
    }

    pub fn as_int16(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Int16, None)
    }

    pub fn as_int32(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Int32, None)
    }

    pub fn as_int64(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Int64, None)
    }

    pub fn as_time(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Time, None)
    }

    pub fn as_xml(self) -> ColumnOptionStage<'a, P> {
        self.db(DbType::Xml, None)
    }
}

impl<'a> ColumnTypeStage<'a, ForColumn> {
    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        let schema = Some(schema.into());
        match self.ctx.expression_mut(self.slot.expression()) {
            Some(Expression::CreateColumn(e)) => e.schema = schema,
            Some(Expression::AlterColumn(e)) => e.schema = schema,
            _ => {}
        }
        self
    }
}

impl<'a, P> ColumnOptionStage<'a, P> {
    fn update(self, apply: impl FnOnce(&mut ColumnDefinition)) -> Self {
        if let Some(column) = self.ctx.column_mut(self.slot) {
            apply(column);
        }
        self
    }

    fn column_name(&mut self) -> String {
        self.ctx
            .column_mut(self.slot)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    pub fn nullable(self) -> Self {
        self.update(|c| c.nullable = Some(true))
    }

    pub fn not_nullable(self) -> Self {
        self.update(|c| c.nullable = Some(false))
    }

    /// Literal default rendered with the dialect's quoting rules.
    pub fn with_default_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.update(|c| c.default = Some(DefaultValue::Value(value)))
    }

    /// Database function default, e.g. [`SystemMethod::NewGuid`].
    pub fn with_default(self, method: SystemMethod) -> Self {
        self.update(|c| c.default = Some(DefaultValue::System(method)))
    }

    /// Unescaped SQL default.
    pub fn with_default_sql(self, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        self.update(|c| c.default = Some(DefaultValue::RawSql(sql)))
    }

    pub fn identity(self) -> Self {
        self.update(|c| c.identity = Some(Identity::default()))
    }

    pub fn identity_seeded(self, seed: i64, increment: i64) -> Self {
        self.update(|c| c.identity = Some(Identity { seed, increment }))
    }

    /// PostgreSQL: `GENERATED ALWAYS AS IDENTITY`.
    pub fn identity_always(self) -> Self {
        self.update(|c| {
            c.identity.get_or_insert_with(Identity::default);
            c.extensions.postgres.identity_always = true;
        })
    }

    pub fn primary_key(self) -> Self {
        self.update(|c| c.primary_key = true)
    }

    pub fn primary_key_named(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.update(|c| {
            c.primary_key = true;
            c.primary_key_name = Some(name);
        })
    }

    /// SQL Server: `PRIMARY KEY CLUSTERED` or `NONCLUSTERED`.
    pub fn clustered(self, clustered: bool) -> Self {
        self.update(|c| c.extensions.sql_server.primary_key_clustered = Some(clustered))
    }

    pub fn unique(self) -> Self {
        self.update(|c| c.unique = true)
    }

    pub fn with_collation(self, collation: impl Into<String>) -> Self {
        let collation = collation.into();
        self.update(|c| c.collation = Some(collation))
    }

    pub fn with_column_description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.update(|c| c.description = Some(description))
    }

    /// Index this column with a conventionally named index.
    pub fn indexed(self) -> Self {
        self.push_index(None)
    }

    pub fn indexed_named(self, name: impl Into<String>) -> Self {
        self.push_index(Some(name.into()))
    }

    fn push_index(mut self, name: Option<String>) -> Self {
        let column = self.column_name();
        if let Some((schema, table)) = self.ctx.column_host(self.slot) {
            self.ctx.push(Expression::CreateIndex(IndexDefinition {
                name,
                schema,
                table,
                columns: vec![IndexColumn::new(column, Direction::Ascending)],
                ..Default::default()
            }));
        }
        self
    }

    /// Foreign key from this column to `primary_table(primary_column)`.
    pub fn references(
        self,
        primary_table: impl Into<String>,
        primary_column: impl Into<String>,
    ) -> Self {
        self.push_foreign_key(None, primary_table.into(), primary_column.into())
    }

    pub fn references_named(
        self,
        name: impl Into<String>,
        primary_table: impl Into<String>,
        primary_column: impl Into<String>,
    ) -> Self {
        self.push_foreign_key(Some(name.into()), primary_table.into(), primary_column.into())
    }

    fn push_foreign_key(
        mut self,
        name: Option<String>,
        primary_table: String,
        primary_column: String,
    ) -> Self {
        let column = self.column_name();
        if let Some((schema, table)) = self.ctx.column_host(self.slot) {
            let index = self.ctx.push(Expression::CreateForeignKey(ForeignKeyDefinition {
                name,
                primary_schema: schema.clone(),
                foreign_schema: schema,
                foreign_table: table,
                foreign_columns: vec![column],
                primary_table,
                primary_columns: vec![primary_column],
                ..Default::default()
            }));
            self.foreign_key = Some(index);
        }
        self
    }

    fn update_foreign_key(self, apply: impl FnOnce(&mut ForeignKeyDefinition)) -> Self {
        if let Some(index) = self.foreign_key {
            if let Some(Expression::CreateForeignKey(fk)) = self.ctx.expression_mut(index) {
                apply(fk);
            }
        }
        self
    }

    /// `ON DELETE` rule of the foreign key declared by the last `references`.
    pub fn on_delete(self, rule: ForeignKeyRule) -> Self {
        self.update_foreign_key(|fk| fk.on_delete = rule)
    }

    /// `ON UPDATE` rule of the foreign key declared by the last `references`.
    pub fn on_update(self, rule: ForeignKeyRule) -> Self {
        self.update_foreign_key(|fk| fk.on_update = rule)
    }
}

impl<'a> ColumnOptionStage<'a, ForTable> {
    /// Next column of the same table.
    pub fn with_column(self, name: impl Into<String>) -> ColumnTypeStage<'a, ForTable> {
        let expression = self.slot.expression();
        let name = name.into();
        let mut column_index = 0;
        if let Some(Expression::CreateTable(e)) = self.ctx.expression_mut(expression) {
            let mut column = ColumnDefinition::new(name);
            column.table_name = e.table.clone();
            e.columns.push(column);
            column_index = e.columns.len() - 1;
        }
        ColumnTypeStage::new(
            self.ctx,
            ColumnSlot::TableColumn {
                expression,
                column: column_index,
            },
        )
    }
}

impl<'a> ColumnOptionStage<'a, ForAlterTable> {
    fn table(self) -> AlterTableBuilder<'a> {
        let (schema, table) = self.ctx.column_host(self.slot).unwrap_or_default();
        AlterTableBuilder::new(self.ctx, schema, table)
    }

    pub fn add_column(self, name: impl Into<String>) -> ColumnTypeStage<'a, ForAlterTable> {
        self.table().add_column(name)
    }

    pub fn alter_column(self, name: impl Into<String>) -> ColumnTypeStage<'a, ForAlterTable> {
        self.table().alter_column(name)
    }
}

#[cfg(test)]
mod tests {
    use super::super::MigrationContext;
    use crate::model::{ColumnType, DbType, DefaultValue, Expression, ForeignKeyRule, SystemMethod};

    // =========================================================================
    // Column option tests
    // =========================================================================

    #[test]
    fn test_table_columns_in_declaration_order() {
        let mut ctx = MigrationContext::new("SqlServer");
        ctx.create()
            .table("Users")
            .with_column("Id")
            .as_int64()
            .primary_key()
            .identity()
            .with_column("Name")
            .as_string_sized(100)
            .nullable()
            .with_column("CreatedAt")
            .as_date_time()
            .with_default(SystemMethod::CurrentUtcDateTime);

        let Expression::CreateTable(table) = &ctx.expressions()[0] else {
            panic!("expected CreateTable");
        };
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Id", "Name", "CreatedAt"]);
        assert!(table.columns[0].primary_key);
        assert!(table.columns[0].identity.is_some());
        assert_eq!(table.columns[1].size, Some(100));
        assert_eq!(table.columns[1].nullable, Some(true));
        assert_eq!(
            table.columns[2].default,
            Some(DefaultValue::System(SystemMethod::CurrentUtcDateTime))
        );
        assert!(table.columns.iter().all(|c| c.table_name == "Users"));
    }

    #[test]
    fn test_indexed_and_references_append_after_table() {
        let mut ctx = MigrationContext::new("SqlServer");
        ctx.create()
            .table("Orders")
            .with_column("Id")
            .as_int32()
            .primary_key()
            .with_column("CustomerId")
            .as_int32()
            .indexed()
            .references("Customers", "Id")
            .on_delete(ForeignKeyRule::Cascade);

        let kinds: Vec<&str> = ctx.expressions().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["CreateTable", "CreateIndex", "CreateForeignKey"]);

        let Expression::CreateForeignKey(fk) = &ctx.expressions()[2] else {
            panic!("expected CreateForeignKey");
        };
        assert_eq!(fk.effective_name(), "FK_Orders_CustomerId_Customers_Id");
        assert_eq!(fk.on_delete, ForeignKeyRule::Cascade);

        let Expression::CreateIndex(index) = &ctx.expressions()[1] else {
            panic!("expected CreateIndex");
        };
        assert_eq!(index.effective_name(), "IX_Orders_CustomerId");
    }

    #[test]
    fn test_custom_type_and_decimal() {
        let mut ctx = MigrationContext::new("Postgres");
        ctx.create()
            .column("Tags")
            .on_table("Posts")
            .in_schema("blog")
            .as_custom("text[]");
        ctx.alter()
            .column("Price")
            .on_table("Products")
            .as_decimal_with(10, 2)
            .not_nullable();

        match &ctx.expressions()[0] {
            Expression::CreateColumn(e) => {
                assert_eq!(e.schema.as_deref(), Some("blog"));
                assert_eq!(e.table, "Posts");
                assert_eq!(e.column.column_type, Some(ColumnType::Custom("text[]".into())));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &ctx.expressions()[1] {
            Expression::AlterColumn(e) => {
                assert_eq!(e.column.db_type(), Some(DbType::Decimal));
                assert_eq!((e.column.precision, e.column.scale), (Some(10), Some(2)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_alter_table_chains_add_and_alter() {
        let mut ctx = MigrationContext::new("SqlServer");
        ctx.alter()
            .table("Users")
            .in_schema("app")
            .add_column("Age")
            .as_int16()
            .nullable()
            .alter_column("Name")
            .as_string_sized(200)
            .not_nullable();

        let kinds: Vec<&str> = ctx.expressions().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["CreateColumn", "AlterColumn"]);
        match &ctx.expressions()[1] {
            Expression::AlterColumn(e) => {
                assert_eq!(e.schema.as_deref(), Some("app"));
                assert_eq!(e.table, "Users");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
