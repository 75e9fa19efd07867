//! Abstract schema-change model.
//!
//! - [`expression`]: the [`Expression`] tagged union and its payloads
//! - [`column`]: column definitions, portable types, system-method defaults
//! - [`definitions`]: indexes, constraints, foreign keys, sequences
//! - [`conventions`]: deterministic names for unnamed objects

pub mod column;
pub mod conventions;
pub mod definitions;
pub mod expression;

pub use column::{
    ColumnDefinition, ColumnExtensions, ColumnType, DbType, DefaultValue, Identity,
    PostgresColumnOptions, SqlServerColumnOptions, SystemMethod,
};
pub use definitions::{
    ConstraintDefinition, ConstraintExtensions, ConstraintKind, Direction, ForeignKeyDefinition,
    ForeignKeyRule, IndexColumn, IndexDefinition, IndexExtensions, SequenceDefinition,
};
pub use expression::{
    AlterColumnExpression, AlterSchemaExpression, AlterTableExpression, CreateColumnExpression,
    CreateSchemaExpression, CreateTableExpression, DataRow, DeleteColumnExpression,
    DeleteDataExpression, DeleteSchemaExpression, DeleteSequenceExpression,
    DeleteTableExpression, Expression, InsertDataExpression, RawCallback, RawOperation,
    RenameColumnExpression, RenameTableExpression, UpdateDataExpression,
};
