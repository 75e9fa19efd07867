//! The VersionInfo ledger: which migrations have been applied.
//!
//! [`VersionTableMetaData`] names the table and its columns;
//! [`VersionInfoStore`] reads and mutates it through a processor.

mod store;

pub use store::{AppliedVersion, VersionInfoStore};

use serde::{Deserialize, Serialize};

use crate::core::value::Value;
use crate::model::{
    ColumnDefinition, CreateSchemaExpression, CreateTableExpression, DbType, DeleteDataExpression,
    DeleteTableExpression, Direction, Expression, IndexColumn, IndexDefinition,
    InsertDataExpression,
};

/// Identity of the VersionInfo table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionTableMetaData {
    /// Schema holding the table; the dialect default when unset.
    pub schema_name: Option<String>,
    pub table_name: String,
    pub version_column: String,
    pub applied_on_column: String,
    pub description_column: String,
    pub unique_index_name: String,
}

impl Default for VersionTableMetaData {
    fn default() -> Self {
        Self {
            schema_name: None,
            table_name: "VersionInfo".to_string(),
            version_column: "Version".to_string(),
            applied_on_column: "AppliedOn".to_string(),
            description_column: "Description".to_string(),
            unique_index_name: "UC_Version".to_string(),
        }
    }
}

impl VersionTableMetaData {
    fn schema(&self) -> Option<String> {
        self.schema_name.clone()
    }

    /// Expressions creating the table and its unique index.
    ///
    /// The schema is created first when `create_schema` is set.
    pub fn create_expressions(&self, create_schema: bool) -> Vec<Expression> {
        let mut expressions = Vec::new();
        if let (true, Some(schema)) = (create_schema, &self.schema_name) {
            expressions.push(Expression::CreateSchema(CreateSchemaExpression {
                name: schema.clone(),
            }));
        }

        let mut version = ColumnDefinition::new(&self.version_column).with_type(DbType::Int64);
        version.nullable = Some(false);
        let mut applied_on =
            ColumnDefinition::new(&self.applied_on_column).with_type(DbType::DateTime);
        applied_on.nullable = Some(true);
        let mut description =
            ColumnDefinition::new(&self.description_column).with_type(DbType::String);
        description.size = Some(1024);
        description.nullable = Some(true);
        let columns = vec![version, applied_on, description]
            .into_iter()
            .map(|mut c| {
                c.table_name = self.table_name.clone();
                c
            })
            .collect();

        expressions.push(Expression::CreateTable(CreateTableExpression {
            schema: self.schema(),
            table: self.table_name.clone(),
            description: None,
            columns,
        }));
        expressions.push(Expression::CreateIndex(IndexDefinition {
            name: Some(self.unique_index_name.clone()),
            schema: self.schema(),
            table: self.table_name.clone(),
            columns: vec![IndexColumn::new(&self.version_column, Direction::Ascending)],
            unique: true,
            extensions: Default::default(),
        }));
        expressions
    }

    pub fn delete_table_expression(&self) -> Expression {
        Expression::DeleteTable(DeleteTableExpression {
            schema: self.schema(),
            table: self.table_name.clone(),
        })
    }

    pub fn insert_expression(&self, entry: &AppliedVersion) -> Expression {
        let applied_on = entry.applied_on.map(Value::DateTime).unwrap_or(Value::Null);
        let description = entry
            .description
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null);
        Expression::InsertData(InsertDataExpression {
            schema: self.schema(),
            table: self.table_name.clone(),
            rows: vec![vec![
                (self.version_column.clone(), Value::I64(entry.version)),
                (self.applied_on_column.clone(), applied_on),
                (self.description_column.clone(), description),
            ]],
            identity_insert: false,
        })
    }

    pub fn delete_expression(&self, version: i64) -> Expression {
        Expression::DeleteData(DeleteDataExpression {
            schema: self.schema(),
            table: self.table_name.clone(),
            rows: vec![vec![(self.version_column.clone(), Value::I64(version))]],
            all_rows: false,
        })
    }
}
