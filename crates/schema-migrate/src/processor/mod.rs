//! The execution boundary: a [`Processor`] runs generated SQL against one
//! database session and answers existence queries.
//!
//! Driver adapters live under [`crate::drivers`]; the
//! [`ConnectionlessProcessor`] answers everything offline for previews.

mod connectionless;

pub use connectionless::ConnectionlessProcessor;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::value::Value;
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use crate::model::{Expression, RawOperation};

/// Options shared by every processor.
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Per-statement timeout passed through to the driver.
    pub command_timeout: Option<Duration>,
}

impl ProcessorOptions {
    pub fn with_command_timeout_secs(secs: Option<u64>) -> Self {
        Self {
            command_timeout: secs.map(Duration::from_secs),
        }
    }
}

/// Executes SQL for one dialect over a single logical connection.
///
/// Transaction scope is pinned to that connection: `begin_transaction`,
/// `commit` and `rollback` bracket everything executed in between.
#[async_trait]
pub trait Processor: Send + Sync {
    /// SQL dialect this processor speaks.
    fn dialect(&self) -> &dyn Dialect;

    /// Execute a statement or script.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Run a query and return its rows.
    async fn read(&self, sql: &str) -> Result<Vec<Vec<Value>>>;

    /// True when the query returns at least one row.
    async fn exists(&self, sql: &str) -> Result<bool> {
        Ok(!self.read(sql).await?.is_empty())
    }

    async fn begin_transaction(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// Release the connection.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    // =========================================================================
    // Existence predicates
    // =========================================================================

    async fn schema_exists(&self, schema: &str) -> Result<bool> {
        let sql = self.dialect().schema_exists_sql(schema);
        self.exists(&sql).await
    }

    async fn table_exists(&self, schema: Option<&str>, table: &str) -> Result<bool> {
        let sql = self.dialect().table_exists_sql(schema, table);
        self.exists(&sql).await
    }

    async fn column_exists(&self, schema: Option<&str>, table: &str, column: &str) -> Result<bool> {
        let sql = self.dialect().column_exists_sql(schema, table, column);
        self.exists(&sql).await
    }

    async fn constraint_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        constraint: &str,
    ) -> Result<bool> {
        let sql = self.dialect().constraint_exists_sql(schema, table, constraint);
        self.exists(&sql).await
    }

    async fn index_exists(&self, schema: Option<&str>, table: &str, index: &str) -> Result<bool> {
        let sql = self.dialect().index_exists_sql(schema, table, index);
        self.exists(&sql).await
    }

    async fn sequence_exists(&self, schema: Option<&str>, sequence: &str) -> Result<bool> {
        let sql = self.dialect().sequence_exists_sql(schema, sequence);
        self.exists(&sql).await
    }

    async fn default_value_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        default_value: &str,
    ) -> Result<bool> {
        let sql = self
            .dialect()
            .default_value_exists_sql(schema, table, column, default_value);
        self.exists(&sql).await
    }
}

impl dyn Processor + '_ {
    /// Run one expression: raw callbacks are invoked with this processor,
    /// everything else is generated and executed.
    pub async fn process(&self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::PerformRawOperation(RawOperation::Callback(callback)) => {
                callback.call(self).await
            }
            _ => {
                expression.validate()?;
                let sql = self.dialect().generate(expression)?;
                self.execute(&sql)
                    .await
                    .map_err(|e| execution_error(self.dialect(), expression, e))
            }
        }
    }
}

/// Wrap a driver failure as an execution error for `expression`.
pub(crate) fn execution_error(
    dialect: &dyn Dialect,
    expression: &Expression,
    error: MigrateError,
) -> MigrateError {
    match error {
        MigrateError::Execution { .. }
        | MigrateError::Validation { .. }
        | MigrateError::Capability { .. }
        | MigrateError::Cancelled => error.describing(expression.to_string()),
        other => MigrateError::execution(dialect.name(), expression.to_string(), other),
    }
}

/// Split a script on lines consisting only of the batch separator.
///
/// Empty batches are dropped. Without a separator the script is one batch.
pub fn split_batches(script: &str, separator: Option<&str>) -> Vec<String> {
    let Some(separator) = separator else {
        return vec![script.to_string()];
    };

    let mut batches = Vec::new();
    let mut current = String::new();
    for line in script.lines() {
        if line.trim().eq_ignore_ascii_case(separator) {
            if !current.trim().is_empty() {
                batches.push(current.trim_end().to_string());
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        batches.push(current.trim_end().to_string());
    }
    batches
}

/// Apply the command timeout to a driver future.
pub(crate) async fn with_timeout<T, F>(timeout: Option<Duration>, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| MigrateError::Timeout(limit.as_secs()))?,
        None => future.await,
    }
}
