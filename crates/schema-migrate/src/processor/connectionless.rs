//! Offline processor: records SQL instead of sending it anywhere.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use super::Processor;
use crate::core::value::Value;
use crate::dialect::Dialect;
use crate::drivers::DialectImpl;
use crate::error::Result;

/// Processor with no database behind it.
///
/// Every statement is logged and kept in order; queries return no rows, so
/// every existence predicate answers `false` and the version ledger is empty.
#[derive(Debug)]
pub struct ConnectionlessProcessor {
    dialect: DialectImpl,
    statements: Mutex<Vec<String>>,
}

impl ConnectionlessProcessor {
    pub fn new(dialect: DialectImpl) -> Self {
        Self {
            dialect,
            statements: Mutex::new(Vec::new()),
        }
    }

    /// Statements received so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &str) {
        info!("{}", sql);
        if let Ok(mut statements) = self.statements.lock() {
            statements.push(sql.to_string());
        }
    }
}

#[async_trait]
impl Processor for ConnectionlessProcessor {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_dialect()
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.record(sql);
        Ok(())
    }

    async fn read(&self, _sql: &str) -> Result<Vec<Vec<Value>>> {
        Ok(Vec::new())
    }

    async fn begin_transaction(&self) -> Result<()> {
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }
}
