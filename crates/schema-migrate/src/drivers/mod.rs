//! Database driver implementations.
//!
//! Each driver module provides:
//! - a `Dialect`: SQL generation rules for the engine (always compiled)
//! - a `Processor`: executes generated SQL over one connection (feature-gated)
//!
//! - [`mssql`]: Microsoft SQL Server (`mssql` feature)
//! - [`postgres`]: PostgreSQL (`postgres` feature)
//! - [`mysql`]: MySQL/MariaDB (`mysql` feature)
//! - [`common`]: Shared utilities (TLS)
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` with `dialect.rs`
//! 2. Implement `Dialect`, overriding only the rules that differ from `dialect::base`
//! 3. Add a variant to `DialectImpl` and a name to `from_db_type`
//! 4. Gate the processor with a feature flag in `Cargo.toml`

pub mod common;
pub mod mssql;
pub mod mysql;
pub mod postgres;

pub use common::SslMode;
pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use crate::model::Expression;
use crate::processor::{Processor, ProcessorOptions};

/// Enum-based static dispatch over the built-in dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    SqlServer(MssqlDialect),
    Postgres(PostgresDialect),
    MySql(MysqlDialect),
}

impl DialectImpl {
    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql_server" => Ok(DialectImpl::SqlServer(MssqlDialect::new())),
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "mysql" | "mariadb" => Ok(DialectImpl::MySql(MysqlDialect::new())),
            other => Err(MigrateError::Config(format!(
                "Unknown database type: '{}'. Supported types: mssql, postgres, mysql",
                other
            ))),
        }
    }

    pub fn as_dialect(&self) -> &dyn Dialect {
        match self {
            DialectImpl::SqlServer(d) => d,
            DialectImpl::Postgres(d) => d,
            DialectImpl::MySql(d) => d,
        }
    }

    pub fn name(&self) -> &str {
        self.as_dialect().name()
    }

    pub fn generate(&self, expression: &Expression) -> Result<String> {
        match self {
            DialectImpl::SqlServer(d) => d.generate(expression),
            DialectImpl::Postgres(d) => d.generate(expression),
            DialectImpl::MySql(d) => d.generate(expression),
        }
    }
}

/// Open a processor for the configured database type.
///
/// # Errors
///
/// Fails for unknown types, for types whose feature is not compiled in, and
/// when the connection cannot be established.
pub async fn connect(
    config: &ConnectionConfig,
    options: ProcessorOptions,
) -> Result<Arc<dyn Processor>> {
    match DialectImpl::from_db_type(&config.r#type)? {
        #[cfg(feature = "mssql")]
        DialectImpl::SqlServer(_) => Ok(Arc::new(
            mssql::MssqlProcessor::connect(config, options).await?,
        )),
        #[cfg(feature = "postgres")]
        DialectImpl::Postgres(_) => Ok(Arc::new(
            postgres::PostgresProcessor::connect(config, options).await?,
        )),
        #[cfg(feature = "mysql")]
        DialectImpl::MySql(_) => Ok(Arc::new(
            mysql::MysqlProcessor::connect(config, options).await?,
        )),
        #[allow(unreachable_patterns)]
        other => {
            let _ = options;
            Err(MigrateError::Config(format!(
                "{} support is not compiled in; enable the matching cargo feature",
                other.name()
            )))
        }
    }
}
