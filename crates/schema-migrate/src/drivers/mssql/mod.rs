//! Microsoft SQL Server driver.
//!
//! - [`MssqlDialect`]: T-SQL generation rules
//! - [`MssqlProcessor`]: executes scripts over a tiberius connection (`mssql` feature)

mod dialect;
#[cfg(feature = "mssql")]
mod processor;

pub use dialect::MssqlDialect;
#[cfg(feature = "mssql")]
pub use processor::MssqlProcessor;
