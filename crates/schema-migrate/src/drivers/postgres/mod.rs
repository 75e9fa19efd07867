//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL generation rules for PostgreSQL
//! - [`PostgresProcessor`]: executes scripts over a deadpool-postgres client (`postgres` feature)

mod dialect;
#[cfg(feature = "postgres")]
mod processor;

pub use dialect::PostgresDialect;
#[cfg(feature = "postgres")]
pub use processor::PostgresProcessor;
