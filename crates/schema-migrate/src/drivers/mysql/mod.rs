//! MySQL/MariaDB driver.
//!
//! - [`MysqlDialect`]: SQL generation rules (always compiled, usable offline)
//! - [`MysqlProcessor`]: executes scripts over a mysql_async connection
//!
//! # Feature Flag
//!
//! The processor is only available when the `mysql` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! schema-migrate = { version = "0.4", features = ["mysql"] }
//! ```
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod dialect;
#[cfg(feature = "mysql")]
mod processor;

pub use dialect::MysqlDialect;
#[cfg(feature = "mysql")]
pub use processor::MysqlProcessor;
