//! # schema-migrate
//!
//! Versioned schema migrations for SQL Server, PostgreSQL and MySQL.
//!
//! Migrations describe changes with a fluent builder. Each change is recorded
//! as an abstract [`Expression`](model::Expression), rendered to exact SQL by
//! a dialect, and executed by a [`Processor`](processor::Processor). Applied
//! versions are tracked in a VersionInfo table.
//!
//! - **Fluent builders** that only expose the calls valid at each step
//! - **Byte-exact SQL** per dialect, with capability errors instead of approximations
//! - **Tag filtering** and maintenance stages around each run
//! - **Preview mode** that generates SQL without touching the database
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use schema_migrate::builder::MigrationContext;
//! use schema_migrate::migration::{Migration, MigrationRegistry};
//! use schema_migrate::{connect, Config, MigrationRunner, ProcessorOptions, RunnerOptions};
//!
//! struct CreateUsers;
//!
//! impl Migration for CreateUsers {
//!     fn up(&self, ctx: &mut MigrationContext) {
//!         ctx.create()
//!             .table("Users")
//!             .with_column("Id").as_int64().primary_key().identity()
//!             .with_column("Email").as_string_sized(256).not_nullable();
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> schema_migrate::Result<()> {
//!     let config = Config::load("migrate.yaml")?;
//!     let mut registry = MigrationRegistry::new();
//!     registry.add(20240101120000, CreateUsers);
//!
//!     let processor = connect(
//!         &config.connection,
//!         ProcessorOptions::with_command_timeout_secs(config.runner.command_timeout_secs),
//!     )
//!     .await?;
//!     let mut runner =
//!         MigrationRunner::new(Arc::clone(&processor), &registry, RunnerOptions::from_config(&config))?;
//!     let report = runner.migrate_up(None).await?;
//!     println!("Applied {:?}", report.applied);
//!     processor.close().await
//! }
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod migration;
pub mod model;
pub mod processor;
pub mod runner;
pub mod state;

// Re-exports for convenient access
pub use builder::MigrationContext;
pub use config::{Config, ConnectionConfig, RunnerConfig};
pub use crate::core::value::Value;
pub use dialect::Dialect;
pub use drivers::{connect, DialectImpl};
pub use error::{MigrateError, Result};
pub use migration::{
    Migration, MigrationInfo, MigrationRegistry, TagGroup, TransactionBehavior,
};
pub use processor::{ConnectionlessProcessor, Processor, ProcessorOptions};
pub use runner::{MigrationRunner, RunReport, RunnerOptions};
pub use state::VersionTableMetaData;
