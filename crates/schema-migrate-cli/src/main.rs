//! schema-migrate demo binary: the CLI over a small built-in registry.

mod demo;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    schema_migrate_cli::run_cli(demo::registry()).await
}
