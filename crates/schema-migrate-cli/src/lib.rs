//! Command-line host for schema-migrate.
//!
//! Host binaries build a [`MigrationRegistry`] and hand it to [`run_cli`],
//! which parses arguments, connects, and drives a
//! [`MigrationRunner`](schema_migrate::MigrationRunner).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use schema_migrate::migration::MigrationRegistry;
use schema_migrate::runner::{CollectingSink, MigrationStatus};
use schema_migrate::{
    connect, Config, ConnectionlessProcessor, DialectImpl, MigrateError, MigrationRunner,
    Processor, ProcessorOptions, RunReport, RunnerOptions,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "schema-migrate")]
#[command(about = "Versioned schema migrations for SQL Server, PostgreSQL and MySQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "migrate.yaml")]
    config: PathBuf,

    /// Generate SQL without connecting (implies preview)
    #[arg(long)]
    connectionless: bool,

    /// Active tag; repeat for several (overrides runner.tags)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Up {
        /// Highest version to apply
        #[arg(long)]
        target: Option<i64>,

        /// Print the SQL instead of executing it
        #[arg(long)]
        preview: bool,
    },

    /// Revert applied migrations above a version
    Down {
        /// Version to migrate down to (0 reverts everything)
        #[arg(long)]
        target: i64,

        /// Print the SQL instead of executing it
        #[arg(long)]
        preview: bool,
    },

    /// Revert the most recently applied migrations
    Rollback {
        /// Number of migrations to revert
        #[arg(long, default_value = "1")]
        steps: usize,

        /// Print the SQL instead of executing it
        #[arg(long)]
        preview: bool,
    },

    /// Check that no pending migration predates the latest applied one
    Validate,

    /// Show every migration and whether it is applied
    List,
}

impl Commands {
    fn preview(&self) -> bool {
        match self {
            Commands::Up { preview, .. }
            | Commands::Down { preview, .. }
            | Commands::Rollback { preview, .. } => *preview,
            Commands::Validate | Commands::List => false,
        }
    }
}

/// Parse the command line, run the command, and map the outcome to an exit code.
pub async fn run_cli(registry: MigrationRegistry) -> ExitCode {
    match run(Cli::parse(), registry).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, registry: MigrationRegistry) -> Result<(), MigrateError> {
    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let mut options = RunnerOptions::from_config(&config);
    if !cli.tags.is_empty() {
        options.tags = cli.tags.clone();
    }
    if cli.connectionless || cli.command.preview() {
        options.preview_only = true;
    }

    let processor: Arc<dyn Processor> = if cli.connectionless {
        let dialect = DialectImpl::from_db_type(&config.connection.r#type)?;
        Arc::new(ConnectionlessProcessor::new(dialect))
    } else {
        connect(
            &config.connection,
            ProcessorOptions::with_command_timeout_secs(config.runner.command_timeout_secs),
        )
        .await?
    };

    let sink = CollectingSink::new();
    let cancel = setup_signal_handler();
    let mut runner = MigrationRunner::new(Arc::clone(&processor), &registry, options)?
        .with_sink(sink.clone())
        .with_cancellation(cancel_receiver(cancel));

    let result = execute(&cli, &mut runner, &sink).await;
    close_after(processor.as_ref(), result).await
}

/// Close the connection without letting a close failure mask `result`.
async fn close_after(
    processor: &dyn Processor,
    result: Result<(), MigrateError>,
) -> Result<(), MigrateError> {
    if let Err(e) = processor.close().await {
        warn!("Failed to close connection: {}", e);
    }
    result
}

async fn execute(
    cli: &Cli,
    runner: &mut MigrationRunner,
    sink: &CollectingSink,
) -> Result<(), MigrateError> {
    match &cli.command {
        Commands::Up { target, .. } => {
            let report = runner.migrate_up(*target).await?;
            print_report(cli, &report, sink)?;
        }
        Commands::Down { target, .. } => {
            let report = runner.migrate_down(*target).await?;
            print_report(cli, &report, sink)?;
        }
        Commands::Rollback { steps, .. } => {
            let report = runner.rollback(*steps).await?;
            print_report(cli, &report, sink)?;
        }
        Commands::Validate => {
            runner.validate_version_order().await?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "valid": true }));
            } else {
                println!("Version order is valid");
            }
        }
        Commands::List => {
            let statuses = runner.list_migrations().await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                print_statuses(&statuses);
            }
        }
    }
    Ok(())
}

fn print_report(cli: &Cli, report: &RunReport, sink: &CollectingSink) -> Result<(), MigrateError> {
    if cli.output_json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    if report.preview {
        let script = sink.script();
        if !script.is_empty() {
            println!("{}", script);
        }
    }

    let status_msg = match (report.preview, report.operation.as_str()) {
        (true, _) => "Preview completed!",
        (false, "up") => "Migration completed!",
        (false, _) => "Rollback completed!",
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    if !report.applied.is_empty() {
        println!("  Applied: {:?}", report.applied);
    }
    if !report.reverted.is_empty() {
        println!("  Reverted: {:?}", report.reverted);
    }
    if report.applied.is_empty() && report.reverted.is_empty() {
        println!("  Nothing to do");
    }
    for error in &report.errors {
        println!("  Ignored error: {}", error.message);
    }
    Ok(())
}

fn print_statuses(statuses: &[MigrationStatus]) {
    if statuses.is_empty() {
        println!("No migrations registered");
        return;
    }
    for status in statuses {
        let state = if status.current {
            "current"
        } else if status.applied {
            "applied"
        } else {
            "pending"
        };
        let applied_on = status
            .applied_on
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "{:>16}  {:<8} {:<19} {}{}",
            status.version,
            state,
            applied_on,
            status.description,
            if status.breaking_change { " (BREAKING)" } else { "" }
        );
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries previewed SQL and JSON results
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().try_init().map_err(|e| e.to_string())
    } else {
        subscriber.try_init().map_err(|e| e.to_string())
    }
}

/// Bridge the shutdown token to the runner's cancellation flag.
fn cancel_receiver(token: CancellationToken) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        token.cancelled().await;
        let _ = tx.send(true);
    });
    rx
}

/// Cancel on SIGINT or SIGTERM. The runner stops before the next migration.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            let Ok(mut stream) = signal(kind) else {
                eprintln!("Failed to install {} handler", name);
                return;
            };
            stream.recv().await;
            eprintln!(
                "\nReceived {}. Stopping after the current migration...",
                name
            );
            token.cancel();
        });
    }

    cancel_token
}

/// Cancel on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current migration...");
            token.cancel();
        }
    });

    cancel_token
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_migrate::dialect::Dialect;
    use schema_migrate::Value;

    /// Processor whose connection cannot be closed.
    struct StuckProcessor {
        dialect: DialectImpl,
    }

    #[async_trait::async_trait]
    impl Processor for StuckProcessor {
        fn dialect(&self) -> &dyn Dialect {
            self.dialect.as_dialect()
        }

        async fn execute(&self, _sql: &str) -> schema_migrate::Result<()> {
            Ok(())
        }

        async fn read(&self, _sql: &str) -> schema_migrate::Result<Vec<Vec<Value>>> {
            Ok(Vec::new())
        }

        async fn begin_transaction(&self) -> schema_migrate::Result<()> {
            Ok(())
        }

        async fn commit(&self) -> schema_migrate::Result<()> {
            Ok(())
        }

        async fn rollback(&self) -> schema_migrate::Result<()> {
            Ok(())
        }

        async fn close(&self) -> schema_migrate::Result<()> {
            Err(MigrateError::Processor("connection reset".into()))
        }
    }

    fn stuck() -> StuckProcessor {
        StuckProcessor {
            dialect: DialectImpl::from_db_type("postgres").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_close_failure_keeps_run_error() {
        let err = close_after(&stuck(), Err(MigrateError::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Cancelled));
    }

    #[tokio::test]
    async fn test_close_failure_after_success_is_not_fatal() {
        assert!(close_after(&stuck(), Ok(())).await.is_ok());
    }
}
