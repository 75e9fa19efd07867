//! Error types for the migration engine.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::migration::MigrationInfo;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two registered migrations share a version number.
    #[error("Duplicate migration version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: i64,
        first: String,
        second: String,
    },

    /// An expression is malformed. Raised before any SQL is generated.
    #[error("{}Invalid expression {expression}: {message}", version_prefix(.version))]
    Validation {
        version: Option<i64>,
        expression: String,
        message: String,
    },

    /// Unapplied migrations are older than the latest applied version.
    #[error(
        "Migration order violation: {} unapplied migration(s) precede the latest applied version: {:?}",
        .offenders.len(),
        .offenders.keys().collect::<Vec<_>>()
    )]
    Ordering {
        offenders: BTreeMap<i64, MigrationInfo>,
    },

    /// The dialect cannot express the requested operation.
    #[error(
        "{}{dialect} cannot generate {expression}: {message}{}",
        version_prefix(.version),
        suggestion_suffix(.suggestion)
    )]
    Capability {
        version: Option<i64>,
        dialect: String,
        expression: String,
        message: String,
        suggestion: Option<String>,
    },

    /// The processor rejected generated SQL.
    #[error("{}{dialect} rejected {expression}: {message}", version_prefix(.version))]
    Execution {
        version: Option<i64>,
        dialect: String,
        expression: String,
        message: String,
    },

    /// Connection-level processor error
    #[error("Processor error: {0}")]
    Processor(String),

    /// SQL Server driver error
    #[cfg(feature = "mssql")]
    #[error("SQL Server error: {0}")]
    Tiberius(#[from] tiberius::error::Error),

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL driver error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A statement exceeded the configured command timeout.
    #[error("Statement timed out after {0}s")]
    Timeout(u64),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Migration run cancelled")]
    Cancelled,
}

fn version_prefix(version: &Option<i64>) -> String {
    match version {
        Some(v) => format!("Migration {}: ", v),
        None => String::new(),
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (suggestion: {})", s),
        None => String::new(),
    }
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Validation error for an expression.
    pub fn validation(expression: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Validation {
            version: None,
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create a Capability error. The expression is filled in by
    /// [`MigrateError::describing`] at the generation boundary.
    pub fn capability(dialect: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Capability {
            version: None,
            dialect: dialect.into(),
            expression: String::new(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Fill in the expression description where it is still missing.
    pub fn describing(mut self, description: impl Into<String>) -> Self {
        match &mut self {
            MigrateError::Validation { expression, .. }
            | MigrateError::Capability { expression, .. }
            | MigrateError::Execution { expression, .. } => {
                if expression.is_empty() {
                    *expression = description.into();
                }
            }
            _ => {}
        }
        self
    }

    /// Attach a suggested alternative to a Capability error.
    pub fn suggest(mut self, alternative: impl Into<String>) -> Self {
        if let MigrateError::Capability { suggestion, .. } = &mut self {
            *suggestion = Some(alternative.into());
        }
        self
    }

    /// Create an Execution error carrying the processor's message verbatim.
    pub fn execution(
        dialect: impl Into<String>,
        expression: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        MigrateError::Execution {
            version: None,
            dialect: dialect.into(),
            expression: expression.into(),
            message: message.to_string(),
        }
    }

    /// Stamp the migration version onto errors that report one.
    pub fn in_migration(mut self, migration_version: i64) -> Self {
        match &mut self {
            MigrateError::Validation { version, .. }
            | MigrateError::Capability { version, .. }
            | MigrateError::Execution { version, .. } => {
                if version.is_none() {
                    *version = Some(migration_version);
                }
            }
            _ => {}
        }
        self
    }

    /// Version of the migration the error occurred in, when known.
    pub fn version(&self) -> Option<i64> {
        match self {
            MigrateError::Validation { version, .. }
            | MigrateError::Capability { version, .. }
            | MigrateError::Execution { version, .. } => *version,
            MigrateError::DuplicateVersion { version, .. } => Some(*version),
            _ => None,
        }
    }

    /// Process exit code for the error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::DuplicateVersion { .. }
            | MigrateError::Validation { .. }
            | MigrateError::Ordering { .. }
            | MigrateError::Capability { .. } => 3,
            MigrateError::Execution { .. } | MigrateError::Timeout(_) => 4,
            MigrateError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        if let MigrateError::Ordering { offenders } = self {
            for (version, info) in offenders {
                output.push_str(&format!("  - {} {}\n", version, info.description()));
            }
        }

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
