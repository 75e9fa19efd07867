//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::SslMode;
pub use crate::state::VersionTableMetaData;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection.
    pub connection: ConnectionConfig,

    /// Runner behavior.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Version ledger table layout.
    #[serde(default)]
    pub version_table: VersionTableMetaData,
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type: mssql, postgres or mysql.
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default depends on the type).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password. Never serialized.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// TLS mode for PostgreSQL and MySQL (default: require).
    #[serde(default)]
    pub ssl_mode: SslMode,

    /// Encrypt SQL Server connections (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust the SQL Server certificate without validation (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

impl ConnectionConfig {
    /// Effective port: the configured one or the engine default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| match self.r#type.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => 5432,
            "mysql" | "mariadb" => 3306,
            _ => 1433,
        })
    }
}

/// Runner behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Generate SQL without executing it (default: false).
    #[serde(default)]
    pub preview_only: bool,

    /// Capture per-expression failures instead of aborting (default: false).
    #[serde(default)]
    pub silently_fail: bool,

    /// Active tags for tag-filtered migrations.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Per-statement timeout handed to the processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    /// Wrap each migration in a transaction (default: true).
    #[serde(default = "default_true")]
    pub transaction_per_migration: bool,

    /// Allow migrations flagged as breaking changes (default: false).
    #[serde(default)]
    pub allow_breaking_changes: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            preview_only: false,
            silently_fail: false,
            tags: Vec::new(),
            command_timeout_secs: None,
            transaction_per_migration: true,
            allow_breaking_changes: false,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
