//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::drivers::DialectImpl;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    DialectImpl::from_db_type(&config.connection.r#type)?;

    if let Some(0) = config.connection.port {
        return Err(MigrateError::Config("connection.port must not be 0".into()));
    }

    if let Some(0) = config.runner.command_timeout_secs {
        return Err(MigrateError::Config(
            "runner.command_timeout_secs must be at least 1".into(),
        ));
    }
    if config.runner.tags.iter().any(|t| t.trim().is_empty()) {
        return Err(MigrateError::Config("runner.tags must not contain empty tags".into()));
    }

    let table = &config.version_table;
    for (field, value) in [
        ("version_table.table_name", &table.table_name),
        ("version_table.version_column", &table.version_column),
        ("version_table.applied_on_column", &table.applied_on_column),
        ("version_table.description_column", &table.description_column),
        ("version_table.unique_index_name", &table.unique_index_name),
    ] {
        if value.trim().is_empty() {
            return Err(MigrateError::Config(format!("{} must not be empty", field)));
        }
    }

    Ok(())
}

/// Fields needed to open a live connection.
pub fn validate_server(connection: &ConnectionConfig) -> Result<()> {
    if connection.host.is_empty() {
        return Err(MigrateError::Config("connection.host is required".into()));
    }
    if connection.database.is_empty() {
        return Err(MigrateError::Config("connection.database is required".into()));
    }
    if connection.user.is_empty() {
        return Err(MigrateError::Config("connection.user is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunnerConfig, VersionTableMetaData};
    use crate::drivers::SslMode;

    fn valid_config() -> Config {
        Config {
            connection: ConnectionConfig {
                r#type: "mssql".to_string(),
                host: "localhost".to_string(),
                port: None,
                database: "app".to_string(),
                user: "sa".to_string(),
                password: "password".to_string(),
                ssl_mode: SslMode::Disable,
                encrypt: false,
                trust_server_cert: true,
            },
            runner: RunnerConfig::default(),
            version_table: VersionTableMetaData::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
        assert!(validate_server(&valid_config().connection).is_ok());
    }

    #[test]
    fn test_unknown_type() {
        let mut config = valid_config();
        config.connection.r#type = "oracle".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_host_only_matters_for_server() {
        let mut config = valid_config();
        config.connection.host = "".to_string();
        assert!(validate(&config).is_ok());
        assert!(validate_server(&config.connection).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = valid_config();
        config.runner.command_timeout_secs = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_version_column_rejected() {
        let mut config = valid_config();
        config.version_table.version_column = " ".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("version_table.version_column"));
    }

    #[test]
    fn test_connection_config_debug_redacts_password() {
        let mut config = valid_config();
        config.connection.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.connection);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
