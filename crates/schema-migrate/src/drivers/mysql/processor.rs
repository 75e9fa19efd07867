//! MySQL processor over a single mysql_async connection.

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Row, SslOpts};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::MysqlDialect;
use crate::config::{validate_server, ConnectionConfig};
use crate::core::value::Value;
use crate::dialect::Dialect;
use crate::drivers::SslMode;
use crate::error::{MigrateError, Result};
use crate::processor::{with_timeout, Processor, ProcessorOptions};

/// Executes statements with `query_drop`.
pub struct MysqlProcessor {
    dialect: MysqlDialect,
    conn: Mutex<Conn>,
    options: ProcessorOptions,
}

impl MysqlProcessor {
    /// Open a connection described by `config`.
    pub async fn connect(config: &ConnectionConfig, options: ProcessorOptions) -> Result<Self> {
        validate_server(config)?;

        let ssl_opts = match config.ssl_mode {
            SslMode::Disable => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            SslMode::Require => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            SslMode::VerifyCa | SslMode::VerifyFull => Some(SslOpts::default()),
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port())
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let opts: Opts = builder.into();
        let mut conn = Conn::new(opts)
            .await
            .map_err(|e| MigrateError::pool(e, "connecting to MySQL"))?;
        conn.query_drop("SELECT 1").await?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host,
            config.port(),
            config.database
        );

        Ok(Self {
            dialect: MysqlDialect::new(),
            conn: Mutex::new(conn),
            options,
        })
    }
}

fn convert_row(row: Row) -> Vec<Value> {
    (0..row.len())
        .map(|i| match row.as_ref(i).cloned().unwrap_or(mysql_async::Value::NULL) {
            mysql_async::Value::NULL => Value::Null,
            mysql_async::Value::Int(v) => Value::I64(v),
            mysql_async::Value::UInt(v) => match i64::try_from(v) {
                Ok(v) => Value::I64(v),
                Err(_) => Value::String(v.to_string()),
            },
            mysql_async::Value::Float(v) => Value::F32(v),
            mysql_async::Value::Double(v) => Value::F64(v),
            mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Value::String(text),
                Err(e) => Value::Bytes(e.into_bytes()),
            },
            other => Value::String(other.as_sql(true).trim_matches('\'').to_string()),
        })
        .collect()
}

#[async_trait]
impl Processor for MysqlProcessor {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("{}", sql);
        with_timeout(self.options.command_timeout, async {
            let mut conn = self.conn.lock().await;
            conn.query_drop(sql).await?;
            Ok(())
        })
        .await
    }

    async fn read(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        debug!("{}", sql);
        let rows: Vec<Row> = with_timeout(self.options.command_timeout, async {
            let mut conn = self.conn.lock().await;
            Ok(conn.query(sql).await?)
        })
        .await?;
        Ok(rows.into_iter().map(convert_row).collect())
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.execute("START TRANSACTION").await
    }

    async fn commit(&self) -> Result<()> {
        self.execute("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.execute("ROLLBACK").await
    }
}
