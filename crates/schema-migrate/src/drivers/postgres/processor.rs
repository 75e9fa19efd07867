//! PostgreSQL processor over one pooled tokio-postgres client.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio::sync::Mutex;
use tokio_postgres::{Config as PgConfig, SimpleQueryMessage};
use tracing::{debug, info, warn};

use super::PostgresDialect;
use crate::config::{validate_server, ConnectionConfig};
use crate::core::value::Value;
use crate::dialect::Dialect;
use crate::drivers::common::tls::make_rustls_connect;
use crate::error::{MigrateError, Result};
use crate::processor::{with_timeout, Processor, ProcessorOptions};

/// Connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes scripts with `batch_execute` on a single session.
///
/// The pool holds exactly one connection so transaction statements and the
/// migration body always share a session.
pub struct PostgresProcessor {
    dialect: PostgresDialect,
    client: Mutex<Object>,
    options: ProcessorOptions,
    _pool: Pool,
}

impl PostgresProcessor {
    /// Open a connection described by `config`.
    pub async fn connect(config: &ConnectionConfig, options: ProcessorOptions) -> Result<Self> {
        validate_server(config)?;

        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        pg_config.keepalives(true);
        pg_config.keepalives_idle(Duration::from_secs(30));
        pg_config.connect_timeout(CONNECT_TIMEOUT);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = match make_rustls_connect(config.ssl_mode) {
            Some(tls_connector) => Manager::from_config(pg_config, tls_connector, mgr_config),
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
            }
        };
        let pool = Pool::builder(mgr)
            .max_size(1)
            .build()
            .map_err(|e| MigrateError::pool(e, "creating PostgreSQL pool"))?;

        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "connecting to PostgreSQL"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host,
            config.port(),
            config.database
        );

        Ok(Self {
            dialect: PostgresDialect::new(),
            client: Mutex::new(client),
            options,
            _pool: pool,
        })
    }
}

/// Text-protocol rows; the ledger parses versions and timestamps from text.
fn convert_messages(messages: Vec<SimpleQueryMessage>) -> Vec<Vec<Value>> {
    messages
        .into_iter()
        .filter_map(|message| match message {
            SimpleQueryMessage::Row(row) => Some(
                (0..row.len())
                    .map(|i| match row.get(i) {
                        Some(text) => Value::String(text.to_string()),
                        None => Value::Null,
                    })
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl Processor for PostgresProcessor {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("{}", sql);
        with_timeout(self.options.command_timeout, async {
            let client = self.client.lock().await;
            client.batch_execute(sql).await?;
            Ok(())
        })
        .await
    }

    async fn read(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        debug!("{}", sql);
        let messages = with_timeout(self.options.command_timeout, async {
            let client = self.client.lock().await;
            Ok(client.simple_query(sql).await?)
        })
        .await?;
        Ok(convert_messages(messages))
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.execute("BEGIN").await
    }

    async fn commit(&self) -> Result<()> {
        self.execute("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.execute("ROLLBACK").await
    }
}
