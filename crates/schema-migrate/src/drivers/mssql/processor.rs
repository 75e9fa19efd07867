//! SQL Server processor over a single tiberius connection.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Row};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use super::MssqlDialect;
use crate::config::{validate_server, ConnectionConfig};
use crate::core::value::Value;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::processor::{split_batches, with_timeout, Processor, ProcessorOptions};

/// TCP keepalive time for long-running migrations.
const TCP_KEEPALIVE_TIME: Duration = Duration::from_secs(30);

/// Maximum TDS packet size.
const TDS_MAX_PACKET_SIZE: u32 = 32767;

type MssqlClient = Client<Compat<TcpStream>>;

/// Executes T-SQL scripts, splitting them on `GO` lines.
pub struct MssqlProcessor {
    dialect: MssqlDialect,
    client: Mutex<MssqlClient>,
    options: ProcessorOptions,
}

impl MssqlProcessor {
    /// Open a connection described by `config`.
    pub async fn connect(config: &ConnectionConfig, options: ProcessorOptions) -> Result<Self> {
        validate_server(config)?;
        let tiberius_config = build_config(config);
        let client = open_client(tiberius_config).await?;

        info!(
            "Connected to SQL Server: {}:{}/{}",
            config.host,
            config.port(),
            config.database
        );

        Ok(Self {
            dialect: MssqlDialect::new(),
            client: Mutex::new(client),
            options,
        })
    }

    async fn run_batch(&self, batch: &str) -> Result<()> {
        debug!("{}", batch);
        with_timeout(self.options.command_timeout, async {
            let mut client = self.client.lock().await;
            client.simple_query(batch).await?.into_results().await?;
            Ok(())
        })
        .await
    }
}

fn build_config(config: &ConnectionConfig) -> Config {
    let mut tiberius_config = Config::new();
    tiberius_config.host(&config.host);
    tiberius_config.port(config.port());
    tiberius_config.database(&config.database);
    tiberius_config.authentication(AuthMethod::sql_server(&config.user, &config.password));

    if config.encrypt {
        if config.trust_server_cert {
            tiberius_config.trust_cert();
        }
        tiberius_config.encryption(EncryptionLevel::Required);
    } else {
        warn!("SQL Server encryption is disabled. Credentials will be transmitted in plaintext.");
        tiberius_config.encryption(EncryptionLevel::NotSupported);
    }

    tiberius_config.packet_size(TDS_MAX_PACKET_SIZE);
    tiberius_config
}

async fn open_client(config: Config) -> Result<MssqlClient> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true).ok();

    let std_tcp = tcp.into_std()?;
    let socket = socket2::Socket::from(std_tcp);
    let keepalive = socket2::TcpKeepalive::new()
        .with_time(TCP_KEEPALIVE_TIME)
        .with_interval(TCP_KEEPALIVE_TIME);
    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        warn!("Failed to set TCP keepalive on SQL Server connection: {}", e);
    }

    let std_tcp: std::net::TcpStream = socket.into();
    std_tcp.set_nonblocking(true)?;
    let tcp = TcpStream::from_std(std_tcp)?;

    Ok(Client::connect(config, tcp.compat_write()).await?)
}

/// Convert one tiberius row into engine values.
fn convert_row(row: Row) -> Result<Vec<Value>> {
    row.into_iter().map(|data| convert_column(&data)).collect()
}

fn convert_column(data: &ColumnData<'static>) -> Result<Value> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| Value::I16(i16::from(v))),
        ColumnData::I16(v) => v.map(Value::I16),
        ColumnData::I32(v) => v.map(Value::I32),
        ColumnData::I64(v) => v.map(Value::I64),
        ColumnData::F32(v) => v.map(Value::F32),
        ColumnData::F64(v) => v.map(Value::F64),
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| Value::String(s.to_string())),
        ColumnData::Guid(v) => v.map(Value::Uuid),
        ColumnData::Binary(v) => v.as_ref().map(|b| Value::Bytes(b.to_vec())),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| Value::String(x.clone().into_owned().into_string())),
        ColumnData::Numeric(_) => Decimal::from_sql(data)?.map(Value::Decimal),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(Value::DateTime)
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)?.map(Value::Date),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(Value::Time),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<FixedOffset>::from_sql(data)?.map(Value::DateTimeOffset)
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

#[async_trait]
impl Processor for MssqlProcessor {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        for batch in split_batches(sql, self.dialect.batch_separator()) {
            self.run_batch(&batch).await?;
        }
        Ok(())
    }

    async fn read(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        debug!("{}", sql);
        let rows = with_timeout(self.options.command_timeout, async {
            let mut client = self.client.lock().await;
            let rows = client.simple_query(sql).await?.into_first_result().await?;
            Ok(rows)
        })
        .await?;
        rows.into_iter().map(convert_row).collect()
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.run_batch("BEGIN TRANSACTION").await
    }

    async fn commit(&self) -> Result<()> {
        self.run_batch("COMMIT TRANSACTION").await
    }

    async fn rollback(&self) -> Result<()> {
        self.run_batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
    }
}
