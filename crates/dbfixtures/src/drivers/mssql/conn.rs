//! Tiberius connection glue.

use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncWrite};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::info;

use crate::config::ConnectionConfig;
use crate::core::traits::{Connection, Queryable};
use crate::drivers::common::SslMode;
use crate::error::Result;

/// Default SQL Server port.
pub const DEFAULT_PORT: u16 = 1433;

/// Client type returned by [`connect`].
pub type MssqlClient = Client<Compat<TcpStream>>;

fn build_config(config: &ConnectionConfig) -> Result<Config> {
    let mut tconfig = Config::new();
    tconfig.host(&config.host);
    tconfig.port(config.port_or(DEFAULT_PORT));
    tconfig.database(&config.database);
    tconfig.authentication(AuthMethod::sql_server(&config.user, &config.password));

    match SslMode::parse(&config.ssl_mode)? {
        SslMode::Disable => tconfig.encryption(EncryptionLevel::NotSupported),
        SslMode::Require => {
            tconfig.trust_cert();
            tconfig.encryption(EncryptionLevel::Required);
        }
        SslMode::VerifyCa | SslMode::VerifyFull => {
            tconfig.encryption(EncryptionLevel::Required)
        }
    }

    Ok(tconfig)
}

/// Open a SQL Server connection.
pub async fn connect(config: &ConnectionConfig) -> Result<MssqlClient> {
    let tconfig = build_config(config)?;
    let tcp = TcpStream::connect(tconfig.get_addr()).await?;
    tcp.set_nodelay(true)?;

    let client = Client::connect(tconfig, tcp.compat_write()).await?;

    info!(
        "Connected to SQL Server: {}:{}/{}",
        config.host,
        config.port_or(DEFAULT_PORT),
        config.database
    );

    Ok(client)
}

fn bind<'a>(params: &'a [&'a str]) -> Vec<&'a dyn ToSql> {
    params.iter().map(|p| p as &dyn ToSql).collect()
}

#[async_trait]
impl<S> Queryable for Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn query_string(&mut self, sql: &str, params: &[&str]) -> Result<Option<String>> {
        let params = bind(params);
        let rows = Client::query(self, sql, &params)
            .await?
            .into_first_result()
            .await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<&str, _>(0)?.map(str::to_owned)),
            None => Ok(None),
        }
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>> {
        let params = bind(params);
        let rows = Client::query(self, sql, &params)
            .await?
            .into_first_result()
            .await?;
        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(value) = row.try_get::<&str, _>(0)? {
                values.push(value.to_owned());
            }
        }
        Ok(values)
    }

    async fn query_f64(&mut self, sql: &str, column: usize) -> Result<Option<f64>> {
        let rows = Client::query(self, sql, &[])
            .await?
            .into_first_result()
            .await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<f64, _>(column)?),
            None => Ok(None),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let result = Client::execute(self, sql, &[]).await?;
        Ok(result.total())
    }
}

#[async_trait]
impl<S> Connection for Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn begin(&mut self) -> Result<()> {
        Client::simple_query(self, "BEGIN TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        Client::simple_query(self, "COMMIT TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        Client::simple_query(self, "ROLLBACK TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(())
    }
}
