//! `tokio_postgres` connection glue.

use std::future::Future;

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{info, warn};

use crate::config::ConnectionConfig;
use crate::core::traits::{Connection, Queryable};
use crate::drivers::common::TlsBuilder;
use crate::error::Result;

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Open a PostgreSQL connection.
///
/// The connection task is spawned on the current tokio runtime and ends
/// when the returned client is dropped.
pub async fn connect(config: &ConnectionConfig) -> Result<Client> {
    let port = config.port_or(DEFAULT_PORT);
    let mut pg_config = PgConfig::new();
    pg_config.host(&config.host);
    pg_config.port(port);
    pg_config.dbname(&config.database);
    pg_config.user(&config.user);
    pg_config.password(&config.password);

    let client = match TlsBuilder::parse(&config.ssl_mode)?.build()? {
        None => {
            let (client, connection) = pg_config.connect(NoTls).await?;
            spawn_connection(connection);
            client
        }
        Some(tls) => {
            let (client, connection) = pg_config.connect(tls).await?;
            spawn_connection(connection);
            client
        }
    };

    info!(
        "Connected to PostgreSQL: {}:{}/{}",
        config.host, port, config.database
    );

    Ok(client)
}

fn spawn_connection<F>(connection: F)
where
    F: Future<Output = std::result::Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("PostgreSQL connection closed with error: {}", e);
        }
    });
}

fn bind<'a>(params: &'a [&'a str]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Queryable for Client {
    async fn query_string(&mut self, sql: &str, params: &[&str]) -> Result<Option<String>> {
        let params = bind(params);
        let rows = Client::query(self, sql, &params).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<_, Option<String>>(0)?),
            None => Ok(None),
        }
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>> {
        let params = bind(params);
        let rows = Client::query(self, sql, &params).await?;
        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(value) = row.try_get::<_, Option<String>>(0)? {
                values.push(value);
            }
        }
        Ok(values)
    }

    async fn query_f64(&mut self, sql: &str, column: usize) -> Result<Option<f64>> {
        let rows = Client::query(self, sql, &[]).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<_, Option<f64>>(column)?),
            None => Ok(None),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        Ok(Client::execute(self, sql, &[]).await?)
    }
}

#[async_trait]
impl Connection for Client {
    async fn begin(&mut self) -> Result<()> {
        Client::batch_execute(self, "BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        Client::batch_execute(self, "COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        Client::batch_execute(self, "ROLLBACK").await?;
        Ok(())
    }
}
