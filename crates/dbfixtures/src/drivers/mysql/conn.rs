//! `mysql_async` connection glue.
//!
//! Implements [`Queryable`] and [`Connection`] for [`mysql_async::Conn`] and
//! opens single connections from a [`ConnectionConfig`].

use async_trait::async_trait;
use mysql_async::prelude::Queryable as _;
use mysql_async::{Conn, OptsBuilder, Params, Row, SslOpts, Value};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::traits::{Connection, Queryable};
use crate::drivers::common::SslMode;
use crate::error::{FixtureError, Result};

/// Default MySQL port.
pub const DEFAULT_PORT: u16 = 3306;

/// Open a MySQL connection.
pub async fn connect(config: &ConnectionConfig) -> Result<Conn> {
    connect_with_default_port(config, DEFAULT_PORT, "MySQL").await
}

/// Open a connection to any MySQL-protocol server.
pub(crate) async fn connect_with_default_port(
    config: &ConnectionConfig,
    default_port: u16,
    engine: &str,
) -> Result<Conn> {
    let port = config.port_or(default_port);
    let ssl_opts = ssl_opts(SslMode::parse(&config.ssl_mode)?);
    if ssl_opts.is_none() {
        debug!("{} TLS is disabled", engine);
    }

    let mut builder = OptsBuilder::default()
        .ip_or_hostname(&config.host)
        .tcp_port(port)
        .db_name(Some(&config.database))
        .user(Some(&config.user))
        .pass(Some(&config.password))
        // Use utf8mb4 for full Unicode support
        .init(vec!["SET NAMES utf8mb4"]);

    if let Some(ssl) = ssl_opts {
        builder = builder.ssl_opts(ssl);
    }

    let conn = Conn::new(builder).await?;

    info!(
        "Connected to {}: {}:{}/{}",
        engine, config.host, port, config.database
    );

    Ok(conn)
}

fn ssl_opts(mode: SslMode) -> Option<SslOpts> {
    if !mode.requires_tls() {
        return None;
    }
    Some(SslOpts::default().with_danger_accept_invalid_certs(!mode.verifies_certificate()))
}

fn bind(params: &[&str]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(
            params
                .iter()
                .map(|p| Value::Bytes(p.as_bytes().to_vec()))
                .collect(),
        )
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        other => Some(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

fn value_to_f64(value: &Value) -> Result<Option<f64>> {
    match value {
        Value::NULL => Ok(None),
        Value::Int(v) => Ok(Some(*v as f64)),
        Value::UInt(v) => Ok(Some(*v as f64)),
        Value::Float(v) => Ok(Some(f64::from(*v))),
        Value::Double(v) => Ok(Some(*v)),
        Value::Bytes(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            text.trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|e| FixtureError::Query(format!("non-numeric value {:?}: {}", text, e)))
        }
        other => Err(FixtureError::Query(format!(
            "expected a numeric value, got {:?}",
            other
        ))),
    }
}

#[async_trait]
impl Queryable for Conn {
    async fn query_string(&mut self, sql: &str, params: &[&str]) -> Result<Option<String>> {
        let row: Option<Row> = if params.is_empty() {
            self.query_first(sql).await?
        } else {
            self.exec_first(sql, bind(params)).await?
        };
        Ok(row.and_then(|r| r.as_ref(0).and_then(value_to_string)))
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>> {
        let rows: Vec<Row> = if params.is_empty() {
            self.query(sql).await?
        } else {
            self.exec(sql, bind(params)).await?
        };
        Ok(rows
            .iter()
            .filter_map(|r| r.as_ref(0).and_then(value_to_string))
            .collect())
    }

    async fn query_f64(&mut self, sql: &str, column: usize) -> Result<Option<f64>> {
        let row: Option<Row> = self.query_first(sql).await?;
        let Some(row) = row else {
            return Ok(None);
        };
        match row.as_ref(column) {
            Some(value) => value_to_f64(value),
            None => Err(FixtureError::Query(format!(
                "column {} out of range ({} columns)",
                column,
                row.len()
            ))),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.query_drop(sql).await?;
        Ok(self.affected_rows())
    }
}

#[async_trait]
impl Connection for Conn {
    async fn begin(&mut self) -> Result<()> {
        self.query_drop("START TRANSACTION").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.query_drop("ROLLBACK").await?;
        Ok(())
    }
}
