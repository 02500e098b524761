//! Built-in database drivers.
//!
//! Each driver module provides:
//! - a [`Dialect`](crate::core::Dialect) implementation
//! - [`Queryable`](crate::core::Queryable) and
//!   [`Connection`](crate::core::Connection) for the engine's client type
//! - a `connect` function taking a [`ConnectionConfig`](crate::config::ConnectionConfig)
//!
//! | Module       | Dialect            | Client                        |
//! |--------------|--------------------|-------------------------------|
//! | [`tidb`]     | [`TidbDialect`]    | `mysql_async::Conn`           |
//! | [`mysql`]    | [`MysqlDialect`]   | `mysql_async::Conn`           |
//! | [`postgres`] | [`PostgresDialect`]| `tokio_postgres::Client`      |
//! | [`mssql`]    | [`MssqlDialect`]   | `tiberius::Client<Compat<..>>`|
//!
//! Dialects only need a `Queryable`, so they compile without the `mysql`
//! feature; the MySQL-protocol clients do not.

pub mod common;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod tidb;

pub use common::{SslMode, TlsBuilder};

pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use tidb::TidbDialect;
