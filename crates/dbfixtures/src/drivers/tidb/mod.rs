//! TiDB driver.
//!
//! TiDB speaks the MySQL wire protocol, so connections are plain
//! `mysql_async::Conn` handles (requires the `mysql` feature).

mod dialect;

pub use dialect::TidbDialect;

/// Default TiDB port.
pub const DEFAULT_PORT: u16 = 4000;

/// Open a TiDB connection.
#[cfg(feature = "mysql")]
pub async fn connect(config: &crate::config::ConnectionConfig) -> crate::error::Result<mysql_async::Conn> {
    crate::drivers::mysql::connect_with_default_port(config, DEFAULT_PORT, "TiDB").await
}
