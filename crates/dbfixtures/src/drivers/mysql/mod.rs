//! MySQL/MariaDB driver.
//!
//! - [`MysqlDialect`]: Fixture dialect (always available)
//! - `conn`: [`Queryable`](crate::core::Queryable) for `mysql_async::Conn`
//!   and [`connect`]
//!
//! # Feature Flag
//!
//! The connection glue is only compiled with the `mysql` feature (on by
//! default). The dialect works with any `Queryable`.

pub mod dialect;

#[cfg(feature = "mysql")]
mod conn;

pub use dialect::MysqlDialect;

#[cfg(feature = "mysql")]
pub use conn::{connect, DEFAULT_PORT};

#[cfg(feature = "mysql")]
pub(crate) use conn::connect_with_default_port;
