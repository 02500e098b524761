//! Microsoft SQL Server driver.
//!
//! - [`MssqlDialect`]: Fixture dialect
//! - `conn`: [`Queryable`](crate::core::Queryable) for `tiberius::Client`
//!   and [`connect`]

mod conn;
mod dialect;

pub use conn::{connect, MssqlClient, DEFAULT_PORT};
pub use dialect::MssqlDialect;
