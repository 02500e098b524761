//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: Fixture dialect
//! - `conn`: [`Queryable`](crate::core::Queryable) for `tokio_postgres::Client`
//!   and [`connect`]

mod conn;
mod dialect;

pub use conn::{connect, DEFAULT_PORT};
pub use dialect::PostgresDialect;
