//! # dbfixtures
//!
//! Engine-agnostic test fixture loading.
//!
//! Loads fixture rows into a database while referential integrity is
//! suspended, then puts the database back into a normal state:
//!
//! - **Suspend-and-load**: one transaction, foreign keys off, caller's
//!   routine runs, foreign keys back on, commit or roll back
//! - **Sequence reset**: identity generators moved to a high floor so rows
//!   inserted by tests never collide with fixture ids
//! - **Change detection**: per-table checksums recorded after the first
//!   load, so unchanged tables can be skipped on reload
//!
//! Supported engines: TiDB, MySQL/MariaDB, PostgreSQL and SQL Server.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbfixtures::drivers::postgres::{self, PostgresDialect};
//! use dbfixtures::{BoxError, DialectAdapter, FixtureError, FixturesConfig, Queryable};
//! use futures::future::BoxFuture;
//!
//! fn load_users(tx: &mut dyn Queryable) -> BoxFuture<'_, Result<(), BoxError>> {
//!     Box::pin(async move {
//!         tx.execute("DELETE FROM users").await?;
//!         tx.execute("INSERT INTO users (id, name) VALUES (1, 'alice')").await?;
//!         Ok(())
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> dbfixtures::Result<()> {
//!     let config = FixturesConfig::load("fixtures.yaml")?;
//!     let connection = config
//!         .connection
//!         .clone()
//!         .ok_or_else(|| FixtureError::Config("connection is required".into()))?;
//!
//!     let mut client = postgres::connect(&connection).await?;
//!     let dialect = PostgresDialect::from_options(&config.adapter.postgres);
//!     let mut adapter = DialectAdapter::new(dialect, config.adapter.clone());
//!
//!     adapter.init(&mut client).await?;
//!     adapter.suspend_and_load(&mut client, &mut load_users).await?;
//!     adapter.after_load(&mut client).await?;
//!
//!     if adapter.is_table_modified(&mut client, "public.users").await? {
//!         adapter.suspend_and_load(&mut client, &mut load_users).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use adapter::{ChangeStatus, DialectAdapter, SchemaCache};
pub use config::{AdapterConfig, ConnectionConfig, FixturesConfig, PgIntegrityMode};
pub use crate::core::{Connection, Dialect, IntegrityRestore, LoadRoutine, ParameterStyle, Queryable};
pub use error::{BoxError, FixtureError, Result};
pub use orchestrator::LoadTransaction;
