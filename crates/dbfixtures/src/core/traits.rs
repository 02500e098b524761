//! Core traits for engine-agnostic fixture loading.
//!
//! This module defines the primary abstractions used by the load orchestrator:
//!
//! - [`Queryable`]: Runs queries and statements against one live connection
//! - [`Connection`]: A [`Queryable`] that can also control transactions
//! - [`LoadRoutine`]: Caller-supplied routine that writes fixture rows
//! - [`Dialect`]: Engine-specific strategy for discovery, integrity,
//!   identity reset and checksums
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable per-engine algorithms
//! - **Template Method**: `Dialect::enable_integrity` has a default
//!   implementation that replays the restore plan built by `disable_integrity`

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{BoxError, Result};

/// Bind-parameter syntax understood by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    /// `$1`, `$2`, ... (PostgreSQL)
    Positional,
    /// `@P1`, `@P2`, ... (SQL Server)
    Named,
    /// `?` (MySQL, TiDB)
    Question,
}

impl ParameterStyle {
    /// Render the placeholder for the given 1-based parameter index.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            ParameterStyle::Positional => format!("${}", index),
            ParameterStyle::Named => format!("@P{}", index),
            ParameterStyle::Question => "?".to_string(),
        }
    }
}

/// Execute queries against a single live database connection.
///
/// Parameters are bound as strings using the engine's own placeholder
/// syntax (see [`ParameterStyle`]). Implementations exist for
/// `tokio_postgres::Client`, `tiberius::Client` and (with the `mysql`
/// feature) `mysql_async::Conn`.
#[async_trait]
pub trait Queryable: Send {
    /// Fetch the first column of the first row as a string.
    ///
    /// Returns `None` when there are no rows or the value is NULL.
    async fn query_string(&mut self, sql: &str, params: &[&str]) -> Result<Option<String>>;

    /// Fetch the first column of every row as strings, skipping NULLs.
    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>>;

    /// Fetch column `column` (0-based) of the first row as a float.
    ///
    /// Returns `None` when there are no rows or the value is NULL.
    async fn query_f64(&mut self, sql: &str, column: usize) -> Result<Option<f64>>;

    /// Execute a statement that returns no rows.
    ///
    /// Returns the number of affected rows where the engine reports one.
    async fn execute(&mut self, sql: &str) -> Result<u64>;
}

/// A [`Queryable`] connection that can open and close transactions.
///
/// Transactions are controlled with plain statements on the same session,
/// so everything executed between [`begin`](Connection::begin) and
/// [`commit`](Connection::commit) shares one unit of work.
#[async_trait]
pub trait Connection: Queryable {
    /// Start a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;
}

/// Caller-supplied routine that deletes and inserts fixture rows.
///
/// Runs inside the load transaction with referential integrity suspended.
/// Functions of the shape
/// `fn(&mut dyn Queryable) -> BoxFuture<'_, Result<(), BoxError>>`
/// implement this trait directly; stateful loaders implement it on a struct.
#[async_trait]
pub trait LoadRoutine: Send {
    async fn load(&mut self, tx: &mut dyn Queryable) -> std::result::Result<(), BoxError>;
}

#[async_trait]
impl<F> LoadRoutine for F
where
    F: for<'a> FnMut(&'a mut dyn Queryable) -> BoxFuture<'a, std::result::Result<(), BoxError>>
        + Send,
{
    async fn load(&mut self, tx: &mut dyn Queryable) -> std::result::Result<(), BoxError> {
        (self)(tx).await
    }
}

/// Statements that undo an integrity suspension, in execution order.
///
/// Built by [`Dialect::disable_integrity`] so that engines which need to
/// remember what they changed (e.g. which constraints were made deferrable)
/// can restore exactly that.
///
/// A `transactional` plan undoes a suspension that rolls back with the load
/// transaction (PostgreSQL DDL, SQL Server `NOCHECK`). When the load routine
/// fails, the orchestrator rolls back instead of replaying such a plan.
/// Session-level toggles (MySQL `FOREIGN_KEY_CHECKS`) are not transactional
/// and are always replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityRestore {
    pub statements: Vec<String>,
    pub transactional: bool,
}

impl IntegrityRestore {
    /// Create a restore plan for a session-level suspension.
    pub fn new(statements: Vec<String>) -> Self {
        Self {
            statements,
            transactional: false,
        }
    }

    /// Create a restore plan for a suspension undone by rollback.
    pub fn transactional(statements: Vec<String>) -> Self {
        Self {
            statements,
            transactional: true,
        }
    }
}

/// Engine-specific strategy for fixture loading.
///
/// One implementation exists per database engine. The shared orchestration
/// in [`crate::adapter::DialectAdapter`] and [`crate::orchestrator`] depends
/// only on this trait. Dialects report raw results; callers attach the
/// error kind (discovery, integrity toggle, sequence reset, checksum).
///
/// Every method that touches the database returns its error to the caller;
/// none of them log-and-continue or retry.
#[async_trait]
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g. "tidb", "postgres").
    fn name(&self) -> &str;

    /// Bind-parameter syntax the row loader should generate.
    fn parameter_style(&self) -> ParameterStyle;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - TiDB/MySQL: `` `identifier` ``
    /// - PostgreSQL: `"identifier"`
    /// - SQL Server: `[identifier]`
    fn quote_ident(&self, name: &str) -> String;

    /// Name of the database the connection currently uses.
    ///
    /// `None` when the session has no current database.
    async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<Option<String>>;

    /// Base tables (no views) of `database`, in catalog order.
    async fn discover_tables(&self, q: &mut dyn Queryable, database: &str) -> Result<Vec<String>>;

    /// Disable referential-integrity enforcement inside the open transaction.
    ///
    /// Returns the plan that [`enable_integrity`](Dialect::enable_integrity)
    /// replays to turn enforcement back on.
    async fn disable_integrity(
        &self,
        tx: &mut dyn Queryable,
        tables: &[String],
    ) -> Result<IntegrityRestore>;

    /// Re-enable referential-integrity enforcement.
    ///
    /// The default implementation executes the restore statements in order
    /// and stops at the first failure. Not called for a transactional plan
    /// after the load routine failed.
    async fn enable_integrity(
        &self,
        tx: &mut dyn Queryable,
        restore: &IntegrityRestore,
    ) -> Result<()> {
        for sql in &restore.statements {
            tx.execute(sql).await?;
        }
        Ok(())
    }

    /// Reset the identity generator of one table so the next value is at
    /// least `floor`. Tables without an identity column are a no-op.
    async fn reset_sequence(&self, conn: &mut dyn Queryable, table: &str, floor: i64)
        -> Result<()>;

    /// Engine-native content fingerprint of one table.
    ///
    /// `None` when the table does not exist or the engine reports no value.
    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>>;
}
