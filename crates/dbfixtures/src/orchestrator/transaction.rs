//! Transaction scope for one fixture load.

use async_trait::async_trait;
use tracing::warn;

use crate::core::traits::{Connection, Queryable};
use crate::error::{FixtureError, Result};

/// An open transaction on a borrowed [`Connection`].
///
/// Ends with exactly one of [`commit`](Self::commit) or
/// [`rollback`](Self::rollback). Dropping it while still open (e.g. when the
/// load future is cancelled) cannot roll back asynchronously; the connection
/// is then left inside the transaction and is logged at `warn`.
pub struct LoadTransaction<'c, C: Connection> {
    conn: &'c mut C,
    open: bool,
}

impl<'c, C: Connection> LoadTransaction<'c, C> {
    /// Start a transaction on `conn`.
    pub async fn begin(conn: &'c mut C) -> Result<Self> {
        conn.begin().await.map_err(FixtureError::transaction)?;
        Ok(Self { conn, open: true })
    }

    /// Commit the transaction.
    pub async fn commit(mut self) -> Result<()> {
        self.open = false;
        self.conn.commit().await.map_err(FixtureError::transaction)
    }

    /// Roll back the transaction.
    pub async fn rollback(mut self) -> Result<()> {
        self.open = false;
        self.conn.rollback().await.map_err(FixtureError::transaction)
    }
}

impl<C: Connection> Drop for LoadTransaction<'_, C> {
    fn drop(&mut self) {
        if self.open {
            warn!("Load transaction dropped while open; roll back the connection before reuse");
        }
    }
}

#[async_trait]
impl<C: Connection> Queryable for LoadTransaction<'_, C> {
    async fn query_string(&mut self, sql: &str, params: &[&str]) -> Result<Option<String>> {
        self.conn.query_string(sql, params).await
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>> {
        self.conn.query_strings(sql, params).await
    }

    async fn query_f64(&mut self, sql: &str, column: usize) -> Result<Option<f64>> {
        self.conn.query_f64(sql, column).await
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.conn.execute(sql).await
    }
}
