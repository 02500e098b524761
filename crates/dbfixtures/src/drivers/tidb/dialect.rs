//! TiDB fixture dialect.
//!
//! TiDB speaks the MySQL protocol and shares discovery, integrity suspension
//! and identity reset with [`MysqlDialect`](crate::drivers::mysql::MysqlDialect).
//! Content is fingerprinted with `ADMIN CHECKSUM TABLE`, whose result row is
//! `(Db_name, Table_name, Checksum_crc64_xor, Total_kvs, Total_bytes)`.

use async_trait::async_trait;

use crate::core::identifier::quote_mysql;
use crate::core::traits::{Dialect, IntegrityRestore, ParameterStyle, Queryable};
use crate::drivers::mysql::dialect as mysql;
use crate::error::Result;

/// Column of `ADMIN CHECKSUM TABLE` holding `Checksum_crc64_xor`.
const CHECKSUM_COLUMN: usize = 2;

/// TiDB dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct TidbDialect;

impl TidbDialect {
    /// Create a new TiDB dialect instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialect for TidbDialect {
    fn name(&self) -> &str {
        "tidb"
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Question
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_mysql(name)
    }

    async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<Option<String>> {
        q.query_string(mysql::CURRENT_DATABASE_SQL, &[]).await
    }

    async fn discover_tables(&self, q: &mut dyn Queryable, database: &str) -> Result<Vec<String>> {
        mysql::list_tables(q, database).await
    }

    async fn disable_integrity(
        &self,
        tx: &mut dyn Queryable,
        _tables: &[String],
    ) -> Result<IntegrityRestore> {
        mysql::disable_foreign_key_checks(tx).await
    }

    async fn reset_sequence(
        &self,
        conn: &mut dyn Queryable,
        table: &str,
        floor: i64,
    ) -> Result<()> {
        mysql::reset_auto_increment(conn, table, floor).await
    }

    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>> {
        let sql = format!("ADMIN CHECKSUM TABLE {}", quote_mysql(table));
        q.query_f64(&sql, CHECKSUM_COLUMN).await
    }
}
