//! MySQL fixture dialect.
//!
//! Foreign keys are suspended per session with `FOREIGN_KEY_CHECKS`, identity
//! counters are moved with `ALTER TABLE ... AUTO_INCREMENT` and content is
//! fingerprinted with `CHECKSUM TABLE`. TiDB reuses everything here except
//! the checksum statement.

use async_trait::async_trait;
use tracing::debug;

use crate::core::identifier::quote_mysql;
use crate::core::traits::{Dialect, IntegrityRestore, ParameterStyle, Queryable};
use crate::error::Result;

pub(crate) const CURRENT_DATABASE_SQL: &str = "SELECT DATABASE()";

pub(crate) const LIST_TABLES_SQL: &str = "SELECT table_name \
     FROM information_schema.tables \
     WHERE table_schema = ? AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

pub(crate) const DISABLE_FOREIGN_KEY_CHECKS: &str = "SET FOREIGN_KEY_CHECKS = 0";
pub(crate) const ENABLE_FOREIGN_KEY_CHECKS: &str = "SET FOREIGN_KEY_CHECKS = 1";

/// Names of base tables in `database`.
pub(crate) async fn list_tables(q: &mut dyn Queryable, database: &str) -> Result<Vec<String>> {
    q.query_strings(LIST_TABLES_SQL, &[database]).await
}

/// Turn off `FOREIGN_KEY_CHECKS` for the session.
///
/// The variable is session state, not transactional, so the returned plan
/// must run even when the transaction is rolled back.
pub(crate) async fn disable_foreign_key_checks(tx: &mut dyn Queryable) -> Result<IntegrityRestore> {
    tx.execute(DISABLE_FOREIGN_KEY_CHECKS).await?;
    Ok(IntegrityRestore::new(vec![ENABLE_FOREIGN_KEY_CHECKS.to_string()]))
}

/// Raise the auto-increment counter of `table` to `floor`.
pub(crate) async fn reset_auto_increment(
    conn: &mut dyn Queryable,
    table: &str,
    floor: i64,
) -> Result<()> {
    let sql = format!("ALTER TABLE {} AUTO_INCREMENT = {}", quote_mysql(table), floor);
    debug!("{}", sql);
    conn.execute(&sql).await?;
    Ok(())
}

/// MySQL dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+ and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Question
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_mysql(name)
    }

    async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<Option<String>> {
        q.query_string(CURRENT_DATABASE_SQL, &[]).await
    }

    async fn discover_tables(&self, q: &mut dyn Queryable, database: &str) -> Result<Vec<String>> {
        list_tables(q, database).await
    }

    async fn disable_integrity(
        &self,
        tx: &mut dyn Queryable,
        _tables: &[String],
    ) -> Result<IntegrityRestore> {
        disable_foreign_key_checks(tx).await
    }

    async fn reset_sequence(
        &self,
        conn: &mut dyn Queryable,
        table: &str,
        floor: i64,
    ) -> Result<()> {
        reset_auto_increment(conn, table, floor).await
    }

    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>> {
        // Result columns: Table, Checksum
        let sql = format!("CHECKSUM TABLE {}", quote_mysql(table));
        q.query_f64(&sql, 1).await
    }
}
