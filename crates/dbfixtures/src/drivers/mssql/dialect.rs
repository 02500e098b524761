//! SQL Server fixture dialect.
//!
//! Tables are discovered as `schema.table`. Only foreign keys that are enabled
//! when the load starts are switched off (`NOCHECK CONSTRAINT`); restoring
//! runs `WITH CHECK CHECK CONSTRAINT` on exactly those, which re-validates
//! the loaded rows. Keys the user had disabled stay disabled.

use async_trait::async_trait;
use tracing::debug;

use crate::core::identifier::{escape_literal, quote_mssql, quote_qualified};
use crate::core::traits::{Dialect, IntegrityRestore, ParameterStyle, Queryable};
use crate::error::Result;

const CURRENT_DATABASE_SQL: &str = "SELECT DB_NAME()";

const LIST_TABLES_SQL: &str = "SELECT TABLE_SCHEMA + '.' + TABLE_NAME \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_CATALOG = @P1 AND TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_SCHEMA, TABLE_NAME";

const ENABLED_FOREIGN_KEYS_SQL: &str = "SELECT name FROM sys.foreign_keys \
     WHERE parent_object_id = OBJECT_ID(@P1, 'U') AND is_disabled = 0 \
     ORDER BY name";

const HAS_IDENTITY_SQL: &str =
    "SELECT CAST(OBJECTPROPERTY(OBJECT_ID(@P1, 'U'), 'TableHasIdentity') AS VARCHAR(1))";

const TABLE_EXISTS_SQL: &str = "SELECT CAST(OBJECT_ID(@P1, 'U') AS VARCHAR(20))";

/// SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new SQL Server dialect instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Named
    }

    /// Quotes each dot-separated part: `dbo.users` -> `[dbo].[users]`.
    fn quote_ident(&self, name: &str) -> String {
        quote_qualified(name, quote_mssql)
    }

    async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<Option<String>> {
        q.query_string(CURRENT_DATABASE_SQL, &[]).await
    }

    async fn discover_tables(&self, q: &mut dyn Queryable, database: &str) -> Result<Vec<String>> {
        q.query_strings(LIST_TABLES_SQL, &[database]).await
    }

    async fn disable_integrity(
        &self,
        tx: &mut dyn Queryable,
        tables: &[String],
    ) -> Result<IntegrityRestore> {
        let mut restore = Vec::new();
        for table in tables {
            let quoted = self.quote_ident(table);
            let keys = tx
                .query_strings(ENABLED_FOREIGN_KEYS_SQL, &[quoted.as_str()])
                .await?;
            for key in &keys {
                let key = quote_mssql(key);
                tx.execute(&format!("ALTER TABLE {} NOCHECK CONSTRAINT {}", quoted, key))
                    .await?;
                restore.push(format!(
                    "ALTER TABLE {} WITH CHECK CHECK CONSTRAINT {}",
                    quoted, key
                ));
            }
        }
        debug!("Suspended {} foreign keys", restore.len());
        Ok(IntegrityRestore::transactional(restore))
    }

    async fn reset_sequence(
        &self,
        conn: &mut dyn Queryable,
        table: &str,
        floor: i64,
    ) -> Result<()> {
        let quoted = self.quote_ident(table);
        let has_identity = conn
            .query_string(HAS_IDENTITY_SQL, &[quoted.as_str()])
            .await?;
        if has_identity.as_deref() != Some("1") {
            return Ok(());
        }

        // Never move below existing rows.
        let max_sql = format!(
            "SELECT CAST(COALESCE(MAX($IDENTITY), 0) AS FLOAT) FROM {}",
            quoted
        );
        let current_max = conn.query_f64(&max_sql, 0).await?.unwrap_or(0.0) as i64;
        let reseed = current_max.max(floor);

        let sql = format!(
            "DBCC CHECKIDENT ('{}', RESEED, {})",
            escape_literal(&quoted),
            reseed
        );
        conn.execute(&sql).await?;
        debug!("Reseeded identity of {} to {}", table, reseed);
        Ok(())
    }

    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>> {
        let quoted = self.quote_ident(table);
        if q.query_string(TABLE_EXISTS_SQL, &[quoted.as_str()])
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let sql = format!(
            "SELECT CAST(COALESCE(CHECKSUM_AGG(BINARY_CHECKSUM(*)), 0) AS FLOAT) FROM {}",
            quoted
        );
        q.query_f64(&sql, 0).await
    }
}
