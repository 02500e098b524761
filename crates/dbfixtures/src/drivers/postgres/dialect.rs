//! PostgreSQL fixture dialect.
//!
//! Tables are discovered as `schema.table` across every non-system schema of
//! the current database. Foreign keys are suspended in one of two ways (see
//! [`PgIntegrityMode`]):
//!
//! - `DisableTriggers`: `ALTER TABLE ... DISABLE TRIGGER ALL` on every table.
//!   Needs superuser because it also disables the internal FK triggers.
//! - `DeferConstraints`: make non-deferrable foreign keys
//!   `DEFERRABLE INITIALLY IMMEDIATE`, then `SET CONSTRAINTS ALL DEFERRED`.
//!   Restoring runs `SET CONSTRAINTS ALL IMMEDIATE`, which checks the loaded
//!   rows before commit, then makes those keys `NOT DEFERRABLE` again.
//!
//! Both are transactional, so a rolled-back load leaves the schema untouched
//! and a committed one leaves it as it was found.

use async_trait::async_trait;
use tracing::debug;

use crate::config::{PgIntegrityMode, PostgresOptions};
use crate::core::identifier::{escape_literal, quote_pg, quote_qualified};
use crate::core::traits::{Dialect, IntegrityRestore, ParameterStyle, Queryable};
use crate::error::Result;

const CURRENT_DATABASE_SQL: &str = "SELECT current_database()::text";

const LIST_TABLES_SQL: &str = "SELECT table_schema::text || '.' || table_name::text \
     FROM information_schema.tables \
     WHERE table_catalog::text = $1 \
       AND table_type = 'BASE TABLE' \
       AND table_schema NOT IN ('pg_catalog', 'information_schema') \
       AND table_schema::text NOT LIKE 'pg\\_toast%' \
     ORDER BY table_schema, table_name";

const NON_DEFERRABLE_FOREIGN_KEYS_SQL: &str =
    "SELECT format('ALTER TABLE %I.%I ALTER CONSTRAINT %I', n.nspname, c.relname, con.conname) \
     FROM pg_constraint con \
     JOIN pg_class c ON c.oid = con.conrelid \
     JOIN pg_namespace n ON n.oid = c.relnamespace \
     WHERE con.contype = 'f' AND NOT con.condeferrable \
       AND n.nspname NOT IN ('pg_catalog', 'information_schema') \
     ORDER BY n.nspname, c.relname, con.conname";

const SERIAL_COLUMNS_SQL: &str = "SELECT a.attname::text \
     FROM pg_attribute a \
     WHERE a.attrelid = ($1::text)::regclass \
       AND a.attnum > 0 AND NOT a.attisdropped \
       AND pg_get_serial_sequence($1::text, a.attname::text) IS NOT NULL \
     ORDER BY a.attnum";

const SERIAL_SEQUENCE_SQL: &str = "SELECT pg_get_serial_sequence($1::text, $2::text)";

const TABLE_EXISTS_SQL: &str = "SELECT to_regclass($1::text)::text";

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect {
    integrity_mode: PgIntegrityMode,
}

impl PostgresDialect {
    /// Create a dialect that disables triggers during loads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dialect from configuration.
    pub fn from_options(options: &PostgresOptions) -> Self {
        Self::with_integrity_mode(options.integrity_mode)
    }

    /// Create a dialect with an explicit integrity strategy.
    pub fn with_integrity_mode(integrity_mode: PgIntegrityMode) -> Self {
        Self { integrity_mode }
    }

    /// The configured integrity strategy.
    pub fn integrity_mode(&self) -> PgIntegrityMode {
        self.integrity_mode
    }

    async fn disable_triggers(
        &self,
        tx: &mut dyn Queryable,
        tables: &[String],
    ) -> Result<IntegrityRestore> {
        let mut restore = Vec::with_capacity(tables.len());
        for table in tables {
            let quoted = self.quote_ident(table);
            tx.execute(&format!("ALTER TABLE {} DISABLE TRIGGER ALL", quoted))
                .await?;
            restore.push(format!("ALTER TABLE {} ENABLE TRIGGER ALL", quoted));
        }
        Ok(IntegrityRestore::transactional(restore))
    }

    async fn defer_constraints(&self, tx: &mut dyn Queryable) -> Result<IntegrityRestore> {
        let alters = tx
            .query_strings(NON_DEFERRABLE_FOREIGN_KEYS_SQL, &[])
            .await?;
        for alter in &alters {
            tx.execute(&format!("{} DEFERRABLE INITIALLY IMMEDIATE", alter))
                .await?;
        }
        debug!("Made {} foreign keys deferrable", alters.len());
        tx.execute("SET CONSTRAINTS ALL DEFERRED").await?;

        let mut restore = Vec::with_capacity(alters.len() + 1);
        restore.push("SET CONSTRAINTS ALL IMMEDIATE".to_string());
        restore.extend(alters.iter().map(|alter| format!("{} NOT DEFERRABLE", alter)));
        Ok(IntegrityRestore::transactional(restore))
    }
}

#[async_trait]
impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Positional
    }

    /// Quotes each dot-separated part: `public.users` -> `"public"."users"`.
    fn quote_ident(&self, name: &str) -> String {
        quote_qualified(name, quote_pg)
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
        match self.integrity_mode {
            PgIntegrityMode::DisableTriggers => self.disable_triggers(tx, tables).await,
            PgIntegrityMode::DeferConstraints => self.defer_constraints(tx).await,
        }
    }

    async fn reset_sequence(
        &self,
        conn: &mut dyn Queryable,
        table: &str,
        floor: i64,
    ) -> Result<()> {
        let quoted = self.quote_ident(table);
        let columns = conn.query_strings(SERIAL_COLUMNS_SQL, &[quoted.as_str()]).await?;

        for column in &columns {
            let Some(sequence) = conn
                .query_string(SERIAL_SEQUENCE_SQL, &[quoted.as_str(), column.as_str()])
                .await?
            else {
                continue;
            };
            // Never move below existing rows.
            let sql = format!(
                "SELECT setval('{}', GREATEST(COALESCE((SELECT MAX({}) FROM {}), 0) + 1, {}), false)",
                escape_literal(&sequence),
                quote_pg(column),
                quoted,
                floor
            );
            conn.execute(&sql).await?;
            debug!("Reset sequence {} for {}", sequence, table);
        }

        Ok(())
    }

    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>> {
        let quoted = self.quote_ident(table);
        if q.query_string(TABLE_EXISTS_SQL, &[quoted.as_str()]).await?.is_none() {
            return Ok(None);
        }

        // First 52 bits of an md5 over the ordered rows, exact in an f64.
        let sql = format!(
            "SELECT COALESCE(('x' || substr(md5(string_agg(t::text, E'\\n' ORDER BY t::text)), 1, 13))\
             ::bit(52)::bigint::float8, 0) FROM {} AS t",
            quoted
        );
        q.query_f64(&sql, 0).await
    }
}
