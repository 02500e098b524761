//! Dialect adapter: schema cache, load orchestration and change detection
//! bound to one [`Dialect`].
//!
//! A [`DialectAdapter`] is created once per database session:
//!
//! ```ignore
//! let mut adapter = DialectAdapter::new(TidbDialect::new(), config.adapter.clone());
//! adapter.init(&mut conn).await?;
//! adapter.suspend_and_load(&mut conn, &mut load_rows).await?;
//! adapter.after_load(&mut conn).await?;
//! // ... test runs ...
//! if adapter.is_table_modified(&mut conn, "users").await? { /* reload */ }
//! ```
//!
//! The adapter is not synchronized; callers serialize use of one adapter
//! and its connection.

pub mod change;

use std::collections::HashMap;

use tracing::{debug, info};

pub use change::{ChangeStatus, UNKNOWN_CHECKSUM};

use crate::config::AdapterConfig;
use crate::core::identifier::validate_identifier;
use crate::core::traits::{Connection, Dialect, LoadRoutine, ParameterStyle, Queryable};
use crate::error::{FixtureError, Result};
use crate::orchestrator;

/// Discovered tables plus the checksum baseline.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    tables: Vec<String>,
    initialized: bool,
    tables_checksum: Option<HashMap<String, f64>>,
}

impl SchemaCache {
    /// Discovered tables, in catalog order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Whether discovery has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Recorded baseline for `table`, if any.
    pub fn baseline(&self, table: &str) -> Option<f64> {
        self.tables_checksum
            .as_ref()
            .and_then(|sums| sums.get(table).copied())
    }

    /// Whether the baseline has been recorded.
    pub fn has_baseline(&self) -> bool {
        self.tables_checksum.is_some()
    }
}

/// Fixture adapter for one engine.
pub struct DialectAdapter<D: Dialect> {
    dialect: D,
    config: AdapterConfig,
    cache: SchemaCache,
}

impl<D: Dialect> DialectAdapter<D> {
    /// Create an adapter. Call [`init`](Self::init) before loading.
    pub fn new(dialect: D, config: AdapterConfig) -> Self {
        Self {
            dialect,
            config,
            cache: SchemaCache::default(),
        }
    }

    /// The underlying dialect.
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Discovered tables and checksum baseline.
    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Discovered tables, in catalog order.
    pub fn tables(&self) -> &[String] {
        &self.cache.tables
    }

    /// Discover and store the table list.
    ///
    /// On failure the previous cache contents are left untouched.
    pub async fn init(&mut self, q: &mut dyn Queryable) -> Result<()> {
        let tables = self.discover_tables(q).await?;
        info!("Discovered {} tables ({})", tables.len(), self.dialect.name());
        self.cache.tables = tables;
        self.cache.initialized = true;
        Ok(())
    }

    /// Bind-parameter syntax for this engine.
    pub fn parameter_style(&self) -> ParameterStyle {
        self.dialect.parameter_style()
    }

    /// Engine-correct quoted form of an identifier.
    pub fn quote_identifier(&self, name: &str) -> String {
        self.dialect.quote_ident(name)
    }

    /// Name of the database the connection currently uses.
    pub async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<String> {
        match self.dialect.current_database_name(q).await {
            Ok(Some(name)) if !name.is_empty() => Ok(name),
            Ok(_) => Err(FixtureError::discovery("connection has no current database")),
            Err(e) => Err(as_discovery_error(e)),
        }
    }

    /// Base tables of the current database, in catalog order.
    pub async fn discover_tables(&self, q: &mut dyn Queryable) -> Result<Vec<String>> {
        let database = self.current_database_name(q).await?;
        let tables = self
            .dialect
            .discover_tables(q, &database)
            .await
            .map_err(as_discovery_error)?;
        for table in &tables {
            validate_identifier(table)?;
        }
        debug!("Tables in {}: {:?}", database, tables);
        Ok(tables)
    }

    /// Run `routine` inside one transaction with referential integrity
    /// suspended, then reset identity generators.
    ///
    /// See [`orchestrator`] for the exact sequence and error precedence.
    pub async fn suspend_and_load<C, L>(&self, conn: &mut C, routine: &mut L) -> Result<()>
    where
        C: Connection,
        L: LoadRoutine + ?Sized,
    {
        self.ensure_initialized()?;
        orchestrator::suspend_and_load(
            &self.dialect,
            &self.cache.tables,
            &self.config,
            conn,
            routine,
        )
        .await
    }

    /// Record the checksum of every discovered table as the baseline.
    ///
    /// Only the first successful call records anything; later calls are
    /// no-ops. If any checksum fails nothing is recorded and the next call
    /// tries again.
    pub async fn after_load(&mut self, q: &mut dyn Queryable) -> Result<()> {
        if self.cache.tables_checksum.is_some() {
            return Ok(());
        }
        self.ensure_initialized()?;

        let mut sums = HashMap::with_capacity(self.cache.tables.len());
        for table in &self.cache.tables {
            let sum = self.table_checksum(q, table).await?;
            sums.insert(table.clone(), sum);
        }

        info!("Recorded checksum baseline for {} tables", sums.len());
        self.cache.tables_checksum = Some(sums);
        Ok(())
    }

    /// Whether `table` changed since the baseline.
    ///
    /// Returns `true` when no baseline exists. On `Err`, callers should
    /// assume the table was modified; see
    /// [`is_table_modified_or_assume`](Self::is_table_modified_or_assume).
    pub async fn is_table_modified(&self, q: &mut dyn Queryable, table: &str) -> Result<bool> {
        let current = self.table_checksum(q, table).await?;
        Ok(change::checksum_changed(self.cache.baseline(table), current))
    }

    /// Fail-open variant of [`is_table_modified`](Self::is_table_modified).
    pub async fn is_table_modified_or_assume(
        &self,
        q: &mut dyn Queryable,
        table: &str,
    ) -> ChangeStatus {
        ChangeStatus::from_result(self.is_table_modified(q, table).await)
    }

    /// Discovered tables whose content changed since the baseline.
    ///
    /// Stops at the first checksum error.
    pub async fn modified_tables(&self, q: &mut dyn Queryable) -> Result<Vec<String>> {
        let mut modified = Vec::new();
        for table in &self.cache.tables {
            if self.is_table_modified(q, table).await? {
                modified.push(table.clone());
            }
        }
        Ok(modified)
    }

    /// Engine-native fingerprint of `table`.
    pub async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<f64> {
        match self.dialect.table_checksum(q, table).await {
            Ok(Some(sum)) => Ok(sum),
            Ok(None) => Err(FixtureError::checksum_not_found(table)),
            Err(e @ FixtureError::Checksum { .. }) => Err(e),
            Err(e) => Err(FixtureError::checksum_query(table, e)),
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.cache.initialized {
            Ok(())
        } else {
            Err(FixtureError::Config(
                "adapter is not initialized; call init() first".into(),
            ))
        }
    }
}

fn as_discovery_error(err: FixtureError) -> FixtureError {
    match err {
        e @ FixtureError::Discovery(_) => e,
        other => FixtureError::discovery(other),
    }
}
