//! Test doubles shared by the unit tests.
//!
//! [`ScriptedQueryable`] records every statement it sees and answers queries
//! from canned replies matched by substring. [`RecordingDialect`] is a
//! minimal dialect whose statements are easy to assert on.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::core::traits::{Connection, Dialect, IntegrityRestore, ParameterStyle, Queryable};
use crate::error::{BoxError, FixtureError, Result};

enum Reply {
    Strings(Vec<Option<String>>),
    Float(Option<f64>),
}

/// Queryable that records SQL and replays canned results.
#[derive(Default)]
pub(crate) struct ScriptedQueryable {
    /// Every query and statement, in order.
    pub log: Vec<String>,
    /// Bound parameters, one entry per query.
    pub params: Vec<Vec<String>>,
    replies: Vec<(String, Reply)>,
    failures: Vec<String>,
    abort_on_error: bool,
    aborted: bool,
}

impl ScriptedQueryable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `pattern` with one row per value.
    pub fn reply_strings(mut self, pattern: &str, values: &[&str]) -> Self {
        let rows = values.iter().map(|v| Some(v.to_string())).collect();
        self.replies.push((pattern.to_string(), Reply::Strings(rows)));
        self
    }

    /// Answer queries containing `pattern` with a single NULL.
    pub fn reply_null(mut self, pattern: &str) -> Self {
        self.replies
            .push((pattern.to_string(), Reply::Strings(vec![None])));
        self
    }

    /// Answer numeric queries containing `pattern`.
    pub fn reply_f64(mut self, pattern: &str, value: Option<f64>) -> Self {
        self.replies.push((pattern.to_string(), Reply::Float(value)));
        self
    }

    /// Fail every query or statement containing `pattern`.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.failures.push(pattern.to_string());
        self
    }

    /// After a failed statement, reject everything but `ROLLBACK`, like a
    /// PostgreSQL transaction in the aborted state.
    pub fn abort_on_error(mut self) -> Self {
        self.abort_on_error = true;
        self
    }

    /// Replace the reply for `pattern` (used to simulate external writes).
    pub fn set_f64(&mut self, pattern: &str, value: Option<f64>) {
        self.replies.retain(|(p, _)| p != pattern);
        self.replies.push((pattern.to_string(), Reply::Float(value)));
    }

    /// Position of the first logged statement containing `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.log.iter().position(|sql| sql.contains(pattern))
    }

    fn record(&mut self, sql: &str, params: &[&str]) -> Result<()> {
        self.log.push(sql.to_string());
        self.params
            .push(params.iter().map(|p| p.to_string()).collect());
        if sql == "ROLLBACK" {
            self.aborted = false;
        } else if self.aborted {
            return Err(FixtureError::Query(
                "current transaction is aborted, commands ignored until end of transaction block"
                    .into(),
            ));
        }
        if self.failures.iter().any(|p| sql.contains(p.as_str())) {
            self.aborted = self.abort_on_error;
            return Err(FixtureError::Query(format!("scripted failure: {}", sql)));
        }
        Ok(())
    }

    fn reply(&self, sql: &str) -> Option<&Reply> {
        self.replies
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, reply)| reply)
    }
}

#[async_trait]
impl Queryable for ScriptedQueryable {
    async fn query_string(&mut self, sql: &str, params: &[&str]) -> Result<Option<String>> {
        self.record(sql, params)?;
        Ok(match self.reply(sql) {
            Some(Reply::Strings(rows)) => rows.first().cloned().flatten(),
            _ => None,
        })
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>> {
        self.record(sql, params)?;
        Ok(match self.reply(sql) {
            Some(Reply::Strings(rows)) => rows.iter().flatten().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn query_f64(&mut self, sql: &str, _column: usize) -> Result<Option<f64>> {
        self.record(sql, &[])?;
        Ok(match self.reply(sql) {
            Some(Reply::Float(value)) => *value,
            _ => None,
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.record(sql, &[])?;
        Ok(0)
    }
}

#[async_trait]
impl Connection for ScriptedQueryable {
    async fn begin(&mut self) -> Result<()> {
        self.record("BEGIN", &[])
    }

    async fn commit(&mut self) -> Result<()> {
        self.record("COMMIT", &[])
    }

    async fn rollback(&mut self) -> Result<()> {
        self.record("ROLLBACK", &[])
    }
}

/// Dialect issuing plain marker statements.
///
/// - integrity: `DISABLE FK` / `ENABLE FK`
/// - identity: `RESET <table> <floor>`
/// - checksum: `CHECKSUM <table>`
#[derive(Default)]
pub(crate) struct RecordingDialect {
    transactional: bool,
}

impl RecordingDialect {
    /// Dialect whose suspension is undone by rollback.
    pub fn transactional() -> Self {
        Self { transactional: true }
    }
}

#[async_trait]
impl Dialect for RecordingDialect {
    fn name(&self) -> &str {
        "recording"
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Question
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("<{}>", name)
    }

    async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<Option<String>> {
        q.query_string("CURRENT DATABASE", &[]).await
    }

    async fn discover_tables(&self, q: &mut dyn Queryable, database: &str) -> Result<Vec<String>> {
        q.query_strings("LIST TABLES", &[database]).await
    }

    async fn disable_integrity(
        &self,
        tx: &mut dyn Queryable,
        _tables: &[String],
    ) -> Result<IntegrityRestore> {
        tx.execute("DISABLE FK").await?;
        let statements = vec!["ENABLE FK".to_string()];
        Ok(if self.transactional {
            IntegrityRestore::transactional(statements)
        } else {
            IntegrityRestore::new(statements)
        })
    }

    async fn reset_sequence(&self, conn: &mut dyn Queryable, table: &str, floor: i64) -> Result<()> {
        conn.execute(&format!("RESET {} {}", table, floor)).await?;
        Ok(())
    }

    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>> {
        q.query_f64(&format!("CHECKSUM {}", table), 0).await
    }
}

/// Load routine that inserts one row.
pub(crate) fn insert_one(tx: &mut dyn Queryable) -> BoxFuture<'_, std::result::Result<(), BoxError>> {
    Box::pin(async move {
        tx.execute("INSERT INTO users VALUES (1)").await?;
        Ok(())
    })
}

/// Load routine that always fails.
pub(crate) fn fail_load(tx: &mut dyn Queryable) -> BoxFuture<'_, std::result::Result<(), BoxError>> {
    Box::pin(async move {
        tx.execute("INSERT INTO orders VALUES (1)").await?;
        Err("orders: foreign key violation".into())
    })
}
