//! In-memory database double for integration tests.
//!
//! [`MemoryEngine`] understands a tiny SQL dialect:
//!
//! - `INSERT INTO <table> VALUES (<id>, <parent id|NULL>)`
//! - `INSERT INTO <table> DEFAULT VALUES`
//! - `DELETE FROM <table>`
//! - `SET FOREIGN_KEY_CHECKS = 0|1`
//! - `ALTER TABLE <table> AUTO_INCREMENT = <n>`
//! - `CHECKSUM <table>` (numeric query)
//! - `SELECT DATABASE()` and `LIST TABLES` (string queries)
//!
//! Table data is transactional; `FOREIGN_KEY_CHECKS` is session state and
//! survives rollback, like MySQL. [`MemoryEngine::strict_transactions`]
//! switches to PostgreSQL behavior: the flag rolls back with the data and a
//! failed statement aborts the transaction until `ROLLBACK`.

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use dbfixtures::{
    BoxError, Connection, Dialect, FixtureError, IntegrityRestore, LoadRoutine, ParameterStyle,
    Queryable, Result,
};

#[derive(Debug, Clone, Default)]
struct MemTable {
    /// id -> parent id
    rows: BTreeMap<i64, Option<i64>>,
    parent: Option<String>,
    next_id: i64,
}

#[derive(Debug)]
pub struct MemoryEngine {
    database: String,
    tables: BTreeMap<String, MemTable>,
    snapshot: Option<(BTreeMap<String, MemTable>, bool)>,
    fk_checks: bool,
    strict: bool,
    aborted: bool,
    failures: Vec<String>,
    pub log: Vec<String>,
}

impl MemoryEngine {
    /// Engine with no tables.
    pub fn empty(database: &str) -> Self {
        Self {
            database: database.to_string(),
            tables: BTreeMap::new(),
            snapshot: None,
            fk_checks: true,
            strict: false,
            aborted: false,
            failures: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Engine with `users` and `posts` (posts.parent -> users.id).
    pub fn blog() -> Self {
        let mut engine = Self::empty("blog_test");
        engine.create_table("users", None);
        engine.create_table("posts", Some("users"));
        engine
    }

    pub fn create_table(&mut self, name: &str, parent: Option<&str>) {
        self.tables.insert(
            name.to_string(),
            MemTable {
                rows: BTreeMap::new(),
                parent: parent.map(str::to_string),
                next_id: 1,
            },
        );
    }

    /// Transactional `FOREIGN_KEY_CHECKS` and aborted transactions.
    pub fn strict_transactions(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn drop_table(&mut self, name: &str) {
        self.tables.remove(name);
    }

    /// Fail every statement containing `pattern`.
    pub fn fail_on(&mut self, pattern: &str) {
        self.failures.push(pattern.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn fk_checks(&self) -> bool {
        self.fk_checks
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn row_ids(&self, table: &str) -> Vec<i64> {
        self.tables
            .get(table)
            .map(|t| t.rows.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn next_id(&self, table: &str) -> Option<i64> {
        self.tables.get(table).map(|t| t.next_id)
    }

    /// Write outside any fixture load, as a test under way would.
    pub fn insert_row(&mut self, table: &str, parent: Option<i64>) -> Result<i64> {
        let t = self.table_mut(table)?;
        let id = t.next_id;
        t.rows.insert(id, parent);
        t.next_id = id + 1;
        Ok(id)
    }

    pub fn checksum(&self, table: &str) -> Option<f64> {
        let t = self.tables.get(table)?;
        if t.rows.is_empty() {
            return Some(0.0);
        }
        let mut hasher = DefaultHasher::new();
        t.rows.hash(&mut hasher);
        // Keep 52 bits so the value is exact in an f64; never 0.
        Some(((hasher.finish() >> 12) | 1) as f64)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| FixtureError::Query(format!("no such table: {}", name)))
    }

    fn run(&mut self, sql: &str) -> Result<u64> {
        self.log.push(sql.to_string());
        self.check_aborted()?;
        let result = self.apply(sql);
        if result.is_err() && self.strict && self.snapshot.is_some() {
            self.aborted = true;
        }
        result
    }

    fn check_aborted(&self) -> Result<()> {
        if self.aborted {
            return Err(FixtureError::Query(
                "current transaction is aborted, commands ignored until end of transaction block"
                    .into(),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, sql: &str) -> Result<u64> {
        if self.failures.iter().any(|p| sql.contains(p.as_str())) {
            return Err(FixtureError::Query(format!("injected failure: {}", sql)));
        }

        let words: Vec<&str> = sql
            .split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ',')
            .filter(|w| !w.is_empty())
            .collect();

        match words.as_slice() {
            ["SET", "FOREIGN_KEY_CHECKS", "=", value] => {
                self.fk_checks = *value == "1";
                Ok(0)
            }
            ["INSERT", "INTO", table, "DEFAULT", "VALUES"] => {
                let table = table.to_string();
                self.insert_row(&table, None).map(|_| 1)
            }
            ["INSERT", "INTO", table, "VALUES", id, parent] => {
                let id: i64 = parse(id)?;
                let parent = if *parent == "NULL" {
                    None
                } else {
                    Some(parse(parent)?)
                };
                self.insert_explicit(table, id, parent).map(|_| 1)
            }
            ["DELETE", "FROM", table] => {
                let table = table.to_string();
                self.delete_all(&table)
            }
            ["ALTER", "TABLE", table, "AUTO_INCREMENT", "=", n] => {
                let n: i64 = parse(n)?;
                let t = self.table_mut(table)?;
                let max = t.rows.keys().next_back().copied().unwrap_or(0);
                t.next_id = n.max(max + 1);
                Ok(0)
            }
            _ => Err(FixtureError::Query(format!("syntax error: {}", sql))),
        }
    }

    fn insert_explicit(&mut self, table: &str, id: i64, parent: Option<i64>) -> Result<()> {
        let parent_table = self.table_mut(table)?.parent.clone();
        if let (true, Some(parent_table), Some(parent_id)) = (self.fk_checks, parent_table, parent) {
            let exists = self
                .tables
                .get(&parent_table)
                .is_some_and(|t| t.rows.contains_key(&parent_id));
            if !exists {
                return Err(FixtureError::Query(format!(
                    "foreign key violation: {}.parent = {}",
                    table, parent_id
                )));
            }
        }

        let t = self.table_mut(table)?;
        if t.rows.contains_key(&id) {
            return Err(FixtureError::Query(format!("duplicate key {} in {}", id, table)));
        }
        t.rows.insert(id, parent);
        t.next_id = t.next_id.max(id + 1);
        Ok(())
    }

    fn delete_all(&mut self, table: &str) -> Result<u64> {
        if self.fk_checks {
            let referenced = self.tables.values().any(|t| {
                t.parent.as_deref() == Some(table) && t.rows.values().any(Option::is_some)
            });
            if referenced {
                return Err(FixtureError::Query(format!(
                    "foreign key violation: {} is referenced",
                    table
                )));
            }
        }
        let t = self.table_mut(table)?;
        let n = t.rows.len() as u64;
        t.rows.clear();
        Ok(n)
    }
}

fn parse(word: &str) -> Result<i64> {
    word.parse()
        .map_err(|_| FixtureError::Query(format!("not a number: {}", word)))
}

#[async_trait]
impl Queryable for MemoryEngine {
    async fn query_string(&mut self, sql: &str, _params: &[&str]) -> Result<Option<String>> {
        self.log.push(sql.to_string());
        self.check_aborted()?;
        match sql {
            "SELECT DATABASE()" => Ok(Some(self.database.clone())),
            _ => Err(FixtureError::Query(format!("syntax error: {}", sql))),
        }
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> Result<Vec<String>> {
        self.log.push(sql.to_string());
        self.check_aborted()?;
        match sql {
            "LIST TABLES" if params == [self.database.as_str()] => {
                Ok(self.tables.keys().cloned().collect())
            }
            "LIST TABLES" => Ok(Vec::new()),
            _ => Err(FixtureError::Query(format!("syntax error: {}", sql))),
        }
    }

    async fn query_f64(&mut self, sql: &str, _column: usize) -> Result<Option<f64>> {
        self.log.push(sql.to_string());
        self.check_aborted()?;
        if self.failures.iter().any(|p| sql.contains(p.as_str())) {
            return Err(FixtureError::Query(format!("injected failure: {}", sql)));
        }
        match sql.strip_prefix("CHECKSUM ") {
            Some(table) => Ok(self.checksum(table)),
            None => Err(FixtureError::Query(format!("syntax error: {}", sql))),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.run(sql)
    }
}

#[async_trait]
impl Connection for MemoryEngine {
    async fn begin(&mut self) -> Result<()> {
        self.log.push("BEGIN".to_string());
        if self.snapshot.is_some() {
            return Err(FixtureError::Query("transaction already open".into()));
        }
        self.snapshot = Some((self.tables.clone(), self.fk_checks));
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.log.push("COMMIT".to_string());
        if self.aborted {
            self.restore_snapshot()?;
            return Err(FixtureError::Query("transaction was aborted".into()));
        }
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| FixtureError::Query("no transaction".into()))
    }

    async fn rollback(&mut self) -> Result<()> {
        self.log.push("ROLLBACK".to_string());
        self.restore_snapshot()
    }
}

impl MemoryEngine {
    fn restore_snapshot(&mut self) -> Result<()> {
        self.aborted = false;
        match self.snapshot.take() {
            Some((tables, fk_checks)) => {
                self.tables = tables;
                if self.strict {
                    self.fk_checks = fk_checks;
                }
                Ok(())
            }
            None => Err(FixtureError::Query("no transaction".into())),
        }
    }
}

/// Dialect speaking the [`MemoryEngine`] mini language.
pub struct MemoryDialect;

#[async_trait]
impl Dialect for MemoryDialect {
    fn name(&self) -> &str {
        "memory"
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Question
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<Option<String>> {
        q.query_string("SELECT DATABASE()", &[]).await
    }

    async fn discover_tables(&self, q: &mut dyn Queryable, database: &str) -> Result<Vec<String>> {
        q.query_strings("LIST TABLES", &[database]).await
    }

    async fn disable_integrity(
        &self,
        tx: &mut dyn Queryable,
        _tables: &[String],
    ) -> Result<IntegrityRestore> {
        tx.execute("SET FOREIGN_KEY_CHECKS = 0").await?;
        Ok(IntegrityRestore::new(vec![
            "SET FOREIGN_KEY_CHECKS = 1".to_string(),
        ]))
    }

    async fn reset_sequence(&self, conn: &mut dyn Queryable, table: &str, floor: i64) -> Result<()> {
        conn.execute(&format!("ALTER TABLE {} AUTO_INCREMENT = {}", table, floor))
            .await?;
        Ok(())
    }

    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>> {
        q.query_f64(&format!("CHECKSUM {}", table), 0).await
    }
}

/// [`MemoryDialect`] for [`MemoryEngine::strict_transactions`] engines,
/// where rollback also undoes the integrity suspension.
pub struct TransactionalMemoryDialect;

#[async_trait]
impl Dialect for TransactionalMemoryDialect {
    fn name(&self) -> &str {
        "memory-strict"
    }

    fn parameter_style(&self) -> ParameterStyle {
        MemoryDialect.parameter_style()
    }

    fn quote_ident(&self, name: &str) -> String {
        MemoryDialect.quote_ident(name)
    }

    async fn current_database_name(&self, q: &mut dyn Queryable) -> Result<Option<String>> {
        MemoryDialect.current_database_name(q).await
    }

    async fn discover_tables(&self, q: &mut dyn Queryable, database: &str) -> Result<Vec<String>> {
        MemoryDialect.discover_tables(q, database).await
    }

    async fn disable_integrity(
        &self,
        tx: &mut dyn Queryable,
        tables: &[String],
    ) -> Result<IntegrityRestore> {
        let restore = MemoryDialect.disable_integrity(tx, tables).await?;
        Ok(IntegrityRestore::transactional(restore.statements))
    }

    async fn reset_sequence(&self, conn: &mut dyn Queryable, table: &str, floor: i64) -> Result<()> {
        MemoryDialect.reset_sequence(conn, table, floor).await
    }

    async fn table_checksum(&self, q: &mut dyn Queryable, table: &str) -> Result<Option<f64>> {
        MemoryDialect.table_checksum(q, table).await
    }
}

/// Load routine that runs a list of statements, optionally failing early.
pub struct Fixture {
    statements: Vec<String>,
    fail_before: Option<usize>,
    pub runs: usize,
}

impl Fixture {
    pub fn new(statements: &[&str]) -> Self {
        Self {
            statements: statements.iter().map(|s| s.to_string()).collect(),
            fail_before: None,
            runs: 0,
        }
    }

    /// Fail with a routine error before running statement `index`.
    pub fn failing_before(mut self, index: usize) -> Self {
        self.fail_before = Some(index);
        self
    }

    /// Users 1-2 and posts 10-11. Posts are inserted first, so the load
    /// only succeeds with foreign key checks off.
    pub fn blog() -> Self {
        Self::new(&[
            "DELETE FROM posts",
            "DELETE FROM users",
            "INSERT INTO posts VALUES (10, 1)",
            "INSERT INTO posts VALUES (11, 2)",
            "INSERT INTO users VALUES (1, NULL)",
            "INSERT INTO users VALUES (2, NULL)",
        ])
    }
}

#[async_trait]
impl LoadRoutine for Fixture {
    async fn load(&mut self, tx: &mut dyn Queryable) -> std::result::Result<(), BoxError> {
        self.runs += 1;
        for (i, sql) in self.statements.iter().enumerate() {
            if self.fail_before == Some(i) {
                return Err(format!("fixture aborted before statement {}", i).into());
            }
            tx.execute(sql).await?;
        }
        Ok(())
    }
}

/// Install a test subscriber so `RUST_LOG=debug cargo test` shows traces.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
