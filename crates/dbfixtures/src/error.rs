//! Error types for fixture loading.

use std::fmt;

use thiserror::Error;

/// Boxed error returned by caller-supplied load routines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for fixture loading operations.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Configuration error (invalid YAML, out-of-range values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog query failed or returned no usable database name
    #[error("Schema discovery failed: {0}")]
    Discovery(String),

    /// Enabling or disabling constraint enforcement failed
    #[error("Failed to {action} referential integrity: {message}")]
    IntegrityToggle {
        action: IntegrityAction,
        message: String,
    },

    /// The caller's row-loading routine failed
    #[error("Fixture load routine failed: {0}")]
    LoadRoutine(#[source] BoxError),

    /// Identity/sequence reset failed for a table
    #[error("Sequence reset failed for table {table}: {message}")]
    SequenceReset { table: String, message: String },

    /// Checksum query failed or the table has no fingerprint
    #[error("Checksum failed for table {table}: {kind}")]
    Checksum {
        table: String,
        kind: ChecksumErrorKind,
    },

    /// Begin, commit or rollback failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A query against the connection failed
    #[error("Query failed: {0}")]
    Query(String),

    /// PostgreSQL driver error
    #[error("PostgreSQL error: {}", postgres_message(.0))]
    Postgres(#[from] tokio_postgres::Error),

    /// SQL Server driver error
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// MySQL/TiDB driver error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// IO error (config files, sockets)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Direction of a referential-integrity toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityAction {
    Disable,
    Enable,
}

impl fmt::Display for IntegrityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityAction::Disable => f.write_str("disable"),
            IntegrityAction::Enable => f.write_str("enable"),
        }
    }
}

/// Why a checksum could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumErrorKind {
    /// The table does not exist or the engine reported no fingerprint.
    NotFound,
    /// The fingerprint query itself failed.
    Query(String),
}

impl fmt::Display for ChecksumErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumErrorKind::NotFound => f.write_str("table does not exist"),
            ChecksumErrorKind::Query(msg) => write!(f, "{}", msg),
        }
    }
}

impl FixtureError {
    /// Create a Discovery error.
    pub fn discovery(message: impl fmt::Display) -> Self {
        FixtureError::Discovery(message.to_string())
    }

    /// Create an IntegrityToggle error.
    pub fn integrity(action: IntegrityAction, message: impl fmt::Display) -> Self {
        FixtureError::IntegrityToggle {
            action,
            message: message.to_string(),
        }
    }

    /// Create a SequenceReset error.
    pub fn sequence_reset(table: impl Into<String>, message: impl fmt::Display) -> Self {
        FixtureError::SequenceReset {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Checksum error for a table that has no fingerprint.
    pub fn checksum_not_found(table: impl Into<String>) -> Self {
        FixtureError::Checksum {
            table: table.into(),
            kind: ChecksumErrorKind::NotFound,
        }
    }

    /// Create a Checksum error for a failed fingerprint query.
    pub fn checksum_query(table: impl Into<String>, message: impl fmt::Display) -> Self {
        FixtureError::Checksum {
            table: table.into(),
            kind: ChecksumErrorKind::Query(message.to_string()),
        }
    }

    /// Create a Transaction error.
    pub fn transaction(message: impl fmt::Display) -> Self {
        FixtureError::Transaction(message.to_string())
    }

    /// True for the "table does not exist" checksum sub-kind.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FixtureError::Checksum {
                kind: ChecksumErrorKind::NotFound,
                ..
            }
        )
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Server message and SQLSTATE for database errors, otherwise the driver
/// message with its cause. `tokio_postgres::Error` alone displays only
/// "db error".
fn postgres_message(err: &tokio_postgres::Error) -> String {
    if let Some(db) = err.as_db_error() {
        let mut message = format!("{} (SQLSTATE {})", db.message(), db.code().code());
        if let Some(detail) = db.detail() {
            message.push_str(": ");
            message.push_str(detail);
        }
        return message;
    }

    let message = err.to_string();
    match std::error::Error::source(err) {
        Some(cause) => {
            let cause = cause.to_string();
            if message.contains(&cause) {
                message
            } else {
                format!("{}: {}", message, cause)
            }
        }
        None => message,
    }
}

/// Result type alias for fixture operations.
pub type Result<T> = std::result::Result<T, FixtureError>;
