//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity floor used when `reset_sequences_to` is 0.
pub const DEFAULT_RESET_SEQUENCES_TO: i64 = 10_000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixturesConfig {
    /// Adapter behavior.
    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Connection settings for the built-in drivers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionConfig>,
}

/// Behavior shared by every dialect adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Skip the identity/sequence reset after each load (default: false).
    #[serde(default)]
    pub skip_reset_sequences: bool,

    /// Floor for identity generators after a load. 0 means the default of 10000.
    #[serde(default)]
    pub reset_sequences_to: i64,

    /// PostgreSQL-specific options.
    #[serde(default)]
    pub postgres: PostgresOptions,
}

impl AdapterConfig {
    /// Floor actually applied by the sequence reset.
    pub fn effective_reset_floor(&self) -> i64 {
        if self.reset_sequences_to == 0 {
            DEFAULT_RESET_SEQUENCES_TO
        } else {
            self.reset_sequences_to
        }
    }
}

/// PostgreSQL-specific adapter options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresOptions {
    /// How foreign keys are suspended during a load (default: disable_triggers).
    #[serde(default)]
    pub integrity_mode: PgIntegrityMode,
}

/// Strategy for suspending foreign keys on PostgreSQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PgIntegrityMode {
    /// `ALTER TABLE ... DISABLE TRIGGER ALL`. Requires superuser.
    #[default]
    DisableTriggers,

    /// Make foreign keys deferrable and `SET CONSTRAINTS ALL DEFERRED`.
    /// Works for table owners without superuser.
    DeferConstraints,
}

/// Connection settings for the built-in drivers.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port. Defaults per engine when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SSL mode: disable, require, verify-ca, verify-full (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,
}

impl ConnectionConfig {
    /// Port to connect to, falling back to the engine default.
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

fn default_disable() -> String {
    "disable".to_string()
}
