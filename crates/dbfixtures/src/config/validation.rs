//! Configuration validation.

use super::FixturesConfig;
use crate::drivers::common::SslMode;
use crate::error::{FixtureError, Result};

/// Validate the configuration.
pub fn validate(config: &FixturesConfig) -> Result<()> {
    if config.adapter.reset_sequences_to < 0 {
        return Err(FixtureError::Config(format!(
            "adapter.reset_sequences_to must not be negative, got {}",
            config.adapter.reset_sequences_to
        )));
    }

    if let Some(ref conn) = config.connection {
        if conn.host.is_empty() {
            return Err(FixtureError::Config("connection.host is required".into()));
        }
        if conn.database.is_empty() {
            return Err(FixtureError::Config(
                "connection.database is required".into(),
            ));
        }
        if conn.user.is_empty() {
            return Err(FixtureError::Config("connection.user is required".into()));
        }
        if let Some(0) = conn.port {
            return Err(FixtureError::Config(
                "connection.port must be between 1 and 65535".into(),
            ));
        }
        SslMode::parse(&conn.ssl_mode)?;
    }

    Ok(())
}
