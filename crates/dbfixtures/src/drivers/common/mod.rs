//! Utilities shared by the built-in drivers.
//!
//! - [`tls`]: SSL mode parsing and rustls setup for PostgreSQL connections

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
