//! Core abstractions for engine-agnostic fixture loading.
//!
//! - [`traits`]: Connection handle, load routine and dialect traits
//! - [`identifier`]: Identifier validation and per-engine quoting
//!
//! Driver modules (`drivers/tidb`, `drivers/postgres`, ...) implement these
//! traits; the adapter and orchestrator only ever see the traits.

pub mod identifier;
pub mod traits;

pub use traits::{Connection, Dialect, IntegrityRestore, LoadRoutine, ParameterStyle, Queryable};
