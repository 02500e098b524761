//! Checksum-based change detection.

use crate::error::FixtureError;

/// Baseline value meaning "no fingerprint recorded".
pub const UNKNOWN_CHECKSUM: f64 = 0.0;

/// Compare a fresh checksum against the recorded baseline.
///
/// A missing or zero baseline always counts as modified.
pub fn checksum_changed(baseline: Option<f64>, current: f64) -> bool {
    match baseline {
        None => true,
        Some(b) if b == UNKNOWN_CHECKSUM => true,
        Some(b) => b != current,
    }
}

/// Fail-open result of a modification check.
///
/// `modified` is `true` whenever `error` is set, so callers that only look
/// at the flag reload the table rather than trust stale data.
#[derive(Debug)]
pub struct ChangeStatus {
    /// Whether the table should be treated as modified.
    pub modified: bool,
    /// Why the check could not complete, if it failed.
    pub error: Option<FixtureError>,
}

impl ChangeStatus {
    pub(crate) fn from_result(result: crate::error::Result<bool>) -> Self {
        match result {
            Ok(modified) => Self {
                modified,
                error: None,
            },
            Err(e) => Self {
                modified: true,
                error: Some(e),
            },
        }
    }

    /// Split into the `(modified, error)` pair.
    pub fn into_parts(self) -> (bool, Option<FixtureError>) {
        (self.modified, self.error)
    }
}
