//! Persisted failure counter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The one value stored per client: `{"failedAttempts": n}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub failed_attempts: u64,
}

impl ClientRecord {
    pub fn new(failed_attempts: u64) -> Self {
        Self { failed_attempts }
    }

    /// Decode a stored value. Anything but an object with a non-negative
    /// integer `failedAttempts` field is not trusted and yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Record with one more failure.
    pub fn next_failure(self) -> Self {
        Self::new(self.failed_attempts.saturating_add(1))
    }
}
