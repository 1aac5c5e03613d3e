//! Per-transaction state shared between the inbound and outbound phases.

use crate::throttle::identity::ClientIdentity;

/// Threshold used when neither config nor the transaction supplies one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// State carried from the attempt gate to the outcome recorder.
///
/// Owned by a single transaction and dropped with it, so it needs no locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    pub request_id: String,
    pub client_identity: ClientIdentity,
    /// Count read (or defaulted) on entry; the base for the increment.
    pub failure_count_at_entry: u64,
    pub max_attempts: u32,
}

/// Parse a per-transaction max attempts override.
///
/// Absent, empty, non-numeric and non-positive values all yield `fallback`.
pub fn parse_max_attempts(raw: Option<&str>, fallback: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(fallback)
}
