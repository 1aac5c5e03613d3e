//! Store types and error definitions.

use thiserror::Error;

/// Longest key the store accepts.
pub const MAX_KEY_LEN: usize = 512;

/// Errors that can occur while talking to the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation did not finish inside its time budget.
    #[error("store operation timed out")]
    Timeout,

    /// Key violates the store's naming rules.
    #[error("invalid store key '{0}'")]
    InvalidKey(String),

    /// Connection or request failed before a response arrived.
    #[error("store transport error: {0}")]
    Transport(String),

    /// Store answered with an unexpected HTTP status.
    #[error("store returned status {0}")]
    Status(u16),

    /// Stored value could not be decoded as JSON.
    #[error("malformed store value: {0}")]
    Decode(String),

    /// Value could not be encoded for writing.
    #[error("failed to encode store value: {0}")]
    Encode(String),

    /// Store client not initialized or no runtime to issue the call on.
    #[error("store not available: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Transient failures are the only ones worth retrying inside a read budget.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout)
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Timeout => "timeout",
            StoreError::InvalidKey(_) => "invalid_key",
            StoreError::Transport(_) => "transport",
            StoreError::Status(_) => "status",
            StoreError::Decode(_) => "decode",
            StoreError::Encode(_) => "encode",
            StoreError::Unavailable(_) => "unavailable",
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Returns true if `key` satisfies the store naming rule: 1 to 512 characters
/// drawn from ASCII letters, digits, underscore and hyphen.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Reject keys the store would refuse.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rules() {
        assert!(is_valid_key("10-0-0-1"));
        assert!(is_valid_key("unknown-client"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("10.0.0.1"));
        assert!(!is_valid_key("2001:db8::1"));
        assert!(!is_valid_key(&"a".repeat(MAX_KEY_LEN + 1)));
        assert!(is_valid_key(&"a".repeat(MAX_KEY_LEN)));
    }

    #[test]
    fn test_only_timeouts_are_transient() {
        assert!(StoreError::Timeout.is_transient());
        assert!(!StoreError::Status(500).is_transient());
        assert!(!StoreError::InvalidKey("x.y".into()).is_transient());
    }
}
