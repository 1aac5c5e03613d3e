//! Key-value store subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt gate
//!     → read_bounded (deadline + retries on timeout)
//!     → KvStore::get (memory.rs | http.rs)
//!
//! Outcome recorder
//!     → KvStore::put_no_wait (spawns the write, returns immediately)
//! ```
//!
//! # Design Decisions
//! - The store is best-effort and eventually consistent; nothing here adds
//!   locking or compare-and-swap on top of it
//! - "Not found" is `Ok(None)`, not an error
//! - Both backends enforce the same key rule so a bad key fails the same way
//!   in tests and in production

pub mod http;
pub mod memory;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::schema::{StoreBackend, StoreConfig};
use crate::observability::metrics;
use crate::resilience::retry_on_timeout;

pub use http::HttpStore;
pub use memory::MemoryStore;
pub use types::{is_valid_key, validate_key, StoreError, StoreResult, MAX_KEY_LEN};

/// Operations the throttle needs from an external key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Single read attempt. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Issue a write without waiting for it to complete.
    ///
    /// Only failures detected while issuing the call are returned; the
    /// outcome of the write itself is logged by the backend.
    fn put_no_wait(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Backend name for logs and the admin API.
    fn backend_name(&self) -> &'static str;
}

/// Time budget and retry count for store reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    /// Total budget for the read, retries included.
    pub timeout: Duration,
    /// Extra attempts after a transient timeout.
    pub retries_on_timeout: u32,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            retries_on_timeout: 2,
        }
    }
}

impl From<&StoreConfig> for ReadPolicy {
    fn from(config: &StoreConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.read_timeout_ms),
            retries_on_timeout: config.retries_on_timeout,
        }
    }
}

/// Read `key` within the policy's budget.
pub async fn read_bounded(store: &dyn KvStore, key: &str, policy: ReadPolicy) -> StoreResult<Option<Value>> {
    let result = retry_on_timeout(policy.timeout, policy.retries_on_timeout, || store.get(key)).await;

    match &result {
        Ok(Some(_)) => metrics::record_store_read("hit"),
        Ok(None) => metrics::record_store_read("miss"),
        Err(e) => metrics::record_store_read(e.kind()),
    }
    result
}

/// Build the configured store backend.
pub fn build_store(config: &StoreConfig) -> StoreResult<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(Duration::from_millis(config.propagation_delay_ms))),
        StoreBackend::Http => Arc::new(HttpStore::new(config)?),
    };

    tracing::info!(
        backend = store.backend_name(),
        read_timeout_ms = config.read_timeout_ms,
        retries_on_timeout = config.retries_on_timeout,
        "Store initialized"
    );
    Ok(store)
}

/// Handle to the ambient Tokio runtime for spawning fire-and-forget writes.
pub(crate) fn runtime_handle() -> StoreResult<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current()
        .map_err(|e| StoreError::Unavailable(format!("no async runtime to issue write: {}", e)))
}
