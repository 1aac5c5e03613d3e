//! In-process store backend.
//!
//! Keeps values in a `DashMap`. Writes can be delayed by a fixed propagation
//! delay so local setups see the same read-your-write gaps as a replicated store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::observability::metrics;
use crate::store::{runtime_handle, validate_key, KvStore, StoreResult};

/// A thread-safe in-memory key-value store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Value>>,
    propagation_delay: Duration,
}

impl MemoryStore {
    /// Create an empty store whose writes become visible after `propagation_delay`.
    pub fn new(propagation_delay: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            propagation_delay,
        }
    }

    /// Write immediately, bypassing propagation delay.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.inner.insert(key.into(), value);
    }

    /// Current value for `key` without going through the async interface.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        validate_key(key)?;
        Ok(self.peek(key))
    }

    fn put_no_wait(&self, key: &str, value: Value) -> StoreResult<()> {
        validate_key(key)?;
        let handle = runtime_handle()?;

        let inner = self.inner.clone();
        let delay = self.propagation_delay;
        let key = key.to_string();
        handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            tracing::debug!(key = %key, "Store write applied");
            inner.insert(key, value);
            metrics::record_store_write_result("ok");
        });
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
