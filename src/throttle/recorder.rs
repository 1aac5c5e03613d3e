//! Outcome recorder: the outbound phase.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::observability::metrics;
use crate::store::{KvStore, StoreError};
use crate::throttle::context::TransactionContext;
use crate::throttle::record::ClientRecord;

/// The only origin status treated as an approved 2FA code.
pub const APPROVED_STATUS: StatusCode = StatusCode::OK;

/// What the recorder did for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Origin approved the code; nothing written.
    Approved,
    /// A write of the incremented count was issued (not awaited).
    FailureRecorded { failed_attempts: u64 },
    /// The write could not even be issued.
    WriteFailed { failed_attempts: u64 },
}

pub struct OutcomeRecorder {
    store: Arc<dyn KvStore>,
}

impl OutcomeRecorder {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Record the origin's verdict for a transaction the gate let through.
    ///
    /// Non-blocking: a failure issues one fire-and-forget write of
    /// `failure_count_at_entry + 1`. Concurrent failures from the same
    /// client may all write the same value.
    pub fn record(&self, ctx: &TransactionContext, status: StatusCode) -> Outcome {
        if status == APPROVED_STATUS {
            tracing::info!(request_id = %ctx.request_id, client = %ctx.client_identity, "2FA approved");
            return Outcome::Approved;
        }

        let record = ClientRecord::new(ctx.failure_count_at_entry).next_failure();
        let failed_attempts = record.failed_attempts;

        let issued = record
            .to_value()
            .map_err(|e| StoreError::Encode(e.to_string()))
            .and_then(|value| self.store.put_no_wait(ctx.client_identity.as_str(), value));

        match issued {
            Ok(()) => {
                metrics::record_store_write("issued");
                tracing::info!(
                    request_id = %ctx.request_id,
                    client = %ctx.client_identity,
                    status = %status,
                    failed_attempts,
                    "2FA failed, recording attempt"
                );
                Outcome::FailureRecorded { failed_attempts }
            }
            Err(e) => {
                metrics::record_store_write(e.kind());
                tracing::warn!(
                    request_id = %ctx.request_id,
                    client = %ctx.client_identity,
                    error = %e,
                    "Failed to issue store write"
                );
                Outcome::WriteFailed { failed_attempts }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::IdentityConfig;
    use crate::store::{MemoryStore, StoreResult};
    use crate::throttle::identity::resolve;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Remembers every write issued to it.
    #[derive(Default)]
    struct WriteLog {
        writes: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl KvStore for WriteLog {
        async fn get(&self, _key: &str) -> StoreResult<Option<Value>> {
            Ok(None)
        }

        fn put_no_wait(&self, key: &str, value: Value) -> StoreResult<()> {
            self.writes.lock().unwrap().push((key.to_string(), value));
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "write-log"
        }
    }

    fn ctx(ip: &str, failures: u64) -> TransactionContext {
        TransactionContext {
            request_id: "r1".into(),
            client_identity: resolve(Some(ip), &IdentityConfig::default()).unwrap(),
            failure_count_at_entry: failures,
            max_attempts: 3,
        }
    }

    #[test]
    fn test_approval_writes_nothing() {
        let log = Arc::new(WriteLog::default());
        let recorder = OutcomeRecorder::new(log.clone());

        assert_eq!(recorder.record(&ctx("10.0.0.1", 2), StatusCode::OK), Outcome::Approved);
        assert!(log.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_every_other_status_writes_once() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FOUND,
            StatusCode::NO_CONTENT,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let log = Arc::new(WriteLog::default());
            let recorder = OutcomeRecorder::new(log.clone());

            assert_eq!(
                recorder.record(&ctx("10.0.0.1", 1), status),
                Outcome::FailureRecorded { failed_attempts: 2 }
            );
            let writes = log.writes.lock().unwrap();
            assert_eq!(writes.len(), 1, "status {}", status);
            assert_eq!(writes[0], ("10-0-0-1".to_string(), json!({"failedAttempts": 2})));
        }
    }

    #[test]
    fn test_write_issue_failure_is_contained() {
        // No runtime here, so the memory store cannot spawn the write.
        let recorder = OutcomeRecorder::new(Arc::new(MemoryStore::default()));
        assert_eq!(
            recorder.record(&ctx("10.0.0.1", 0), StatusCode::UNAUTHORIZED),
            Outcome::WriteFailed { failed_attempts: 1 }
        );
    }

    #[tokio::test]
    async fn test_failure_lands_in_store() {
        let store = MemoryStore::default();
        let recorder = OutcomeRecorder::new(Arc::new(store.clone()));

        recorder.record(&ctx("10.0.0.1", 0), StatusCode::UNAUTHORIZED);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.peek("10-0-0-1"), Some(json!({"failedAttempts": 1})));
    }

    #[tokio::test]
    async fn test_concurrent_failures_from_same_base_undercount() {
        let store = MemoryStore::default();
        let recorder = OutcomeRecorder::new(Arc::new(store.clone()));

        let base = ctx("10.0.0.1", 1);
        recorder.record(&base, StatusCode::UNAUTHORIZED);
        recorder.record(&base, StatusCode::UNAUTHORIZED);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.peek("10-0-0-1"), Some(json!({"failedAttempts": 2})));
    }
}
