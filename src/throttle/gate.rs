//! Attempt gate: the inbound phase.
//!
//! Reads the client's failure count under a bounded budget and decides
//! whether the transaction may reach the authentication origin. Every store
//! problem (timeout, missing key, error, malformed value) counts as zero
//! failures: the gate fails open and never rejects because of the store.

use std::sync::Arc;

use crate::observability::metrics;
use crate::store::{read_bounded, KvStore, ReadPolicy};
use crate::throttle::context::TransactionContext;
use crate::throttle::identity::ClientIdentity;
use crate::throttle::record::ClientRecord;

/// Decision for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Forward to the origin; the context travels to the outcome recorder.
    Proceed(TransactionContext),
    /// Threshold reached; answer 403 without contacting the origin.
    Reject {
        client_identity: ClientIdentity,
        failed_attempts: u64,
        max_attempts: u32,
    },
}

pub struct AttemptGate {
    store: Arc<dyn KvStore>,
    read_policy: ReadPolicy,
}

impl AttemptGate {
    pub fn new(store: Arc<dyn KvStore>, read_policy: ReadPolicy) -> Self {
        Self { store, read_policy }
    }

    /// Failure count for `identity`, or 0 if it cannot be read.
    pub async fn current_failures(&self, identity: &ClientIdentity) -> u64 {
        match read_bounded(self.store.as_ref(), identity.as_str(), self.read_policy).await {
            Ok(Some(value)) => match ClientRecord::from_value(&value) {
                Some(record) => record.failed_attempts,
                None => {
                    tracing::warn!(client = %identity, value = %value, "Malformed client record, treating as no record");
                    0
                }
            },
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(client = %identity, error = %e, "Store read failed, failing open");
                0
            }
        }
    }

    /// Decide whether the transaction may proceed.
    pub async fn admit(&self, request_id: String, client_identity: ClientIdentity, max_attempts: u32) -> Admission {
        let failed_attempts = self.current_failures(&client_identity).await;

        tracing::info!(
            request_id = %request_id,
            client = %client_identity,
            failed_attempts,
            max_attempts,
            "Resolved client failure count"
        );

        if failed_attempts >= u64::from(max_attempts) {
            tracing::warn!(
                request_id = %request_id,
                client = %client_identity,
                failed_attempts,
                "Too many failed 2FA codes, rejecting"
            );
            metrics::record_gate_decision("reject");
            return Admission::Reject {
                client_identity,
                failed_attempts,
                max_attempts,
            };
        }

        metrics::record_gate_decision("allow");
        Admission::Proceed(TransactionContext {
            request_id,
            client_identity,
            failure_count_at_entry: failed_attempts,
            max_attempts,
        })
    }
}
