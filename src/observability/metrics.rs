//! Metrics collection and exposition.
//!
//! # Metrics
//! - `twofa_gate_decisions_total` (counter): decision = allow | reject
//! - `twofa_store_reads_total` (counter): outcome = hit | miss | timeout | ...
//! - `twofa_store_writes_total` (counter): writes issued, or why not
//! - `twofa_store_write_results_total` (counter): completion of issued writes
//! - `twofa_requests_total` (counter): origin responses by status
//! - `twofa_request_duration_seconds` (histogram): origin round trip

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    describe_metrics();

    let builder = match PrometheusBuilder::new().with_http_listener(addr).set_buckets_for_metric(
        Matcher::Suffix("duration_seconds".to_string()),
        &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
    ) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Failed to configure metrics exporter");
            return;
        }
    };

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn describe_metrics() {
    describe_counter!("twofa_gate_decisions_total", "Attempt gate decisions");
    describe_counter!("twofa_store_reads_total", "Bounded store reads by outcome");
    describe_counter!("twofa_store_writes_total", "Failure counter writes issued or refused at call time");
    describe_counter!("twofa_store_write_results_total", "Completion of fire-and-forget writes");
    describe_counter!("twofa_requests_total", "Origin responses by status");
    describe_histogram!("twofa_request_duration_seconds", "Origin round trip time");
}

pub fn record_gate_decision(decision: &'static str) {
    counter!("twofa_gate_decisions_total", "decision" => decision).increment(1);
}

pub fn record_store_read(outcome: &'static str) {
    counter!("twofa_store_reads_total", "outcome" => outcome).increment(1);
}

pub fn record_store_write(outcome: &'static str) {
    counter!("twofa_store_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_store_write_result(result: &'static str) {
    counter!("twofa_store_write_results_total", "result" => result).increment(1);
}

pub fn record_request(status: u16, start: Instant) {
    counter!("twofa_requests_total", "status" => status.to_string()).increment(1);
    histogram!("twofa_request_duration_seconds").record(start.elapsed().as_secs_f64());
}
