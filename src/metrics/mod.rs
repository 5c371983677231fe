//! Prometheus metrics for a burst run
//!
//! Exposes metrics for:
//! - Submissions and their failures
//! - Receipt polls by outcome
//! - Confirmations, confirmation latency and tasks in flight
//!
//! The process is short-lived, so there is no scrape endpoint; `render` dumps
//! the registry as text at the end of a run.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};

lazy_static! {
    pub static ref TX_SUBMITTED: Counter = register_counter!(
        "nonce_burst_transactions_submitted_total",
        "Total transactions accepted by eth_sendTransaction"
    ).unwrap();

    pub static ref TX_CONFIRMED: Counter = register_counter!(
        "nonce_burst_transactions_confirmed_total",
        "Total transactions with a mined receipt"
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "nonce_burst_transactions_failed_total",
        "Total transactions that failed, by stage",
        &["stage"]
    ).unwrap();

    pub static ref RECEIPT_POLLS: CounterVec = register_counter_vec!(
        "nonce_burst_receipt_polls_total",
        "Receipt polls by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref IN_FLIGHT: Gauge = register_gauge!(
        "nonce_burst_tasks_in_flight",
        "Tasks currently past the admission gate"
    ).unwrap();

    pub static ref CONFIRMATION_LATENCY: Histogram = register_histogram!(
        "nonce_burst_confirmation_latency_seconds",
        "Time from submission to mined receipt",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();
}

/// Encode every registered metric in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

// Helper functions to record metrics

pub fn record_tx_submitted() {
    TX_SUBMITTED.inc();
}

pub fn record_tx_confirmed(latency_secs: f64) {
    TX_CONFIRMED.inc();
    CONFIRMATION_LATENCY.observe(latency_secs);
}

pub fn record_submission_failed() {
    TX_FAILED.with_label_values(&["submission"]).inc();
}

pub fn record_confirmation_failed() {
    TX_FAILED.with_label_values(&["confirmation"]).inc();
}

pub fn record_receipt_poll(outcome: &str) {
    RECEIPT_POLLS.with_label_values(&[outcome]).inc();
}

pub fn record_task_admitted() {
    IN_FLIGHT.inc();
}

pub fn record_task_released() {
    IN_FLIGHT.dec();
}
