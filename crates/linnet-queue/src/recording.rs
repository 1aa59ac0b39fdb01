// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; nothing is exported unless the binary
//! installs a recorder.

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register descriptions for all Linnet metrics.
pub fn register_metrics() {
    describe_counter!(
        "linnet_requests_enqueued_total",
        "Requests admitted into the queue"
    );
    describe_counter!(
        "linnet_requests_processed_total",
        "Requests processed successfully"
    );
    describe_counter!(
        "linnet_requests_failed_total",
        "Processing attempts that failed or timed out"
    );
    describe_counter!(
        "linnet_requests_retried_total",
        "Failed requests re-enqueued for another attempt"
    );
    describe_counter!(
        "linnet_requests_timed_out_total",
        "Processing attempts abandoned at the deadline"
    );
    describe_counter!(
        "linnet_requests_abandoned_total",
        "Failed requests dropped because their retry did not fit in the queue"
    );
    describe_counter!(
        "linnet_rate_limited_total",
        "Requests rejected by the rate limiter"
    );
    describe_gauge!("linnet_queue_depth", "Requests waiting in the queue");
    describe_histogram!(
        "linnet_processing_seconds",
        "Wall time of one processing attempt"
    );
}

pub(crate) fn record_enqueued(depth: usize) {
    metrics::counter!("linnet_requests_enqueued_total").increment(1);
    set_depth(depth);
}

pub(crate) fn record_processed(elapsed: Duration) {
    metrics::counter!("linnet_requests_processed_total").increment(1);
    metrics::histogram!("linnet_processing_seconds").record(elapsed.as_secs_f64());
}

pub(crate) fn record_failed(elapsed: Duration) {
    metrics::counter!("linnet_requests_failed_total").increment(1);
    metrics::histogram!("linnet_processing_seconds").record(elapsed.as_secs_f64());
}

pub(crate) fn record_retried() {
    metrics::counter!("linnet_requests_retried_total").increment(1);
}

pub(crate) fn record_abandoned() {
    metrics::counter!("linnet_requests_abandoned_total").increment(1);
}

pub(crate) fn record_timed_out() {
    metrics::counter!("linnet_requests_timed_out_total").increment(1);
}

pub(crate) fn set_depth(depth: usize) {
    metrics::gauge!("linnet_queue_depth").set(depth as f64);
}
