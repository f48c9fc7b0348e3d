// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::{describe_counter, describe_histogram};

/// Register all Tabula metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("tabula_model_calls_total", "Total model backend calls");
    describe_counter!("tabula_tool_calls_total", "Total tool dispatches");
    describe_counter!(
        "tabula_generation_total",
        "SQL generation sessions by outcome"
    );
    describe_counter!(
        "tabula_limiter_admitted_total",
        "Requests admitted by the rate limiter"
    );
    describe_counter!(
        "tabula_limiter_blocked_total",
        "Requests rejected by the rate limiter"
    );
    describe_histogram!(
        "tabula_request_latency_seconds",
        "Gated request latency in seconds"
    );
}

/// Record a model backend call.
pub fn record_model_call() {
    metrics::counter!("tabula_model_calls_total").increment(1);
}

/// Record a tool dispatch.
pub fn record_tool_call(tool: &str) {
    metrics::counter!("tabula_tool_calls_total", "tool" => tool.to_string()).increment(1);
}

/// Record the outcome of a generation session.
pub fn record_generation(outcome: &'static str) {
    metrics::counter!("tabula_generation_total", "outcome" => outcome).increment(1);
}

/// Record a limiter admission decision.
pub fn record_admission(admitted: bool) {
    if admitted {
        metrics::counter!("tabula_limiter_admitted_total").increment(1);
    } else {
        metrics::counter!("tabula_limiter_blocked_total").increment(1);
    }
}

/// Record the latency of a completed gated request.
pub fn record_latency(seconds: f64) {
    metrics::histogram!("tabula_request_latency_seconds").record(seconds);
}
