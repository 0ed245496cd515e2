//! Prometheus metrics for the booking core.
//!
//! Thin wrappers over the `metrics` facade; the server binary installs
//! the Prometheus exporter and serves the rendered text at `/metrics`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and register metric descriptions.
///
/// Returns `None` when a recorder is already installed (tests install
/// one per process at most).
#[must_use]
pub fn install_recorder() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok();
    if handle.is_some() {
        register_metrics();
    } else {
        tracing::warn!("metrics recorder already installed, skipping re-initialization");
    }
    handle
}

fn register_metrics() {
    describe_counter!(
        "fairgate_booking_requests_total",
        "Booking outcomes by kind (pending, waitlisted, rejected)"
    );
    describe_counter!(
        "fairgate_messages_dead_lettered_total",
        "Finalize messages forwarded to the dead-letter topic"
    );
    describe_histogram!(
        "fairgate_finalize_duration_seconds",
        "Time spent handling one finalize message"
    );
    describe_counter!(
        "fairgate_reconciliation_runs_total",
        "Reconciliation runs"
    );
    describe_counter!(
        "fairgate_reconciliation_fixes_total",
        "Counter adjustments applied by the reconciler"
    );
}

/// Booking coordinator metrics.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a booking request outcome (`pending`, `waitlisted`,
    /// `rejected`).
    pub fn record_outcome(outcome: &'static str) {
        counter!("fairgate_booking_requests_total", "outcome" => outcome).increment(1);
    }
}

/// Finalize worker metrics.
pub struct FinalizeMetrics;

impl FinalizeMetrics {
    /// Record the handling duration of one message.
    pub fn record_handled(duration: Duration) {
        histogram!("fairgate_finalize_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a message forwarded to the dead-letter topic.
    pub fn record_dead_letter() {
        counter!("fairgate_messages_dead_lettered_total").increment(1);
    }
}

/// Reconciler metrics.
pub struct ReconcileMetrics;

impl ReconcileMetrics {
    /// Record a reconciliation run.
    pub fn record_run() {
        counter!("fairgate_reconciliation_runs_total").increment(1);
    }

    /// Record one applied counter fix.
    pub fn record_fix() {
        counter!("fairgate_reconciliation_fixes_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_noop() {
        // The facade drops metrics when no recorder is installed;
        // these must not panic either way.
        BookingMetrics::record_outcome("pending");
        FinalizeMetrics::record_handled(Duration::from_millis(3));
        FinalizeMetrics::record_dead_letter();
        ReconcileMetrics::record_run();
        ReconcileMetrics::record_fix();
    }
}
