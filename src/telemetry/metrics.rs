//! Metric definitions for mail composition and delivery

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

pub const EMAILS_SENT_TOTAL: &str = "mailcraft_emails_sent_total";
pub const EMAILS_FAILED_TOTAL: &str = "mailcraft_emails_failed_total";
pub const DELIVERY_ATTEMPTS_TOTAL: &str = "mailcraft_delivery_attempts_total";
pub const COMPOSE_DURATION_SECONDS: &str = "mailcraft_compose_duration_seconds";

/// Register metric descriptions with whatever recorder the host installed.
pub fn describe_metrics() {
    describe_counter!(EMAILS_SENT_TOTAL, "Emails accepted by a delivery backend");
    describe_counter!(
        EMAILS_FAILED_TOTAL,
        "Emails rejected by validation or a delivery backend"
    );
    describe_counter!(
        DELIVERY_ATTEMPTS_TOTAL,
        "Transport send attempts, retries included"
    );
    describe_histogram!(
        COMPOSE_DURATION_SECONDS,
        "Template resolution and rendering duration in seconds"
    );
}

pub fn record_sent(backend: &'static str) {
    counter!(EMAILS_SENT_TOTAL, "backend" => backend).increment(1);
}

pub fn record_failed(backend: &'static str, kind: &'static str) {
    counter!(EMAILS_FAILED_TOTAL, "backend" => backend, "kind" => kind).increment(1);
}

pub fn record_attempt(backend: &'static str) {
    counter!(DELIVERY_ATTEMPTS_TOTAL, "backend" => backend).increment(1);
}

pub fn record_compose_duration(elapsed: Duration) {
    histogram!(COMPOSE_DURATION_SECONDS).record(elapsed.as_secs_f64());
}
