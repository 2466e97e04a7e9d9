//! Prometheus metrics for fees-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "fees_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Billed assignments counter.
pub static STUDENTS_BILLED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fees_students_billed_total",
        "Total number of student term assignments billed",
        &["grade"]
    )
    .expect("Failed to register students_billed_total")
});

/// Payment application counter by outcome.
pub static PAYMENTS_APPLIED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fees_payments_applied_total",
        "Total number of payment allocations by outcome",
        &["outcome"] // fully_applied, remainder_returned, nothing_outstanding
    )
    .expect("Failed to register payments_applied_total")
});

/// Monetary amount counter for applied and unapplied payment portions.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fees_payment_amount_total",
        "Total payment amount by disposition",
        &["disposition"] // applied, unapplied
    )
    .expect("Failed to register payment_amount_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&STUDENTS_BILLED_TOTAL);
    Lazy::force(&PAYMENTS_APPLIED_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
