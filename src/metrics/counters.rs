//! Counter helpers

use super::labels;

/// Record a driver open
pub fn driver_open(driver: &str, outcome: &'static str) {
    metrics::counter!(
        labels::DRIVER_OPENS_TOTAL,
        "driver" => driver.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a driver ping
pub fn driver_ping(driver: &str, outcome: &'static str) {
    metrics::counter!(
        labels::DRIVER_PINGS_TOTAL,
        "driver" => driver.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one health-check attempt; `error` is the error category on failure
pub fn health_check_attempt(outcome: &'static str, error: &'static str) {
    metrics::counter!(
        labels::HEALTH_CHECK_ATTEMPTS_TOTAL,
        "outcome" => outcome,
        "error" => error
    )
    .increment(1);
}

/// Record a health check that used every attempt without success
pub fn health_check_exhausted(error: &'static str) {
    metrics::counter!(labels::HEALTH_CHECK_EXHAUSTED_TOTAL, "error" => error).increment(1);
}
