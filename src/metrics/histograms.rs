//! Histogram helpers

use super::labels;

/// Record how long a driver open took
pub fn driver_open_duration(driver: &str, millis: u64) {
    metrics::histogram!(labels::DRIVER_OPEN_DURATION_MS, "driver" => driver.to_string())
        .record(millis as f64);
}

/// Record how long a ping took
pub fn driver_ping_duration(driver: &str, millis: u64) {
    metrics::histogram!(labels::DRIVER_PING_DURATION_MS, "driver" => driver.to_string())
        .record(millis as f64);
}

/// Record how many attempts a health check used
pub fn health_check_attempts_used(outcome: &'static str, attempts: u32) {
    metrics::histogram!(labels::HEALTH_CHECK_ATTEMPTS_USED, "outcome" => outcome)
        .record(attempts as f64);
}
